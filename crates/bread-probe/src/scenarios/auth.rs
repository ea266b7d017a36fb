//! Register and log in, then try to register the same user again and a
//! user with a malformed email.

use super::flows::check_status;
use super::ScenarioKind;
use crate::assertion::StatusClass;
use crate::driver::PageDriver;
use crate::result::ProbeResult;
use crate::scenario::{Journey, ScenarioContext};

pub(super) async fn run<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
) -> ProbeResult<()> {
    let user = ctx.user(ScenarioKind::Auth.user_prefix());
    let session = ctx
        .bootstrapper()
        .create_authenticated_session(user, journey)
        .await?;

    journey.act("register the same user again");
    let duplicate = ctx.api.register(&session.user).await;
    check_status(journey, "duplicate registration rejected", StatusClass::Not(201), duplicate);

    journey.act("register with a malformed email");
    let malformed = session
        .user
        .with_identity(format!("bad_{}", ctx.token), "not-an-email");
    let response = ctx.api.register(&malformed).await;
    check_status(journey, "malformed email rejected", StatusClass::Not(201), response);

    Ok(())
}
