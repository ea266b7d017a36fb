//! A user registered through the form exists and can log in.

use super::flows::check_status;
use super::ScenarioKind;
use crate::assertion::{StatusClass, UrlPattern};
use crate::driver::PageDriver;
use crate::locator::SemanticTarget;
use crate::result::ProbeResult;
use crate::scenario::{Journey, ScenarioContext};

pub(super) async fn run<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
) -> ProbeResult<()> {
    let user = ctx
        .user(ScenarioKind::Registration.user_prefix())
        .with_names("Reg", "Tester");
    let bootstrapper = ctx.bootstrapper();
    let observer = ctx.observer();
    let settle = ctx.config.settle_timeout_ms;

    journey.setup();
    let submitted = bootstrapper.register_via_ui(&user).await;
    if !journey.action("submit registration form", &submitted) {
        return Ok(());
    }

    journey.check(
        "registration form accepted",
        observer
            .leaves(
                &UrlPattern::Contains("/register".into()),
                Some(SemanticTarget::SuccessAlert),
                settle,
            )
            .await,
    );

    // A second registration of the same identity only fails if the first one stuck
    journey.act("register the same user via api");
    let again = ctx.api.register(&user).await;
    check_status(journey, "registration persisted", StatusClass::Not(201), again);

    bootstrapper.login(&user, journey).await;
    Ok(())
}
