//! Invalid calculation inputs are rejected and protected routes bounce an
//! unauthenticated visitor to the login page.

use super::flows::{self, check_status};
use super::ScenarioKind;
use crate::assertion::{AssertionResult, StatusClass, UrlPattern};
use crate::config::InvalidInputPolicy;
use crate::driver::PageDriver;
use crate::fixture::{Session, DASHBOARD_PATH};
use crate::locator::SemanticTarget;
use crate::model::{CalculationRequest, CalculationType};
use crate::result::{FailureKind, ProbeResult};
use crate::scenario::{Journey, ScenarioContext};

/// Id that no calculation will ever have
const MISSING_CALCULATION: &str = "00000000-0000-0000-0000-000000000000";

const REJECTED_PREDICATE: &str =
    "no new listing row, and validation error visible or listing row count unchanged";

fn invalid_request() -> CalculationRequest {
    CalculationRequest::new(CalculationType::Addition, ["abc", "def"])
}

pub(super) async fn run<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
) -> ProbeResult<()> {
    let user = ctx.user(ScenarioKind::Negative.user_prefix());
    let session = ctx
        .bootstrapper()
        .create_authenticated_session(user, journey)
        .await?;

    reject_via_api(ctx, journey, &session).await;
    reject_via_ui(ctx, journey).await;
    guard_routes(ctx, journey).await;
    Ok(())
}

async fn reject_via_api<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
    session: &Session,
) {
    journey.act("submit non-numeric inputs via api");
    match &session.credential {
        Some(credential) => {
            let response = ctx
                .api
                .create_calculation(Some(credential), &invalid_request())
                .await;
            check_status(journey, "api rejects non-numeric inputs", StatusClass::NotSuccess, response);
        }
        None => journey.warn(
            "api rejects non-numeric inputs",
            "session credential available",
            format!("localStorage[{}] empty", ctx.config.token_key),
        ),
    }
}

async fn reject_via_ui<D: PageDriver + ?Sized>(ctx: &ScenarioContext<'_, D>, journey: &mut Journey) {
    let observer = ctx.observer();

    let on_dashboard = flows::ensure_dashboard(ctx).await;
    if !journey.action("open dashboard", &on_dashboard) {
        return;
    }
    let rows_before = observer.count(SemanticTarget::ListingRow).await;

    let submitted = flows::add_calculation(ctx, &invalid_request()).await;
    if !journey.action("submit non-numeric inputs", &submitted) {
        return;
    }

    let shown = observer.present(SemanticTarget::ValidationError).await.passed;
    let rows_after = observer.count(SemanticTarget::ListingRow).await;
    let result = grade_rejection(shown, rows_before, rows_after);
    if result.passed {
        journey.check("ui rejects non-numeric inputs", result);
        return;
    }
    match ctx.config.invalid_input_policy {
        InvalidInputPolicy::Strict => journey.check("ui rejects non-numeric inputs", result),
        InvalidInputPolicy::Warn => journey.check_tolerant("ui rejects non-numeric inputs", result),
    };
}

/// A stored garbage row fails even under a visible error banner
fn grade_rejection(error_shown: bool, rows_before: usize, rows_after: usize) -> AssertionResult {
    let banner = if error_shown { "validation error shown" } else { "no validation error" };
    let rejected = rows_after <= rows_before && (error_shown || rows_after == rows_before);
    if rejected {
        AssertionResult::pass(REJECTED_PREDICATE)
    } else {
        AssertionResult::fail(
            FailureKind::Assertion,
            REJECTED_PREDICATE,
            format!("{banner}; listing rows {rows_before} -> {rows_after}"),
        )
    }
}

async fn guard_routes<D: PageDriver + ?Sized>(ctx: &ScenarioContext<'_, D>, journey: &mut Journey) {
    let actions = ctx.actions();
    let observer = ctx.observer();
    let settle = ctx.config.settle_timeout_ms;
    let login = UrlPattern::Contains("/login".into());

    let ended = ctx.bootstrapper().end_session().await;
    journey.action("log out", &ended);

    for (name, path) in [
        ("edit route requires login", format!("/edit-calculation/{MISSING_CALCULATION}")),
        ("dashboard requires login", DASHBOARD_PATH.to_string()),
    ] {
        let visited = actions.navigate(&path).await;
        if journey.action(&format!("visit {path}"), &visited) {
            journey.check(name, observer.url(&login, settle).await);
        }
    }
}
