//! Full lifecycle of one calculation: add, browse, read, edit, delete.

use super::flows::{self, UPDATE_BUTTONS};
use super::ScenarioKind;
use crate::assertion::{AssertionResult, StatusClass, TextQuery, UrlPattern, Visibility};
use crate::config::CreationMode;
use crate::driver::PageDriver;
use crate::fixture::{Session, DASHBOARD_PATH};
use crate::locator::SemanticTarget;
use crate::model::{CalculationRequest, CalculationType, ExpectedCalculation};
use crate::result::{FailureKind, ProbeResult};
use crate::scenario::{Journey, ScenarioContext};

/// Password used for the lifecycle user
const PASSWORD: &str = "CalcPass123!";

fn created() -> ExpectedCalculation {
    ExpectedCalculation::new(CalculationRequest::new(CalculationType::Addition, [7, 3]), "10")
}

fn edited() -> ExpectedCalculation {
    ExpectedCalculation::new(CalculationRequest::new(CalculationType::Multiplication, [8, 2]), "16")
}

pub(super) async fn run<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
) -> ProbeResult<()> {
    let user = ctx
        .user(ScenarioKind::Crud.user_prefix())
        .with_password(PASSWORD);
    let session = ctx
        .bootstrapper()
        .create_authenticated_session(user, journey)
        .await?;

    let first = created();
    let second = edited();

    add(ctx, journey, &session, &first).await;
    browse(ctx, journey, &first).await;
    read(ctx, journey, &first).await;
    edit(ctx, journey, &first, &second).await;
    delete(ctx, journey, &first, &second).await;
    Ok(())
}

async fn add<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
    session: &Session,
    calc: &ExpectedCalculation,
) {
    match ctx.config.creation_mode {
        CreationMode::Ui => {
            let outcome = flows::add_calculation(ctx, &calc.request).await;
            journey.action("add calculation", &outcome);
        }
        CreationMode::Api => {
            journey.act("add calculation via api");
            match &session.credential {
                Some(credential) => {
                    let response = ctx
                        .api
                        .create_calculation(Some(credential), &calc.request)
                        .await;
                    if let Ok(created) = &response {
                        tracing::debug!(id = ?created.id(), "calculation created");
                    }
                    flows::check_status(journey, "calculation created", StatusClass::Success, response);
                }
                None => {
                    journey.check(
                        "calculation created",
                        AssertionResult::fail(
                            FailureKind::Assertion,
                            "session credential available",
                            format!("localStorage[{}] empty", ctx.config.token_key),
                        ),
                    );
                }
            }
            let outcome = ctx.actions().navigate(DASHBOARD_PATH).await;
            journey.action("open dashboard", &outcome);
        }
    }
}

async fn browse<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
    calc: &ExpectedCalculation,
) {
    let observer = ctx.observer();
    let settle = ctx.config.settle_timeout_ms;
    journey.check(
        &format!("listing shows {}", calc.expected),
        observer
            .text(&TextQuery::listed(&calc.expected), Visibility::Visible, settle)
            .await,
    );
    journey.check(
        "listing visible",
        observer.present(SemanticTarget::ListingRegion).await,
    );
}

async fn read<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
    calc: &ExpectedCalculation,
) {
    let actions = ctx.actions();
    let observer = ctx.observer();
    let settle = ctx.config.settle_timeout_ms;

    journey.act("open calculation details");
    let opened = actions
        .click_first(&[SemanticTarget::ViewControl, SemanticTarget::DetailsControl])
        .await;
    if !opened.is_done() {
        journey.warn(
            "view control",
            "view or details control present",
            opened.detail().to_string(),
        );
        return;
    }

    journey.check(
        "view page opened",
        observer
            .url(&UrlPattern::Contains("/view-calculation/".into()), settle)
            .await,
    );
    for input in calc.request.input_texts() {
        let query = TextQuery::contains(input.as_str());
        journey.check(
            &format!("view shows input {input}"),
            observer.text(&query, Visibility::Visible, settle).await,
        );
    }

    let back = actions.navigate(DASHBOARD_PATH).await;
    journey.action("return to dashboard", &back);
}

async fn edit<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
    before: &ExpectedCalculation,
    after: &ExpectedCalculation,
) {
    let actions = ctx.actions();
    let observer = ctx.observer();
    let settle = ctx.config.settle_timeout_ms;
    let edit_route = UrlPattern::Contains("/edit-calculation/".into());

    let opened = actions.click(SemanticTarget::EditControl).await;
    if !journey.action("open edit form", &opened) {
        return;
    }
    journey.check("edit page opened", observer.url(&edit_route, settle).await);

    let submitted = flows::submit_calculation_form(ctx, &after.request, &UPDATE_BUTTONS).await;
    if !journey.action("submit edit form", &submitted) {
        return;
    }

    // Leave the form only after the update has been handled
    journey.check_tolerant(
        "edit form closed",
        observer.leaves(&edit_route, None, settle).await,
    );
    let on_dashboard = flows::ensure_dashboard(ctx).await;
    journey.action("return to dashboard", &on_dashboard);

    journey.check(
        &format!("listing shows {}", after.expected),
        observer
            .text(&TextQuery::listed(&after.expected), Visibility::Visible, settle)
            .await,
    );
    journey.check(
        &format!("listing no longer shows {}", before.expected),
        observer
            .text(&TextQuery::listed(&before.expected), Visibility::Absent, settle)
            .await,
    );
}

async fn delete<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    journey: &mut Journey,
    before: &ExpectedCalculation,
    after: &ExpectedCalculation,
) {
    let actions = ctx.actions();
    let observer = ctx.observer();
    let settle = ctx.config.settle_timeout_ms;

    let armed = actions.accept_dialogs().await;
    journey.action("accept confirmation dialogs", &armed);
    let deleted = actions.click(SemanticTarget::DeleteControl).await;
    if !journey.action("delete calculation", &deleted) {
        return;
    }

    for calc in [after, before] {
        journey.check(
            &format!("listing no longer shows {} after delete", calc.expected),
            observer
                .text(&TextQuery::listed(&calc.expected), Visibility::Absent, settle)
                .await,
        );
    }
}
