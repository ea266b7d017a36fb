//! Steps shared by several journeys.

use crate::action::ActionOutcome;
use crate::api::{ApiError, ApiResponse};
use crate::assertion::{AssertionResult, StatusClass};
use crate::driver::PageDriver;
use crate::fixture::DASHBOARD_PATH;
use crate::locator::SemanticTarget;
use crate::model::CalculationRequest;
use crate::result::FailureKind;
use crate::scenario::{Journey, ScenarioContext};

/// Buttons that submit the calculation form
pub const ADD_BUTTONS: [SemanticTarget; 4] = [
    SemanticTarget::AddButton,
    SemanticTarget::CreateButton,
    SemanticTarget::SubmitTextButton,
    SemanticTarget::SubmitButton,
];

/// Buttons that submit the edit form
pub const UPDATE_BUTTONS: [SemanticTarget; 3] = [
    SemanticTarget::UpdateButton,
    SemanticTarget::SaveButton,
    SemanticTarget::SubmitButton,
];

/// Navigate to the dashboard unless the page is already there
pub async fn ensure_dashboard<D: PageDriver + ?Sized>(ctx: &ScenarioContext<'_, D>) -> ActionOutcome {
    match ctx.driver.current_url().await {
        Ok(url) if url.contains(DASHBOARD_PATH) => ActionOutcome::Done {
            detail: format!("already on {url}"),
        },
        _ => ctx.actions().navigate(DASHBOARD_PATH).await,
    }
}

/// Fill and submit the dashboard's calculation form
pub async fn add_calculation<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    request: &CalculationRequest,
) -> ActionOutcome {
    let on_dashboard = ensure_dashboard(ctx).await;
    if !on_dashboard.is_done() {
        return on_dashboard;
    }
    submit_calculation_form(ctx, request, &ADD_BUTTONS).await
}

/// Choose the type, fill the operands, press the first submit button found
pub async fn submit_calculation_form<D: PageDriver + ?Sized>(
    ctx: &ScenarioContext<'_, D>,
    request: &CalculationRequest,
    buttons: &[SemanticTarget],
) -> ActionOutcome {
    let actions = ctx.actions();
    let chosen = actions
        .choose(SemanticTarget::CalculationTypeSelect, request.kind.as_str())
        .await;
    if !chosen.is_done() {
        return chosen;
    }
    let typed = actions
        .type_values(SemanticTarget::CalculationInputs, &request.input_texts())
        .await;
    if !typed.is_done() {
        return typed;
    }
    actions.click_first(buttons).await
}

/// Record a status-class checkpoint for an API call
pub fn check_status(
    journey: &mut Journey,
    name: &str,
    class: StatusClass,
    response: Result<ApiResponse, ApiError>,
) -> bool {
    let result = match response {
        Ok(response) => class.check(response.status),
        Err(e) => AssertionResult::fail(FailureKind::Interaction, class.to_string(), e.to_string()),
    };
    journey.check(name, result)
}
