use axum::extract::State;
use axum::response::Response;

use crate::utils::error::AppResult;
use crate::utils::response::success;

use super::AppState;

pub async fn list_offers(State(state): State<AppState>) -> AppResult<Response> {
    let offers = state.service.list_offers().await?;
    Ok(success(offers, "Offers listed"))
}
