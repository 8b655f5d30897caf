use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::models::UserRole;
use crate::utils::error::AppResult;
use crate::utils::response::{created, empty_success, success};

use super::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Response> {
    let user = state
        .service
        .register(
            &payload.name,
            &payload.email,
            &payload.password,
            payload.role.unwrap_or(UserRole::Customer),
        )
        .await?;
    Ok(created(user, "User registered"))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Response> {
    let user = state
        .service
        .authenticate(&payload.email, &payload.password)
        .await?;
    Ok(success(user, "Login successful"))
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Response> {
    let outcome = state.service.request_password_reset(&payload.email).await?;
    Ok(success(outcome, "Password reset requested"))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Response> {
    state
        .service
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(empty_success("Password has been reset successfully"))
}

#[derive(Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Response> {
    let users = state.service.list_users(query.role).await?;
    Ok(success(users, "Users listed"))
}
