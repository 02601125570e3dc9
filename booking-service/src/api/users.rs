use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, response::Json};

use super::{json_body, reply, AppState, AuthUser, Reply};
use crate::models::User;
use crate::services::{LoginInput, RegisterInput, Session};

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Reply<User> {
    let user = state.users.register(json_body(payload)?).await?;
    reply(StatusCode::CREATED, "user registered", user)
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Reply<Session> {
    let session = state.users.login(json_body(payload)?).await?;
    reply(StatusCode::OK, "login successful", session)
}

pub async fn me(State(state): State<AppState>, AuthUser(principal): AuthUser) -> Reply<User> {
    let user = state.users.profile(principal.id).await?;
    reply(StatusCode::OK, "profile", user)
}
