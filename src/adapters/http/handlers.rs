//! Route handlers. Each one decodes its input, calls one service
//! operation and wraps the result in the response envelope.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use super::response::ApiResponse;
use super::session::{
    ACCESS_COOKIE, AuthUser, REFRESH_COOKIE, clear_cookie, cookie_value, session_cookie,
};
use crate::domain::ServiceError;
use crate::domain::order::OrderRequest;
use crate::usecases::Session;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ServiceError::bad_request(e.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    email: String,
    name: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    otp: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuery {
    market_id: Option<String>,
    #[serde(default)]
    team_details: bool,
}

/// Query of the football metadata routes. Both ids are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootballQuery {
    league_id: Option<String>,
    season_id: Option<String>,
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ServiceError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ServiceError::bad_request(e.body_text()))
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    session: Session,
) -> Result<Response, ServiceError> {
    let secure = state.cookie_secure;
    let access_age = state.tokens.access_ttl().num_seconds();
    let refresh_age = state.tokens.refresh_ttl().num_seconds();
    let access = session_cookie(ACCESS_COOKIE, &session.access_token, access_age, secure)?;
    let refresh = session_cookie(REFRESH_COOKIE, &session.refresh_token, refresh_age, secure)?;
    let message = format!("You successfully logged in ... {}", session.user.name);
    Ok((
        AppendHeaders([(SET_COOKIE, access), (SET_COOKIE, refresh)]),
        ApiResponse::with_status(status, session.user, message),
    )
        .into_response())
}

pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let req = body(payload)?;
    let session = state.auth.sign_up(&req.email, &req.name, &req.password).await?;
    session_response(&state, StatusCode::CREATED, session)
}

pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let req = body(payload)?;
    let session = state.auth.sign_in(&req.email, &req.password).await?;
    session_response(&state, StatusCode::OK, session)
}

pub async fn sign_out(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let secret = cookie_value(&headers, REFRESH_COOKIE)
        .ok_or_else(|| ServiceError::unauthorized("missing refresh token"))?;
    state.auth.sign_out(identity.id, secret).await?;
    let secure = state.cookie_secure;
    Ok((
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE, secure)?),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE, secure)?),
        ]),
        ApiResponse::with_status(StatusCode::ACCEPTED, serde_json::Value::Null, "Signed out"),
    )
        .into_response())
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let req = body(payload)?;
    let user_id = Uuid::parse_str(&req.id)
        .map_err(|_| ServiceError::bad_request(format!("invalid user id {:?}", req.id)))?;
    let secret = cookie_value(&headers, REFRESH_COOKIE)
        .ok_or_else(|| ServiceError::unauthorized("missing refresh token"))?;
    let access = state.auth.refresh(user_id, secret).await?;
    let max_age = state.tokens.access_ttl().num_seconds();
    let cookie = session_cookie(ACCESS_COOKIE, &access, max_age, state.cookie_secure)?;
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        ApiResponse::ok(serde_json::Value::Null, "Access token refreshed"),
    )
        .into_response())
}

pub async fn send_otp(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<ApiResponse<serde_json::Value>, ServiceError> {
    state.auth.send_otp(&identity).await?;
    Ok(ApiResponse::ok(
        serde_json::Value::Null,
        format!("Verification code sent to {}", identity.email),
    ))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<ApiResponse<serde_json::Value>, ServiceError> {
    let req = body(payload)?;
    state.auth.verify_otp(&identity, &req.otp).await?;
    Ok(ApiResponse::ok(serde_json::Value::Null, "Email verified"))
}

pub async fn me(AuthUser(identity): AuthUser) -> impl IntoResponse {
    ApiResponse::ok(identity, "Current user")
}

pub async fn markets(
    State(state): State<AppState>,
    q: Result<Query<MarketQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let q = query(q)?;
    match q.market_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => {
            let market = state.markets.get(id, q.team_details).await?;
            Ok(ApiResponse::ok(market, "Market fetched").into_response())
        }
        None => {
            let markets = state.markets.list(q.team_details).await?;
            Ok(ApiResponse::ok(markets, "Markets fetched").into_response())
        }
    }
}

pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let req = body(payload)?;
    let placed = state.orders.place_order(&identity, &req).await?;
    Ok(ApiResponse::with_status(StatusCode::CREATED, placed, "Order accepted").into_response())
}

pub async fn wallet(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Response, ServiceError> {
    let wallet = state.wallets.wallet_of(&identity).await?;
    Ok(ApiResponse::ok(wallet, "Wallet fetched").into_response())
}

pub async fn competitions(
    State(state): State<AppState>,
    _caller: AuthUser,
    q: Result<Query<FootballQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let q = query(q)?;
    let competitions = state.football.competitions(q.league_id.as_deref()).await?;
    Ok(ApiResponse::ok(competitions, "Competition meta data").into_response())
}

pub async fn standings(
    State(state): State<AppState>,
    _caller: AuthUser,
    q: Result<Query<FootballQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let q = query(q)?;
    let standings = state
        .football
        .standings(q.league_id.as_deref(), q.season_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(standings, "Standings fetched").into_response())
}

pub async fn seasons(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Response, ServiceError> {
    let seasons = state.football.seasons().await?;
    Ok(ApiResponse::ok(seasons, "Seasons fetched").into_response())
}
