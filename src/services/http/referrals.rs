use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::oneshot;

use super::AppState;
use crate::services::referrals::ReferralRequest;
use crate::services::{RejectReason, ServiceError, CODE_SUCCESS, MESSAGE_SUCCESS};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msisdn: String,
}

fn success<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "code": CODE_SUCCESS,
            "message": MESSAGE_SUCCESS,
            "data": data,
        })),
    )
        .into_response()
}

/// Sends a request to the referral service and waits for its answer.
async fn dispatch<T>(
    state: &AppState,
    request: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> ReferralRequest,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .referral_channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication("Http => Referral".to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication("Referral => Http".to_string(), e.to_string()))?
}

pub async fn get_code(
    State(state): State<AppState>,
    Path(msisdn): Path<String>,
) -> Result<Response, ServiceError> {
    let code = dispatch(&state, |response| ReferralRequest::GetCode { msisdn, response }).await?;

    Ok(success(json!({ "referralCode": code })))
}

pub async fn list_history(
    State(state): State<AppState>,
    Path(msisdn): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, ServiceError> {
    let page = parse_or_zero(params.page.as_deref());
    let limit = parse_or_zero(params.limit.as_deref());

    let history = dispatch(&state, |response| ReferralRequest::ListHistory {
        msisdn,
        page,
        limit,
        response,
    })
    .await?;

    Ok(success(history))
}

pub async fn get_reward(
    State(state): State<AppState>,
    Path(msisdn): Path<String>,
) -> Result<Response, ServiceError> {
    let status =
        dispatch(&state, |response| ReferralRequest::GetReward { msisdn, response }).await?;

    Ok(success(status))
}

pub async fn redeem(
    State(state): State<AppState>,
    body: Result<Json<RedeemRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = match body {
        Ok(Json(request)) if !request.code.is_empty() && !request.msisdn.is_empty() => request,
        Ok(_) => return Err(ServiceError::InvalidRequest(RejectReason::MalformedRequest)),
        Err(rejection) => {
            log::info!("Rejected referral body: {}", rejection);
            return Err(ServiceError::InvalidRequest(RejectReason::MalformedRequest));
        }
    };

    dispatch(&state, |response| ReferralRequest::Redeem {
        code: request.code,
        msisdn: request.msisdn,
        response,
    })
    .await?;

    Ok((
        StatusCode::OK,
        Json(json!({"code": CODE_SUCCESS, "message": MESSAGE_SUCCESS})),
    )
        .into_response())
}

fn parse_or_zero(value: Option<&str>) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}
