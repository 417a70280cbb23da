use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::repositories::{
    PgReferralCodeRepository, PgReferralHistoryRepository, PgRewardRepository, RepositoryError,
};
use crate::settings::Settings;
use crate::utils::msisdn::InvalidMsisdn;

pub mod code_generator;
pub mod history;
pub mod http;
pub mod issuance;
pub mod redemption;
pub mod referrals;
pub mod rewards;

pub const CODE_SUCCESS: &str = "0000";
pub const MESSAGE_SUCCESS: &str = "Success";

/// Why a request was turned away. Serialized as the `reason` of an error response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MalformedRequest,
    CodeTooLong,
    UnknownCode,
    AlreadyReferred,
    RefereeHasCode,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid msisdn: {0:?}")]
    InvalidIdentifier(String),
    #[error("Invalid request: {0:?}")]
    InvalidRequest(RejectReason),
    #[error("Data not found")]
    NotFound,
    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
    #[error("Could not generate a unique referral code")]
    GenerationExhausted,
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

impl From<InvalidMsisdn> for ServiceError {
    fn from(e: InvalidMsisdn) -> Self {
        ServiceError::InvalidIdentifier(e.0)
    }
}

impl ServiceError {
    /// Stable machine-readable code carried in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound => "0001",
            ServiceError::InvalidIdentifier(_) | ServiceError::InvalidRequest(_) => "0077",
            ServiceError::Storage(_) => "0081",
            ServiceError::GenerationExhausted => "0082",
            ServiceError::Communication(..) => "9999",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ServiceError::NotFound => "data not found",
            ServiceError::InvalidIdentifier(_) | ServiceError::InvalidRequest(_) => {
                "invalid request"
            }
            ServiceError::Storage(_) | ServiceError::GenerationExhausted => "unexpected error",
            ServiceError::Communication(..) => "system internal error",
        }
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            ServiceError::InvalidRequest(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::NotFound
                | ServiceError::InvalidIdentifier(_)
                | ServiceError::InvalidRequest(_)
        )
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let (referral_tx, mut referral_rx) = mpsc::channel(512);

    let limits = settings.referral.clone();
    let codes = Arc::new(PgReferralCodeRepository::new(
        pool.clone(),
        limits.lookup_timeout(),
    ));
    let histories = Arc::new(PgReferralHistoryRepository::new(
        pool.clone(),
        limits.lookup_timeout(),
        limits.aggregate_timeout(),
    ));
    let rewards = Arc::new(PgRewardRepository::new(pool, limits.lookup_timeout()));

    log::info!("Starting referral service.");
    let mut referral_service = referrals::ReferralService::new();
    let handler = referrals::ReferralRequestHandler::new(codes, histories, rewards, &limits);
    tokio::spawn(async move {
        referral_service.run(handler, &mut referral_rx).await;
    });

    log::info!("Starting HTTP server.");
    http::start_http_server(&settings.server, settings.auth, referral_tx).await?;

    log::info!("Services stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn errors_map_to_stable_codes() {
        assert_eq!(ServiceError::NotFound.code(), "0001");
        assert_eq!(ServiceError::InvalidIdentifier("x".into()).code(), "0077");
        assert_eq!(
            ServiceError::InvalidRequest(RejectReason::UnknownCode).code(),
            "0077"
        );
        assert_eq!(
            ServiceError::Storage(RepositoryError::Timeout(Duration::from_secs(10))).code(),
            "0081"
        );
        assert_eq!(ServiceError::GenerationExhausted.code(), "0082");
        assert_eq!(
            ServiceError::Communication("Http".into(), "closed".into()).code(),
            "9999"
        );
    }

    #[test]
    fn only_business_rejections_carry_a_reason() {
        assert_eq!(
            ServiceError::InvalidRequest(RejectReason::AlreadyReferred).reason(),
            Some(RejectReason::AlreadyReferred)
        );
        assert_eq!(ServiceError::InvalidIdentifier("x".into()).reason(), None);
        assert_eq!(ServiceError::GenerationExhausted.reason(), None);
    }

    #[test]
    fn reject_reason_serializes_in_snake_case() {
        assert_eq!(
            serde_json::to_value(RejectReason::RefereeHasCode).ok(),
            Some(serde_json::json!("referee_has_code"))
        );
    }

    #[test]
    fn invalid_msisdn_converts_to_invalid_identifier() {
        let error: ServiceError = InvalidMsisdn("abc".into()).into();
        assert!(matches!(error, ServiceError::InvalidIdentifier(raw) if raw == "abc"));
    }
}
