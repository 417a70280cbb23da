use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::code_generator::CodeGenerator;
use super::history::HistoryService;
use super::issuance::IssuanceService;
use super::redemption::RedemptionService;
use super::rewards::RewardResolver;
use super::{RequestHandler, Service, ServiceError};
use crate::models::referral_history::HistoryPage;
use crate::models::reward::RewardStatus;
use crate::repositories::{ReferralCodeRepository, ReferralHistoryRepository, RewardRepository};
use crate::settings;

pub enum ReferralRequest {
    GetCode {
        msisdn: String,
        response: oneshot::Sender<Result<String, ServiceError>>,
    },
    ListHistory {
        msisdn: String,
        page: i64,
        limit: i64,
        response: oneshot::Sender<Result<HistoryPage, ServiceError>>,
    },
    GetReward {
        msisdn: String,
        response: oneshot::Sender<Result<RewardStatus, ServiceError>>,
    },
    Redeem {
        code: String,
        msisdn: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ReferralRequestHandler {
    issuance: IssuanceService,
    history: HistoryService,
    redemption: RedemptionService,
}

impl ReferralRequestHandler {
    pub fn new(
        codes: Arc<dyn ReferralCodeRepository>,
        histories: Arc<dyn ReferralHistoryRepository>,
        rewards: Arc<dyn RewardRepository>,
        limits: &settings::Referral,
    ) -> Self {
        let generator = CodeGenerator::new(limits.code_bytes, limits.generation_attempts);

        ReferralRequestHandler {
            issuance: IssuanceService::new(codes.clone(), generator),
            history: HistoryService::new(
                histories.clone(),
                RewardResolver::new(rewards),
                limits.default_page_limit,
            ),
            redemption: RedemptionService::new(
                codes,
                histories,
                limits.max_code_length,
                limits.strict_owner_check,
            ),
        }
    }
}

/// Runs `work` until it finishes or the caller drops its receiver. Dropping
/// the future cancels whatever repository call or generation attempt is pending.
async fn reply<T, F>(response: oneshot::Sender<Result<T, ServiceError>>, work: F)
where
    F: Future<Output = Result<T, ServiceError>>,
{
    let mut response = response;
    tokio::select! {
        result = work => {
            if let Err(e) = &result {
                if e.is_client_error() {
                    log::debug!("Request rejected: {}", e);
                } else {
                    log::error!("Request failed: {}", e);
                }
            }
            let _ = response.send(result);
        }
        _ = response.closed() => {
            log::warn!("Caller went away, abandoning referral request.");
        }
    }
}

#[async_trait]
impl RequestHandler<ReferralRequest> for ReferralRequestHandler {
    async fn handle_request(&self, request: ReferralRequest) {
        match request {
            ReferralRequest::GetCode { msisdn, response } => {
                reply(response, self.issuance.get_or_create_code(&msisdn)).await;
            }
            ReferralRequest::ListHistory {
                msisdn,
                page,
                limit,
                response,
            } => {
                reply(response, self.history.list_history(&msisdn, page, limit)).await;
            }
            ReferralRequest::GetReward { msisdn, response } => {
                reply(response, self.history.current_month_reward(&msisdn)).await;
            }
            ReferralRequest::Redeem {
                code,
                msisdn,
                response,
            } => {
                reply(response, self.redemption.redeem(&code, &msisdn)).await;
            }
        }
    }
}

pub struct ReferralService;

impl ReferralService {
    pub fn new() -> Self {
        ReferralService {}
    }
}

impl Default for ReferralService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service<ReferralRequest, ReferralRequestHandler> for ReferralService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::referral_code::MockReferralCodeRepository;
    use crate::repositories::referral_history::MockReferralHistoryRepository;
    use crate::repositories::reward::MockRewardRepository;
    use crate::services::RejectReason;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn handler(
        codes: MockReferralCodeRepository,
        histories: MockReferralHistoryRepository,
    ) -> ReferralRequestHandler {
        ReferralRequestHandler::new(
            Arc::new(codes),
            Arc::new(histories),
            Arc::new(MockRewardRepository::new()),
            &settings::Referral::default(),
        )
    }

    #[tokio::test]
    async fn requests_are_answered_through_the_service_loop() {
        let mut codes = MockReferralCodeRepository::new();
        codes.expect_find_by_code().returning(|_| Ok(None));
        let handler = handler(codes, MockReferralHistoryRepository::new());

        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(async move {
            ReferralService::new().run(handler, &mut rx).await;
        });

        let (response_tx, response_rx) = oneshot::channel();
        tx.send(ReferralRequest::Redeem {
            code: "DOESNOTEXIST".to_string(),
            msisdn: "628123456789".to_string(),
            response: response_tx,
        })
        .await
        .expect("service is running");

        let result = response_rx.await.expect("service replies");
        assert!(matches!(
            result,
            Err(ServiceError::InvalidRequest(RejectReason::UnknownCode))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_request_stops_pending_work() {
        let (response_tx, response_rx) = oneshot::channel::<Result<(), ServiceError>>();
        drop(response_rx);

        let finished = tokio::time::timeout(
            Duration::from_secs(1),
            reply(response_tx, async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }),
        )
        .await;

        assert!(finished.is_ok());
    }
}
