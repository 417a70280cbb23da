use std::sync::Arc;

use super::{RejectReason, ServiceError};
use crate::models::referral_history::NewReferralHistory;
use crate::repositories::{ReferralCodeRepository, ReferralHistoryRepository, RepositoryError};
use crate::utils::msisdn;

/// Records a referee consuming someone else's referral code.
///
/// Checks run in order and stop at the first failure:
/// 1. the referee msisdn is valid and the code is not oversized;
/// 2. the code belongs to an active owner;
/// 3. the referee has never been referred before;
/// 4. the referee does not own a code of their own.
///
/// The unique index on the referee column backs check 3 when two redemptions race.
#[derive(Clone)]
pub struct RedemptionService {
    codes: Arc<dyn ReferralCodeRepository>,
    histories: Arc<dyn ReferralHistoryRepository>,
    max_code_length: usize,
    strict_owner_check: bool,
}

impl RedemptionService {
    pub fn new(
        codes: Arc<dyn ReferralCodeRepository>,
        histories: Arc<dyn ReferralHistoryRepository>,
        max_code_length: usize,
        strict_owner_check: bool,
    ) -> Self {
        RedemptionService {
            codes,
            histories,
            max_code_length,
            strict_owner_check,
        }
    }

    pub async fn redeem(&self, code: &str, raw_referee: &str) -> Result<(), ServiceError> {
        let referee = msisdn::normalize(raw_referee)?;
        if code.chars().count() > self.max_code_length {
            log::info!("Rejected oversized referral code from {}.", referee);
            return Err(ServiceError::InvalidRequest(RejectReason::CodeTooLong));
        }

        let referral_code = match self.codes.find_by_code(code).await? {
            Some(referral_code) => referral_code,
            None => {
                log::info!("Referral code not found: {}.", code);
                return Err(ServiceError::InvalidRequest(RejectReason::UnknownCode));
            }
        };

        if self.histories.find_by_referee(&referee).await?.is_some() {
            log::info!("{} was already referred.", referee);
            return Err(ServiceError::InvalidRequest(RejectReason::AlreadyReferred));
        }

        if self.referee_owns_code(&referee).await? {
            log::info!("{} already owns a referral code.", referee);
            return Err(ServiceError::InvalidRequest(RejectReason::RefereeHasCode));
        }

        let history = NewReferralHistory {
            msisdn: referral_code.msisdn,
            code: code.to_string(),
            referral_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            msisdn_referee: referee,
        };
        match self.histories.insert(&history).await {
            Ok(0) => {
                log::error!(
                    "Referral history insert for {} returned no id.",
                    history.msisdn_referee
                );
                Err(ServiceError::Storage(RepositoryError::MissingId))
            }
            Ok(_) => {
                log::info!(
                    "{} referred {} with code {}.",
                    history.msisdn,
                    history.msisdn_referee,
                    history.code
                );
                Ok(())
            }
            Err(RepositoryError::Conflict(constraint)) => {
                log::info!(
                    "{} was referred concurrently ({}).",
                    history.msisdn_referee,
                    constraint
                );
                Err(ServiceError::InvalidRequest(RejectReason::AlreadyReferred))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn referee_owns_code(&self, referee: &str) -> Result<bool, ServiceError> {
        match self.codes.find_by_msisdn(referee).await {
            Ok(found) => Ok(found.is_some()),
            Err(e) if self.strict_owner_check => Err(e.into()),
            Err(e) => {
                log::warn!(
                    "Ignoring lookup failure while checking codes owned by {}: {}",
                    referee,
                    e
                );
                Ok(false)
            }
        }
    }
}
