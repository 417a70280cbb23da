use std::sync::Arc;

use super::code_generator::CodeGenerator;
use super::ServiceError;
use crate::models::referral_code::NewReferralCode;
use crate::repositories::{ReferralCodeRepository, RepositoryError};
use crate::utils::msisdn;

/// Hands out the one active referral code an msisdn owns, creating it on first request.
#[derive(Clone)]
pub struct IssuanceService {
    codes: Arc<dyn ReferralCodeRepository>,
    generator: CodeGenerator,
}

impl IssuanceService {
    pub fn new(codes: Arc<dyn ReferralCodeRepository>, generator: CodeGenerator) -> Self {
        IssuanceService { codes, generator }
    }

    pub async fn get_or_create_code(&self, raw_msisdn: &str) -> Result<String, ServiceError> {
        let msisdn = msisdn::normalize(raw_msisdn)?;

        if let Some(existing) = self.codes.find_by_msisdn(&msisdn).await? {
            return Ok(existing.code);
        }

        let codes = &self.codes;
        let code = self
            .generator
            .generate(move |candidate| async move {
                codes
                    .find_by_code(&candidate)
                    .await
                    .map(|found| found.is_some())
            })
            .await?;

        let new_code = NewReferralCode {
            msisdn: msisdn.clone(),
            code,
        };
        match self.codes.insert(&new_code).await {
            Ok(0) => {
                log::error!("Referral code insert for {} returned no id.", msisdn);
                Err(ServiceError::Storage(RepositoryError::MissingId))
            }
            Ok(_) => {
                log::info!("Issued referral code for {}.", msisdn);
                Ok(new_code.code)
            }
            Err(RepositoryError::Conflict(constraint)) => {
                log::warn!(
                    "Referral code insert for {} conflicted on {}.",
                    msisdn,
                    constraint
                );
                match self.codes.find_by_msisdn(&msisdn).await? {
                    Some(existing) => Ok(existing.code),
                    None => Err(ServiceError::GenerationExhausted),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
