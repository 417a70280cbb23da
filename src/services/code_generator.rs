use std::future::Future;

use rand::{rngs::OsRng, TryRngCore};

use super::ServiceError;
use crate::repositories::RepositoryError;

/// Draws random uppercase-hex codes from the OS CSPRNG until one is unused.
///
/// A live code is the only credential needed to redeem, so the source must
/// stay unpredictable.
#[derive(Clone, Debug)]
pub struct CodeGenerator {
    code_bytes: usize,
    max_attempts: u32,
}

impl CodeGenerator {
    pub fn new(code_bytes: usize, max_attempts: u32) -> Self {
        CodeGenerator {
            code_bytes,
            max_attempts,
        }
    }

    /// `exists` reports whether a candidate is already held by an active code.
    /// Collisions and random-source failures use up an attempt; a storage fault
    /// from `exists` ends generation immediately.
    pub async fn generate<F, Fut>(&self, mut exists: F) -> Result<String, ServiceError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, RepositoryError>>,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = match self.random_code() {
                Ok(candidate) => candidate,
                Err(e) => {
                    log::warn!("Random source failed on attempt {}: {}", attempt, e);
                    continue;
                }
            };

            if !exists(candidate.clone()).await? {
                return Ok(candidate);
            }
            log::debug!("Referral code collision on attempt {}.", attempt);
        }

        log::error!(
            "Unable to generate a unique referral code after {} attempts.",
            self.max_attempts
        );
        Err(ServiceError::GenerationExhausted)
    }

    fn random_code(&self) -> Result<String, rand::rand_core::OsError> {
        let mut bytes = vec![0u8; self.code_bytes];
        OsRng.try_fill_bytes(&mut bytes)?;

        Ok(hex::encode_upper(bytes))
    }
}
