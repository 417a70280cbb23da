use std::sync::Arc;

use super::ServiceError;
use crate::models::reward::Reward;
use crate::repositories::RewardRepository;

#[derive(Clone)]
pub struct RewardResolver {
    rewards: Arc<dyn RewardRepository>,
}

impl RewardResolver {
    pub fn new(rewards: Arc<dyn RewardRepository>) -> Self {
        RewardResolver { rewards }
    }

    /// The next active tier at or above `total_referral`.
    pub async fn resolve(&self, total_referral: i64) -> Result<Reward, ServiceError> {
        self.rewards
            .find_tier_at_or_above(total_referral)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Description of the tier earned by `total_referral`; empty when nothing
    /// was referred. A zero count never queries storage.
    pub async fn describe(&self, total_referral: i64) -> Result<String, ServiceError> {
        if total_referral == 0 {
            return Ok(String::new());
        }

        Ok(self.resolve(total_referral).await?.description)
    }
}
