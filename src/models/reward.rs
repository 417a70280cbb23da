use serde::{Deserialize, Serialize};

use super::RecordStatus;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct Reward {
    pub id: i64,
    pub total_referral: i32,
    #[sqlx(rename = "reward_description")]
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub status: RecordStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewReward {
    pub total_referral: i32,
    pub description: String,
}

/// Partial update; a zero threshold or empty description leaves that column untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct RewardUpdate {
    pub id: i64,
    pub total_referral: i32,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardStatus {
    pub total_referral: i64,
    pub reward: String,
}
