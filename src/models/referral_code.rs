use serde::{Deserialize, Serialize};

use super::RecordStatus;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct ReferralCode {
    pub id: i64,
    pub msisdn: String,
    pub code: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: RecordStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewReferralCode {
    pub msisdn: String,
    pub code: String,
}
