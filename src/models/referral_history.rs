use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct ReferralHistory {
    pub id: i64,
    /// Owner of the redeemed code.
    pub msisdn: String,
    pub code: String,
    /// Calendar date of the redemption, `YYYY-MM-DD`.
    pub referral_date: String,
    pub msisdn_referee: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ReferralHistory {
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewReferralHistory {
    pub msisdn: String,
    pub code: String,
    pub referral_date: String,
    pub msisdn_referee: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub msisdn: String,
    pub referral_date: String,
    pub date_time: i64,
}

impl From<ReferralHistory> for HistoryItem {
    fn from(history: ReferralHistory) -> Self {
        HistoryItem {
            date_time: history.created_at_millis(),
            msisdn: history.msisdn_referee,
            referral_date: history.referral_date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_page: i64,
    pub total_record: i64,
    pub page: i64,
    pub size: usize,
    pub limit: i64,
    pub first_page: bool,
    pub last_page: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryPage {
    pub list: Vec<HistoryItem>,
    pub meta: PageMeta,
}
