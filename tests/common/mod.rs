#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use referral_service::models::referral_code::{NewReferralCode, ReferralCode};
use referral_service::models::referral_history::{NewReferralHistory, ReferralHistory};
use referral_service::models::reward::{NewReward, Reward, RewardUpdate};
use referral_service::models::RecordStatus;
use referral_service::repositories::{
    ReferralCodeRepository, ReferralHistoryRepository, RepositoryError, RewardRepository,
};
use referral_service::services::http;
use referral_service::services::referrals::{ReferralRequestHandler, ReferralService};
use referral_service::services::Service;
use referral_service::settings;
use tokio::sync::mpsc;

pub const USERNAME: &str = "referral";
pub const PASSWORD: &str = "secret";

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

#[derive(Default)]
pub struct InMemoryCodes {
    rows: Mutex<Vec<ReferralCode>>,
}

impl InMemoryCodes {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ReferralCodeRepository for InMemoryCodes {
    async fn find_by_msisdn(&self, msisdn: &str) -> Result<Option<ReferralCode>, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| r.msisdn == msisdn && r.status == RecordStatus::Active)
            .cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ReferralCode>, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| r.code == code && r.status == RecordStatus::Active)
            .cloned())
    }

    async fn insert(&self, code: &NewReferralCode) -> Result<i64, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(ReferralCode {
            id,
            msisdn: code.msisdn.clone(),
            code: code.code.clone(),
            created_at: now(),
            status: RecordStatus::Active,
        });
        Ok(id)
    }
}

#[derive(Default)]
pub struct InMemoryHistories {
    rows: Mutex<Vec<ReferralHistory>>,
}

impl InMemoryHistories {
    pub fn rows(&self) -> Vec<ReferralHistory> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReferralHistoryRepository for InMemoryHistories {
    async fn find_page(
        &self,
        msisdn: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ReferralHistory>, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|r| r.msisdn == msisdn)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_by_msisdn(&self, msisdn: &str) -> Result<i64, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|r| r.msisdn == msisdn).count() as i64)
    }

    async fn find_by_referee(
        &self,
        msisdn_referee: &str,
    ) -> Result<Option<ReferralHistory>, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| r.msisdn_referee == msisdn_referee)
            .cloned())
    }

    async fn count_by_msisdn_and_month(
        &self,
        msisdn: &str,
        month: &str,
    ) -> Result<i64, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.msisdn == msisdn && r.referral_date.starts_with(month))
            .count() as i64)
    }

    async fn insert(&self, history: &NewReferralHistory) -> Result<i64, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.msisdn_referee == history.msisdn_referee) {
            return Err(RepositoryError::Conflict(
                "referral_history_referee_idx".to_string(),
            ));
        }
        let id = rows.len() as i64 + 1;
        rows.push(ReferralHistory {
            id,
            msisdn: history.msisdn.clone(),
            code: history.code.clone(),
            referral_date: history.referral_date.clone(),
            msisdn_referee: history.msisdn_referee.clone(),
            created_at: now(),
        });
        Ok(id)
    }
}

pub struct InMemoryRewards {
    rows: Mutex<Vec<Reward>>,
}

impl InMemoryRewards {
    pub fn with_tiers(tiers: &[(i32, &str, RecordStatus)]) -> Self {
        let rows = tiers
            .iter()
            .enumerate()
            .map(|(i, (total_referral, description, status))| Reward {
                id: i as i64 + 1,
                total_referral: *total_referral,
                description: description.to_string(),
                created_at: now(),
                updated_at: now(),
                status: *status,
            })
            .collect();
        InMemoryRewards {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl RewardRepository for InMemoryRewards {
    async fn find_tier_at_or_above(
        &self,
        total_referral: i64,
    ) -> Result<Option<Reward>, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.status == RecordStatus::Active)
            .filter(|r| i64::from(r.total_referral) >= total_referral)
            .min_by_key(|r| r.total_referral)
            .cloned())
    }

    async fn insert(&self, reward: &NewReward) -> Result<i64, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(Reward {
            id,
            total_referral: reward.total_referral,
            description: reward.description.clone(),
            created_at: now(),
            updated_at: now(),
            status: RecordStatus::Active,
        });
        Ok(id)
    }

    async fn update(&self, reward: &RewardUpdate) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == reward.id)
            .ok_or(RepositoryError::NotFound)?;
        if reward.total_referral > 0 {
            row.total_referral = reward.total_referral;
        }
        if !reward.description.is_empty() {
            row.description = reward.description.clone();
        }
        row.updated_at = now();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.status = RecordStatus::Inactive;
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub codes: Arc<InMemoryCodes>,
    pub histories: Arc<InMemoryHistories>,
}

/// Wires the in-memory repositories through the real service loop and router.
pub fn spawn_app(rewards: InMemoryRewards) -> TestApp {
    let codes = Arc::new(InMemoryCodes::default());
    let histories = Arc::new(InMemoryHistories::default());

    let handler = ReferralRequestHandler::new(
        codes.clone(),
        histories.clone(),
        Arc::new(rewards),
        &settings::Referral::default(),
    );
    let (tx, mut rx) = mpsc::channel(64);
    tokio::spawn(async move {
        ReferralService::new().run(handler, &mut rx).await;
    });

    let router = http::app(
        tx,
        settings::Auth {
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
        },
    );

    TestApp {
        router,
        codes,
        histories,
    }
}
