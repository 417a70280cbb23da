use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{with_timeout, RepositoryError};
use crate::models::referral_history::{NewReferralHistory, ReferralHistory};

const HISTORY_COLUMNS: &str = "id, msisdn, code, referral_date, msisdn_referee, created_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralHistoryRepository: Send + Sync {
    /// Newest first.
    async fn find_page(
        &self,
        msisdn: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ReferralHistory>, RepositoryError>;
    async fn count_by_msisdn(&self, msisdn: &str) -> Result<i64, RepositoryError>;
    async fn find_by_referee(
        &self,
        msisdn_referee: &str,
    ) -> Result<Option<ReferralHistory>, RepositoryError>;
    /// `month` is `YYYY-MM`, matched as a prefix of the referral date.
    async fn count_by_msisdn_and_month(
        &self,
        msisdn: &str,
        month: &str,
    ) -> Result<i64, RepositoryError>;
    async fn insert(&self, history: &NewReferralHistory) -> Result<i64, RepositoryError>;
}

#[derive(Clone)]
pub struct PgReferralHistoryRepository {
    conn: PgPool,
    lookup_timeout: Duration,
    aggregate_timeout: Duration,
}

impl PgReferralHistoryRepository {
    pub fn new(conn: PgPool, lookup_timeout: Duration, aggregate_timeout: Duration) -> Self {
        PgReferralHistoryRepository {
            conn,
            lookup_timeout,
            aggregate_timeout,
        }
    }
}

#[async_trait]
impl ReferralHistoryRepository for PgReferralHistoryRepository {
    async fn find_page(
        &self,
        msisdn: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ReferralHistory>, RepositoryError> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM referral_history WHERE msisdn = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
        );

        with_timeout(
            self.aggregate_timeout,
            sqlx::query_as::<_, ReferralHistory>(&query)
                .bind(msisdn)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.conn),
        )
        .await
    }

    async fn count_by_msisdn(&self, msisdn: &str) -> Result<i64, RepositoryError> {
        with_timeout(
            self.aggregate_timeout,
            sqlx::query_scalar::<_, i64>("SELECT COUNT(id) FROM referral_history WHERE msisdn = $1")
                .bind(msisdn)
                .fetch_one(&self.conn),
        )
        .await
    }

    async fn find_by_referee(
        &self,
        msisdn_referee: &str,
    ) -> Result<Option<ReferralHistory>, RepositoryError> {
        let query =
            format!("SELECT {HISTORY_COLUMNS} FROM referral_history WHERE msisdn_referee = $1");

        with_timeout(
            self.lookup_timeout,
            sqlx::query_as::<_, ReferralHistory>(&query)
                .bind(msisdn_referee)
                .fetch_optional(&self.conn),
        )
        .await
    }

    async fn count_by_msisdn_and_month(
        &self,
        msisdn: &str,
        month: &str,
    ) -> Result<i64, RepositoryError> {
        with_timeout(
            self.aggregate_timeout,
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(id) FROM referral_history WHERE msisdn = $1 AND referral_date LIKE $2",
            )
            .bind(msisdn)
            .bind(format!("{month}%"))
            .fetch_one(&self.conn),
        )
        .await
    }

    async fn insert(&self, history: &NewReferralHistory) -> Result<i64, RepositoryError> {
        with_timeout(
            self.lookup_timeout,
            sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO referral_history (msisdn, code, referral_date, msisdn_referee)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(&history.msisdn)
            .bind(&history.code)
            .bind(&history.referral_date)
            .bind(&history.msisdn_referee)
            .fetch_one(&self.conn),
        )
        .await
    }
}
