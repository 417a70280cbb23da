use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{with_timeout, RepositoryError};
use crate::models::referral_code::{NewReferralCode, ReferralCode};

/// Storage for referral codes. Lookups only ever return active rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralCodeRepository: Send + Sync {
    async fn find_by_msisdn(&self, msisdn: &str) -> Result<Option<ReferralCode>, RepositoryError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<ReferralCode>, RepositoryError>;
    /// Returns the server-assigned id.
    async fn insert(&self, code: &NewReferralCode) -> Result<i64, RepositoryError>;
}

#[derive(Clone)]
pub struct PgReferralCodeRepository {
    conn: PgPool,
    timeout: Duration,
}

impl PgReferralCodeRepository {
    pub fn new(conn: PgPool, timeout: Duration) -> Self {
        PgReferralCodeRepository { conn, timeout }
    }
}

#[async_trait]
impl ReferralCodeRepository for PgReferralCodeRepository {
    async fn find_by_msisdn(&self, msisdn: &str) -> Result<Option<ReferralCode>, RepositoryError> {
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, ReferralCode>(
                "SELECT id, msisdn, code, created_at, status FROM referral_code WHERE msisdn = $1 AND status = 1",
            )
            .bind(msisdn)
            .fetch_optional(&self.conn),
        )
        .await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ReferralCode>, RepositoryError> {
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, ReferralCode>(
                "SELECT id, msisdn, code, created_at, status FROM referral_code WHERE code = $1 AND status = 1",
            )
            .bind(code)
            .fetch_optional(&self.conn),
        )
        .await
    }

    async fn insert(&self, code: &NewReferralCode) -> Result<i64, RepositoryError> {
        with_timeout(
            self.timeout,
            sqlx::query_scalar::<_, i64>(
                "INSERT INTO referral_code (msisdn, code) VALUES ($1, $2) RETURNING id",
            )
            .bind(&code.msisdn)
            .bind(&code.code)
            .fetch_one(&self.conn),
        )
        .await
    }
}
