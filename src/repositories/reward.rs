use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{with_timeout, RepositoryError};
use crate::models::reward::{NewReward, Reward, RewardUpdate};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardRepository: Send + Sync {
    /// Active tier with the smallest threshold that is at least `total_referral`.
    async fn find_tier_at_or_above(
        &self,
        total_referral: i64,
    ) -> Result<Option<Reward>, RepositoryError>;
    async fn insert(&self, reward: &NewReward) -> Result<i64, RepositoryError>;
    async fn update(&self, reward: &RewardUpdate) -> Result<(), RepositoryError>;
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct PgRewardRepository {
    conn: PgPool,
    timeout: Duration,
}

impl PgRewardRepository {
    pub fn new(conn: PgPool, timeout: Duration) -> Self {
        PgRewardRepository { conn, timeout }
    }
}

#[async_trait]
impl RewardRepository for PgRewardRepository {
    async fn find_tier_at_or_above(
        &self,
        total_referral: i64,
    ) -> Result<Option<Reward>, RepositoryError> {
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, Reward>(
                r#"
                SELECT id, total_referral, reward_description, created_at, updated_at, status
                FROM reward
                WHERE total_referral >= $1 AND status = 1
                ORDER BY total_referral ASC
                LIMIT 1
                "#,
            )
            .bind(total_referral)
            .fetch_optional(&self.conn),
        )
        .await
    }

    async fn insert(&self, reward: &NewReward) -> Result<i64, RepositoryError> {
        with_timeout(
            self.timeout,
            sqlx::query_scalar::<_, i64>(
                "INSERT INTO reward (total_referral, reward_description) VALUES ($1, $2) RETURNING id",
            )
            .bind(reward.total_referral)
            .bind(&reward.description)
            .fetch_one(&self.conn),
        )
        .await
    }

    async fn update(&self, reward: &RewardUpdate) -> Result<(), RepositoryError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE reward SET ");
        let mut columns = query.separated(", ");
        if reward.total_referral > 0 {
            columns.push("total_referral = ");
            columns.push_bind_unseparated(reward.total_referral);
        }
        if !reward.description.is_empty() {
            columns.push("reward_description = ");
            columns.push_bind_unseparated(reward.description.clone());
        }
        columns.push("updated_at = NOW()");
        query.push(" WHERE id = ");
        query.push_bind(reward.id);

        let result = with_timeout(self.timeout, query.build().execute(&self.conn)).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = with_timeout(
            self.timeout,
            sqlx::query("UPDATE reward SET status = 0, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.conn),
        )
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
