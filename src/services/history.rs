use std::sync::Arc;

use super::rewards::RewardResolver;
use super::ServiceError;
use crate::models::referral_history::{HistoryItem, HistoryPage, PageMeta, ReferralHistory};
use crate::models::reward::RewardStatus;
use crate::repositories::ReferralHistoryRepository;
use crate::utils::msisdn;

#[derive(Clone)]
pub struct HistoryService {
    histories: Arc<dyn ReferralHistoryRepository>,
    rewards: RewardResolver,
    default_limit: i64,
}

impl HistoryService {
    pub fn new(
        histories: Arc<dyn ReferralHistoryRepository>,
        rewards: RewardResolver,
        default_limit: i64,
    ) -> Self {
        HistoryService {
            histories,
            rewards,
            default_limit,
        }
    }

    /// One page of the referrals made by `raw_msisdn`, newest first.
    pub async fn list_history(
        &self,
        raw_msisdn: &str,
        page: i64,
        limit: i64,
    ) -> Result<HistoryPage, ServiceError> {
        let msisdn = msisdn::normalize(raw_msisdn)?;
        let page = page.max(1);
        let limit = if limit <= 0 { self.default_limit } else { limit };
        let Some(offset) = (page - 1).checked_mul(limit) else {
            log::debug!("Page {} of {} past the end for {}.", page, limit, msisdn);
            let total = self.histories.count_by_msisdn(&msisdn).await?;
            return Ok(assemble_page(Vec::new(), total, page, limit));
        };

        let (entities, total) = tokio::try_join!(
            self.histories.find_page(&msisdn, offset, limit),
            self.histories.count_by_msisdn(&msisdn),
        )?;

        Ok(assemble_page(entities, total, page, limit))
    }

    /// Referrals made in the current calendar month and the tier they earn.
    pub async fn current_month_reward(
        &self,
        raw_msisdn: &str,
    ) -> Result<RewardStatus, ServiceError> {
        let msisdn = msisdn::normalize(raw_msisdn)?;
        let month = chrono::Local::now().format("%Y-%m").to_string();

        let total_referral = self
            .histories
            .count_by_msisdn_and_month(&msisdn, &month)
            .await?;
        let reward = self.rewards.describe(total_referral).await?;

        Ok(RewardStatus {
            total_referral,
            reward,
        })
    }
}

/// Floor division plus one; an exact multiple of `limit` still reports an extra page.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total > 0 && limit > 0 {
        ((total - total % limit) / limit) + 1
    } else {
        0
    }
}

fn assemble_page(
    entities: Vec<ReferralHistory>,
    total: i64,
    page: i64,
    limit: i64,
) -> HistoryPage {
    let total_page = total_pages(total, limit);
    let size = entities.len();

    HistoryPage {
        list: entities.into_iter().map(HistoryItem::from).collect(),
        meta: PageMeta {
            total_page,
            total_record: total,
            page,
            size,
            limit,
            first_page: page == 1 || page == 0,
            last_page: page == total_page,
        },
    }
}
