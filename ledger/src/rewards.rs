//! Reward Catalog
//!
//! Rewards are listed most expensive first; the 1-based position in that
//! listing is the id users redeem by.

use crate::error::{LedgerError, Result};
use crate::points::Balances;
use crate::types::UserId;
use kirbec_storage::{CommunityId, DocumentKey, DocumentStore, Vault};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info};

pub const ADD_REWARD_USAGE: &str =
    "-addreward [Desired Reward] [Price of the Reward]\n\nexample: -addreward CSGO with friends 500";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reward {
    pub title: String,
    pub cost: u64,
}

/// Receipt for a successful redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub title: String,
    pub cost: u64,
    pub remaining_balance: u64,
}

/// The `rewards` document: title -> cost
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardTable(BTreeMap<String, u64>);

impl RewardTable {
    /// Rewards by cost descending, ties by title
    pub fn listed(&self) -> Vec<Reward> {
        let mut rewards: Vec<Reward> = self
            .0
            .iter()
            .map(|(title, cost)| Reward {
                title: title.clone(),
                cost: *cost,
            })
            .collect();
        rewards.sort_by(|a, b| b.cost.cmp(&a.cost).then_with(|| a.title.cmp(&b.title)));
        rewards
    }

    /// Reward at 1-based position `ordinal` of [`RewardTable::listed`]
    pub fn by_ordinal(&self, ordinal: usize) -> Option<Reward> {
        if ordinal == 0 {
            return None;
        }
        self.listed().into_iter().nth(ordinal - 1)
    }

    pub fn upsert(&mut self, title: String, cost: u64) {
        self.0.insert(title, cost);
    }

    pub fn remove(&mut self, title: &str) -> Option<u64> {
        self.0.remove(title)
    }
}

/// Split `"<title> <cost>"` into its parts. The cost is the trailing run of
/// digits; the title is everything before it.
pub fn parse_reward(text: &str) -> Result<(String, u64)> {
    let text = text.trim();
    let title_len = text.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (title, digits) = text.split_at(title_len);
    let title = title.trim();

    if title.is_empty() || digits.is_empty() {
        return Err(LedgerError::UsageError(ADD_REWARD_USAGE.to_string()));
    }

    let cost = digits
        .parse::<u64>()
        .map_err(|_| LedgerError::UsageError(ADD_REWARD_USAGE.to_string()))?;

    Ok((title.to_string(), cost))
}

pub struct RewardCatalog<S> {
    vault: Vault<S>,
}

impl<S: DocumentStore> RewardCatalog<S> {
    pub fn new(vault: Vault<S>) -> Self {
        Self { vault }
    }

    pub async fn list_rewards(&self, community: CommunityId) -> Result<Vec<Reward>> {
        let session = self.vault.session(community).await;
        let table: RewardTable = session.read(DocumentKey::Rewards).await?;
        Ok(table.listed())
    }

    /// Insert or re-price a reward; returns the updated listing
    pub async fn add_reward(&self, community: CommunityId, title: &str, cost: u64) -> Result<Vec<Reward>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(LedgerError::UsageError(ADD_REWARD_USAGE.to_string()));
        }
        if cost == 0 {
            return Err(LedgerError::InvalidAmount(
                "reward cost must be greater than zero".to_string(),
            ));
        }

        let mut session = self.vault.session(community).await;
        let mut table: RewardTable = session.read(DocumentKey::Rewards).await?;
        table.upsert(title.to_string(), cost);
        session.stage(DocumentKey::Rewards, &table)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, title, error = %e, "Failed to save reward");
        })?;

        info!(community = %community, title, cost, "Reward saved");
        Ok(table.listed())
    }

    pub async fn remove_reward(&self, community: CommunityId, title: &str) -> Result<Vec<Reward>> {
        let mut session = self.vault.session(community).await;
        let mut table: RewardTable = session.read(DocumentKey::Rewards).await?;
        if table.remove(title.trim()).is_none() {
            return Err(LedgerError::UnknownReward(title.trim().to_string()));
        }
        session.stage(DocumentKey::Rewards, &table)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, title, error = %e, "Failed to remove reward");
        })?;

        info!(community = %community, title, "Reward removed");
        Ok(table.listed())
    }

    /// Spend points on the reward at position `ordinal` of the listing
    pub async fn redeem(&self, community: CommunityId, user: UserId, ordinal: usize) -> Result<Redemption> {
        let mut session = self.vault.session(community).await;
        let table: RewardTable = session.read(DocumentKey::Rewards).await?;
        let reward = table
            .by_ordinal(ordinal)
            .ok_or(LedgerError::InvalidRewardId(ordinal))?;

        let mut balances: Balances = session.read(DocumentKey::Points).await?;
        let remaining_balance = balances.debit(user, reward.cost)?;
        session.stage(DocumentKey::Points, &balances)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, user = %user, error = %e, "Failed to save redemption");
        })?;

        info!(
            community = %community,
            user = %user,
            title = %reward.title,
            cost = reward.cost,
            remaining_balance,
            "Reward redeemed"
        );

        Ok(Redemption {
            title: reward.title,
            cost: reward.cost,
            remaining_balance,
        })
    }
}
