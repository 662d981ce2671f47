//! Points Ledger
//!
//! Per-user integer balances kept in the `discordPoints` document.
//! A balance never goes negative: a debit that would overdraw is rejected
//! before anything is changed.

use crate::error::{LedgerError, Result};
use crate::page::{paginate, Page};
use crate::types::UserId;
use kirbec_storage::{CommunityId, DocumentKey, DocumentStore, Vault};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info};

/// The `discordPoints` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<UserId, u64>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `user`, 0 when the user has no record
    pub fn balance(&self, user: UserId) -> u64 {
        self.0.get(&user).copied().unwrap_or(0)
    }

    /// Add `amount` and return the new balance
    pub fn credit(&mut self, user: UserId, amount: u64) -> u64 {
        let balance = self.0.entry(user).or_insert(0);
        *balance = balance.saturating_add(amount);
        *balance
    }

    /// Subtract `amount` and return the new balance
    pub fn debit(&mut self, user: UserId, amount: u64) -> Result<u64> {
        let balance = self.balance(user);
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance,
                required: amount,
            });
        }

        let remaining = balance - amount;
        self.0.insert(user, remaining);
        Ok(remaining)
    }

    pub fn set(&mut self, user: UserId, balance: u64) {
        self.0.insert(user, balance);
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserId, u64)> + '_ {
        self.0.iter().map(|(user, balance)| (*user, *balance))
    }
}

fn require_positive(amount: u64) -> Result<()> {
    if amount == 0 {
        return Err(LedgerError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

pub struct PointsLedger<S> {
    vault: Vault<S>,
}

impl<S: DocumentStore> PointsLedger<S> {
    pub fn new(vault: Vault<S>) -> Self {
        Self { vault }
    }

    pub async fn get_balance(&self, community: CommunityId, user: UserId) -> Result<u64> {
        let session = self.vault.session(community).await;
        let balances: Balances = session.read(DocumentKey::Points).await?;
        Ok(balances.balance(user))
    }

    pub async fn credit(&self, community: CommunityId, user: UserId, amount: u64) -> Result<u64> {
        require_positive(amount)?;

        let mut session = self.vault.session(community).await;
        let mut balances: Balances = session.read(DocumentKey::Points).await?;
        let balance = balances.credit(user, amount);
        session.stage(DocumentKey::Points, &balances)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, user = %user, error = %e, "Failed to save balance");
        })?;

        info!(community = %community, user = %user, amount, balance, "Points credited");
        Ok(balance)
    }

    pub async fn debit(&self, community: CommunityId, user: UserId, amount: u64) -> Result<u64> {
        require_positive(amount)?;

        let mut session = self.vault.session(community).await;
        let mut balances: Balances = session.read(DocumentKey::Points).await?;
        let balance = balances.debit(user, amount)?;
        session.stage(DocumentKey::Points, &balances)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, user = %user, error = %e, "Failed to save balance");
        })?;

        info!(community = %community, user = %user, amount, balance, "Points debited");
        Ok(balance)
    }

    /// Overwrite a balance with a value the caller already computed
    pub async fn set_balance(&self, community: CommunityId, user: UserId, balance: u64) -> Result<()> {
        let mut session = self.vault.session(community).await;
        let mut balances: Balances = session.read(DocumentKey::Points).await?;
        balances.set(user, balance);
        session.stage(DocumentKey::Points, &balances)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, user = %user, error = %e, "Failed to save balance");
        })?;

        info!(community = %community, user = %user, balance, "Points balance set");
        Ok(())
    }

    /// Balances ranked highest first
    pub async fn leaderboard(&self, community: CommunityId, page: usize) -> Result<Page> {
        let session = self.vault.session(community).await;
        let balances: Balances = session.read(DocumentKey::Points).await?;
        Ok(paginate(balances.iter().collect(), page))
    }
}
