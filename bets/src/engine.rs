//! Bet Engine
//!
//! Every operation runs in one storage session for the community, so the bet
//! document and the points balances it touches are read fresh, changed
//! together and committed in a single batch.

use crate::bet::{Bet, BetBook, BetId, Payouts};
use crate::error::{BetError, Result};
use crate::parse::{parse_bet, BET_USAGE};
use chrono::Local;
use kirbec_ledger::{Balances, Member, UserId};
use kirbec_storage::{CommunityId, DocumentKey, DocumentStore, Vault};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info};

const CREATED_AT_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Result of completing a bet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub bet: Bet,
    pub payouts: BTreeMap<UserId, u64>,
    pub total_pool: u64,
    pub winning_pool: u64,
    pub multiplier: Option<f64>,
}

pub struct BetEngine<S> {
    vault: Vault<S>,
}

impl<S: DocumentStore> BetEngine<S> {
    pub fn new(vault: Vault<S>) -> Self {
        Self { vault }
    }

    /// Create a bet from `"<title> | <option> | ..."`
    pub async fn create_bet_from_text(
        &self,
        community: CommunityId,
        creator: &Member,
        text: &str,
    ) -> Result<BetId> {
        let draft = parse_bet(text)?;
        self.create_bet(community, creator, &draft.title, draft.options)
            .await
    }

    pub async fn create_bet<I, L>(
        &self,
        community: CommunityId,
        creator: &Member,
        title: &str,
        labels: I,
    ) -> Result<BetId>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let title = title.trim();
        let labels: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();

        if title.is_empty() || labels.is_empty() {
            return Err(BetError::UsageError(BET_USAGE.to_string()));
        }

        let mut session = self.vault.session(community).await;
        let mut book: BetBook = session.read(DocumentKey::Bets).await?;

        let id = book.allocate_id();
        let created_at = Local::now().format(CREATED_AT_FORMAT).to_string();
        let bet = Bet::new(id, title.to_string(), labels, creator.id, created_at);
        book.bets.insert(id, bet);

        session.stage(DocumentKey::Bets, &book)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, bet = id, error = %e, "Failed to save new bet");
        })?;

        info!(community = %community, bet = id, creator = %creator.id, title, "Bet created");
        Ok(id)
    }

    /// Stake `amount` points on the option at `ordinal`
    pub async fn place_bet(
        &self,
        community: CommunityId,
        user: UserId,
        bet_id: BetId,
        ordinal: usize,
        amount: u64,
    ) -> Result<Bet> {
        if amount == 0 {
            return Err(BetError::InvalidAmount(
                "wager must be greater than zero".to_string(),
            ));
        }

        let mut session = self.vault.session(community).await;

        let mut balances: Balances = session.read(DocumentKey::Points).await?;
        let balance = balances.balance(user);
        if balance < amount {
            return Err(BetError::InsufficientFunds {
                balance,
                required: amount,
            });
        }

        let mut book: BetBook = session.read(DocumentKey::Bets).await?;
        let bet = book.get_mut(bet_id)?;
        bet.place_wager(user, ordinal, amount)?;
        debug_assert!(bet.pools_match_wagers());
        let bet = bet.clone();

        let remaining = balances.debit(user, amount)?;

        session.stage(DocumentKey::Bets, &book)?;
        session.stage(DocumentKey::Points, &balances)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, bet = bet_id, user = %user, error = %e, "Failed to save wager");
        })?;

        info!(
            community = %community,
            bet = bet_id,
            user = %user,
            ordinal,
            amount,
            remaining,
            "Wager placed"
        );
        Ok(bet)
    }

    /// Stop accepting wagers
    pub async fn close_bet(&self, community: CommunityId, actor: &Member, bet_id: BetId) -> Result<Bet> {
        let mut session = self.vault.session(community).await;
        let mut book: BetBook = session.read(DocumentKey::Bets).await?;

        let bet = book.get_mut(bet_id)?;
        if !bet.can_manage(actor) {
            return Err(BetError::NotAuthorized(actor.id));
        }
        bet.close()?;
        let bet = bet.clone();

        session.stage(DocumentKey::Bets, &book)?;
        session.commit().await.inspect_err(|e| {
            error!(community = %community, bet = bet_id, error = %e, "Failed to save closed bet");
        })?;

        info!(community = %community, bet = bet_id, actor = %actor.id, "Bet closed");
        Ok(bet)
    }

    /// Name the winning option and pay out the pool
    pub async fn complete_bet(
        &self,
        community: CommunityId,
        actor: &Member,
        bet_id: BetId,
        ordinal: usize,
    ) -> Result<Settlement> {
        let mut session = self.vault.session(community).await;
        let mut book: BetBook = session.read(DocumentKey::Bets).await?;

        let bet = book.get_mut(bet_id)?;
        if !bet.can_manage(actor) {
            return Err(BetError::NotAuthorized(actor.id));
        }
        let Payouts {
            payouts,
            total_pool,
            winning_pool,
            multiplier,
        } = bet.settle(ordinal)?;
        let bet = bet.clone();

        let mut balances: Balances = session.read(DocumentKey::Points).await?;
        for (user, amount) in &payouts {
            balances.credit(*user, *amount);
        }

        session.stage(DocumentKey::Bets, &book)?;
        if !payouts.is_empty() {
            session.stage(DocumentKey::Points, &balances)?;
        }
        session.commit().await.inspect_err(|e| {
            error!(community = %community, bet = bet_id, error = %e, "Failed to save settlement");
        })?;

        info!(
            community = %community,
            bet = bet_id,
            actor = %actor.id,
            winner = bet.winning_option.as_deref().unwrap_or_default(),
            total_pool,
            winners = payouts.len(),
            "Bet completed"
        );

        Ok(Settlement {
            bet,
            payouts,
            total_pool,
            winning_pool,
            multiplier,
        })
    }

    pub async fn get_bet(&self, community: CommunityId, bet_id: BetId) -> Result<Bet> {
        let session = self.vault.session(community).await;
        let book: BetBook = session.read(DocumentKey::Bets).await?;
        debug!(community = %community, bet = bet_id, "Bet lookup");
        book.get(bet_id).cloned()
    }

    /// Bets that are not completed, by id
    pub async fn list_active_bets(&self, community: CommunityId) -> Result<Vec<Bet>> {
        let session = self.vault.session(community).await;
        let book: BetBook = session.read(DocumentKey::Bets).await?;
        Ok(book.active().cloned().collect())
    }

    /// Active bets created by `user`
    pub async fn list_user_active_bets(&self, community: CommunityId, user: UserId) -> Result<Vec<Bet>> {
        let session = self.vault.session(community).await;
        let book: BetBook = session.read(DocumentKey::Bets).await?;
        Ok(book
            .active()
            .filter(|bet| bet.created_by == user)
            .cloned()
            .collect())
    }
}
