//! Bet records and the bet state machine
//!
//! Open -> Closed -> Completed, or Open -> Completed. Never backwards.

use crate::error::{BetError, Result};
use kirbec_ledger::{Member, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type BetId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    /// Accepting wagers
    Open,
    /// No new wagers, awaiting settlement
    Closed,
    /// Settled and paid out
    Completed,
}

/// A user's stake on one option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub option: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberedOption {
    pub ordinal: usize,
    pub label: String,
    pub pool: u64,
}

/// Outcome of settling a bet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payouts {
    pub payouts: BTreeMap<UserId, u64>,
    pub total_pool: u64,
    pub winning_pool: u64,
    /// `total_pool / winning_pool`; `None` when nothing was staked on the winner
    pub multiplier: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: BetId,
    pub title: String,
    /// Label -> points staked on it. Keys are fixed at creation.
    pub options: BTreeMap<String, u64>,
    pub created_by: UserId,
    pub created_at: String,
    pub status: BetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_option: Option<String>,
    #[serde(default)]
    pub wagers: BTreeMap<UserId, Wager>,
}

impl Bet {
    pub fn new(
        id: BetId,
        title: String,
        labels: BTreeSet<String>,
        created_by: UserId,
        created_at: String,
    ) -> Self {
        Self {
            id,
            title,
            options: labels.into_iter().map(|label| (label, 0)).collect(),
            created_by,
            created_at,
            status: BetStatus::Open,
            winning_option: None,
            wagers: BTreeMap::new(),
        }
    }

    /// Labels in numbering order
    pub fn labels(&self) -> Vec<&str> {
        // BTreeMap keys iterate in ascending lexicographic order
        self.options.keys().map(String::as_str).collect()
    }

    /// Label at 1-based `ordinal`
    pub fn option_at(&self, ordinal: usize) -> Option<&str> {
        if ordinal == 0 {
            return None;
        }
        self.options.keys().nth(ordinal - 1).map(String::as_str)
    }

    pub fn numbered_options(&self) -> Vec<NumberedOption> {
        self.options
            .iter()
            .enumerate()
            .map(|(index, (label, pool))| NumberedOption {
                ordinal: index + 1,
                label: label.clone(),
                pool: *pool,
            })
            .collect()
    }

    pub fn total_pool(&self) -> u64 {
        self.options
            .values()
            .fold(0u64, |total, pool| total.saturating_add(*pool))
    }

    pub fn is_open(&self) -> bool {
        self.status == BetStatus::Open
    }

    pub fn is_completed(&self) -> bool {
        self.status == BetStatus::Completed
    }

    /// Creator or administrator
    pub fn can_manage(&self, member: &Member) -> bool {
        member.id == self.created_by || member.is_administrator
    }

    /// Every option's pool equals the sum of the wagers on it
    pub fn pools_match_wagers(&self) -> bool {
        self.options.iter().all(|(label, pool)| {
            let staked: u64 = self
                .wagers
                .values()
                .filter(|wager| &wager.option == label)
                .map(|wager| wager.amount)
                .sum();
            staked == *pool
        })
    }

    /// Record a stake. Funds are checked by the caller.
    pub fn place_wager(&mut self, user: UserId, ordinal: usize, amount: u64) -> Result<()> {
        if !self.is_open() {
            return Err(BetError::BettingClosed(self.id));
        }

        let label = self
            .option_at(ordinal)
            .ok_or(BetError::InvalidOption(ordinal))?
            .to_string();

        if let Some(existing) = self.wagers.get(&user) {
            if existing.option != label {
                return Err(BetError::MultipleOptionsNotAllowed {
                    existing: existing.option.clone(),
                });
            }
            return Err(BetError::DuplicateWager { option: label });
        }

        // The whole pool must stay representable for settlement
        self.total_pool()
            .checked_add(amount)
            .ok_or_else(pool_overflow)?;

        let pool = self
            .options
            .get_mut(&label)
            .ok_or(BetError::InvalidOption(ordinal))?;
        *pool = pool.checked_add(amount).ok_or_else(pool_overflow)?;

        self.wagers.insert(
            user,
            Wager {
                option: label,
                amount,
            },
        );

        Ok(())
    }

    /// Stop accepting wagers. Closing a closed bet changes nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.is_completed() {
            return Err(BetError::AlreadyCompleted(self.id));
        }
        self.status = BetStatus::Closed;
        Ok(())
    }

    /// Declare the winner and compute payouts. Balances are credited by the caller.
    pub fn settle(&mut self, ordinal: usize) -> Result<Payouts> {
        let label = self
            .option_at(ordinal)
            .ok_or(BetError::InvalidOption(ordinal))?
            .to_string();

        if self.is_completed() {
            return Err(BetError::AlreadyCompleted(self.id));
        }

        let total_pool = self.total_pool();
        let winning_pool = self.options.get(&label).copied().unwrap_or(0);

        let mut payouts = BTreeMap::new();
        let mut multiplier = None;

        if winning_pool > 0 {
            multiplier = Some(total_pool as f64 / winning_pool as f64);

            for (user, wager) in &self.wagers {
                if wager.option == label {
                    payouts.insert(*user, payout(wager.amount, total_pool, winning_pool));
                }
            }
        }

        self.status = BetStatus::Completed;
        self.winning_option = Some(label);

        Ok(Payouts {
            payouts,
            total_pool,
            winning_pool,
            multiplier,
        })
    }
}

fn pool_overflow() -> BetError {
    BetError::InvalidAmount("pool overflow".to_string())
}

/// floor(stake * total_pool / winning_pool), computed exactly
fn payout(stake: u64, total_pool: u64, winning_pool: u64) -> u64 {
    let exact = stake as u128 * total_pool as u128 / winning_pool as u128;
    u64::try_from(exact).unwrap_or(u64::MAX)
}

/// The `bets` document: every bet of a community plus the id counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetBook {
    #[serde(default)]
    pub next_id: BetId,
    #[serde(default)]
    pub bets: BTreeMap<BetId, Bet>,
}

impl BetBook {
    /// Next unused id; ids start at 1 and only grow
    pub fn allocate_id(&mut self) -> BetId {
        let after_last = self.bets.keys().next_back().map_or(1, |last| last + 1);
        let id = self.next_id.max(after_last).max(1);
        self.next_id = id + 1;
        id
    }

    pub fn get(&self, id: BetId) -> Result<&Bet> {
        self.bets.get(&id).ok_or(BetError::InvalidBetId(id))
    }

    pub fn get_mut(&mut self, id: BetId) -> Result<&mut Bet> {
        self.bets.get_mut(&id).ok_or(BetError::InvalidBetId(id))
    }

    /// Bets not yet completed, by id
    pub fn active(&self) -> impl Iterator<Item = &Bet> {
        self.bets.values().filter(|bet| !bet.is_completed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bet(labels: &[&str]) -> Bet {
        Bet::new(
            1,
            "X wins".to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
            UserId(100),
            "01/01/2024 12:00:00".to_string(),
        )
    }

    #[test]
    fn test_numbering_is_sorted() {
        let bet = bet(&["yes", "no", "maybe"]);
        assert_eq!(bet.labels(), vec!["maybe", "no", "yes"]);
        assert_eq!(bet.option_at(1), Some("maybe"));
        assert_eq!(bet.option_at(3), Some("yes"));
        assert_eq!(bet.option_at(0), None);
        assert_eq!(bet.option_at(4), None);
    }

    #[test]
    fn test_numbering_is_stable_across_insertion_order() {
        let a = bet(&["b", "a", "c"]);
        let b = bet(&["c", "b", "a"]);
        assert_eq!(a.numbered_options(), b.numbered_options());
    }

    #[test]
    fn test_single_position_rule() {
        let mut bet = bet(&["yes", "no"]);
        bet.place_wager(UserId(1), 2, 50).unwrap();

        let before = bet.clone();
        assert!(matches!(
            bet.place_wager(UserId(1), 1, 10),
            Err(BetError::MultipleOptionsNotAllowed { .. })
        ));
        assert!(matches!(
            bet.place_wager(UserId(1), 2, 10),
            Err(BetError::DuplicateWager { .. })
        ));
        assert_eq!(bet, before);
    }

    #[test]
    fn test_wager_checks_status_before_option() {
        let mut bet = bet(&["yes", "no"]);
        bet.close().unwrap();
        assert!(matches!(bet.place_wager(UserId(1), 9, 10), Err(BetError::BettingClosed(1))));
    }

    #[test]
    fn test_pools_track_wagers() {
        let mut bet = bet(&["yes", "no"]);
        bet.place_wager(UserId(1), 1, 30).unwrap();
        bet.place_wager(UserId(2), 1, 20).unwrap();
        bet.place_wager(UserId(3), 2, 7).unwrap();

        assert_eq!(bet.options["no"], 50);
        assert_eq!(bet.options["yes"], 7);
        assert_eq!(bet.total_pool(), 57);
        assert!(bet.pools_match_wagers());
    }

    #[test]
    fn test_pool_overflow_rejected_without_change() {
        let mut bet = bet(&["yes", "no"]);
        bet.place_wager(UserId(1), 1, u64::MAX).unwrap();

        let before = bet.clone();
        assert!(matches!(
            bet.place_wager(UserId(2), 1, u64::MAX),
            Err(BetError::InvalidAmount(_))
        ));
        // Another option still counts toward the total pool
        assert!(matches!(
            bet.place_wager(UserId(3), 2, 1),
            Err(BetError::InvalidAmount(_))
        ));
        assert_eq!(bet, before);
        assert_eq!(bet.total_pool(), u64::MAX);
        assert!(bet.pools_match_wagers());
    }

    #[test]
    fn test_settlement_example() {
        let mut bet = bet(&["yes", "no"]);
        bet.place_wager(UserId(1), 1, 300).unwrap(); // "no"
        bet.place_wager(UserId(2), 2, 100).unwrap(); // "yes"

        let result = bet.settle(2).unwrap();
        assert_eq!(result.total_pool, 400);
        assert_eq!(result.winning_pool, 100);
        assert_eq!(result.multiplier, Some(4.0));
        assert_eq!(result.payouts.get(&UserId(2)), Some(&400));
        assert!(!result.payouts.contains_key(&UserId(1)));
        assert_eq!(bet.status, BetStatus::Completed);
        assert_eq!(bet.winning_option.as_deref(), Some("yes"));
    }

    #[test]
    fn test_settlement_floors_and_never_overpays() {
        let mut bet = bet(&["a", "b"]);
        bet.place_wager(UserId(1), 1, 1).unwrap();
        bet.place_wager(UserId(2), 1, 1).unwrap();
        bet.place_wager(UserId(3), 1, 1).unwrap();
        bet.place_wager(UserId(4), 2, 7).unwrap();

        let result = bet.settle(1).unwrap();
        // 10 / 3 each, floored
        assert!(result.payouts.values().all(|p| *p == 3));
        let paid: u64 = result.payouts.values().sum();
        assert!(paid <= result.total_pool);
    }

    #[test]
    fn test_empty_winning_pool_pays_nobody() {
        let mut bet = bet(&["a", "b"]);
        bet.place_wager(UserId(1), 2, 40).unwrap();

        let result = bet.settle(1).unwrap();
        assert!(result.payouts.is_empty());
        assert_eq!(result.multiplier, None);
        assert!(bet.is_completed());
    }

    #[test]
    fn test_completed_bet_never_reopens() {
        let mut bet = bet(&["a"]);
        bet.settle(1).unwrap();

        assert!(matches!(bet.close(), Err(BetError::AlreadyCompleted(1))));
        assert!(matches!(bet.settle(1), Err(BetError::AlreadyCompleted(1))));
        assert!(matches!(bet.place_wager(UserId(1), 1, 5), Err(BetError::BettingClosed(1))));
        assert_eq!(bet.status, BetStatus::Completed);
    }

    #[test]
    fn test_close_is_repeatable() {
        let mut bet = bet(&["a"]);
        bet.close().unwrap();
        bet.close().unwrap();
        assert_eq!(bet.status, BetStatus::Closed);
    }

    #[test]
    fn test_allocate_id() {
        let mut book = BetBook::default();
        assert_eq!(book.allocate_id(), 1);
        assert_eq!(book.allocate_id(), 2);

        let mut imported = BetBook::default();
        imported.bets.insert(41, bet(&["a"]));
        assert_eq!(imported.allocate_id(), 42);
    }

    #[test]
    fn test_document_field_names() {
        let mut bet = bet(&["yes"]);
        bet.place_wager(UserId(5), 1, 10).unwrap();
        let json = serde_json::to_value(&bet).unwrap();

        assert_eq!(json["createdBy"], 100);
        assert_eq!(json["status"], "Open");
        assert_eq!(json["options"]["yes"], 10);
        assert_eq!(json["wagers"]["5"]["amount"], 10);
        assert!(json.get("winningOption").is_none());
    }
}
