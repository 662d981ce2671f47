//! Kirbec Bet Engine
//!
//! Community prediction bets settled pari-mutuel style in points:
//! - a bet is created with a fixed set of option labels
//! - members wager points on exactly one option while the bet is open
//! - the creator (or an administrator) closes the bet and names the winner
//! - the whole pool is split among winning wagers in proportion to stake
//!
//! Options are referred to by ordinal: their 1-based position in
//! lexicographic order of the labels.

pub mod bet;
pub mod engine;
pub mod error;
pub mod parse;

pub use bet::{Bet, BetBook, BetId, BetStatus, NumberedOption, Payouts, Wager};
pub use engine::{BetEngine, Settlement};
pub use error::{BetError, Result};
pub use parse::{parse_bet, BetDraft, BET_USAGE};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_names_the_command() {
        assert!(BET_USAGE.starts_with("-bet"));
    }
}
