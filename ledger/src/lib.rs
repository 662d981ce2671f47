//! Kirbec Ledger
//!
//! Points balances, the reward catalog and voice-presence accounting for a
//! community. All state lives in the community's documents; every operation
//! reads fresh inside a storage session and commits before returning.

pub mod error;
pub mod page;
pub mod points;
pub mod presence;
pub mod rewards;
pub mod timelog;
pub mod types;

pub use error::{LedgerError, Result};
pub use page::{paginate, rank, Page, Standing, PAGE_SIZE};
pub use points::{Balances, PointsLedger};
pub use presence::{PresenceSettings, PresenceSource, PresenceTracker};
pub use rewards::{parse_reward, Redemption, Reward, RewardCatalog, RewardTable};
pub use timelog::{format_minutes, DateTimes, DayLog, MyLog, TimeLog, TotalTimes, WeekLog};
pub use types::{Member, UserId, VoiceState};

pub use kirbec_storage::{CommunityId, DocumentStore, Vault};
