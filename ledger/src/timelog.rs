//! Voice presence time logs
//!
//! `total` keeps lifetime minutes per user; `date` keeps minutes per user for
//! each day, keyed `MM/DD/YYYY`.

use crate::error::Result;
use crate::page::{paginate, rank, Page, Standing};
use crate::types::UserId;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use kirbec_storage::{CommunityId, DocumentKey, DocumentStore, Vault};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Days summed by the week log
pub const WEEK_DAYS: usize = 7;

/// The `total` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalTimes {
    #[serde(default)]
    pub users: BTreeMap<UserId, u64>,
}

impl TotalTimes {
    pub fn add(&mut self, user: UserId, minutes: u64) {
        *self.users.entry(user).or_insert(0) += minutes;
    }

    pub fn minutes(&self, user: UserId) -> Option<u64> {
        self.users.get(&user).copied()
    }
}

/// The `date` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateTimes(BTreeMap<String, BTreeMap<UserId, u64>>);

impl DateTimes {
    pub fn add(&mut self, day: &str, user: UserId, minutes: u64) {
        *self
            .0
            .entry(day.to_string())
            .or_default()
            .entry(user)
            .or_insert(0) += minutes;
    }

    /// Recorded days, most recent first. Keys that are not dates are skipped.
    pub fn recent(&self) -> Vec<(NaiveDate, &BTreeMap<UserId, u64>)> {
        let mut days: Vec<_> = self
            .0
            .iter()
            .filter_map(|(key, users)| {
                NaiveDate::parse_from_str(key, DATE_FORMAT)
                    .ok()
                    .map(|date| (date, users))
            })
            .collect();
        days.sort_by(|a, b| b.0.cmp(&a.0));
        days
    }
}

/// Day a sample taken at `now` counts toward. Days roll over at
/// `rollover_hours` past midnight.
pub fn day_key(now: NaiveDateTime, rollover_hours: i64) -> String {
    let shifted = now - TimeDelta::hours(rollover_hours);
    shifted.format(DATE_FORMAT).to_string()
}

/// Render minutes as `"N days N hrs N mins"`
pub fn format_minutes(minutes: u64) -> String {
    if minutes == 0 {
        return "0 mins".to_string();
    }

    let days = minutes / (24 * 60);
    let hrs = (minutes % (24 * 60)) / 60;
    let mins = minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{} days", days));
    }
    if hrs > 0 {
        parts.push(format!("{} hrs", hrs));
    }
    if mins > 0 {
        parts.push(format!("{} mins", mins));
    }
    parts.join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayLog {
    pub date: NaiveDate,
    pub entries: Vec<Standing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekLog {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub entries: Vec<Standing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MyLog {
    pub total: u64,
    /// Minutes on the most recent recorded day
    pub today: u64,
    pub longest_day: Option<(NaiveDate, u64)>,
}

pub struct TimeLog<S> {
    vault: Vault<S>,
}

impl<S: DocumentStore> TimeLog<S> {
    pub fn new(vault: Vault<S>) -> Self {
        Self { vault }
    }

    pub async fn total_log(&self, community: CommunityId, page: usize) -> Result<Page> {
        let session = self.vault.session(community).await;
        let totals: TotalTimes = session.read(DocumentKey::TotalTimes).await?;
        Ok(paginate(totals.users.into_iter().collect(), page))
    }

    /// Minutes for the most recent recorded day
    pub async fn today_log(&self, community: CommunityId) -> Result<Option<DayLog>> {
        let session = self.vault.session(community).await;
        let dates: DateTimes = session.read(DocumentKey::DateTimes).await?;

        Ok(dates.recent().first().map(|(date, users)| DayLog {
            date: *date,
            entries: rank(users.iter().map(|(u, m)| (*u, *m)).collect()),
        }))
    }

    /// Minutes summed over the last seven recorded days, `None` until seven
    /// days exist
    pub async fn week_log(&self, community: CommunityId) -> Result<Option<WeekLog>> {
        let session = self.vault.session(community).await;
        let dates: DateTimes = session.read(DocumentKey::DateTimes).await?;
        let days = dates.recent();

        if days.len() < WEEK_DAYS {
            return Ok(None);
        }

        let week = &days[..WEEK_DAYS];
        let mut sums: BTreeMap<UserId, u64> = BTreeMap::new();
        for (_, users) in week {
            for (user, minutes) in users.iter() {
                *sums.entry(*user).or_insert(0) += minutes;
            }
        }

        Ok(Some(WeekLog {
            from: week[WEEK_DAYS - 1].0,
            to: week[0].0,
            entries: rank(sums.into_iter().collect()),
        }))
    }

    pub async fn my_log(&self, community: CommunityId, user: UserId) -> Result<Option<MyLog>> {
        let session = self.vault.session(community).await;
        let totals: TotalTimes = session.read(DocumentKey::TotalTimes).await?;
        let dates: DateTimes = session.read(DocumentKey::DateTimes).await?;

        let Some(total) = totals.minutes(user) else {
            return Ok(None);
        };

        let days = dates.recent();
        let today = days
            .first()
            .and_then(|(_, users)| users.get(&user).copied())
            .unwrap_or(0);

        // Earliest day wins a tie
        let mut longest_day: Option<(NaiveDate, u64)> = None;
        for (date, users) in days.iter().rev() {
            if let Some(minutes) = users.get(&user).copied() {
                if longest_day.map_or(true, |(_, best)| minutes > best) {
                    longest_day = Some((*date, minutes));
                }
            }
        }

        Ok(Some(MyLog {
            total,
            today,
            longest_day,
        }))
    }
}
