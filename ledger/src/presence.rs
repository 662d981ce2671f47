//! Presence Tracker
//!
//! Samples who is sitting in voice and credits them one minute of time and
//! `points_per_tick` points per sample.

use crate::error::Result;
use crate::points::Balances;
use crate::timelog::{day_key, DateTimes, TotalTimes};
use crate::types::{Member, UserId, VoiceState};
use chrono::{Local, NaiveDateTime};
use kirbec_storage::{CommunityId, DocumentKey, DocumentStore, Vault};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSettings {
    pub points_per_tick: u64,
    /// Hours after midnight at which a new day starts
    pub day_rollover_hours: i64,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            points_per_tick: 1,
            day_rollover_hours: 6,
        }
    }
}

/// Enumerates voice participants. Implemented by the chat-platform adapter.
pub trait PresenceSource: Send + Sync {
    fn communities(&self) -> impl Future<Output = Result<Vec<CommunityId>>> + Send;

    fn active_voice(
        &self,
        community: CommunityId,
    ) -> impl Future<Output = Result<Vec<VoiceState>>> + Send;
}

pub struct PresenceTracker<S> {
    vault: Vault<S>,
    settings: PresenceSettings,
}

impl<S: DocumentStore> PresenceTracker<S> {
    pub fn new(vault: Vault<S>, settings: PresenceSettings) -> Self {
        Self { vault, settings }
    }

    /// Credit one sample to each member; returns how many users were credited
    pub async fn credit_presence(&self, community: CommunityId, members: &[Member]) -> Result<usize> {
        self.credit_presence_at(community, members, Local::now().naive_local())
            .await
    }

    pub async fn credit_presence_at(
        &self,
        community: CommunityId,
        members: &[Member],
        now: NaiveDateTime,
    ) -> Result<usize> {
        let users: BTreeSet<UserId> = members.iter().map(|m| m.id).collect();
        if users.is_empty() {
            return Ok(0);
        }

        let day = day_key(now, self.settings.day_rollover_hours);

        let mut session = self.vault.session(community).await;
        let mut totals: TotalTimes = session.read(DocumentKey::TotalTimes).await?;
        let mut dates: DateTimes = session.read(DocumentKey::DateTimes).await?;
        let mut balances: Balances = session.read(DocumentKey::Points).await?;

        for user in &users {
            totals.add(*user, 1);
            dates.add(&day, *user, 1);
            if self.settings.points_per_tick > 0 {
                balances.credit(*user, self.settings.points_per_tick);
            }
        }

        session.stage(DocumentKey::TotalTimes, &totals)?;
        session.stage(DocumentKey::DateTimes, &dates)?;
        session.stage(DocumentKey::Points, &balances)?;
        session.commit().await?;

        debug!(community = %community, day = %day, users = users.len(), "Presence credited");
        Ok(users.len())
    }

    /// One sampling pass over every community the source knows about.
    /// A failing community is logged and skipped.
    pub async fn tick<P: PresenceSource>(&self, source: &P) -> Result<usize> {
        let communities = source.communities().await?;

        let mut credited = 0;
        for community in communities {
            match self.sample(source, community).await {
                Ok(count) => credited += count,
                Err(e) => {
                    warn!(community = %community, error = %e, "Presence sampling failed");
                }
            }
        }
        Ok(credited)
    }

    async fn sample<P: PresenceSource>(&self, source: &P, community: CommunityId) -> Result<usize> {
        let members: Vec<Member> = source
            .active_voice(community)
            .await?
            .into_iter()
            .filter(VoiceState::is_tracked)
            .map(|state| state.member)
            .collect();

        self.credit_presence(community, &members).await
    }

    /// Sample every `period` until `shutdown` changes. Failures never stop the loop.
    pub async fn run<P: PresenceSource>(
        &self,
        source: &P,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = period.as_secs(), "Presence tracker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick(source).await {
                        Ok(credited) => debug!(credited, "Presence tick complete"),
                        Err(e) => warn!(error = %e, "Presence tick failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Presence tracker stopping");
                    break;
                }
            }
        }
    }
}
