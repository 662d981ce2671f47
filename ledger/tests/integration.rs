//! Points, rewards and presence working over one shared vault

use chrono::NaiveDate;
use kirbec_ledger::{
    CommunityId, LedgerError, Member, PointsLedger, PresenceSettings, PresenceTracker,
    RewardCatalog, TimeLog, UserId, Vault,
};
use kirbec_storage::MemoryStore;
use std::sync::Arc;

const GUILD: CommunityId = CommunityId(1234);

struct Ledger {
    points: PointsLedger<MemoryStore>,
    rewards: RewardCatalog<MemoryStore>,
    presence: PresenceTracker<MemoryStore>,
    times: TimeLog<MemoryStore>,
}

fn ledger(settings: PresenceSettings) -> Ledger {
    let vault = Vault::new(MemoryStore::new());
    Ledger {
        points: PointsLedger::new(vault.clone()),
        rewards: RewardCatalog::new(vault.clone()),
        presence: PresenceTracker::new(vault.clone(), settings),
        times: TimeLog::new(vault),
    }
}

#[tokio::test]
async fn test_presence_earns_points_to_spend_on_rewards() {
    let ledger = ledger(PresenceSettings {
        points_per_tick: 25,
        ..PresenceSettings::default()
    });
    let alice = Member::new(1, "alice");
    let bob = Member::new(2, "bob");

    ledger.rewards.add_reward(GUILD, "Pick the map", 100).await.unwrap();
    ledger.rewards.add_reward(GUILD, "Movie night", 60).await.unwrap();

    for _ in 0..4 {
        ledger
            .presence
            .credit_presence(GUILD, &[alice.clone(), bob.clone()])
            .await
            .unwrap();
    }
    ledger.presence.credit_presence(GUILD, &[alice.clone()]).await.unwrap();

    assert_eq!(ledger.points.get_balance(GUILD, alice.id).await.unwrap(), 125);
    assert_eq!(ledger.points.get_balance(GUILD, bob.id).await.unwrap(), 100);

    // Listing is by cost descending: 1 = "Pick the map"
    let receipt = ledger.rewards.redeem(GUILD, alice.id, 1).await.unwrap();
    assert_eq!(receipt.title, "Pick the map");
    assert_eq!(receipt.remaining_balance, 25);

    assert!(matches!(
        ledger.rewards.redeem(GUILD, alice.id, 2).await,
        Err(LedgerError::InsufficientFunds { balance: 25, required: 60 })
    ));
    assert_eq!(ledger.points.get_balance(GUILD, alice.id).await.unwrap(), 25);

    let total = ledger.times.total_log(GUILD, 1).await.unwrap();
    assert_eq!(total.entries[0].user, alice.id);
    assert_eq!(total.entries[0].value, 5);
    assert_eq!(total.entries[1].value, 4);
}

#[tokio::test]
async fn test_redeem_out_of_range_is_rejected_first() {
    let ledger = ledger(PresenceSettings::default());
    ledger.rewards.add_reward(GUILD, "Only one", 10).await.unwrap();

    // A broke user asking for a missing reward hears about the reward
    for ordinal in [0, 2, 99] {
        assert!(matches!(
            ledger.rewards.redeem(GUILD, UserId(5), ordinal).await,
            Err(LedgerError::InvalidRewardId(o)) if o == ordinal
        ));
    }
}

#[tokio::test]
async fn test_balances_never_go_negative() {
    let ledger = ledger(PresenceSettings::default());
    let user = UserId(8);
    ledger.points.set_balance(GUILD, user, 30).await.unwrap();

    let results = [
        ledger.points.debit(GUILD, user, 20).await,
        ledger.points.debit(GUILD, user, 20).await,
        ledger.points.debit(GUILD, user, 10).await,
        ledger.points.debit(GUILD, user, 1).await,
    ];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 2);
    assert_eq!(ledger.points.get_balance(GUILD, user).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_presence_and_redemptions() {
    let ledger = Arc::new(ledger(PresenceSettings::default()));
    let member = Member::new(3, "carol");
    ledger.points.set_balance(GUILD, member.id, 50).await.unwrap();
    ledger.rewards.add_reward(GUILD, "Sticker", 1).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..25 {
        let user = member.id;
        let presence_ledger = Arc::clone(&ledger);
        let member = member.clone();
        handles.push(tokio::spawn(async move {
            presence_ledger.presence.credit_presence(GUILD, &[member]).await.unwrap();
        }));
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger.rewards.redeem(GUILD, user, 1).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // 50 + 25 earned - 25 spent
    assert_eq!(ledger.points.get_balance(GUILD, member.id).await.unwrap(), 50);
    let mine = ledger.times.my_log(GUILD, member.id).await.unwrap().unwrap();
    assert_eq!(mine.total, 25);
}

#[tokio::test]
async fn test_week_log_after_seven_days() {
    let ledger = ledger(PresenceSettings::default());
    let member = Member::new(4, "dave");

    for day in 1..=6 {
        let at = NaiveDate::from_ymd_opt(2024, 7, day)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        ledger
            .presence
            .credit_presence_at(GUILD, &[member.clone()], at)
            .await
            .unwrap();
    }
    assert!(ledger.times.week_log(GUILD).await.unwrap().is_none());

    // 03:00 on the 8th still counts toward the 7th
    let late = NaiveDate::from_ymd_opt(2024, 7, 8)
        .unwrap()
        .and_hms_opt(3, 0, 0)
        .unwrap();
    ledger
        .presence
        .credit_presence_at(GUILD, &[member.clone()], late)
        .await
        .unwrap();

    let week = ledger.times.week_log(GUILD).await.unwrap().unwrap();
    assert_eq!(week.from, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    assert_eq!(week.to, NaiveDate::from_ymd_opt(2024, 7, 7).unwrap());
    assert_eq!(week.entries[0].value, 7);
}
