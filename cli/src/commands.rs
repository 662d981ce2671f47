//! Operator commands against a community's ledger

use anyhow::Result;
use clap::{Parser, Subcommand};
use kirbec_bets::{Bet, BetEngine, BetId, BetStatus, Settlement};
use kirbec_ledger::{
    format_minutes, parse_reward, CommunityId, DayLog, Member, MyLog, Page, PointsLedger, Redemption,
    Reward, RewardCatalog, TimeLog, UserId, Vault, WeekLog,
};
use kirbec_storage::DocumentStore;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kirbec-cli")]
#[command(about = "Kirbec points, rewards and bets operator tool", version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Community (guild) id
    #[arg(long)]
    pub community: u64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Points leaderboard
    Points {
        #[arg(default_value = "1")]
        page: usize,
    },

    /// Points balance of one user
    Balance { user: u64 },

    /// List rewards, most expensive first
    Rewards,

    /// Add or re-price a reward: `<title> <cost>`
    AddReward {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Remove a reward by title
    RemoveReward {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Spend points on the reward at position `reward` of the listing
    Redeem { user: u64, reward: usize },

    #[command(subcommand)]
    Bet(BetCommand),

    #[command(subcommand)]
    Log(LogCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BetCommand {
    /// Create a bet: `<title> | <option> | <option> ...`
    Create {
        user: u64,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Stake points on an option
    Place {
        user: u64,
        bet: BetId,
        option: usize,
        amount: u64,
    },

    /// Stop accepting wagers
    Close {
        user: u64,
        bet: BetId,
        /// Act as an administrator
        #[arg(long)]
        admin: bool,
    },

    /// Name the winning option and pay out
    Complete {
        user: u64,
        bet: BetId,
        option: usize,
        #[arg(long)]
        admin: bool,
    },

    Show { bet: BetId },

    /// Bets not yet completed
    List,

    /// Active bets created by a user
    Mine { user: u64 },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LogCommand {
    Total {
        #[arg(default_value = "1")]
        page: usize,
    },
    Today,
    Week,
    Mine { user: u64 },
}

fn member(user: u64, admin: bool) -> Member {
    let member = Member::new(user, user.to_string());
    if admin {
        member.administrator()
    } else {
        member
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Run one command and render its result
pub async fn execute<S: DocumentStore>(
    vault: &Vault<S>,
    community: CommunityId,
    command: Command,
    json: bool,
) -> Result<String> {
    let points = PointsLedger::new(vault.clone());
    let rewards = RewardCatalog::new(vault.clone());

    match command {
        Command::Points { page } => {
            let page = points.leaderboard(community, page).await?;
            if json {
                return to_json(&page);
            }
            Ok(render_page("Points", &page, |value| value.to_string()))
        }

        Command::Balance { user } => {
            let balance = points.get_balance(community, UserId(user)).await?;
            if json {
                return to_json(&json!({ "user": user, "balance": balance }));
            }
            Ok(format!("{}: {} points", user, balance.green()))
        }

        Command::Rewards => {
            let listed = rewards.list_rewards(community).await?;
            if json {
                return to_json(&listed);
            }
            Ok(render_rewards(&listed))
        }

        Command::AddReward { text } => {
            let (title, cost) = parse_reward(&text.join(" "))?;
            let listed = rewards.add_reward(community, &title, cost).await?;
            if json {
                return to_json(&listed);
            }
            Ok(render_rewards(&listed))
        }

        Command::RemoveReward { title } => {
            let listed = rewards.remove_reward(community, &title.join(" ")).await?;
            if json {
                return to_json(&listed);
            }
            Ok(render_rewards(&listed))
        }

        Command::Redeem { user, reward } => {
            let receipt = rewards.redeem(community, UserId(user), reward).await?;
            if json {
                return to_json(&receipt);
            }
            Ok(render_redemption(user, &receipt))
        }

        Command::Bet(command) => execute_bet(vault, community, command, json).await,

        Command::Log(command) => execute_log(vault, community, command, json).await,
    }
}

async fn execute_bet<S: DocumentStore>(
    vault: &Vault<S>,
    community: CommunityId,
    command: BetCommand,
    json: bool,
) -> Result<String> {
    let engine = BetEngine::new(vault.clone());

    match command {
        BetCommand::Create { user, text } => {
            let id = engine
                .create_bet_from_text(community, &member(user, false), &text.join(" "))
                .await?;
            let bet = engine.get_bet(community, id).await?;
            if json {
                return to_json(&bet);
            }
            Ok(render_bet(&bet))
        }

        BetCommand::Place {
            user,
            bet,
            option,
            amount,
        } => {
            let bet = engine
                .place_bet(community, UserId(user), bet, option, amount)
                .await?;
            if json {
                return to_json(&bet);
            }
            let label = bet
                .wagers
                .get(&UserId(user))
                .map(|wager| wager.option.as_str())
                .unwrap_or_default();
            Ok(format!(
                "{} bet {} on '{}' in bet #{}\n\n{}",
                user,
                amount.green(),
                label,
                bet.id,
                render_bet(&bet)
            ))
        }

        BetCommand::Close { user, bet, admin } => {
            let bet = engine.close_bet(community, &member(user, admin), bet).await?;
            if json {
                return to_json(&bet);
            }
            Ok(render_bet(&bet))
        }

        BetCommand::Complete {
            user,
            bet,
            option,
            admin,
        } => {
            let settlement = engine
                .complete_bet(community, &member(user, admin), bet, option)
                .await?;
            if json {
                return to_json(&settlement);
            }
            Ok(render_settlement(&settlement))
        }

        BetCommand::Show { bet } => {
            let bet = engine.get_bet(community, bet).await?;
            if json {
                return to_json(&bet);
            }
            Ok(render_bet(&bet))
        }

        BetCommand::List => {
            let bets = engine.list_active_bets(community).await?;
            if json {
                return to_json(&bets);
            }
            Ok(render_bet_list("Active bets", &bets))
        }

        BetCommand::Mine { user } => {
            let bets = engine.list_user_active_bets(community, UserId(user)).await?;
            if json {
                return to_json(&bets);
            }
            Ok(render_bet_list(&format!("Active bets by {}", user), &bets))
        }
    }
}

async fn execute_log<S: DocumentStore>(
    vault: &Vault<S>,
    community: CommunityId,
    command: LogCommand,
    json: bool,
) -> Result<String> {
    let times = TimeLog::new(vault.clone());

    match command {
        LogCommand::Total { page } => {
            let page = times.total_log(community, page).await?;
            if json {
                return to_json(&page);
            }
            Ok(render_page("Total voice time", &page, format_minutes))
        }

        LogCommand::Today => {
            let day = times.today_log(community).await?;
            if json {
                return to_json(&day);
            }
            Ok(match day {
                Some(day) => render_day(&day),
                None => "No voice time recorded yet".to_string(),
            })
        }

        LogCommand::Week => {
            let week = times.week_log(community).await?;
            if json {
                return to_json(&week);
            }
            Ok(match week {
                Some(week) => render_week(&week),
                None => "Not enough data yet: a week log needs seven recorded days".to_string(),
            })
        }

        LogCommand::Mine { user } => {
            let mine = times.my_log(community, UserId(user)).await?;
            if json {
                return to_json(&mine);
            }
            Ok(match mine {
                Some(mine) => render_my_log(user, &mine),
                None => format!("No voice time recorded for {}", user),
            })
        }
    }
}

fn render_page(title: &str, page: &Page, value: impl Fn(u64) -> String) -> String {
    let mut out = format!("{} (page {}/{})\n", title.cyan().bold(), page.page, page.pages);
    if page.entries.is_empty() {
        out.push_str("  (empty)\n");
    }
    for standing in &page.entries {
        let _ = writeln!(out, "  {}. {}: {}", standing.rank, standing.user, value(standing.value));
    }
    out
}

fn render_rewards(rewards: &[Reward]) -> String {
    let mut out = format!("{}\n", "Rewards".cyan().bold());
    if rewards.is_empty() {
        out.push_str("  (none)\n");
    }
    for (index, reward) in rewards.iter().enumerate() {
        let _ = writeln!(out, "  {}. {} - {} points", index + 1, reward.title, reward.cost.yellow());
    }
    out
}

fn render_redemption(user: u64, receipt: &Redemption) -> String {
    format!(
        "{} redeemed '{}' for {} points, {} remaining",
        user,
        receipt.title,
        receipt.cost,
        receipt.remaining_balance.green()
    )
}

fn status_label(status: BetStatus) -> String {
    match status {
        BetStatus::Open => "open".green().to_string(),
        BetStatus::Closed => "closed".yellow().to_string(),
        BetStatus::Completed => "completed".bright_black().to_string(),
    }
}

pub fn render_bet(bet: &Bet) -> String {
    let mut out = format!(
        "{} {} [{}]\n",
        format!("#{}", bet.id).bold(),
        bet.title.cyan().bold(),
        status_label(bet.status)
    );
    let _ = writeln!(out, "  created by {} at {}", bet.created_by, bet.created_at);
    for option in bet.numbered_options() {
        let winner = bet.winning_option.as_deref() == Some(option.label.as_str());
        let _ = writeln!(
            out,
            "  {}. {} ({} points){}",
            option.ordinal,
            option.label,
            option.pool,
            if winner { " <- winner" } else { "" }
        );
    }
    let _ = writeln!(out, "  pool: {} points", bet.total_pool().yellow());
    out
}

fn render_bet_list(title: &str, bets: &[Bet]) -> String {
    let mut out = format!("{}\n", title.cyan().bold());
    if bets.is_empty() {
        out.push_str("  (none)\n");
    }
    for bet in bets {
        let _ = writeln!(
            out,
            "  #{} {} [{}] pool {}",
            bet.id,
            bet.title,
            status_label(bet.status),
            bet.total_pool()
        );
    }
    out
}

fn render_settlement(settlement: &Settlement) -> String {
    let mut out = render_bet(&settlement.bet);
    match settlement.multiplier {
        Some(multiplier) => {
            let _ = writeln!(out, "  multiplier: x{:.2}", multiplier);
            for (user, amount) in &settlement.payouts {
                let _ = writeln!(out, "  {} won {}", user, amount.green());
            }
        }
        None => {
            let _ = writeln!(out, "  nobody backed the winning option, no payouts");
        }
    }
    out
}

fn render_day(day: &DayLog) -> String {
    let mut out = format!("{} {}\n", "Voice time for".cyan().bold(), day.date.format("%m/%d/%Y"));
    for standing in &day.entries {
        let _ = writeln!(out, "  {}. {}: {}", standing.rank, standing.user, format_minutes(standing.value));
    }
    out
}

fn render_week(week: &WeekLog) -> String {
    let mut out = format!(
        "{} {} - {}\n",
        "Voice time for".cyan().bold(),
        week.from.format("%m/%d/%Y"),
        week.to.format("%m/%d/%Y")
    );
    for standing in &week.entries {
        let _ = writeln!(out, "  {}. {}: {}", standing.rank, standing.user, format_minutes(standing.value));
    }
    out
}

fn render_my_log(user: u64, mine: &MyLog) -> String {
    let mut out = format!("{} {}\n", "Voice time for".cyan().bold(), user);
    let _ = writeln!(out, "  total: {}", format_minutes(mine.total));
    let _ = writeln!(out, "  today: {}", format_minutes(mine.today));
    if let Some((date, minutes)) = mine.longest_day {
        let _ = writeln!(
            out,
            "  longest day: {} ({})",
            date.format("%m/%d/%Y"),
            format_minutes(minutes)
        );
    }
    out
}
