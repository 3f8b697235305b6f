//! Command-line surface over `CareerJourney`.

use crate::config::JourneyConfig;
use crate::progression::{
    cert_item_id, skill_item_id, AchievementKind, CareerJourney, ItemKind,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Source label recorded on achievements earned from the command line
pub const CLI_SOURCE: &str = "Command Line";

#[derive(Parser, Debug)]
#[command(name = "career-journey")]
#[command(about = "Track career roadmap exploration, XP, levels and achievements", long_about = None)]
pub struct Cli {
    /// SQLite database file (overrides CAREER_JOURNEY_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Career graph JSON file (overrides CAREER_JOURNEY_GRAPH)
    #[arg(long, global = true)]
    pub graph: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show level, XP and level progress
    Stats,

    /// List every stage with its lock, completion and exploration status
    Stages,

    /// Explore a skill or certification of a stage
    Explore {
        stage: String,
        /// skill or cert
        kind: ItemKind,
        /// 0-based position in the stage's list
        index: usize,
    },

    /// Mark an explored item as unexplored again
    Unexplore {
        stage: String,
        kind: ItemKind,
        index: usize,
    },

    /// Complete an unlocked stage and collect its rewards
    Complete {
        stage: String,
        /// Require half the stage explored, including a certification
        #[arg(long)]
        core: bool,
    },

    /// List earned achievements
    Achievements {
        /// Only the N most recent
        #[arg(long)]
        recent: Option<usize>,
    },

    /// Move the stage cursor to an unlocked stage
    Goto { index: usize },

    /// Set the name printed on the completion certificate
    Profile {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Erase achievements, progress, course and profile
    Reset,

    /// Print a JSON snapshot of the whole journey
    Summary,
}

impl Command {
    fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::Explore { .. }
                | Command::Unexplore { .. }
                | Command::Complete { .. }
                | Command::Goto { .. }
                | Command::Profile { .. }
                | Command::Reset
        )
    }
}

/// Resolve configuration, open the journey and run one command
pub fn run(cli: Cli) -> Result<()> {
    let config = JourneyConfig::from_env().with_overrides(cli.db, cli.graph);
    let graph = config.load_graph().context("Failed to load career graph")?;
    let store = config
        .open_store()
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;

    let mut journey = CareerJourney::open(Arc::new(graph), Arc::new(store));
    let stdout = std::io::stdout();
    execute(&mut journey, &cli.command, &mut stdout.lock())
}

/// Run one command against an open journey, writing the report to `out`
pub fn execute(journey: &mut CareerJourney, command: &Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Stats => print_stats(journey, out)?,
        Command::Stages => print_stages(journey, out)?,
        Command::Explore { stage, kind, index } => {
            let awarded = journey
                .explore(stage, *kind, *index, CLI_SOURCE)
                .with_context(|| format!("No {} #{} in stage {}", kind.as_str(), index, stage))?;
            if awarded {
                writeln!(out, "✅ Explored {} #{} of stage {}", kind.as_str(), index, stage)?;
            } else {
                writeln!(out, "ℹ️  Already explored earlier, no XP awarded")?;
            }
        }
        Command::Unexplore { stage, kind, index } => {
            let item_id = resolve_item(journey, stage, *kind, *index)?;
            let outcome = journey
                .progress_mut()
                .set_item_explored(stage, *kind, &item_id, false);
            if outcome.explored {
                writeln!(out, "⚠️  Item is still explored")?;
            } else {
                writeln!(out, "↩️  Unexplored {} #{} of stage {}", kind.as_str(), index, stage)?;
            }
        }
        Command::Complete { stage, core } => {
            if !journey.graph().contains(stage) {
                bail!("Unknown stage {}", stage);
            }
            if journey.progress().is_stage_completed(stage) {
                writeln!(out, "ℹ️  Stage {} is already completed", stage)?;
                return Ok(());
            }
            if !journey.progress().is_stage_unlocked(stage) {
                bail!("Stage {} is still locked", stage);
            }
            if *core && !journey.progress().is_core_ready(stage) {
                bail!(
                    "Stage {} core not ready ({}% explored, at least 50% and one certification needed)",
                    stage,
                    journey.progress().exploration_percentage(stage)
                );
            }
            let done = if *core {
                journey.complete_core_stage(stage, CLI_SOURCE)
            } else {
                journey.complete_stage(stage, CLI_SOURCE)
            };
            match done {
                Some(done) => {
                    let completion = &done.completion;
                    writeln!(
                        out,
                        "🏁 Completed \"{}\": {} achievements, +{} XP",
                        completion.stage_title, completion.achievements_registered, completion.xp_granted
                    )?;
                    if completion.next_stage_unlocked {
                        writeln!(out, "  └─ Next stage unlocked")?;
                    }
                    if let Some(certificate) = &done.certificate {
                        writeln!(out, "🎓 Certificate issued to {}", certificate.full_name)?;
                        writeln!(out, "  ├─ Course: {}", certificate.course_name)?;
                        writeln!(out, "  ├─ Career path: {}", certificate.career_path)?;
                        writeln!(out, "  └─ Issued: {}", certificate.issued_at.format("%Y-%m-%d"))?;
                    }
                }
                None => writeln!(out, "ℹ️  Stage {} is already completed", stage)?,
            }
        }
        Command::Achievements { recent } => print_achievements(journey, *recent, out)?,
        Command::Goto { index } => {
            if !journey.progress_mut().select_stage(*index) {
                bail!("Stage #{} does not exist or is still locked", index);
            }
            if let Some(stage) = journey.progress().current_stage_def() {
                writeln!(out, "📍 Now at stage {}: {}", stage.id, stage.title)?;
            }
        }
        Command::Profile { name } => {
            journey.profile_mut().set_full_name(&name.join(" "));
            writeln!(out, "👤 Name set to {}", journey.profile().profile().full_name)?;
        }
        Command::Reset => {
            journey.reset();
            writeln!(out, "🧹 All progress reset")?;
        }
        Command::Summary => {
            let json = serde_json::to_string_pretty(&journey.summary())?;
            writeln!(out, "{}", json)?;
        }
    }

    if command.is_mutating() {
        if let Some(celebrate) = journey.flush() {
            if celebrate {
                writeln!(out, "🎉 Celebration! You are level {}", journey.ledger().user_stats().level)?;
            }
        }
    }
    Ok(())
}

fn resolve_item(journey: &CareerJourney, stage_id: &str, kind: ItemKind, index: usize) -> Result<String> {
    let Some(stage) = journey.graph().stage(stage_id) else {
        bail!("Unknown stage {}", stage_id);
    };
    let count = match kind {
        ItemKind::Skill => stage.skills.len(),
        ItemKind::Certification => stage.certifications.len(),
    };
    if index >= count {
        bail!("Stage {} has only {} {} items", stage_id, count, kind.as_str());
    }
    Ok(match kind {
        ItemKind::Skill => skill_item_id(index),
        ItemKind::Certification => cert_item_id(index),
    })
}

fn print_stats(journey: &CareerJourney, out: &mut impl Write) -> Result<()> {
    let stats = journey.ledger().user_stats();
    writeln!(out, "⭐ Level {}{}", stats.level, if stats.is_max_level { " (max)" } else { "" })?;
    writeln!(out, "  ├─ Total XP: {}", stats.total_xp)?;
    writeln!(
        out,
        "  ├─ This level: {} / {}",
        stats.current_level_xp, stats.next_level_xp
    )?;
    writeln!(out, "  ├─ Progress: {:.1}%", stats.progress_percent)?;
    writeln!(
        out,
        "  └─ Achievements: {} unique, {} total",
        journey.ledger().total_count(),
        journey.ledger().multiplier()
    )?;
    Ok(())
}

fn print_stages(journey: &CareerJourney, out: &mut impl Write) -> Result<()> {
    let current = journey.progress().current_stage();
    for (i, status) in journey.summary().stages.iter().enumerate() {
        let marker = if status.completed {
            "✅"
        } else if status.unlocked {
            "🔓"
        } else {
            "🔒"
        };
        let cursor = if i == current { " ◀" } else { "" };
        writeln!(
            out,
            "{} [{}] {} ({}% explored){}",
            marker, status.id, status.title, status.exploration_percent, cursor
        )?;
    }
    Ok(())
}

fn print_achievements(journey: &CareerJourney, recent: Option<usize>, out: &mut impl Write) -> Result<()> {
    let ledger = journey.ledger();
    let achievements = match recent {
        Some(count) => ledger.recent(count),
        None => ledger.achievements().iter().collect(),
    };

    if achievements.is_empty() {
        writeln!(out, "No achievements yet")?;
        return Ok(());
    }

    for achievement in achievements {
        let icon = match achievement.kind {
            AchievementKind::Phase => "🏆",
            AchievementKind::Certification => "📜",
            AchievementKind::Skill => "🛠️",
        };
        writeln!(
            out,
            "{} {} (+{} XP, x{})",
            icon, achievement.name, achievement.xp, achievement.earned_count
        )?;
    }
    Ok(())
}
