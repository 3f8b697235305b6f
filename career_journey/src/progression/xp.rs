//! XP Service
//!
//! The only sanctioned way to award XP for exploring content or completing
//! stages. It owns nothing: it borrows the tracker and the ledger for the
//! duration of one UI action and guarantees at most one exploration grant
//! per (stage, item) and one phase grant per stage.
//!
//! Awards are left pending on the ledger; the caller flushes once the whole
//! action is done.

use super::ledger::{AchievementGrant, AchievementKind, AchievementLedger};
use super::tracker::{ItemKind, ProgressTracker};

/// Parameters of a single exploration award
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorationAward<'a> {
    pub stage_id: &'a str,
    pub item_kind: ItemKind,
    pub item_id: &'a str,
    pub title: &'a str,
    pub source: &'a str,
}

/// Summary of a completed stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCompletion {
    pub stage_id: String,
    pub stage_title: String,
    /// Achievements registered by the completion batch
    pub achievements_registered: usize,
    pub new_achievements: usize,
    pub xp_granted: u64,
    pub is_final_stage: bool,
    pub next_stage_unlocked: bool,
}

pub fn exploration_achievement_id(stage_id: &str, kind: ItemKind, item_id: &str) -> String {
    format!("explore-{}-{}-{}", stage_id, kind.as_str(), item_id)
}

pub fn phase_achievement_id(stage_id: &str) -> String {
    format!("phase-{}", stage_id)
}

pub struct XpService<'a> {
    progress: &'a mut ProgressTracker,
    ledger: &'a mut AchievementLedger,
}

impl<'a> XpService<'a> {
    pub fn new(progress: &'a mut ProgressTracker, ledger: &'a mut AchievementLedger) -> Self {
        Self { progress, ledger }
    }

    /// Mark an item explored and grant XP the first time it ever is.
    ///
    /// Returns whether an award was made.
    pub fn award_exploration_once(&mut self, award: &ExplorationAward<'_>) -> bool {
        let outcome = self
            .progress
            .set_item_explored(award.stage_id, award.item_kind, award.item_id, true);
        if !outcome.first_explore {
            return false;
        }

        let id = exploration_achievement_id(award.stage_id, award.item_kind, award.item_id);
        let name = format!("Explored: {}", award.title);
        self.ledger
            .add_achievement(&id, &name, award.item_kind.achievement_kind(), award.source);
        log::info!("[XP] Exploration award {} from {}", id, award.source);
        true
    }

    /// Complete a stage and grant its phase achievement, once.
    ///
    /// Returns false for unknown or already completed stages.
    pub fn award_stage_completion_once(&mut self, stage_id: &str, stage_title: &str, source: &str) -> bool {
        if !self.progress.graph().contains(stage_id) || self.progress.is_stage_completed(stage_id) {
            return false;
        }

        self.progress.complete_stage(stage_id);
        self.ledger.add_achievement(
            &phase_achievement_id(stage_id),
            stage_title,
            AchievementKind::Phase,
            source,
        );
        log::info!("[XP] Stage {} completion award from {}", stage_id, source);
        true
    }

    /// Complete a stage and register, as one batch, its phase achievement
    /// plus one achievement per item currently explored in it.
    ///
    /// Returns `None` for unknown, locked or already completed stages.
    pub fn complete_stage_with_rewards(&mut self, stage_id: &str, source: &str) -> Option<StageCompletion> {
        if self.progress.is_stage_completed(stage_id) || !self.progress.is_stage_unlocked(stage_id) {
            return None;
        }
        let graph = self.progress.graph();
        let stage = graph.stage(stage_id)?;
        let progress = self.progress.stage_progress(stage_id)?;

        let mut grants = vec![AchievementGrant::new(
            &phase_achievement_id(stage_id),
            &stage.title,
            AchievementKind::Phase,
            source,
        )];

        for (i, item) in stage.skill_items().enumerate() {
            if progress.is_explored(ItemKind::Skill, &item.id) {
                grants.push(AchievementGrant::new(
                    &format!("skill-{}-{}", stage_id, i),
                    item.title,
                    AchievementKind::Skill,
                    source,
                ));
            }
        }

        // certifications keep their full label
        for (i, item) in stage.certification_items().enumerate() {
            if progress.is_explored(ItemKind::Certification, &item.id) {
                grants.push(AchievementGrant::new(
                    &format!("cert-{}-{}", stage_id, i),
                    item.label,
                    AchievementKind::Certification,
                    source,
                ));
            }
        }

        let stage_title = stage.title.clone();
        let is_final_stage = graph.is_final_stage(stage_id);
        let next_stage_id = graph
            .position(stage_id)
            .and_then(|i| graph.stage_at(i + 1))
            .map(|next| next.id.clone());

        self.progress.complete_stage(stage_id);
        let batch = self.ledger.add_batch(&grants);
        let next_stage_unlocked = next_stage_id
            .as_deref()
            .is_some_and(|next| self.progress.is_stage_unlocked(next));

        log::info!(
            "[XP] Stage {} completed with {} achievements (+{} XP)",
            stage_id,
            grants.len(),
            batch.xp_granted
        );

        Some(StageCompletion {
            stage_id: stage_id.to_string(),
            stage_title,
            achievements_registered: grants.len(),
            new_achievements: batch.new_count,
            xp_granted: batch.xp_granted,
            is_final_stage,
            next_stage_unlocked,
        })
    }

    /// `complete_stage_with_rewards`, gated on the stage's core being explored
    pub fn complete_core_stage(&mut self, stage_id: &str, source: &str) -> Option<StageCompletion> {
        if !self.progress.is_core_ready(stage_id) {
            log::debug!("[XP] Stage {} core not ready", stage_id);
            return None;
        }
        self.complete_stage_with_rewards(stage_id, source)
    }
}
