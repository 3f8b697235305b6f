//! Career Journey
//!
//! The composite service object constructed once at startup. It owns the
//! graph and the four stores, hands out an `XpService` for awarding, and
//! resets everything in one coordinated call.

use super::graph::CareerGraph;
use super::ledger::AchievementLedger;
use super::leveling::LevelStats;
use super::profile::{CourseStore, ProfileStore};
use super::tracker::{ItemKind, ProgressTracker};
use super::xp::{ExplorationAward, StageCompletion, XpService};
use crate::storage::{InMemoryStore, SharedStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Issued when the final stage of the graph is completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionCertificate {
    pub full_name: String,
    pub stage_name: String,
    pub course_name: String,
    pub career_path: String,
    pub issued_at: DateTime<Utc>,
}

/// Result of `CareerJourney::complete_stage`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedStage {
    pub completion: StageCompletion,
    pub certificate: Option<CompletionCertificate>,
}

/// Per-stage status row of a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    pub id: String,
    pub title: String,
    pub unlocked: bool,
    pub completed: bool,
    pub core_ready: bool,
    pub exploration_percent: u32,
}

/// Read-only snapshot handed to rendering collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySummary {
    pub full_name: String,
    pub course_name: String,
    pub stats: LevelStats,
    pub unique_achievements: usize,
    pub total_completions: u64,
    pub current_stage: usize,
    pub stages: Vec<StageStatus>,
}

pub struct CareerJourney {
    graph: Arc<CareerGraph>,
    progress: ProgressTracker,
    ledger: AchievementLedger,
    course: CourseStore,
    profile: ProfileStore,
}

impl CareerJourney {
    pub fn open(graph: Arc<CareerGraph>, store: SharedStore) -> Self {
        log::debug!("[JOURNEY] Opening journey over {} stages", graph.len());
        Self {
            progress: ProgressTracker::open(graph.clone(), store.clone()),
            ledger: AchievementLedger::open(store.clone()),
            course: CourseStore::open(store.clone()),
            profile: ProfileStore::open(store),
            graph,
        }
    }

    /// A journey that forgets everything when dropped
    pub fn in_memory(graph: Arc<CareerGraph>) -> Self {
        Self::open(graph, Arc::new(InMemoryStore::new()))
    }

    pub fn graph(&self) -> &CareerGraph {
        &self.graph
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressTracker {
        &mut self.progress
    }

    pub fn ledger(&self) -> &AchievementLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut AchievementLedger {
        &mut self.ledger
    }

    pub fn course(&self) -> &CourseStore {
        &self.course
    }

    pub fn course_mut(&mut self) -> &mut CourseStore {
        &mut self.course
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut ProfileStore {
        &mut self.profile
    }

    pub fn xp(&mut self) -> XpService<'_> {
        XpService::new(&mut self.progress, &mut self.ledger)
    }

    /// Explore the `index`-th skill or certification of a stage, awarding XP once.
    ///
    /// Returns `None` when the stage or item does not exist.
    pub fn explore(&mut self, stage_id: &str, kind: ItemKind, index: usize, source: &str) -> Option<bool> {
        let stage = self.graph.stage(stage_id)?;
        let item = match kind {
            ItemKind::Skill => stage.skill_items().nth(index)?,
            ItemKind::Certification => stage.certification_items().nth(index)?,
        };
        let item_id = item.id.clone();
        let title = item.title.to_string();

        let award = ExplorationAward {
            stage_id,
            item_kind: kind,
            item_id: &item_id,
            title: &title,
            source,
        };
        Some(XpService::new(&mut self.progress, &mut self.ledger).award_exploration_once(&award))
    }

    /// Complete an unlocked stage with its reward batch; the final stage also issues a certificate
    pub fn complete_stage(&mut self, stage_id: &str, source: &str) -> Option<CompletedStage> {
        let completion = self.xp().complete_stage_with_rewards(stage_id, source)?;
        Some(self.with_certificate(completion))
    }

    /// Like `complete_stage`, but only once the stage's core is explored
    pub fn complete_core_stage(&mut self, stage_id: &str, source: &str) -> Option<CompletedStage> {
        let completion = self.xp().complete_core_stage(stage_id, source)?;
        Some(self.with_certificate(completion))
    }

    fn with_certificate(&self, completion: StageCompletion) -> CompletedStage {
        let certificate = completion.is_final_stage.then(|| {
            let course = self.course.course();
            log::info!("[JOURNEY] Course '{}' completed", course.course_name);
            CompletionCertificate {
                full_name: self.profile.profile().full_name.clone(),
                stage_name: completion.stage_title.clone(),
                course_name: course.course_name.clone(),
                career_path: course.career_path.clone(),
                issued_at: Utc::now(),
            }
        });

        CompletedStage {
            completion,
            certificate,
        }
    }

    /// Deliver pending award notifications
    pub fn flush(&mut self) -> Option<bool> {
        self.ledger.flush()
    }

    /// Reset achievements, progress, course and profile together
    pub fn reset(&mut self) {
        self.ledger.reset();
        self.progress.reset();
        self.course.reset();
        self.profile.reset();
        log::info!("[JOURNEY] All progress reset");
    }

    pub fn summary(&self) -> JourneySummary {
        let stages = self
            .graph
            .stages()
            .iter()
            .map(|stage| StageStatus {
                id: stage.id.clone(),
                title: stage.title.clone(),
                unlocked: self.progress.is_stage_unlocked(&stage.id),
                completed: self.progress.is_stage_completed(&stage.id),
                core_ready: self.progress.is_core_ready(&stage.id),
                exploration_percent: self.progress.exploration_percentage(&stage.id),
            })
            .collect();

        JourneySummary {
            full_name: self.profile.profile().full_name.clone(),
            course_name: self.course.course().course_name.clone(),
            stats: self.ledger.user_stats(),
            unique_achievements: self.ledger.total_count(),
            total_completions: self.ledger.multiplier(),
            current_stage: self.progress.current_stage(),
            stages,
        }
    }
}
