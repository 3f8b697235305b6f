//! Progress Tracker
//!
//! Per-stage exploration and completion state, the unlock rule, exploration
//! percentages and the shared stage cursor.
//!
//! Each explorable item moves through `NeverSeen -> Explored` exactly once;
//! afterwards it may flip between `Explored` and `PreviouslyExplored` freely.
//! Only the first transition is reported as `first_explore`, which is what
//! XP awards key off.

use super::graph::{CareerGraph, CareerStage};
use super::ledger::AchievementKind;
use super::notify::{Listeners, Subscription};
use crate::storage::{self, SharedStore, PROGRESS_KEY};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

// ============================================================
// ITEM STATE
// ============================================================

/// Which list of a stage an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "skill")]
    Skill,
    #[serde(rename = "cert")]
    Certification,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Skill => "skill",
            ItemKind::Certification => "cert",
        }
    }

    pub fn achievement_kind(self) -> AchievementKind {
        match self {
            ItemKind::Skill => AchievementKind::Skill,
            ItemKind::Certification => AchievementKind::Certification,
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skill" => Ok(ItemKind::Skill),
            "cert" | "certification" => Ok(ItemKind::Certification),
            other => Err(format!("unknown item kind '{}' (expected skill or cert)", other)),
        }
    }
}

/// Lifetime of a single skill or certification item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    NeverSeen,
    /// Currently explored; XP has been granted
    Explored,
    /// Explored once, since un-explored; XP will not be granted again
    PreviouslyExplored,
}

impl ItemState {
    pub fn is_explored(self) -> bool {
        self == ItemState::Explored
    }

    pub fn is_awarded(self) -> bool {
        self != ItemState::NeverSeen
    }
}

/// Result of an exploration mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExploreOutcome {
    pub explored: bool,
    pub first_explore: bool,
}

// ============================================================
// STAGE PROGRESS
// ============================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageProgress {
    skills: BTreeMap<String, ItemState>,
    certifications: BTreeMap<String, ItemState>,
    completed: bool,
}

impl StageProgress {
    fn items(&self, kind: ItemKind) -> &BTreeMap<String, ItemState> {
        match kind {
            ItemKind::Skill => &self.skills,
            ItemKind::Certification => &self.certifications,
        }
    }

    fn items_mut(&mut self, kind: ItemKind) -> &mut BTreeMap<String, ItemState> {
        match kind {
            ItemKind::Skill => &mut self.skills,
            ItemKind::Certification => &mut self.certifications,
        }
    }

    pub fn item_state(&self, kind: ItemKind, item_id: &str) -> ItemState {
        self.items(kind)
            .get(item_id)
            .copied()
            .unwrap_or(ItemState::NeverSeen)
    }

    pub fn is_explored(&self, kind: ItemKind, item_id: &str) -> bool {
        self.item_state(kind, item_id).is_explored()
    }

    pub fn is_awarded(&self, kind: ItemKind, item_id: &str) -> bool {
        self.item_state(kind, item_id).is_awarded()
    }

    pub fn explored_ids(&self, kind: ItemKind) -> impl Iterator<Item = &str> {
        self.items(kind)
            .iter()
            .filter(|(_, state)| state.is_explored())
            .map(|(id, _)| id.as_str())
    }

    pub fn awarded_ids(&self, kind: ItemKind) -> impl Iterator<Item = &str> {
        self.items(kind)
            .iter()
            .filter(|(_, state)| state.is_awarded())
            .map(|(id, _)| id.as_str())
    }

    pub fn explored_count(&self, kind: ItemKind) -> usize {
        self.explored_ids(kind).count()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns `None` when `desired` already matches
    fn set_explored(&mut self, kind: ItemKind, item_id: &str, desired: bool) -> Option<ExploreOutcome> {
        let current = self.item_state(kind, item_id);
        if current.is_explored() == desired {
            return None;
        }

        let next = if desired {
            ItemState::Explored
        } else {
            ItemState::PreviouslyExplored
        };
        self.items_mut(kind).insert(item_id.to_string(), next);

        Some(ExploreOutcome {
            explored: desired,
            first_explore: desired && current == ItemState::NeverSeen,
        })
    }

    fn clear(&mut self) {
        self.skills.clear();
        self.certifications.clear();
        self.completed = false;
    }
}

// ============================================================
// PERSISTED SNAPSHOT
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressSnapshot {
    #[serde(default)]
    current_stage: usize,
    #[serde(default)]
    exploration: Vec<StageRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageRecord {
    key: String,
    #[serde(default)]
    stage_id: String,
    #[serde(default, alias = "expandedItems")]
    explored_skills: Vec<String>,
    #[serde(default)]
    explored_certifications: Vec<String>,
    awarded_skills: Option<Vec<String>>,
    awarded_certifications: Option<Vec<String>>,
    #[serde(default)]
    completed: bool,
}

impl StageRecord {
    fn from_progress(stage_id: &str, progress: &StageProgress) -> Self {
        fn owned<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
            ids.map(str::to_string).collect()
        }

        Self {
            key: stage_id.to_string(),
            stage_id: stage_id.to_string(),
            explored_skills: owned(progress.explored_ids(ItemKind::Skill)),
            explored_certifications: owned(progress.explored_ids(ItemKind::Certification)),
            awarded_skills: Some(owned(progress.awarded_ids(ItemKind::Skill))),
            awarded_certifications: Some(owned(progress.awarded_ids(ItemKind::Certification))),
            completed: progress.completed,
        }
    }

    /// Awarded lists default to the explored lists when absent
    fn into_progress(self) -> StageProgress {
        fn rebuild(explored: Vec<String>, awarded: Option<Vec<String>>) -> BTreeMap<String, ItemState> {
            let mut items = BTreeMap::new();
            for id in awarded.unwrap_or_default() {
                items.insert(id, ItemState::PreviouslyExplored);
            }
            for id in explored {
                items.insert(id, ItemState::Explored);
            }
            items
        }

        StageProgress {
            skills: rebuild(self.explored_skills, self.awarded_skills),
            certifications: rebuild(self.explored_certifications, self.awarded_certifications),
            completed: self.completed,
        }
    }
}

fn stage_has_item(stage: &CareerStage, kind: ItemKind, item_id: &str) -> bool {
    match kind {
        ItemKind::Skill => stage.skill_items().any(|item| item.id == item_id),
        ItemKind::Certification => stage.certification_items().any(|item| item.id == item_id),
    }
}

// ============================================================
// PROGRESS TRACKER
// ============================================================

type ChangeListener = dyn FnMut();

pub struct ProgressTracker {
    graph: Arc<CareerGraph>,
    current_stage: usize,
    stages: HashMap<String, StageProgress>,
    listeners: Listeners<ChangeListener>,
    store: SharedStore,
}

impl ProgressTracker {
    /// Open the tracker with one entry per graph stage, restoring persisted state
    pub fn open(graph: Arc<CareerGraph>, store: SharedStore) -> Self {
        let stages = graph
            .stages()
            .iter()
            .map(|stage| (stage.id.clone(), StageProgress::default()))
            .collect();

        let mut tracker = Self {
            graph,
            current_stage: 0,
            stages,
            listeners: Listeners::default(),
            store,
        };
        tracker.load();
        tracker
    }

    pub fn graph(&self) -> &CareerGraph {
        &self.graph
    }

    // ========================================================
    // EXPLORATION
    // ========================================================

    pub fn toggle_skill_explored(&mut self, stage_id: &str, skill_id: &str) -> ExploreOutcome {
        self.toggle_item_explored(stage_id, ItemKind::Skill, skill_id)
    }

    pub fn toggle_certification_explored(&mut self, stage_id: &str, cert_id: &str) -> ExploreOutcome {
        self.toggle_item_explored(stage_id, ItemKind::Certification, cert_id)
    }

    pub fn set_skill_explored(&mut self, stage_id: &str, skill_id: &str, explored: bool) -> ExploreOutcome {
        self.set_item_explored(stage_id, ItemKind::Skill, skill_id, explored)
    }

    pub fn set_certification_explored(
        &mut self,
        stage_id: &str,
        cert_id: &str,
        explored: bool,
    ) -> ExploreOutcome {
        self.set_item_explored(stage_id, ItemKind::Certification, cert_id, explored)
    }

    /// Flip an item between explored and not explored
    pub fn toggle_item_explored(&mut self, stage_id: &str, kind: ItemKind, item_id: &str) -> ExploreOutcome {
        let Some(progress) = self.stages.get(stage_id) else {
            return ExploreOutcome::default();
        };
        let desired = !progress.is_explored(kind, item_id);
        self.set_item_explored(stage_id, kind, item_id, desired)
    }

    /// Idempotent: a no-op when the item is already in the desired state
    pub fn set_item_explored(
        &mut self,
        stage_id: &str,
        kind: ItemKind,
        item_id: &str,
        explored: bool,
    ) -> ExploreOutcome {
        if !self.is_stage_item(stage_id, kind, item_id) {
            log::debug!(
                "[PROGRESS] Ignoring exploration of unknown {} {} in stage {}",
                kind.as_str(),
                item_id,
                stage_id
            );
            return ExploreOutcome::default();
        }
        let Some(progress) = self.stages.get_mut(stage_id) else {
            return ExploreOutcome::default();
        };

        match progress.set_explored(kind, item_id, explored) {
            Some(outcome) => {
                log::debug!(
                    "[PROGRESS] Stage {} {} {} explored={} first={}",
                    stage_id,
                    kind.as_str(),
                    item_id,
                    outcome.explored,
                    outcome.first_explore
                );
                self.changed();
                outcome
            }
            None => ExploreOutcome {
                explored,
                first_explore: false,
            },
        }
    }

    /// Whether `item_id` is one of the stage's own skill or certification ids
    fn is_stage_item(&self, stage_id: &str, kind: ItemKind, item_id: &str) -> bool {
        self.graph
            .stage(stage_id)
            .is_some_and(|stage| stage_has_item(stage, kind, item_id))
    }

    // ========================================================
    // COMPLETION & UNLOCKING
    // ========================================================

    /// Mark a stage completed; returns whether this call completed it
    pub fn complete_stage(&mut self, stage_id: &str) -> bool {
        let Some(progress) = self.stages.get_mut(stage_id) else {
            return false;
        };
        let newly_completed = !progress.completed;
        progress.completed = true;
        if newly_completed {
            log::info!("[PROGRESS] Stage {} completed", stage_id);
        }
        self.changed();
        newly_completed
    }

    pub fn is_stage_completed(&self, stage_id: &str) -> bool {
        self.stages
            .get(stage_id)
            .is_some_and(|progress| progress.completed)
    }

    /// Level-1 stages and stages without prerequisites are always unlocked;
    /// otherwise every direct prerequisite must be completed.
    pub fn is_stage_unlocked(&self, stage_id: &str) -> bool {
        let Some(stage) = self.graph.stage(stage_id) else {
            return false;
        };
        if stage.level == 1 || stage.prerequisites.is_empty() {
            return true;
        }
        stage
            .prerequisites
            .iter()
            .all(|prereq| self.is_stage_completed(prereq))
    }

    pub fn stage_progress(&self, stage_id: &str) -> Option<&StageProgress> {
        self.stages.get(stage_id)
    }

    /// Rounded share of the stage's items currently explored, 0 for empty stages
    pub fn exploration_percentage(&self, stage_id: &str) -> u32 {
        let (Some(stage), Some(progress)) = (self.graph.stage(stage_id), self.stages.get(stage_id))
        else {
            return 0;
        };

        let total = stage.total_items();
        if total == 0 {
            return 0;
        }
        let explored = progress.explored_count(ItemKind::Skill)
            + progress.explored_count(ItemKind::Certification);

        // round half up
        ((200 * explored + total) / (2 * total)) as u32
    }

    pub fn is_fully_explored(&self, stage_id: &str) -> bool {
        self.exploration_percentage(stage_id) == 100
    }

    /// At least half the stage explored, including one certification when it lists any
    pub fn is_core_ready(&self, stage_id: &str) -> bool {
        let (Some(stage), Some(progress)) = (self.graph.stage(stage_id), self.stages.get(stage_id))
        else {
            return false;
        };
        let required_certs = usize::from(!stage.certifications.is_empty());
        self.exploration_percentage(stage_id) >= 50
            && progress.explored_count(ItemKind::Certification) >= required_certs
    }

    // ========================================================
    // STAGE CURSOR
    // ========================================================

    pub fn current_stage(&self) -> usize {
        self.current_stage
    }

    pub fn current_stage_def(&self) -> Option<&CareerStage> {
        self.graph.stage_at(self.current_stage)
    }

    /// Move the cursor; indices outside the graph are ignored
    pub fn set_current_stage(&mut self, index: usize) -> bool {
        if index >= self.graph.len() {
            log::warn!(
                "[PROGRESS] Ignoring cursor move to {} ({} stages)",
                index,
                self.graph.len()
            );
            return false;
        }
        self.current_stage = index;
        self.changed();
        true
    }

    /// Move the cursor only if the target stage is unlocked
    pub fn select_stage(&mut self, index: usize) -> bool {
        let unlocked = self
            .graph
            .stage_at(index)
            .is_some_and(|stage| self.is_stage_unlocked(&stage.id));
        unlocked && self.set_current_stage(index)
    }

    /// Step to the next stage if it is unlocked
    pub fn advance(&mut self) -> bool {
        self.select_stage(self.current_stage + 1)
    }

    // ========================================================
    // SUBSCRIPTIONS & RESET
    // ========================================================

    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) -> Subscription {
        self.listeners.add(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.remove(subscription)
    }

    /// Clear every stage and rewind the cursor
    pub fn reset(&mut self) {
        self.current_stage = 0;
        for progress in self.stages.values_mut() {
            progress.clear();
        }
        storage::clear_key(self.store.as_ref(), PROGRESS_KEY);
        log::info!("[PROGRESS] Progress reset");
        self.notify();
    }

    fn changed(&mut self) {
        self.notify();
        self.save();
    }

    fn notify(&mut self) {
        for listener in self.listeners.iter_mut() {
            listener();
        }
    }

    // ========================================================
    // PERSISTENCE
    // ========================================================

    fn save(&self) {
        let exploration = self
            .graph
            .stages()
            .iter()
            .filter_map(|stage| {
                self.stages
                    .get(&stage.id)
                    .map(|progress| StageRecord::from_progress(&stage.id, progress))
            })
            .collect();

        let snapshot = ProgressSnapshot {
            current_stage: self.current_stage,
            exploration,
        };
        storage::save_json(self.store.as_ref(), PROGRESS_KEY, &snapshot);
    }

    fn load(&mut self) {
        let Some(snapshot) =
            storage::load_json::<ProgressSnapshot>(self.store.as_ref(), PROGRESS_KEY)
        else {
            return;
        };

        self.current_stage = if snapshot.current_stage < self.graph.len() {
            snapshot.current_stage
        } else {
            0
        };

        for record in snapshot.exploration {
            let (Some(stage), Some(slot)) = (self.graph.stage(&record.key), self.stages.get_mut(&record.key))
            else {
                continue;
            };
            let mut progress = record.into_progress();
            progress.skills.retain(|id, _| stage_has_item(stage, ItemKind::Skill, id));
            progress
                .certifications
                .retain(|id, _| stage_has_item(stage, ItemKind::Certification, id));
            *slot = progress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStore, KeyValueStore};
    use std::cell::Cell;
    use std::rc::Rc;

    fn tracker() -> (ProgressTracker, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let tracker = ProgressTracker::open(Arc::new(CareerGraph::lineworker()), store.clone());
        (tracker, store)
    }

    #[test]
    fn test_toggle_reports_first_explore_once() {
        let (mut tracker, _) = tracker();

        let first = tracker.toggle_skill_explored("1", "skill-0");
        assert_eq!(first, ExploreOutcome { explored: true, first_explore: true });

        let off = tracker.toggle_skill_explored("1", "skill-0");
        assert_eq!(off, ExploreOutcome { explored: false, first_explore: false });

        let again = tracker.toggle_skill_explored("1", "skill-0");
        assert_eq!(again, ExploreOutcome { explored: true, first_explore: false });
    }

    #[test]
    fn test_set_is_idempotent() {
        let (mut tracker, _) = tracker();

        let noop = tracker.set_certification_explored("2", "cert-1", false);
        assert_eq!(noop, ExploreOutcome { explored: false, first_explore: false });
        assert_eq!(
            tracker.stage_progress("2").unwrap().item_state(ItemKind::Certification, "cert-1"),
            ItemState::NeverSeen
        );

        assert!(tracker.set_certification_explored("2", "cert-1", true).first_explore);
        let repeat = tracker.set_certification_explored("2", "cert-1", true);
        assert_eq!(repeat, ExploreOutcome { explored: true, first_explore: false });
    }

    #[test]
    fn test_unexplore_keeps_award() {
        let (mut tracker, _) = tracker();
        tracker.set_skill_explored("1", "skill-1", true);
        tracker.set_skill_explored("1", "skill-1", false);

        let progress = tracker.stage_progress("1").unwrap();
        assert!(!progress.is_explored(ItemKind::Skill, "skill-1"));
        assert!(progress.is_awarded(ItemKind::Skill, "skill-1"));

        let back = tracker.set_skill_explored("1", "skill-1", true);
        assert!(!back.first_explore);
    }

    #[test]
    fn test_unknown_stage_is_neutral() {
        let (mut tracker, _) = tracker();
        assert_eq!(tracker.toggle_skill_explored("99", "skill-0"), ExploreOutcome::default());
        assert_eq!(
            tracker.set_certification_explored("99", "cert-0", true),
            ExploreOutcome::default()
        );
        assert!(!tracker.complete_stage("99"));
        assert!(!tracker.is_stage_unlocked("99"));
        assert_eq!(tracker.exploration_percentage("99"), 0);
    }

    #[test]
    fn test_items_outside_the_stage_are_ignored() {
        let (mut tracker, _) = tracker();
        // stage 1 has 4 skills and 2 certifications
        for i in 4..24 {
            let outcome = tracker.set_skill_explored("1", &format!("skill-{}", i), true);
            assert_eq!(outcome, ExploreOutcome::default());
        }
        assert_eq!(tracker.toggle_certification_explored("1", "cert-2"), ExploreOutcome::default());
        assert_eq!(tracker.set_certification_explored("1", "skill-0", true), ExploreOutcome::default());
        assert_eq!(tracker.set_skill_explored("1", "bogus", true), ExploreOutcome::default());

        assert_eq!(tracker.exploration_percentage("1"), 0);
        assert_eq!(tracker.stage_progress("1").unwrap().explored_count(ItemKind::Skill), 0);
    }

    #[test]
    fn test_persisted_unknown_items_are_dropped() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set(
                PROGRESS_KEY,
                r#"{"currentStage": 0, "exploration": [
                    {"key": "1", "stageId": "1", "exploredSkills": ["skill-0", "skill-9", "skill-10"]}
                ]}"#,
            )
            .unwrap();

        let tracker = ProgressTracker::open(Arc::new(CareerGraph::lineworker()), store);
        let progress = tracker.stage_progress("1").unwrap();
        assert_eq!(progress.explored_count(ItemKind::Skill), 1);
        assert_eq!(tracker.exploration_percentage("1"), 17);
    }

    #[test]
    fn test_core_readiness() {
        let (mut tracker, _) = tracker();
        // stage 2 has 3 skills + 3 certifications
        for id in ["skill-0", "skill-1", "skill-2"] {
            tracker.set_skill_explored("2", id, true);
        }
        assert_eq!(tracker.exploration_percentage("2"), 50);
        assert!(!tracker.is_core_ready("2"));

        tracker.set_certification_explored("2", "cert-0", true);
        assert!(tracker.is_core_ready("2"));

        let graph = CareerGraph::new(vec![
            CareerStage::new("skills", "Skills", 1).with_skills(&["A", "B"]),
            CareerStage::new("empty", "Empty", 1),
        ])
        .unwrap();
        let mut tracker = ProgressTracker::open(Arc::new(graph), Arc::new(InMemoryStore::new()));
        tracker.set_skill_explored("skills", "skill-0", true);
        assert!(tracker.is_core_ready("skills"));
        assert!(!tracker.is_core_ready("empty"));
        assert!(!tracker.is_core_ready("missing"));
    }

    #[test]
    fn test_unlock_follows_direct_prerequisites() {
        let (mut tracker, _) = tracker();
        assert!(tracker.is_stage_unlocked("1"));
        assert!(!tracker.is_stage_unlocked("2"));

        tracker.complete_stage("1");
        assert!(tracker.is_stage_unlocked("2"));
        assert!(!tracker.is_stage_unlocked("3"));
    }

    #[test]
    fn test_unlock_checks_only_declared_prerequisites() {
        let graph = CareerGraph::new(vec![
            CareerStage::new("a", "A", 1),
            CareerStage::new("b", "B", 2).with_prerequisites(&["a"]),
            CareerStage::new("c", "C", 3).with_prerequisites(&["b"]),
            CareerStage::new("d", "D", 4),
        ])
        .unwrap();
        let mut tracker = ProgressTracker::open(Arc::new(graph), Arc::new(InMemoryStore::new()));

        tracker.complete_stage("b");
        assert!(tracker.is_stage_unlocked("c"));
        assert!(!tracker.is_stage_completed("a"));
        // no prerequisites declared
        assert!(tracker.is_stage_unlocked("d"));
    }

    #[test]
    fn test_level_one_stage_is_always_unlocked() {
        let graph = CareerGraph::new(vec![
            CareerStage::new("gate", "Gate", 2),
            CareerStage::new("entry", "Entry", 1).with_prerequisites(&["gate"]),
        ])
        .unwrap();
        let tracker = ProgressTracker::open(Arc::new(graph), Arc::new(InMemoryStore::new()));

        assert!(tracker.is_stage_unlocked("entry"));
    }

    #[test]
    fn test_complete_stage_is_idempotent() {
        let (mut tracker, _) = tracker();
        assert!(tracker.complete_stage("1"));
        assert!(!tracker.complete_stage("1"));
        assert!(tracker.is_stage_completed("1"));
    }

    #[test]
    fn test_exploration_percentage() {
        let (mut tracker, _) = tracker();
        // stage 2 has 3 skills + 3 certifications
        tracker.set_skill_explored("2", "skill-0", true);
        assert_eq!(tracker.exploration_percentage("2"), 17);

        tracker.set_certification_explored("2", "cert-0", true);
        tracker.set_certification_explored("2", "cert-1", true);
        assert_eq!(tracker.exploration_percentage("2"), 50);

        for id in ["skill-1", "skill-2"] {
            tracker.set_skill_explored("2", id, true);
        }
        tracker.set_certification_explored("2", "cert-2", true);
        assert!(tracker.is_fully_explored("2"));
    }

    #[test]
    fn test_exploration_percentage_of_empty_stage() {
        let graph = CareerGraph::new(vec![CareerStage::new("empty", "Empty", 1)]).unwrap();
        let tracker = ProgressTracker::open(Arc::new(graph), Arc::new(InMemoryStore::new()));
        assert_eq!(tracker.exploration_percentage("empty"), 0);
    }

    #[test]
    fn test_stage_cursor() {
        let (mut tracker, _) = tracker();
        assert_eq!(tracker.current_stage(), 0);

        assert!(!tracker.advance());
        tracker.complete_stage("1");
        assert!(tracker.advance());
        assert_eq!(tracker.current_stage(), 1);
        assert_eq!(tracker.current_stage_def().map(|s| s.id.as_str()), Some("2"));

        assert!(!tracker.select_stage(5));
        assert!(tracker.set_current_stage(5));
        assert!(!tracker.set_current_stage(42));
        assert_eq!(tracker.current_stage(), 5);
    }

    #[test]
    fn test_listeners_fire_on_change() {
        let (mut tracker, _) = tracker();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let subscription = tracker.subscribe(move || counter.set(counter.get() + 1));

        tracker.set_skill_explored("1", "skill-0", true);
        tracker.set_skill_explored("1", "skill-0", true);
        assert_eq!(calls.get(), 1);

        tracker.unsubscribe(subscription);
        tracker.complete_stage("1");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_reset() {
        let (mut tracker, store) = tracker();
        tracker.set_skill_explored("1", "skill-0", true);
        tracker.complete_stage("1");
        tracker.set_current_stage(1);

        tracker.reset();

        assert_eq!(tracker.current_stage(), 0);
        assert!(!tracker.is_stage_completed("1"));
        assert_eq!(
            tracker.stage_progress("1").unwrap().item_state(ItemKind::Skill, "skill-0"),
            ItemState::NeverSeen
        );
        assert_eq!(store.get(PROGRESS_KEY).unwrap(), None);
        assert!(tracker.set_skill_explored("1", "skill-0", true).first_explore);
    }

    #[test]
    fn test_state_survives_reopen() {
        let (mut tracker, store) = tracker();
        tracker.set_skill_explored("1", "skill-0", true);
        tracker.set_skill_explored("1", "skill-1", true);
        tracker.set_skill_explored("1", "skill-1", false);
        tracker.complete_stage("1");
        tracker.set_current_stage(1);

        let reopened = ProgressTracker::open(Arc::new(CareerGraph::lineworker()), store);
        let progress = reopened.stage_progress("1").unwrap();
        assert_eq!(progress.item_state(ItemKind::Skill, "skill-0"), ItemState::Explored);
        assert_eq!(
            progress.item_state(ItemKind::Skill, "skill-1"),
            ItemState::PreviouslyExplored
        );
        assert!(reopened.is_stage_completed("1"));
        assert_eq!(reopened.current_stage(), 1);
    }

    #[test]
    fn test_persisted_layout() {
        let (mut tracker, store) = tracker();
        tracker.set_skill_explored("1", "skill-0", true);
        tracker.set_skill_explored("1", "skill-0", false);

        let raw = store.get(PROGRESS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["currentStage"], 0);
        let first = &value["exploration"][0];
        assert_eq!(first["key"], "1");
        assert_eq!(first["stageId"], "1");
        assert_eq!(first["exploredSkills"], serde_json::json!([]));
        assert_eq!(first["awardedSkills"], serde_json::json!(["skill-0"]));
        assert_eq!(first["completed"], false);
        assert_eq!(value["exploration"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_legacy_payload_defaults_awarded_to_explored() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set(
                PROGRESS_KEY,
                r#"{"currentStage": 2, "exploration": [
                    {"key": "1", "stageId": "1", "expandedItems": ["skill-0"], "completed": true},
                    {"key": "ghost", "stageId": "ghost", "exploredSkills": ["skill-0"]}
                ]}"#,
            )
            .unwrap();

        let mut tracker = ProgressTracker::open(Arc::new(CareerGraph::lineworker()), store);
        assert_eq!(tracker.current_stage(), 2);
        assert!(tracker.is_stage_completed("1"));
        assert!(tracker.stage_progress("ghost").is_none());

        let progress = tracker.stage_progress("1").unwrap();
        assert_eq!(progress.item_state(ItemKind::Skill, "skill-0"), ItemState::Explored);
        assert!(!tracker.set_skill_explored("1", "skill-0", false).first_explore);
        assert!(!tracker.set_skill_explored("1", "skill-0", true).first_explore);
    }

    #[test]
    fn test_malformed_payload_falls_back_to_defaults() {
        let store = Arc::new(InMemoryStore::new());
        store.set(PROGRESS_KEY, "[oops").unwrap();

        let tracker = ProgressTracker::open(Arc::new(CareerGraph::lineworker()), store);
        assert_eq!(tracker.current_stage(), 0);
        assert!(!tracker.is_stage_completed("1"));
    }

    #[test]
    fn test_item_kind_from_str() {
        assert_eq!("skill".parse::<ItemKind>(), Ok(ItemKind::Skill));
        assert_eq!("cert".parse::<ItemKind>(), Ok(ItemKind::Certification));
        assert!("badge".parse::<ItemKind>().is_err());
    }
}
