//! Achievement Ledger
//!
//! The permanent, deduplicated record of earned achievements plus the
//! running XP total. Every award is persisted immediately; subscribers are
//! notified only when the caller flushes, once per batch of awards.

use super::leveling::{
    self, LevelStats, CERTIFICATION_BASE_XP, MAX_LEVEL, PHASE_BASE_XP, SKILL_BASE_XP,
};
use super::notify::{Listeners, Subscription};
use crate::storage::{self, SharedStore, ACHIEVEMENTS_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================
// ACHIEVEMENT TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementKind {
    Phase,
    Certification,
    Skill,
}

impl AchievementKind {
    pub fn base_xp(self) -> u64 {
        match self {
            AchievementKind::Phase => PHASE_BASE_XP,
            AchievementKind::Certification => CERTIFICATION_BASE_XP,
            AchievementKind::Skill => SKILL_BASE_XP,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AchievementKind::Phase => "phase",
            AchievementKind::Certification => "certification",
            AchievementKind::Skill => "skill",
        }
    }
}

/// A ledger entry, unique by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub earned_count: u32,
    /// Origin label recorded on first registration
    #[serde(default)]
    pub first_earned_from: Option<String>,
    /// XP granted by the first registration (display value)
    pub xp: u64,
    #[serde(default)]
    pub first_earned_at: Option<DateTime<Utc>>,
}

/// Input for a single award
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementGrant {
    pub id: String,
    pub name: String,
    pub kind: AchievementKind,
    pub source: String,
}

impl AchievementGrant {
    pub fn new(id: &str, name: &str, kind: AchievementKind, source: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            source: source.to_string(),
        }
    }
}

/// What one award did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardOutcome {
    pub is_new: bool,
    pub xp_granted: u64,
}

/// What a batch of awards did to the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub new_count: usize,
    pub xp_granted: u64,
}

// ============================================================
// PERSISTED SNAPSHOT
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSnapshot {
    #[serde(default)]
    achievements: Vec<Achievement>,
    #[serde(default, rename = "totalXP", deserialize_with = "lenient_xp")]
    total_xp: u64,
    #[serde(default = "default_level", deserialize_with = "lenient_level")]
    previous_level: u32,
}

fn default_level() -> u32 {
    1
}

/// Non-negative numbers are truncated to whole XP; anything else reads as 0
fn lenient_xp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .or_else(|| value.as_f64().filter(|xp| xp.is_finite() && *xp >= 0.0).map(|xp| xp as u64))
        .unwrap_or(0))
}

fn lenient_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|level| u32::try_from(level).ok())
        .unwrap_or_else(default_level))
}

// ============================================================
// LEDGER
// ============================================================

type CelebrationListener = dyn FnMut(bool);

/// Newness accumulated since the last flush
#[derive(Debug, Clone, Copy)]
struct PendingNotice {
    has_new: bool,
}

pub struct AchievementLedger {
    achievements: Vec<Achievement>,
    index: HashMap<String, usize>,
    total_xp: u64,
    previous_level: u32,
    pending: Option<PendingNotice>,
    listeners: Listeners<CelebrationListener>,
    store: SharedStore,
}

impl AchievementLedger {
    /// Open the ledger, restoring any persisted state
    pub fn open(store: SharedStore) -> Self {
        let mut ledger = Self {
            achievements: Vec::new(),
            index: HashMap::new(),
            total_xp: 0,
            previous_level: 1,
            pending: None,
            listeners: Listeners::default(),
            store,
        };
        ledger.load();
        ledger
    }

    /// Register one achievement, scaled by the level held before the award.
    ///
    /// A repeat id bumps `earned_count` and still grants XP.
    pub fn add_achievement(
        &mut self,
        id: &str,
        name: &str,
        kind: AchievementKind,
        source: &str,
    ) -> AwardOutcome {
        let level = leveling::calculate_level(self.total_xp);
        let outcome = self.apply(id, name, kind, source, level);
        self.mark_pending(outcome.is_new);
        self.save();
        outcome
    }

    /// Register several achievements, all scaled by the level held at the start
    pub fn add_batch(&mut self, grants: &[AchievementGrant]) -> BatchOutcome {
        let level = leveling::calculate_level(self.total_xp);
        let mut batch = BatchOutcome::default();

        for grant in grants {
            let outcome = self.apply(&grant.id, &grant.name, grant.kind, &grant.source, level);
            if outcome.is_new {
                batch.new_count += 1;
            }
            batch.xp_granted += outcome.xp_granted;
        }

        self.mark_pending(batch.new_count > 0);
        self.save();
        batch
    }

    fn apply(
        &mut self,
        id: &str,
        name: &str,
        kind: AchievementKind,
        source: &str,
        level: u32,
    ) -> AwardOutcome {
        let xp = leveling::scaled_xp(kind.base_xp(), level);

        let is_new = match self.index.get(id) {
            Some(&i) => {
                let existing = &mut self.achievements[i];
                existing.earned_count = existing.earned_count.saturating_add(1);
                log::debug!(
                    "[LEDGER] Re-earned '{}' (x{})",
                    existing.id,
                    existing.earned_count
                );
                false
            }
            None => {
                self.index.insert(id.to_string(), self.achievements.len());
                self.achievements.push(Achievement {
                    id: id.to_string(),
                    name: name.to_string(),
                    kind,
                    earned_count: 1,
                    first_earned_from: Some(source.to_string()),
                    xp,
                    first_earned_at: Some(Utc::now()),
                });
                log::info!(
                    "[LEDGER] New {} achievement '{}' from {} (+{} XP)",
                    kind.as_str(),
                    name,
                    source,
                    xp
                );
                true
            }
        };

        self.total_xp = self.total_xp.saturating_add(xp);
        AwardOutcome {
            is_new,
            xp_granted: xp,
        }
    }

    fn mark_pending(&mut self, has_new: bool) {
        let pending = self.pending.get_or_insert(PendingNotice { has_new: false });
        pending.has_new |= has_new;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deliver the pending notification, if any.
    ///
    /// Computes level-up status once, calls every subscriber with
    /// `leveled_up || any_new_since_last_flush`, persists, and returns the
    /// delivered flag.
    pub fn flush(&mut self) -> Option<bool> {
        let pending = self.pending.take()?;
        let leveled_up = self.check_level_up();
        let celebrate = leveled_up || pending.has_new;

        if leveled_up {
            log::info!("[LEDGER] Level up! Now level {}", self.previous_level);
        }

        self.notify(celebrate);
        self.save();
        Some(celebrate)
    }

    /// Compare the current level to the last observed one, then record it
    pub fn check_level_up(&mut self) -> bool {
        let current = leveling::calculate_level(self.total_xp);
        let leveled_up = current > self.previous_level;
        self.previous_level = current;
        leveled_up
    }

    // ========================================================
    // QUERIES
    // ========================================================

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn achievement(&self, id: &str) -> Option<&Achievement> {
        self.index.get(id).map(|&i| &self.achievements[i])
    }

    /// Most recent first
    pub fn recent(&self, count: usize) -> Vec<&Achievement> {
        self.achievements.iter().rev().take(count).collect()
    }

    pub fn by_kind(&self, kind: AchievementKind) -> impl Iterator<Item = &Achievement> {
        self.achievements.iter().filter(move |a| a.kind == kind)
    }

    /// Number of unique achievements
    pub fn total_count(&self) -> usize {
        self.achievements.len()
    }

    /// Total completions, repeats included
    pub fn multiplier(&self) -> u64 {
        self.achievements
            .iter()
            .map(|a| u64::from(a.earned_count))
            .sum()
    }

    pub fn total_xp(&self) -> u64 {
        self.total_xp
    }

    pub fn previous_level(&self) -> u32 {
        self.previous_level
    }

    pub fn user_stats(&self) -> LevelStats {
        leveling::level_stats(self.total_xp)
    }

    // ========================================================
    // SUBSCRIPTIONS
    // ========================================================

    pub fn subscribe(&mut self, listener: impl FnMut(bool) + 'static) -> Subscription {
        self.listeners.add(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.remove(subscription)
    }

    fn notify(&mut self, celebrate: bool) {
        for listener in self.listeners.iter_mut() {
            listener(celebrate);
        }
    }

    /// Forget every achievement and all XP
    pub fn reset(&mut self) {
        self.achievements.clear();
        self.index.clear();
        self.total_xp = 0;
        self.previous_level = 1;
        self.pending = None;
        storage::clear_key(self.store.as_ref(), ACHIEVEMENTS_KEY);
        log::info!("[LEDGER] Ledger reset");
        self.notify(false);
    }

    // ========================================================
    // PERSISTENCE
    // ========================================================

    fn save(&self) {
        let snapshot = LedgerSnapshot {
            achievements: self.achievements.clone(),
            total_xp: self.total_xp,
            previous_level: self.previous_level,
        };
        storage::save_json(self.store.as_ref(), ACHIEVEMENTS_KEY, &snapshot);
    }

    fn load(&mut self) {
        let Some(snapshot) =
            storage::load_json::<LedgerSnapshot>(self.store.as_ref(), ACHIEVEMENTS_KEY)
        else {
            return;
        };

        self.total_xp = snapshot.total_xp;
        self.previous_level = snapshot.previous_level.clamp(1, MAX_LEVEL);

        for achievement in snapshot.achievements {
            match self.index.get(&achievement.id) {
                Some(&i) => self.achievements[i] = achievement,
                None => {
                    self.index
                        .insert(achievement.id.clone(), self.achievements.len());
                    self.achievements.push(achievement);
                }
            }
        }

        log::debug!(
            "[LEDGER] Restored {} achievements, {} XP",
            self.achievements.len(),
            self.total_xp
        );
    }
}
