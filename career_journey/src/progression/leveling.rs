//! Leveling Engine
//!
//! Pure functions turning cumulative XP into a level and scaling rewards by
//! the level held before an award. All curve math is done in integers; the
//! results equal the floored decimal formulas
//! `floor(1000 * L * (1 + 0.3 * L))` and `floor(base * (1 + (L - 1) * 0.15))`.

use serde::{Deserialize, Serialize};

/// XP per level unit of the threshold curve
pub const LEVEL_CURVE: u64 = 1000;

pub const MAX_LEVEL: u32 = 4;

pub const PHASE_BASE_XP: u64 = 500;
pub const CERTIFICATION_BASE_XP: u64 = 200;
pub const SKILL_BASE_XP: u64 = 100;

/// Derived view of a learner's position on the curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub level: u32,
    /// Cumulative XP at which the current level starts
    #[serde(rename = "currentLevelXP")]
    pub current_level_xp: u64,
    /// Cumulative XP needed for the next level (equals the floor at max level)
    #[serde(rename = "nextLevelXP")]
    pub next_level_xp: u64,
    /// 0-100
    pub progress_percent: f64,
    pub is_max_level: bool,
}

/// Minimum cumulative XP to be at `level + 1`
pub fn level_threshold(level: u32) -> u64 {
    let level = u64::from(level);
    LEVEL_CURVE * level * (10 + 3 * level) / 10
}

/// Level for a cumulative XP total, clamped to `MAX_LEVEL`
pub fn calculate_level(xp: u64) -> u32 {
    let mut level = 1;
    while level < MAX_LEVEL && xp >= level_threshold(level) {
        level += 1;
    }
    level
}

/// Scale a base reward by the level held before it is applied
pub fn scaled_xp(base_xp: u64, level: u32) -> u64 {
    let bonus_steps = u64::from(level.saturating_sub(1));
    base_xp * (100 + 15 * bonus_steps) / 100
}

pub fn progress_percent(xp: u64, level: u32) -> f64 {
    if level >= MAX_LEVEL {
        return 100.0;
    }
    let floor = level_threshold(level.saturating_sub(1));
    let ceiling = level_threshold(level);
    if ceiling <= floor {
        return 0.0;
    }
    let into_level = xp.saturating_sub(floor) as f64;
    into_level / (ceiling - floor) as f64 * 100.0
}

pub fn level_stats(total_xp: u64) -> LevelStats {
    let level = calculate_level(total_xp).min(MAX_LEVEL);
    let is_max_level = level == MAX_LEVEL;
    let current_level_xp = level_threshold(level - 1);
    let next_level_xp = if is_max_level {
        current_level_xp
    } else {
        level_threshold(level)
    };

    LevelStats {
        total_xp,
        level,
        current_level_xp,
        next_level_xp,
        progress_percent: progress_percent(total_xp, level),
        is_max_level,
    }
}
