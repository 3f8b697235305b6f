//! Course and user profile stores.
//!
//! Small peripheral records read by the certificate and the HUD. Partial
//! payloads merge over the defaults when loaded.

use crate::storage::{self, SharedStore, COURSE_KEY, USER_KEY};
use serde::{Deserialize, Serialize};

// ============================================================
// COURSE
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseInfo {
    pub course_id: String,
    pub course_name: String,
    pub career_path: String,
}

impl Default for CourseInfo {
    fn default() -> Self {
        Self {
            course_id: "electrical-lineworker".to_string(),
            course_name: "Electrical Lineworker Mastery".to_string(),
            career_path: "Electrical Lineworker".to_string(),
        }
    }
}

/// Fields left `None` keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseUpdate {
    pub course_id: Option<String>,
    pub course_name: Option<String>,
    pub career_path: Option<String>,
}

pub struct CourseStore {
    state: CourseInfo,
    store: SharedStore,
}

impl CourseStore {
    pub fn open(store: SharedStore) -> Self {
        let state = storage::load_json(store.as_ref(), COURSE_KEY).unwrap_or_default();
        Self { state, store }
    }

    pub fn course(&self) -> &CourseInfo {
        &self.state
    }

    pub fn update(&mut self, update: CourseUpdate) {
        if let Some(course_id) = update.course_id {
            self.state.course_id = course_id;
        }
        if let Some(course_name) = update.course_name {
            self.state.course_name = course_name;
        }
        if let Some(career_path) = update.career_path {
            self.state.career_path = career_path;
        }
        storage::save_json(self.store.as_ref(), COURSE_KEY, &self.state);
    }

    pub fn reset(&mut self) {
        self.state = CourseInfo::default();
        storage::clear_key(self.store.as_ref(), COURSE_KEY);
    }
}

// ============================================================
// USER PROFILE
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub full_name: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            full_name: "Career Explorer".to_string(),
        }
    }
}

pub struct ProfileStore {
    state: UserProfile,
    store: SharedStore,
}

impl ProfileStore {
    pub fn open(store: SharedStore) -> Self {
        let state = storage::load_json(store.as_ref(), USER_KEY).unwrap_or_default();
        Self { state, store }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.state
    }

    pub fn set_full_name(&mut self, full_name: &str) {
        self.state.full_name = full_name.trim().to_string();
        storage::save_json(self.store.as_ref(), USER_KEY, &self.state);
    }

    pub fn reset(&mut self) {
        self.state = UserProfile::default();
        storage::clear_key(self.store.as_ref(), USER_KEY);
    }
}
