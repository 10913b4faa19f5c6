//! User preference lookup and entity defaulting
//!
//! The router treats preferences as a read-only source. Store failures never
//! reach routing: `load_preferences` logs them and substitutes an empty
//! default.

use chrono::NaiveTime;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::PreferenceError;
use crate::types::{Action, MealType, RouterResult, UserPreferences};

/// Persistence for per-user preferences
pub trait PreferenceStore {
    fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPreferences>, PreferenceError>;

    fn save_preferences(&self, prefs: &UserPreferences) -> Result<(), PreferenceError>;
}

/// Preferences for `user_id`, or an empty record if absent or unreadable
pub fn load_preferences(store: &dyn PreferenceStore, user_id: &str) -> UserPreferences {
    match store.get_preferences(user_id) {
        Ok(Some(prefs)) => prefs,
        Ok(None) => UserPreferences::empty(user_id),
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "preference lookup failed, using defaults"
            );
            UserPreferences::empty(user_id)
        }
    }
}

/// Fill a missing meal type on meal requests: the user's preferred meal
/// type first, then the time of day. Other results are returned unchanged.
pub fn apply_preferences(
    mut result: RouterResult,
    prefs: &UserPreferences,
    now: NaiveTime,
) -> RouterResult {
    if result.action != Action::RecommendMeal || result.entities.meal_type.is_some() {
        return result;
    }

    let meal = prefs
        .preferred_meal_type
        .unwrap_or_else(|| MealType::for_time(now));
    tracing::debug!(meal_type = meal.as_str(), "defaulted meal type");
    result.entities.meal_type = Some(meal);
    result
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    entries: RwLock<HashMap<String, UserPreferences>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPreferences>, PreferenceError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| PreferenceError::Unavailable("lock poisoned".to_string()))?;
        Ok(entries.get(user_id).cloned())
    }

    fn save_preferences(&self, prefs: &UserPreferences) -> Result<(), PreferenceError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| PreferenceError::Unavailable("lock poisoned".to_string()))?;
        entries.insert(prefs.user_id.clone(), prefs.clone());
        Ok(())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// All users' preferences in one JSON object keyed by user id
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, UserPreferences>, PreferenceError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPreferences>, PreferenceError> {
        Ok(self.read_all()?.remove(user_id))
    }

    fn save_preferences(&self, prefs: &UserPreferences) -> Result<(), PreferenceError> {
        let mut all = self.read_all()?;
        all.insert(prefs.user_id.clone(), prefs.clone());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&all)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entities;

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get_preferences(
            &self,
            _user_id: &str,
        ) -> Result<Option<UserPreferences>, PreferenceError> {
            Err(PreferenceError::Unavailable("database down".to_string()))
        }

        fn save_preferences(&self, _prefs: &UserPreferences) -> Result<(), PreferenceError> {
            Err(PreferenceError::Unavailable("database down".to_string()))
        }
    }

    fn meal_without_type() -> RouterResult {
        RouterResult::new(Action::RecommendMeal, Entities::default())
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_store_error_becomes_empty_default() {
        let prefs = load_preferences(&BrokenStore, "user-1");
        assert_eq!(prefs, UserPreferences::empty("user-1"));
    }

    #[test]
    fn test_missing_user_is_empty_default() {
        let store = InMemoryPreferenceStore::new();
        assert_eq!(load_preferences(&store, "nobody"), UserPreferences::empty("nobody"));
    }

    #[test]
    fn test_preferred_meal_type_fills_missing() {
        let prefs = UserPreferences {
            preferred_meal_type: Some(MealType::Dinner),
            ..UserPreferences::empty("u")
        };
        let result = apply_preferences(meal_without_type(), &prefs, noon());
        assert_eq!(result.entities.meal_type, Some(MealType::Dinner));
    }

    #[test]
    fn test_time_of_day_when_no_preference() {
        let result = apply_preferences(meal_without_type(), &UserPreferences::empty("u"), noon());
        assert_eq!(result.entities.meal_type, Some(MealType::Lunch));
    }

    #[test]
    fn test_explicit_meal_type_and_other_actions_untouched() {
        let prefs = UserPreferences {
            preferred_meal_type: Some(MealType::Dinner),
            ..UserPreferences::empty("u")
        };

        let mut explicit = meal_without_type();
        explicit.entities.meal_type = Some(MealType::Breakfast);
        assert_eq!(apply_preferences(explicit.clone(), &prefs, noon()), explicit);

        let dish = RouterResult::new(Action::RecommendDish, Entities::default());
        assert_eq!(apply_preferences(dish.clone(), &prefs, noon()), dish);
    }

    #[test]
    fn test_in_memory_roundtrip() {
        let store = InMemoryPreferenceStore::new();
        let prefs = UserPreferences {
            favorite_dish: Some("Moussaka".to_string()),
            ..UserPreferences::empty("u")
        };
        store.save_preferences(&prefs).unwrap();
        assert_eq!(store.get_preferences("u").unwrap(), Some(prefs));
    }

    #[test]
    fn test_json_file_store() {
        let path = std::env::temp_dir()
            .join("meal_router_prefs_test")
            .join("preferences.json");
        fs::remove_file(&path).ok();

        let store = JsonFilePreferenceStore::new(&path);
        assert_eq!(store.get_preferences("alice").unwrap(), None);

        let alice = UserPreferences {
            favorite_restaurant: Some("Nopa".to_string()),
            preferred_meal_type: Some(MealType::Lunch),
            ..UserPreferences::empty("alice")
        };
        store.save_preferences(&alice).unwrap();
        store.save_preferences(&UserPreferences::empty("bob")).unwrap();

        assert_eq!(store.get_preferences("alice").unwrap(), Some(alice));
        assert!(store.get_preferences("bob").unwrap().is_some());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_json_file_store_corrupt_file_is_error() {
        let path = std::env::temp_dir().join("meal_router_prefs_corrupt.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFilePreferenceStore::new(&path);
        assert!(matches!(store.get_preferences("x"), Err(PreferenceError::Json(_))));
        assert_eq!(load_preferences(&store, "x"), UserPreferences::empty("x"));

        fs::remove_file(&path).ok();
    }
}
