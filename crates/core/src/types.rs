//! Domain models for the recommendation router
//!
//! This module contains the core types used throughout the router, including:
//! - Actions and meal types (closed enums)
//! - The sparse entity bag and the router result
//! - User preferences and candidate records

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

// ============================================================================
// Actions
// ============================================================================

/// The recommendation flow an utterance maps to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    RecommendDish,
    RecommendMeal,
    RecommendRestaurant,
    #[default]
    Unrecognized,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::RecommendDish,
        Action::RecommendMeal,
        Action::RecommendRestaurant,
        Action::Unrecognized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::RecommendDish => "RecommendDish",
            Action::RecommendMeal => "RecommendMeal",
            Action::RecommendRestaurant => "RecommendRestaurant",
            Action::Unrecognized => "Unrecognized",
        }
    }

    /// Parse an action name as emitted by a model.
    ///
    /// Accepts the canonical names case-insensitively and their snake_case
    /// spellings. Anything else is `None`; callers map that to `Unrecognized`.
    pub fn parse(s: &str) -> Option<Action> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "recommenddish" => Some(Action::RecommendDish),
            "recommendmeal" => Some(Action::RecommendMeal),
            "recommendrestaurant" => Some(Action::RecommendRestaurant),
            "unrecognized" => Some(Action::Unrecognized),
            _ => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        *self != Action::Unrecognized
    }
}

// ============================================================================
// Meal types
// ============================================================================

/// Canonical meal time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }

    /// Whitelist a raw value against the three canonical names
    pub fn parse(s: &str) -> Option<MealType> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            _ => None,
        }
    }

    /// Meal type for a local time of day
    pub fn for_time(time: NaiveTime) -> MealType {
        match time.hour() {
            0..=10 => MealType::Breakfast,
            11..=15 => MealType::Lunch,
            _ => MealType::Dinner,
        }
    }
}

// ============================================================================
// Entities and results
// ============================================================================

/// Sparse set of structured fields extracted from an utterance.
///
/// Every field that is set has already been validated: `cuisine` is
/// lower-cased, `meal_type` is canonical, string fields are non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dish_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick: Option<bool>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        *self == Entities::default()
    }
}

/// Outcome of routing one utterance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterResult {
    pub action: Action,

    #[serde(default)]
    pub entities: Entities,
}

impl RouterResult {
    pub fn new(action: Action, entities: Entities) -> Self {
        Self { action, entities }
    }

    pub fn unrecognized() -> Self {
        Self::default()
    }
}

// ============================================================================
// Preferences and candidates
// ============================================================================

/// Per-user preferences kept by the preference store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_dish: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_restaurant: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_meal_type: Option<MealType>,
}

impl UserPreferences {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

/// A single browsable recommendation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Candidate {
    Restaurant {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rating: Option<f32>,
    },
    Recipe {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default)]
        ingredients: Vec<String>,
    },
}

impl Candidate {
    pub fn title(&self) -> &str {
        match self {
            Candidate::Restaurant { name, .. } => name,
            Candidate::Recipe { title, .. } => title,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
