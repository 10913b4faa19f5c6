//! Food Recommendation Query Router Core Library
//!
//! This crate maps natural-language food requests to structured
//! recommendation queries:
//! - Model-backed entity extraction with a soft timeout
//! - Rule-based extraction as the deterministic fallback
//! - The query router composing the two
//! - Session-scoped continuation for "give me another" follow-ups
//! - Dish-name normalization for search terms
//! - Preference lookup and meal-type defaulting

pub mod types;

pub mod config;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod normalize;
pub mod preferences;
pub mod router;
pub mod rules;
pub mod session;

// Re-export commonly used types at crate root
pub use types::{Action, Candidate, Entities, MealType, RouterResult, UserPreferences};

pub use config::RouterConfig;
pub use error::{ExtractionError, PreferenceError, SessionError};
pub use extractor::{EntityExtractor, ModelExtractor, ModelOutcome};
pub use normalize::{extract_core, normalize, search_term};
pub use preferences::{apply_preferences, load_preferences, PreferenceStore};
pub use router::{QueryRouter, Resolution, RulesOnly};
pub use rules::{extract_with_rules, RuleBasedExtractor, RuleExtractor};
pub use session::{Advance, CandidateList, Continuation, ContinuationState, SessionAttributes};
