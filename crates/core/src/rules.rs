//! Rule-based entity extraction
//!
//! Keyword and pattern matching over the lower-cased utterance. No I/O, no
//! state: the same input always produces the same result, and every input
//! (including the empty string) produces a structurally valid one.
//!
//! Keyword scans are first-match-wins in list order. The order of
//! `MEAL_SYNONYMS` and `CUISINE_KEYWORDS` is observable behavior.

use regex::Regex;
use std::sync::LazyLock;

use crate::normalize::STOP_WORDS;
use crate::types::{Action, Entities, MealType, RouterResult};

/// Meal-time synonyms, scanned in order; "brunch" must precede "lunch"
pub const MEAL_SYNONYMS: &[(&str, MealType)] = &[
    ("breakfast", MealType::Breakfast),
    ("brunch", MealType::Breakfast),
    ("morning", MealType::Breakfast),
    ("lunch", MealType::Lunch),
    ("midday", MealType::Lunch),
    ("noon", MealType::Lunch),
    ("dinner", MealType::Dinner),
    ("supper", MealType::Dinner),
    ("evening", MealType::Dinner),
    ("night", MealType::Dinner),
];

/// Cuisine and food-style keywords, scanned in order
pub const CUISINE_KEYWORDS: &[&str] = &[
    "italian",
    "mexican",
    "chinese",
    "japanese",
    "indian",
    "thai",
    "french",
    "greek",
    "spanish",
    "korean",
    "vietnamese",
    "mediterranean",
    "middle eastern",
    "american",
    "caribbean",
    "ethiopian",
    "turkish",
    "lebanese",
    "german",
    "british",
    "vegetarian",
    "vegan",
    "gluten free",
    "seafood",
    "fast food",
    "pizza",
    "sushi",
    "burger",
    "bbq",
    "barbecue",
    "steakhouse",
];

const RESTAURANT_KEYWORDS: &[&str] = &[
    "restaurant",
    "restaurants",
    "place to eat",
    "places to eat",
    "where can i eat",
    "where should i eat",
    "where to eat",
    "somewhere to eat",
    "eat out",
    "dine out",
    "dining out",
    "takeout",
    "take out",
    "delivery",
    "cafe",
    "diner",
    "bistro",
    "near me",
];

const MEAL_KEYWORDS: &[&str] = &[
    "meal",
    "meals",
    "menu",
    "what should i have for",
    "what should i eat for",
    "what to eat for",
    "what's for",
    "what is for",
    "something for",
];

const DISH_KEYWORDS: &[&str] = &[
    "dish",
    "dishes",
    "recipe",
    "recipes",
    "cook",
    "make",
    "food",
    "eat",
    "try",
    "historical",
    "history",
    "ancient",
    "traditional",
    "classic",
];

/// Location captures that refer to the user rather than a place
const NOT_PLACES: &[&str] = &["me", "here", "home", "my place", "my house"];

/// Utterances of at most this many words default to a dish request
const SHORT_QUERY_WORDS: usize = 5;

static LOCATION_PREP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|near|around|at|close to|by)\s+").expect("Invalid regex")
});

static BUDGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:cheap|cheaper|affordable|inexpensive|budget|low[- ]cost",
        r"|not expensive|on a budget)\b",
    ))
    .expect("Invalid regex")
});

static QUICK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:quick|quickly|fast|in a hurry|hurry|asap|rushed",
        r"|short on time|no time|under \d+ minutes)\b",
    ))
    .expect("Invalid regex")
});

static DISH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:(?:can|could|would) you\s+)?(?:please\s+)?",
        r"(?:",
        r"(?:recommend|suggest|find|give|show|tell)(?:\s+me)?(?:\s+about)?",
        r"|what(?:'s| is)",
        r"|what should i (?:have|eat|cook|make)(?:\s+for)?",
        r"|i (?:want|would like|'d like)(?:\s+to (?:eat|try|cook|make))?",
        r"|i'd like(?:\s+to (?:eat|try|cook|make))?",
        r"|how (?:do i|to) (?:make|cook)",
        r")",
        r"(?:\s+(?:a|an|some|the))?\s+(.+?)[\s?.!]*$",
    ))
    .expect("Invalid regex")
});

// ============================================================================
// Extraction
// ============================================================================

/// Extract action and entities from an utterance using rules only
pub fn extract_with_rules(query: &str) -> RouterResult {
    let original = query.trim();
    let t = original.to_lowercase();

    let meal_type = extract_meal_type(&t);
    let cuisine = extract_cuisine(&t).map(str::to_string);
    let location = extract_location(original);
    let budget = BUDGET_RE.is_match(&t).then_some(true);
    let quick = QUICK_RE.is_match(&t.replace("fast food", "")).then_some(true);

    let action = classify(&t, meal_type);

    let dish_name = if action == Action::RecommendDish {
        extract_dish_name(original)
    } else {
        None
    };

    RouterResult {
        action,
        entities: Entities {
            dish_name,
            cuisine,
            meal_type,
            location,
            budget,
            quick,
        },
    }
}

/// First meal-time synonym contained in `t`
pub fn extract_meal_type(t: &str) -> Option<MealType> {
    MEAL_SYNONYMS
        .iter()
        .find(|(word, _)| t.contains(word))
        .map(|(_, meal)| *meal)
}

/// First cuisine keyword contained in `t`
pub fn extract_cuisine(t: &str) -> Option<&'static str> {
    CUISINE_KEYWORDS.iter().copied().find(|kw| t.contains(kw))
}

/// Place named after a location preposition. Each preposition opens a span
/// that runs to the next one; the last span that names a place wins, so
/// "near me in Boston" gives "Boston".
fn extract_location(original: &str) -> Option<String> {
    let preps: Vec<_> = LOCATION_PREP_RE.find_iter(original).collect();
    preps.iter().enumerate().rev().find_map(|(i, m)| {
        let end = preps.get(i + 1).map_or(original.len(), |next| next.start());
        place_name(&original[m.end()..end])
    })
}

fn place_name(span: &str) -> Option<String> {
    let location = span
        .trim()
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '?' | '.' | '!' | ','));
    if location.is_empty() {
        return None;
    }

    // "at night", "in the morning" and "in a hurry" are not places
    let lower = location.to_lowercase();
    let bare = lower.strip_prefix("the ").unwrap_or(&lower);
    if MEAL_SYNONYMS.iter().any(|(word, _)| bare == *word)
        || NOT_PLACES.contains(&bare)
        || QUICK_RE.is_match(&lower)
        || BUDGET_RE.is_match(&lower)
    {
        return None;
    }

    Some(location.to_string())
}

/// Restaurant, then meal, then dish; the first group to match decides
fn classify(t: &str, meal_type: Option<MealType>) -> Action {
    if t.is_empty() {
        return Action::Unrecognized;
    }

    if contains_any(t, RESTAURANT_KEYWORDS) {
        return Action::RecommendRestaurant;
    }

    if meal_type.is_some() || contains_any(t, MEAL_KEYWORDS) {
        return Action::RecommendMeal;
    }

    let words = t
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count();
    if contains_any(t, DISH_KEYWORDS) || (words > 0 && words <= SHORT_QUERY_WORDS) {
        return Action::RecommendDish;
    }

    Action::Unrecognized
}

/// Best-effort dish name: strip a leading request phrase and trailing
/// punctuation, and reject bare meal-time or cuisine words.
fn extract_dish_name(original: &str) -> Option<String> {
    let candidate = match DISH_NAME_RE.captures(original).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim().to_string(),
        None => original
            .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '?' | '.' | '!'))
            .to_string(),
    };

    if candidate.is_empty() {
        return None;
    }

    let lower = candidate.to_lowercase();
    if MEAL_SYNONYMS.iter().any(|(word, _)| lower == *word)
        || CUISINE_KEYWORDS.contains(&lower.as_str())
        || is_generic(&lower)
    {
        return None;
    }

    Some(candidate)
}

/// "dish", "a recipe", "some food": nothing a search could use
fn is_generic(lower: &str) -> bool {
    lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .all(|w| DISH_KEYWORDS.contains(&w) || STOP_WORDS.contains(&w))
}

/// Whole-word (or whole-phrase) containment
fn contains_any(t: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| contains_phrase(t, p))
}

fn contains_phrase(t: &str, phrase: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '\'';
    t.match_indices(phrase).any(|(idx, _)| {
        let before = t[..idx].chars().next_back();
        let after = t[idx + phrase.len()..].chars().next();
        !before.map_or(false, is_word) && !after.map_or(false, is_word)
    })
}

/// `RuleExtractor` implementation over `extract_with_rules`
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedExtractor;

/// Deterministic fallback strategy used by the router
pub trait RuleExtractor {
    fn extract_with_rules(&self, query: &str) -> RouterResult;
}

impl RuleExtractor for RuleBasedExtractor {
    fn extract_with_rules(&self, query: &str) -> RouterResult {
        extract_with_rules(query)
    }
}

// ============================================================================
// Tests
// ============================================================================
