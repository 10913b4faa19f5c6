//! Dish-name normalization
//!
//! Turns noisy free-text dish names into search-API-friendly terms:
//! "a yummy chicken curry recipe" -> "Yummy Chicken Curry".
//! All functions are total; when cleanup would leave nothing, the input is
//! returned unchanged.

use regex::Regex;
use std::sync::LazyLock;

/// Generic words that never help a dish search
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "some", "any", "of", "for", "with", "to", "in", "on", "at", "and", "or",
    "me", "my", "please", "recipe", "recipes", "dish", "dishes", "meal", "meals", "food",
    "breakfast", "brunch", "lunch", "dinner", "supper",
];

static LEADING_REQUEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:(?:can|could|would) you\s+)?(?:please\s+)?",
        r"(?:",
        r"(?:recommend|suggest|find|show|give|tell|get)(?:\s+me)?(?:\s+about)?",
        r"|search for|look up",
        r"|i (?:want|would like|'d like)(?:\s+to (?:eat|try|cook|make))?",
        r"|i'd like(?:\s+to (?:eat|try|cook|make))?",
        r"|what(?:'s| is)",
        r"|how (?:do i|to) (?:make|cook)",
        r")\s+",
    ))
    .expect("Invalid regex")
});

static TRAILING_FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:\s+(?:please|thanks|thank you|for me|for tonight",
        r"|if you can|if possible|right now))*[\s?.!,]*$",
    ))
    .expect("Invalid regex")
});

/// Clean a dish name into a title-cased search term
pub fn normalize(name: &str) -> String {
    clean(name).unwrap_or_else(|| name.to_string())
}

/// Normalized form, or `None` when nothing survives cleanup
fn clean(name: &str) -> Option<String> {
    let lower = name.to_lowercase();

    let kept: Vec<&str> = lower.split_whitespace().filter(|t| keep_token(t)).collect();
    let joined = kept.join(" ");

    let stripped: String = joined
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    let words: Vec<String> = stripped.split_whitespace().map(title_case).collect();
    if words.is_empty() {
        return None;
    }
    Some(words.join(" "))
}

/// Strip request phrasing and trailing filler, then normalize
pub fn extract_core(query: &str) -> String {
    let lower = query.trim().to_lowercase();
    let without_lead = LEADING_REQUEST_RE.replace(&lower, "");
    let core = TRAILING_FILLER_RE.replace(&without_lead, "");

    clean(&core).unwrap_or_else(|| normalize(query))
}

/// Preferred search term for an utterance fragment
pub fn search_term(query: &str) -> String {
    let core = extract_core(query);
    if core.trim().is_empty() {
        normalize(query)
    } else {
        core
    }
}

fn keep_token(token: &str) -> bool {
    // Purely numeric or punctuation
    if !token.chars().any(char::is_alphabetic) {
        return false;
    }
    let bare = token.trim_matches(|c: char| !c.is_alphanumeric());
    !STOP_WORDS.contains(&bare)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_stop_words_and_title_cases() {
        assert_eq!(normalize("a yummy chicken curry recipe"), "Yummy Chicken Curry");
    }

    #[test]
    fn test_normalize_strips_numbers_and_punctuation() {
        assert_eq!(normalize("Shepherd's pie, 2 servings!"), "Shepherds Pie Servings");
        assert_eq!(normalize("stir-fry noodles 100%"), "Stir-fry Noodles");
    }

    #[test]
    fn test_normalize_meal_words_are_stop_words() {
        assert_eq!(normalize("pancakes for breakfast"), "Pancakes");
    }

    #[test]
    fn test_normalize_returns_input_when_emptied() {
        assert_eq!(normalize("the recipe"), "the recipe");
        assert_eq!(normalize("42"), "42");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_extract_core_strips_request_and_filler() {
        assert_eq!(
            extract_core("Can you recommend a chicken curry recipe please?"),
            "Chicken Curry"
        );
        assert_eq!(extract_core("how do I make beef stroganoff"), "Beef Stroganoff");
        assert_eq!(extract_core("Tell me about paella, thanks!"), "Paella");
    }

    #[test]
    fn test_extract_core_without_request_phrase() {
        assert_eq!(extract_core("ramen"), "Ramen");
    }

    #[test]
    fn test_extract_core_is_total() {
        assert_eq!(extract_core("please?"), "please?");
        assert_eq!(extract_core(""), "");
    }

    #[test]
    fn test_search_term_prefers_core() {
        assert_eq!(search_term("what's a good lasagna recipe"), "Good Lasagna");
        assert_eq!(search_term("lasagna"), normalize("lasagna"));
    }
}
