//! Model-backed entity extraction
//!
//! Sends a fixed instruction prompt to a `Generator`, locates the first JSON
//! object in the free-form output and validates it into `Entities`. Every
//! failure is reported as `ModelOutcome::Failed`; nothing is returned as an
//! `Err` to the router.

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::ExtractionError;
use crate::llm::{GenerationOptions, Generator, ResponsesClient};
use crate::types::{Action, Entities, MealType, RouterResult};

/// Built-in prompt; `{{QUERY}}` is replaced with the utterance
const PROMPT_TEMPLATE: &str = r#"You are an entity extractor for a food recommendation voice assistant.
Classify the user's request and extract entities from it.
Output ONLY a single JSON object. No markdown. No explanation.
Omit any field that the request does not mention. Never output null values.

Actions:
- RecommendDish: the user wants a specific dish, a historical or traditional dish, or a recipe
- RecommendMeal: the user asks what to eat for breakfast, lunch or dinner, or wants a composed meal
- RecommendRestaurant: the user wants a place to eat
- Unrecognized: anything else

Fields:
- action (required): one of RecommendDish, RecommendMeal, RecommendRestaurant, Unrecognized
- dishName: the dish the user named
- cuisine: cuisine or food style, e.g. italian, vegan, fast food
- mealType: one of breakfast, lunch, dinner
- location: place the user mentioned, e.g. a neighborhood or city
- budget: true if the user wants something cheap
- quick: true if the user is in a hurry

Example:
Request: "find me a cheap italian place near downtown"
{"action": "RecommendRestaurant", "cuisine": "italian", "location": "downtown", "budget": true}

Request: "{{QUERY}}"
"#;

// ============================================================================
// Extraction capability
// ============================================================================

/// Result of one model extraction attempt
#[derive(Debug)]
pub enum ModelOutcome {
    /// The model answered with a usable object (its action may still be
    /// `Unrecognized`).
    Extracted(RouterResult),
    /// The call or the parse failed; the router falls back to rules.
    Failed(ExtractionError),
}

impl ModelOutcome {
    /// The recognized result, if any
    pub fn recognized(self) -> Option<RouterResult> {
        match self {
            ModelOutcome::Extracted(result) if result.action.is_recognized() => Some(result),
            _ => None,
        }
    }

    /// Collapse to a plain result; failures become `Unrecognized`
    pub fn into_result(self) -> RouterResult {
        match self {
            ModelOutcome::Extracted(result) => result,
            ModelOutcome::Failed(_) => RouterResult::unrecognized(),
        }
    }
}

/// Primary extraction strategy used by the router
pub trait EntityExtractor {
    fn extract(&self, query: &str) -> ModelOutcome;
}

// ============================================================================
// Model extractor
// ============================================================================

/// Extractor backed by a text-generation service
pub struct ModelExtractor<G> {
    generator: Option<Arc<G>>,
    options: GenerationOptions,
    soft_timeout: Duration,
    template: String,
}

impl<G: Generator + 'static> ModelExtractor<G> {
    pub fn new(generator: G, options: GenerationOptions, soft_timeout: Duration) -> Self {
        Self {
            generator: Some(Arc::new(generator)),
            options,
            soft_timeout,
            template: PROMPT_TEMPLATE.to_string(),
        }
    }

    /// Replace the built-in prompt template
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn build_prompt(&self, query: &str) -> String {
        build_prompt(&self.template, query)
    }

    /// Run the generator on a worker thread and stop waiting after the soft
    /// timeout. A late answer is dropped with the channel.
    fn generate_bounded(
        &self,
        generator: &Arc<G>,
        prompt: String,
    ) -> Result<String, ExtractionError> {
        let (tx, rx) = mpsc::channel();
        let generator = Arc::clone(generator);
        let options = self.options.clone();

        thread::spawn(move || {
            let _ = tx.send(generator.generate(&prompt, &options));
        });

        match rx.recv_timeout(self.soft_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(ExtractionError::Timeout(self.soft_timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ExtractionError::Request(
                "generation worker exited without a result".to_string(),
            )),
        }
    }
}

impl ModelExtractor<ResponsesClient> {
    /// Build the production extractor from `[llm]` settings.
    ///
    /// An unusable configuration still yields an extractor; it reports
    /// `NotConfigured` on every call so routing runs on rules alone.
    pub fn from_config(config: &LlmConfig) -> Self {
        let generator = match ResponsesClient::from_config(config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "model extractor disabled");
                None
            }
        };

        let template = config
            .prompt_file
            .as_deref()
            .and_then(load_prompt_template)
            .unwrap_or_else(|| PROMPT_TEMPLATE.to_string());

        Self {
            generator,
            options: GenerationOptions::from(config),
            soft_timeout: Duration::from_millis(config.timeout_ms),
            template,
        }
    }
}

impl<G: Generator + 'static> EntityExtractor for ModelExtractor<G> {
    fn extract(&self, query: &str) -> ModelOutcome {
        let generator = match self.generator {
            Some(ref g) => g,
            None => {
                return ModelOutcome::Failed(ExtractionError::NotConfigured(
                    "no generation client".to_string(),
                ))
            }
        };

        let prompt = self.build_prompt(query);
        let raw = match self.generate_bounded(generator, prompt) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "model extraction failed");
                return ModelOutcome::Failed(e);
            }
        };

        tracing::debug!(query = %query, raw = %raw, "model raw output");

        match parse_model_output(&raw) {
            Ok(result) => ModelOutcome::Extracted(result),
            Err(e) => {
                tracing::warn!(query = %query, raw = %raw, error = %e, "unparseable model output");
                ModelOutcome::Failed(e)
            }
        }
    }
}

fn load_prompt_template(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            tracing::debug!(path = %path.display(), "loaded prompt template");
            Some(content)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read prompt file, using built-in prompt"
            );
            None
        }
    }
}

pub fn build_prompt(template: &str, query: &str) -> String {
    template.replace("{{QUERY}}", query.trim())
}

// ============================================================================
// Output parsing
// ============================================================================

/// Parse raw model text into a validated result
pub fn parse_model_output(text: &str) -> Result<RouterResult, ExtractionError> {
    let json = find_json_object(text).ok_or(ExtractionError::NoJson)?;
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Object(map) => Ok(validate(&map)),
        other => Err(ExtractionError::Shape(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Locate the first balanced `{...}` span, ignoring braces inside strings
fn find_json_object(text: &str) -> Option<&str> {
    let s = text.trim();

    // Fast path: the whole output is the object
    if s.starts_with('{') && s.ends_with('}') && serde_json::from_str::<Value>(s).is_ok() {
        return Some(s);
    }

    let start = s.find('{')?;

    let mut in_str = false;
    let mut escape = false;
    let mut depth = 0usize;

    for (i, ch) in s[start..].char_indices() {
        if in_str {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }

        match ch {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Whitelist and coerce model fields into the canonical entity set
fn validate(map: &Map<String, Value>) -> RouterResult {
    let action = field(map, &["action", "intent"])
        .and_then(Value::as_str)
        .and_then(Action::parse)
        .unwrap_or(Action::Unrecognized);

    let entities = Entities {
        dish_name: string_field(map, &["dishName", "dish_name", "dish"]),
        cuisine: string_field(map, &["cuisine"]).map(|c| c.to_lowercase()),
        meal_type: field(map, &["mealType", "meal_type"])
            .and_then(Value::as_str)
            .and_then(MealType::parse),
        location: string_field(map, &["location"]),
        budget: field(map, &["budget"]).map(truthy),
        quick: field(map, &["quick"]).map(truthy),
    };

    RouterResult { action, entities }
}

/// First present, non-null value among `names`
fn field<'a>(map: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|n| map.get(*n))
        .find(|v| !v.is_null())
}

fn string_field(map: &Map<String, Value>, names: &[&str]) -> Option<String> {
    field(map, names)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            !(s.is_empty() || s == "false" || s == "0" || s == "no")
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedGenerator {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        fn ok(text: &str) -> Self {
            Self { reply: Ok(text.to_string()), prompts: Mutex::new(Vec::new()) }
        }

        fn failing(msg: &str) -> Self {
            Self { reply: Err(msg.to_string()), prompts: Mutex::new(Vec::new()) }
        }
    }

    impl Generator for CannedGenerator {
        fn generate(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, ExtractionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(ExtractionError::Request)
        }
    }

    struct SlowGenerator(Duration);

    impl Generator for SlowGenerator {
        fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, ExtractionError> {
            thread::sleep(self.0);
            Ok(r#"{"action": "RecommendDish"}"#.to_string())
        }
    }

    fn extractor<G: Generator + 'static>(g: G) -> ModelExtractor<G> {
        ModelExtractor::new(g, GenerationOptions::default(), Duration::from_secs(2))
    }

    #[test]
    fn test_prompt_embeds_query_and_actions() {
        let prompt = extractor(CannedGenerator::ok("{}")).build_prompt("  pad thai please ");
        assert!(prompt.contains("Request: \"pad thai please\""));
        for action in Action::ALL {
            assert!(prompt.contains(action.as_str()));
        }
        assert!(prompt.contains("Never output null"));
    }

    #[test]
    fn test_restaurant_scenario_is_normalized() {
        let ex = extractor(CannedGenerator::ok(
            r#"{"action": "RecommendRestaurant", "cuisine": "Italian", "location": "downtown", "budget": true}"#,
        ));
        let result = ex
            .extract("Find me a cheap Italian restaurant near downtown")
            .into_result();
        assert_eq!(result.action, Action::RecommendRestaurant);
        assert_eq!(result.entities.cuisine.as_deref(), Some("italian"));
        assert_eq!(result.entities.location.as_deref(), Some("downtown"));
        assert_eq!(result.entities.budget, Some(true));
        assert_eq!(result.entities.quick, None);
    }

    #[test]
    fn test_json_wrapped_in_commentary() {
        let raw = "Sure! Here is the result:\n```json\n{\"intent\": \"recommend_dish\", \"dishName\": \"Beef {Wellington}\"}\n```\nHope that helps.";
        let result = parse_model_output(raw).unwrap();
        assert_eq!(result.action, Action::RecommendDish);
        assert_eq!(result.entities.dish_name.as_deref(), Some("Beef {Wellington}"));
    }

    #[test]
    fn test_invalid_values_are_dropped() {
        let result = parse_model_output(
            r#"{"action": "OrderFood", "mealType": "brunch", "cuisine": "", "location": null}"#,
        )
        .unwrap();
        assert_eq!(result.action, Action::Unrecognized);
        assert!(result.entities.is_empty());
    }

    #[test]
    fn test_meal_type_lowercased_and_flags_coerced() {
        let result = parse_model_output(
            r#"{"action": "RecommendMeal", "mealType": "Dinner", "budget": "yes", "quick": 0}"#,
        )
        .unwrap();
        assert_eq!(result.action, Action::RecommendMeal);
        assert_eq!(result.entities.meal_type, Some(MealType::Dinner));
        assert_eq!(result.entities.budget, Some(true));
        assert_eq!(result.entities.quick, Some(false));
    }

    #[test]
    fn test_no_json_is_failure() {
        let ex = extractor(CannedGenerator::ok("I am not sure what you mean."));
        assert!(matches!(
            ex.extract("blah"),
            ModelOutcome::Failed(ExtractionError::NoJson)
        ));
    }

    #[test]
    fn test_malformed_json_is_failure() {
        assert!(matches!(
            parse_model_output(r#"{"action": RecommendDish}"#),
            Err(ExtractionError::Json(_))
        ));
        assert!(matches!(
            parse_model_output(r#"{"action": "RecommendDish""#),
            Err(ExtractionError::NoJson)
        ));
    }

    #[test]
    fn test_network_failure_is_failure() {
        let ex = extractor(CannedGenerator::failing("connection refused"));
        let outcome = ex.extract("tacos");
        assert!(matches!(outcome, ModelOutcome::Failed(ExtractionError::Request(_))));
        assert_eq!(outcome.into_result(), RouterResult::unrecognized());
    }

    #[test]
    fn test_soft_timeout_is_failure() {
        let ex = ModelExtractor::new(
            SlowGenerator(Duration::from_millis(500)),
            GenerationOptions::default(),
            Duration::from_millis(20),
        );
        assert!(matches!(
            ex.extract("ramen"),
            ModelOutcome::Failed(ExtractionError::Timeout(20))
        ));
    }

    #[test]
    fn test_unconfigured_extractor_fails() {
        let config = LlmConfig {
            enabled: false,
            ..Default::default()
        };
        let ex = ModelExtractor::from_config(&config);
        assert!(matches!(
            ex.extract("sushi"),
            ModelOutcome::Failed(ExtractionError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_recognized_filters_unrecognized() {
        let outcome = ModelOutcome::Extracted(RouterResult::unrecognized());
        assert!(outcome.recognized().is_none());
    }
}
