//! Query Router
//!
//! Tries the model-backed extractor first and falls back to the rule engine
//! when the model fails or does not recognize the utterance. The rule result
//! is used unconditionally, so routing itself never fails.

use serde::Serialize;

use crate::config::LlmConfig;
use crate::extractor::{EntityExtractor, ModelExtractor, ModelOutcome};
use crate::llm::ResponsesClient;
use crate::rules::{RuleBasedExtractor, RuleExtractor};
use crate::types::RouterResult;

/// Which strategy produced a routed result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Model,
    Rules,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Model => "model",
            Resolution::Rules => "rules",
        }
    }
}

/// Routes utterances through injected extraction strategies
pub struct QueryRouter<M, R = RuleBasedExtractor> {
    model: M,
    rules: R,
}

impl<M: EntityExtractor, R: RuleExtractor> QueryRouter<M, R> {
    pub fn new(model: M, rules: R) -> Self {
        Self { model, rules }
    }

    /// Route an utterance to an action and its entities
    pub fn route(&self, query: &str) -> RouterResult {
        self.route_with_resolution(query).0
    }

    /// Route an utterance and report which strategy resolved it.
    ///
    /// Emits exactly one outcome log per call.
    pub fn route_with_resolution(&self, query: &str) -> (RouterResult, Resolution) {
        let fallback_reason = match self.model.extract(query) {
            ModelOutcome::Extracted(result) if result.action.is_recognized() => {
                tracing::info!(
                    query = %query,
                    action = result.action.as_str(),
                    source = Resolution::Model.as_str(),
                    "resolved via model"
                );
                return (result, Resolution::Model);
            }
            ModelOutcome::Extracted(_) => "model returned Unrecognized".to_string(),
            ModelOutcome::Failed(e) => e.to_string(),
        };

        let result = self.rules.extract_with_rules(query);
        tracing::info!(
            query = %query,
            action = result.action.as_str(),
            source = Resolution::Rules.as_str(),
            fallback_reason = %fallback_reason,
            "resolved via rules"
        );
        (result, Resolution::Rules)
    }
}

impl QueryRouter<ModelExtractor<ResponsesClient>, RuleBasedExtractor> {
    /// Production router: HTTP generation client plus the built-in rules
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(ModelExtractor::from_config(config), RuleBasedExtractor)
    }
}

/// Model strategy that always fails; routes on rules alone
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesOnly;

impl EntityExtractor for RulesOnly {
    fn extract(&self, _query: &str) -> ModelOutcome {
        ModelOutcome::Failed(crate::error::ExtractionError::NotConfigured(
            "model extraction disabled".to_string(),
        ))
    }
}

impl QueryRouter<RulesOnly, RuleBasedExtractor> {
    pub fn rules_only() -> Self {
        Self::new(RulesOnly, RuleBasedExtractor)
    }
}
