//! Food Recommendation Router CLI
//!
//! A thin wrapper around meal-router-core for routing utterances by hand.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;

use meal_router_core::preferences::JsonFilePreferenceStore;
use meal_router_core::{
    apply_preferences, load_preferences, search_term, Action, QueryRouter, Resolution,
    RouterConfig, RouterResult,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "meal-router")]
#[command(about = "Route food recommendation requests to actions and entities")]
struct Args {
    /// User request in natural language
    utterance: String,

    /// Skip the model extractor and use rules only
    #[arg(long = "rules-only")]
    rules_only: bool,

    /// Path to a router config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// User id for preference defaulting
    #[arg(long)]
    user: Option<String>,

    /// Also print the normalized dish search term
    #[arg(long)]
    normalize: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn route(args: &Args, config: &RouterConfig) -> (RouterResult, Resolution) {
    if args.rules_only {
        QueryRouter::rules_only().route_with_resolution(&args.utterance)
    } else {
        QueryRouter::from_config(&config.llm).route_with_resolution(&args.utterance)
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    let config = RouterConfig::load(args.config.as_deref())?;

    let (mut result, resolution) = route(&args, &config);

    if let Some(ref user_id) = args.user {
        let store = JsonFilePreferenceStore::new(config.preferences.resolved_path());
        let prefs = load_preferences(&store, user_id);
        result = apply_preferences(result, &prefs, Local::now().time());
    }

    // Unrecognized is a valid result; the caller re-prompts once
    if result.action == Action::Unrecognized {
        let response = serde_json::json!({
            "type": "need_info",
            "question": "Would you like a dish, a meal idea, or a restaurant recommendation?"
        });
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    // stdout carries only JSON
    eprintln!("Resolved via: {}", resolution.as_str());
    let output = render(&args, &result)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// JSON printed for a recognized result, with `searchTerm` when requested
fn render(args: &Args, result: &RouterResult) -> Result<serde_json::Value> {
    let mut output = serde_json::to_value(result)?;

    if args.normalize {
        let source = result
            .entities
            .dish_name
            .as_deref()
            .unwrap_or(&args.utterance);
        if let Some(object) = output.as_object_mut() {
            object.insert("searchTerm".to_string(), search_term(source).into());
        }
    }

    Ok(output)
}

// ============================================================================
// Tests
// ============================================================================
