//! Doctor command - verify credentials, dataset and configuration.

use crate::cli::Output;
use crate::config::{
    GenerationProvider, RerankerProvider, RetrievalProvider, Settings, OPENAI_API_KEY_VAR,
    WEAVIATE_API_KEY_VAR, WEAVIATE_ENDPOINT_VAR,
};
use crate::dataset::load_guest_list;
use crate::rerank::model_for_name;
use crate::tokenizer::counter_for_model;
use console::style;
use std::path::PathBuf;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    Output::header("podquery doctor");
    println!();
    println!("Checking credentials, dataset and configuration...\n");

    let mut checks = Vec::new();

    let sections: [(&str, Vec<CheckResult>); 4] = [
        ("Credentials", check_credentials(settings)),
        ("Episode dataset", vec![check_dataset(settings)]),
        ("Pipeline", check_pipeline(settings)),
        ("Configuration", vec![check_config_file(config_path)]),
    ];

    for (title, results) in sections {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    }

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using podquery.",
            errors
        ));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! podquery is ready to use.");
    }

    Ok(())
}

/// Check the secrets the configured providers need.
fn check_credentials(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if settings.retrieval.provider == RetrievalProvider::Weaviate {
        results.push(match settings.retrieval.endpoint.as_deref() {
            Some(endpoint) => match url::Url::parse(endpoint) {
                Ok(_) => CheckResult::ok(WEAVIATE_ENDPOINT_VAR, endpoint),
                Err(e) => CheckResult::error(
                    WEAVIATE_ENDPOINT_VAR,
                    &format!("invalid URL: {}", e),
                    "Expected something like https://<cluster>.weaviate.network",
                ),
            },
            None => CheckResult::error(
                WEAVIATE_ENDPOINT_VAR,
                "not set",
                "Set with: export WEAVIATE_ENDPOINT='https://...'",
            ),
        });
        results.push(secret_check(
            WEAVIATE_API_KEY_VAR,
            settings.retrieval.api_key.as_deref(),
            true,
        ));
    }

    let openai_required = settings.generation.provider == GenerationProvider::OpenAI
        || settings.embedding.provider == "openai";
    results.push(secret_check(
        OPENAI_API_KEY_VAR,
        settings.generation.api_key.as_deref(),
        openai_required,
    ));

    results
}

fn secret_check(name: &str, value: Option<&str>, required: bool) -> CheckResult {
    let hint = format!("Set with: export {}='...'", name);
    match value {
        Some(key) if !key.trim().is_empty() => {
            CheckResult::ok(name, &format!("configured ({})", mask(key)))
        }
        _ if required => CheckResult::error(name, "not set", &hint),
        _ => CheckResult::warning(name, "not set", "Only needed for the openai providers"),
    }
}

/// Show only the ends of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check the episode dataset that feeds the guest list.
fn check_dataset(settings: &Settings) -> CheckResult {
    let path = settings.data_path();
    if !path.exists() {
        return CheckResult::warning(
            "Dataset",
            &format!("{} (not found)", path.display()),
            "The guest selector will be empty; set general.data_path",
        );
    }
    match load_guest_list(&path) {
        Ok(guests) => CheckResult::ok(
            "Dataset",
            &format!("{} ({} guests)", path.display(), guests.len()),
        ),
        Err(e) => CheckResult::error("Dataset", &e.to_string(), "Expected a JSON array of episodes with a guest field"),
    }
}

/// Check settings and the components that can be verified offline.
fn check_pipeline(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    results.push(match settings.validate() {
        Ok(()) => CheckResult::ok("Settings", "valid"),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix the value in your config file"),
    });

    results.push(match counter_for_model(&settings.context.tokenizer_model) {
        Ok(_) => CheckResult::ok(
            "Tokenizer",
            &format!(
                "{} ({} token budget)",
                settings.context.tokenizer_model, settings.context.token_threshold
            ),
        ),
        Err(e) => CheckResult::error("Tokenizer", &e.to_string(), "Set context.tokenizer_model to an OpenAI model name"),
    });

    results.push(match settings.reranker.provider {
        RerankerProvider::Local => match model_for_name(&settings.reranker.model) {
            Ok(_) => CheckResult::ok(
                "Reranker",
                &format!("{} (local, downloaded on first use)", settings.reranker.model),
            ),
            Err(e) => CheckResult::error(
                "Reranker",
                &e.to_string(),
                "Use a FastEmbed reranker such as BAAI/bge-reranker-base",
            ),
        },
        RerankerProvider::CrossEncoder => CheckResult::ok(
            "Reranker",
            &format!(
                "{} at {}",
                settings.reranker.model,
                settings.reranker.base_url.as_deref().unwrap_or("(no base_url)")
            ),
        ),
        RerankerProvider::Lexical => CheckResult::ok("Reranker", "lexical (BM25, offline)"),
    });

    results
}

/// Check if config file exists.
fn check_config_file(config_path: Option<&PathBuf>) -> CheckResult {
    let path = config_path.cloned().unwrap_or_else(Settings::default_config_path);
    if path.exists() {
        CheckResult::ok("Config file", &format!("{}", path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override defaults", path.display()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("sk-abcdefghijklmnop"), "sk-a...mnop");
    }

    #[test]
    fn test_missing_credentials_are_errors() {
        let settings = Settings::default();
        let results = check_credentials(&settings);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status == CheckStatus::Error));
    }

    #[test]
    fn test_openai_key_optional_for_fixed_generation() {
        let mut settings = Settings::default();
        settings.generation.provider = GenerationProvider::Fixed;
        let check = check_credentials(&settings).pop().unwrap();
        assert_eq!(check.status, CheckStatus::Warning);
    }
}
