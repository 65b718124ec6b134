//! Prompt templates for podquery.
//!
//! Prompts can be customized by placing a `qa.toml` file in the custom prompts directory.

use crate::rag::prompt::{PromptTemplate, CONTEXT_SLOTS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub qa: QaPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for question answering over transcript excerpts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaPrompts {
    /// System message sent alongside every prompt.
    pub system: String,
    /// User message; `{{question}}` and `{{context}}` are filled per request.
    pub user: String,
    /// One context entry; `{{index}}`, `{{title}}`, `{{guest}}` and `{{content}}` are filled per hit.
    pub item: String,
    /// Placed between rendered context entries.
    pub separator: String,
}

impl Default for QaPrompts {
    fn default() -> Self {
        Self {
            system: "Answer this question based on the podcast material. \
                     If the excerpts do not contain the answer, say so."
                .to_string(),

            user: r#"Below is a series of excerpts from {{show_name}} podcast transcripts. Each excerpt lists the episode title and the guest who was speaking.

{{context}}

Using only the excerpts above, answer the following question. Cite episode titles where it helps the reader.

Question: {{question}}
Answer:"#
                .to_string(),

            item: "---\n[{{index}}] {{title}} (guest: {{guest}})\n{{content}}\n---".to_string(),

            separator: "\n\n".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("show_name".to_string(), "Impact Theory".to_string());

        if let Some(vars) = custom_variables {
            prompts.variables.extend(vars.clone());
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let qa_path = custom_path.join("qa.toml");
            if qa_path.exists() {
                let content = std::fs::read_to_string(&qa_path)?;
                prompts.qa = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a template with the custom config variables, leaving per-request slots intact.
    pub fn render_with_custom(&self, template: &str) -> String {
        let vars: HashMap<String, String> = self
            .variables
            .iter()
            .filter(|(key, _)| !CONTEXT_SLOTS.contains(&key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::render(template, &vars)
    }

    /// Build the question-answering template with custom variables applied.
    pub fn qa_template(&self) -> PromptTemplate {
        PromptTemplate::new(
            self.render_with_custom(&self.qa.user),
            self.render_with_custom(&self.qa.item),
            self.qa.separator.clone(),
        )
    }

    /// The system message with custom variables applied.
    pub fn qa_system(&self) -> String {
        self.render_with_custom(&self.qa.system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.qa.system.is_empty());
        assert!(prompts.qa.user.contains("{{question}}"));
        assert!(prompts.qa.user.contains("{{context}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_custom_variables_skip_request_slots() {
        let mut vars = HashMap::new();
        vars.insert("show_name".to_string(), "Deep Questions".to_string());
        vars.insert("question".to_string(), "hijacked".to_string());

        let prompts = Prompts::load(None, Some(&vars)).unwrap();
        let template = prompts.qa_template();

        assert!(template.user().contains("Deep Questions"));
        assert!(template.user().contains("{{question}}"));
    }

    #[test]
    fn test_load_custom_qa_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("qa.toml"),
            "system = \"Be brief.\"\nuser = \"Q: {{question}}\\n{{context}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.qa.system, "Be brief.");
        assert_eq!(prompts.qa.user, "Q: {{question}}\n{{context}}");
        // Unspecified fields keep their defaults.
        assert!(prompts.qa.item.contains("{{content}}"));
    }
}
