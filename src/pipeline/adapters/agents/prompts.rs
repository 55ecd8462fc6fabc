//! Prompt templates rendered with `minijinja`.

use crate::pipeline::ports::StageContext;
use minijinja::Environment;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Characters of previous test output carried into a retry prompt.
const FAILURE_EXCERPT_CHARS: usize = 4000;

const RESEARCH_TEMPLATE: &str = "\
You are researching a change to the repository {{ repository }} (default branch {{ branch }}).
Task: {{ title }}
{% if description %}Details: {{ description }}
{% endif %}Instruction: {{ prompt }}

List the libraries, existing patterns, and pitfalls relevant to this change.
Be concise.";

const CODING_TEMPLATE: &str = "\
You are changing the repository {{ repository }}.
Task: {{ title }}
{% if description %}Details: {{ description }}
{% endif %}Instruction: {{ prompt }}
{% if research %}
Research notes:
{{ research }}
{% endif %}{% if files %}
Repository files:
{% for file in files %}- {{ file }}
{% endfor %}{% endif %}{% if failure %}
Attempt {{ attempt }}. The previous attempt failed its tests (exit code {{ failure.exit_code }}):
{{ failure.output }}
Fix the failure without discarding the intent of the task.
{% endif %}
Respond with only a JSON array of objects with the keys \"path\" (relative to the \
repository root), \"content\" (the complete new file), and \"description\".";

/// Errors raised while rendering prompts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to render {template} prompt: {reason}")]
pub struct PromptError {
    /// Template name.
    pub template: &'static str,
    /// Renderer diagnostic.
    pub reason: String,
}

/// Renders the research prompt.
///
/// # Errors
///
/// Returns [`PromptError`] when rendering fails.
pub fn research(context: &StageContext) -> Result<String, PromptError> {
    render("research", RESEARCH_TEMPLATE, base_context(context))
}

/// Renders the coding prompt, including the previous failing test output on
/// a retry.
///
/// # Errors
///
/// Returns [`PromptError`] when rendering fails.
pub fn coding(context: &StageContext) -> Result<String, PromptError> {
    let mut values = base_context(context);
    if let Some(findings) = context.research() {
        values.insert("research".to_owned(), Value::String(findings.notes.clone()));
    }
    if let Some(repository) = context.context() {
        values.insert("files".to_owned(), json!(repository.files));
    }
    if let Some(report) = context.previous_tests().filter(|report| !report.passed()) {
        values.insert(
            "failure".to_owned(),
            json!({
                "exit_code": report
                    .exit_code
                    .map_or_else(|| "none".to_owned(), |code| code.to_string()),
                "output": tail(&report.output, FAILURE_EXCERPT_CHARS),
            }),
        );
        values.insert("attempt".to_owned(), json!(context.iteration() + 1));
    }
    render("coding", CODING_TEMPLATE, values)
}

fn base_context(context: &StageContext) -> Map<String, Value> {
    let mut values = Map::new();
    let task = context.task();
    let repository = context.repository();
    values.insert(
        "repository".to_owned(),
        Value::String(repository.full_name.to_string()),
    );
    values.insert(
        "branch".to_owned(),
        Value::String(repository.default_branch.to_string()),
    );
    values.insert("title".to_owned(), Value::String(task.title().to_owned()));
    values.insert("prompt".to_owned(), Value::String(task.prompt().to_owned()));
    if let Some(description) = task.description() {
        values.insert(
            "description".to_owned(),
            Value::String(description.to_owned()),
        );
    }
    values
}

fn render(
    template_name: &'static str,
    template: &str,
    values: Map<String, Value>,
) -> Result<String, PromptError> {
    let environment = Environment::new();
    environment
        .render_str(template, values)
        .map_err(|err| PromptError {
            template: template_name,
            reason: err.to_string(),
        })
}

/// Returns at most the last `limit` characters of `text`.
fn tail(text: &str, limit: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(limit)).collect()
}
