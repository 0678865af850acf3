//! `{{name}}` placeholder scanning, interactive filling, and substitution.
//!
//! Placeholders look like `{{ name }}` or `{{ name description="Shown when
//! asking" }}`. Substitution is a single literal pass: values are never
//! re-scanned, and names without a value stay in the text untouched.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use heyi_shared::{HeyiError, Result};

/// Placeholder name → value.
pub type VariableMap = HashMap<String, String>;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)(?:\s+description\s*=\s*"([^"]*)")?\s*\}\}"#)
        .expect("valid regex")
});

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// A placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub description: Option<String>,
}

impl Placeholder {
    /// Text shown when asking the user for this value.
    pub fn question(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }
}

/// The interactive channel used to ask for missing values.
#[allow(async_fn_in_trait)]
pub trait Prompter {
    /// Ask one question and return the answer, which may be empty.
    async fn ask(&mut self, question: &str) -> Result<String>;
}

/// Every distinct placeholder in order of first appearance. The first
/// occurrence's description wins.
pub fn extract_placeholders(template: &str) -> Vec<Placeholder> {
    let mut found: Vec<Placeholder> = Vec::new();

    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let name = &caps[1];
        if found.iter().any(|p| p.name == name) {
            continue;
        }
        found.push(Placeholder {
            name: name.to_string(),
            description: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }

    found
}

/// Placeholders in `template` that have no entry in `vars`.
pub fn find_missing(template: &str, vars: &VariableMap) -> Vec<Placeholder> {
    extract_placeholders(template)
        .into_iter()
        .filter(|p| !vars.contains_key(&p.name))
        .collect()
}

/// Ask for each missing placeholder in turn and record the answers.
///
/// One question at a time: each answer is stored before the next question is
/// asked. Existing entries are never overwritten.
pub async fn resolve_missing<P: Prompter>(
    missing: &[Placeholder],
    prompter: &mut P,
    vars: &mut VariableMap,
) -> Result<()> {
    for placeholder in missing {
        if vars.contains_key(&placeholder.name) {
            continue;
        }
        let answer = prompter.ask(placeholder.question()).await?;
        debug!(name = %placeholder.name, "variable supplied interactively");
        vars.insert(placeholder.name.clone(), answer);
    }
    Ok(())
}

/// Replace every known placeholder with its value.
pub fn substitute(template: &str, vars: &VariableMap) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Parse a `key=value` assignment. The value may be empty or contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        HeyiError::validation(format!("invalid variable '{raw}': expected key=value"))
    })?;

    let key = key.trim();
    if !IDENT_RE.is_match(key) {
        return Err(HeyiError::validation(format!(
            "invalid variable name '{key}': use letters, digits and underscores, not starting with a digit"
        )));
    }

    Ok((key.to_string(), value.to_string()))
}
