//! Validation System - Rule/Report Separation
//!
//! Rules inspect one entry at a time and produce structured violations.
//! The validator runs every rule over every entry; nothing is repaired.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::IconSheet;
use crate::document::StoreDocument;
use crate::entry::{Entry, ScriptView};
use crate::schema::Block;
use crate::timestamp::TimestampCodec;
use crate::ENGINE_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

/// Where in the document a violation was found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub entry: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<usize>,
}

impl Location {
    fn entry(entry: usize) -> Self {
        Self { entry, script: None, block: None }
    }

    fn block(entry: usize, script: &str, block: Option<usize>) -> Self {
        Self {
            entry,
            script: Some(script.to_string()),
            block,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub location: Location,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Version of the engine that produced this report.
    pub engine_version: String,
    pub entries_checked: usize,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }
}

/// What rules may consult besides the entry itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub codec: &'a TimestampCodec,
    pub icons: Option<&'a IconSheet>,
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn check(&self, index: usize, entry: &Entry, ctx: &ValidationContext<'_>) -> Vec<ValidationViolation>;

    fn violation(&self, severity: ViolationSeverity, location: Location, message: String) -> ValidationViolation {
        ValidationViolation {
            rule: self.name().to_string(),
            severity,
            location,
            message,
        }
    }
}

// --- Concrete Rules ---

/// Every block of every script must match the schema.
pub struct BlockSchemaRule;

impl ValidationRule for BlockSchemaRule {
    fn name(&self) -> &'static str { "block_schema" }

    fn check(&self, index: usize, entry: &Entry, _ctx: &ValidationContext<'_>) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for (name, view) in entry.scripts() {
            let ScriptView::Invalid(raw) = view else {
                continue;
            };
            let Value::Array(items) = raw else {
                violations.push(self.violation(
                    ViolationSeverity::Error,
                    Location::block(index, name, None),
                    "script is not a list of blocks".to_string(),
                ));
                continue;
            };
            for (position, item) in items.iter().enumerate() {
                if let Err(e) = Block::from_value(item.clone()) {
                    violations.push(self.violation(
                        ViolationSeverity::Error,
                        Location::block(index, name, Some(position)),
                        e.to_string(),
                    ));
                }
            }
        }
        violations
    }
}

/// `last_updated` must be present and parse with the configured zones.
pub struct LastUpdatedRule;

impl ValidationRule for LastUpdatedRule {
    fn name(&self) -> &'static str { "last_updated" }

    fn check(&self, index: usize, entry: &Entry, ctx: &ValidationContext<'_>) -> Vec<ValidationViolation> {
        let result = entry.last_updated().and_then(|text| ctx.codec.parse(text));
        match result {
            Ok(_) => vec![],
            Err(e) => vec![self.violation(ViolationSeverity::Error, Location::entry(index), e.to_string())],
        }
    }
}

/// Entries need a title to be listed.
pub struct TitleRule;

impl ValidationRule for TitleRule {
    fn name(&self) -> &'static str { "title" }

    fn check(&self, index: usize, entry: &Entry, _ctx: &ValidationContext<'_>) -> Vec<ValidationViolation> {
        let message = match entry.title() {
            Ok(title) if title.trim().is_empty() => "title is empty".to_string(),
            Ok(_) => return vec![],
            Err(e) => e.to_string(),
        };
        vec![self.violation(ViolationSeverity::Warning, Location::entry(index), message)]
    }
}

/// `icon_index` must point into the icon sheet. Skipped without a sheet.
pub struct IconIndexRule;

impl ValidationRule for IconIndexRule {
    fn name(&self) -> &'static str { "icon_index" }

    fn check(&self, index: usize, entry: &Entry, ctx: &ValidationContext<'_>) -> Vec<ValidationViolation> {
        let Some(sheet) = ctx.icons else {
            return vec![];
        };
        match entry.icon_index() {
            Ok(icon) if sheet.contains(icon) => vec![],
            Ok(icon) => vec![self.violation(
                ViolationSeverity::Error,
                Location::entry(index),
                format!("icon_index {icon} is outside the icon sheet ({} icons)", sheet.len()),
            )],
            Err(e) => vec![self.violation(ViolationSeverity::Error, Location::entry(index), e.to_string())],
        }
    }
}

/// Validator orchestrates rules over a whole document
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(BlockSchemaRule),
                Box::new(LastUpdatedRule),
                Box::new(TitleRule),
                Box::new(IconIndexRule),
            ],
        }
    }

    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn validate(&self, document: &StoreDocument, ctx: &ValidationContext<'_>) -> ValidationResult {
        let mut violations = vec![];

        for (index, entry) in document.entries().iter().enumerate() {
            for rule in &self.rules {
                violations.extend(rule.check(index, entry, ctx));
            }
        }

        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        tracing::debug!(entries = document.len(), violations = violations.len(), valid, "validated document");

        ValidationResult {
            valid,
            engine_version: ENGINE_VERSION.to_string(),
            entries_checked: document.len(),
            violations,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
