#![allow(dead_code)]

use prox::config::{ProcessDefinition, TaggingRule};
use prox::types::{Color, Format};

/// Builder for `ProcessDefinition` to simplify test setup.
pub struct ProcessBuilder {
    process: ProcessDefinition,
}

impl ProcessBuilder {
    pub fn new(name: &str, script: &str) -> Self {
        Self {
            process: ProcessDefinition::new(name, script),
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.process.env.set(key, value);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.process.structured_output.format = format;
        self
    }

    pub fn message_field(mut self, field: &str) -> Self {
        self.process.structured_output.message_field = field.to_string();
        self
    }

    pub fn level_field(mut self, field: &str) -> Self {
        self.process.structured_output.set_level_field(field);
        self
    }

    /// Add (or replace) a tagging rule. Panics on an invalid pattern.
    pub fn rule(mut self, tag: &str, field: &str, pattern: &str, color: Option<Color>) -> Self {
        let rule = TaggingRule::new(tag, field, pattern).expect("valid test pattern");
        self.process.structured_output.apply_rule(rule, color);
        self
    }

    /// Drop every rule, including the defaults.
    pub fn without_rules(mut self) -> Self {
        self.process.structured_output.tagging_rules.clear();
        self
    }

    pub fn build(self) -> ProcessDefinition {
        self.process
    }
}

/// Definitions with default config for each name; the script is the name.
pub fn processes(names: &[&str]) -> Vec<ProcessDefinition> {
    names
        .iter()
        .map(|n| ProcessBuilder::new(n, n).build())
        .collect()
}
