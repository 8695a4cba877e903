// src/config/model.rs

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize, Serializer};

use crate::env::Environment;
use crate::types::{Color, Format};

/// Top-level Proxfile as read from YAML.
///
/// ```yaml
/// processes:
///   redis: redis-server
///   api:
///     script: ./bin/api --port 8080
///     env: ["PORT=8080"]
///     format: json
///     fields:
///       message: msg
///       level: level
///     tags:
///       slow:
///         color: yellow
///         condition:
///           field: duration
///           value: /^[0-9]{4,}ms$/
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProxfile {
    /// Keys are the *process names*.
    #[serde(default)]
    pub processes: BTreeMap<String, RawProcessEntry>,
}

/// One entry under `processes`.
///
/// Either a bare script string or a full record. `untagged` makes serde try
/// the variants in declaration order, so the string form always wins when it
/// applies and the record form is only attempted afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawProcessEntry {
    Script(String),
    Detailed(RawProcess),
}

impl RawProcessEntry {
    pub fn into_process(self) -> RawProcess {
        match self {
            RawProcessEntry::Script(script) => RawProcess {
                script,
                ..RawProcess::default()
            },
            RawProcessEntry::Detailed(process) => process,
        }
    }
}

/// Record form of a Proxfile process.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProcess {
    #[serde(default)]
    pub script: String,

    /// `KEY=VALUE` entries layered over the global environment.
    #[serde(default)]
    pub env: Vec<String>,

    /// `"auto"`, `"json"` or `"plain"`; defaults to auto.
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub fields: RawFields,

    /// Extra tagging rules keyed by tag name.
    #[serde(default)]
    pub tags: BTreeMap<String, RawTag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFields {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTag {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub condition: RawCondition,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCondition {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: String,
}

/// A fully resolved process, ready to be handed to the supervisor.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessDefinition {
    pub name: String,
    pub script: String,
    pub env: Environment,
    pub structured_output: StructuredOutputConfig,
}

impl ProcessDefinition {
    /// Definition with an empty environment and the default output config.
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            env: Environment::new(),
            structured_output: StructuredOutputConfig::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command_line(&self) -> &str {
        &self.script
    }
}

/// How a process's output lines are decoded and tagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredOutputConfig {
    pub format: Format,
    pub message_field: String,
    pub level_field: String,
    pub tag_colors: BTreeMap<String, Color>,
    /// Evaluated first to last; the first matching rule wins.
    pub tagging_rules: Vec<TaggingRule>,
}

impl Default for StructuredOutputConfig {
    fn default() -> Self {
        let mut tag_colors = BTreeMap::new();
        tag_colors.insert("error".to_string(), Color::Red);
        tag_colors.insert("fatal".to_string(), Color::Red);

        Self {
            format: Format::Auto,
            message_field: "msg".to_string(),
            level_field: "level".to_string(),
            tag_colors,
            tagging_rules: vec![
                TaggingRule::builtin("error", "level", r"/(ERR(O|OR)?)|(WARN(ING)?)/i"),
                TaggingRule::builtin("fatal", "level", r"/FATAL?|PANIC/i"),
            ],
        }
    }
}

impl StructuredOutputConfig {
    /// Change the level field. Rules that evaluated the previous level field
    /// are retargeted to the new one.
    pub fn set_level_field(&mut self, field: impl Into<String>) {
        let field = field.into();
        for rule in self.tagging_rules.iter_mut() {
            if rule.field == self.level_field {
                rule.field = field.clone();
            }
        }
        self.level_field = field;
    }

    /// Add a tagging rule.
    ///
    /// A rule whose tag already exists replaces the existing rule in place,
    /// keeping its position. The color entry is only touched when `color` is
    /// given.
    pub fn apply_rule(&mut self, rule: TaggingRule, color: Option<Color>) {
        if let Some(color) = color {
            self.tag_colors.insert(rule.tag.clone(), color);
        }

        match self.tagging_rules.iter_mut().find(|r| r.tag == rule.tag) {
            Some(existing) => *existing = rule,
            None => self.tagging_rules.push(rule),
        }
    }

    pub fn color_for(&self, tag: &str) -> Option<Color> {
        self.tag_colors.get(tag).copied()
    }
}

/// Assigns `tag` when `value` matches the value of `field`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggingRule {
    pub tag: String,
    pub field: String,
    pub value: ValuePattern,
}

impl TaggingRule {
    pub fn new(
        tag: impl Into<String>,
        field: impl Into<String>,
        value: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            tag: tag.into(),
            field: field.into(),
            value: ValuePattern::parse(value)?,
        })
    }

    fn builtin(tag: &str, field: &str, value: &str) -> Self {
        Self {
            tag: tag.to_string(),
            field: field.to_string(),
            value: ValuePattern::parse(value).expect("built-in tagging rule is a valid regex"),
        }
    }
}

/// A compiled value pattern.
///
/// Patterns wrapped in slashes may carry trailing flags, e.g. `/warn/i`.
/// Supported flags: `i` (case-insensitive), `m` (multi-line), `s` (dot matches
/// newline), `x` (ignore whitespace). Anything else is taken as a plain regex.
#[derive(Debug, Clone)]
pub struct ValuePattern {
    source: String,
    regex: Regex,
}

impl ValuePattern {
    pub fn parse(source: &str) -> Result<Self, regex::Error> {
        let (body, flags) = split_delimited(source).unwrap_or((source, ""));

        let regex = RegexBuilder::new(body)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(flags.contains('x'))
            .build()?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for ValuePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for ValuePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Split `/body/flags` into its parts. Returns `None` when the source is not
/// slash-delimited or the flags contain something other than `imsx`.
fn split_delimited(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let (body, flags) = (&rest[..end], &rest[end + 1..]);
    if flags.chars().all(|c| matches!(c, 'i' | 'm' | 's' | 'x')) {
        Some((body, flags))
    } else {
        None
    }
}
