// src/config/validate.rs

//! Turn raw process-file models into validated [`ProcessDefinition`]s.

use crate::config::model::{ProcessDefinition, RawProcess, RawProxfile, TaggingRule};
use crate::config::procfile::ProcfileEntry;
use crate::env::Environment;
use crate::errors::{ProxError, Result};
use crate::types::{Color, Format};

/// Resolve every Proxfile process against the global environment.
pub fn processes_from_proxfile(
    raw: RawProxfile,
    env: &Environment,
) -> Result<Vec<ProcessDefinition>> {
    ensure_not_empty(raw.processes.len())?;

    raw.processes
        .into_iter()
        .map(|(name, entry)| build_process(&name, entry.into_process(), env))
        .collect()
}

/// Procfile processes only carry a script; they get the default output
/// configuration and the global environment.
pub fn processes_from_procfile(
    entries: Vec<ProcfileEntry>,
    env: &Environment,
) -> Result<Vec<ProcessDefinition>> {
    ensure_not_empty(entries.len())?;

    entries
        .into_iter()
        .map(|entry| {
            let raw = RawProcess {
                script: entry.script,
                ..RawProcess::default()
            };
            build_process(&entry.name, raw, env)
        })
        .collect()
}

fn ensure_not_empty(count: usize) -> Result<()> {
    if count == 0 {
        return Err(ProxError::ProcessFile(
            "process file must define at least one process".to_string(),
        ));
    }
    Ok(())
}

fn build_process(name: &str, raw: RawProcess, env: &Environment) -> Result<ProcessDefinition> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProxError::ProcessFile(
            "process names must not be empty".to_string(),
        ));
    }

    let script = raw.script.trim();
    if script.is_empty() {
        return Err(ProxError::ProcessFile(format!(
            "process '{name}' has no script"
        )));
    }

    let mut process_env = env.clone();
    process_env.set_all(&raw.env);

    let mut process = ProcessDefinition::new(name, script);
    process.env = process_env;

    let output = &mut process.structured_output;

    if let Some(format) = raw.format.as_deref() {
        output.format = format
            .parse::<Format>()
            .map_err(|e| ProxError::ProcessFile(format!("process '{name}': {e}")))?;
    }

    if let Some(message) = non_empty(raw.fields.message.as_deref()) {
        output.message_field = message.to_string();
    }

    if let Some(level) = non_empty(raw.fields.level.as_deref()) {
        output.set_level_field(level);
    }

    for (tag, def) in raw.tags {
        let color = match non_empty(def.color.as_deref()) {
            Some(c) => Some(c.parse::<Color>().map_err(|e| {
                ProxError::ProcessFile(format!("process '{name}', tag '{tag}': {e}"))
            })?),
            None => None,
        };

        // A missing condition field means "the level field".
        let field = match non_empty(Some(def.condition.field.as_str())) {
            Some(f) => f.to_string(),
            None => output.level_field.clone(),
        };

        // An empty pattern would match every line.
        if def.condition.value.trim().is_empty() {
            return Err(ProxError::ProcessFile(format!(
                "process '{name}', tag '{tag}': condition value must not be empty"
            )));
        }

        let rule = TaggingRule::new(tag.as_str(), field, &def.condition.value).map_err(|e| {
            ProxError::ProcessFile(format!(
                "process '{name}', tag '{tag}': invalid value pattern: {e}"
            ))
        })?;

        output.apply_rule(rule, color);
    }

    Ok(process)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawCondition, RawProcessEntry, RawTag};

    fn proxfile(entries: Vec<(&str, RawProcessEntry)>) -> RawProxfile {
        RawProxfile {
            processes: entries
                .into_iter()
                .map(|(n, e)| (n.to_string(), e))
                .collect(),
        }
    }

    #[test]
    fn empty_proxfile_is_rejected() {
        let err = processes_from_proxfile(RawProxfile::default(), &Environment::new()).unwrap_err();
        assert!(matches!(err, ProxError::ProcessFile(_)));
    }

    #[test]
    fn process_env_overlays_global_env() {
        let mut global = Environment::new();
        global.set("PORT", "1");
        global.set("HOME", "/root");

        let raw = RawProcess {
            script: "serve".into(),
            env: vec!["PORT=8080".into()],
            ..RawProcess::default()
        };
        let procs =
            processes_from_proxfile(proxfile(vec![("api", RawProcessEntry::Detailed(raw))]), &global)
                .unwrap();

        assert_eq!(procs[0].env.get("PORT"), Some("8080"));
        assert_eq!(procs[0].env.get("HOME"), Some("/root"));
        assert_eq!(global.get("PORT"), Some("1"));
    }

    #[test]
    fn invalid_color_names_the_process_and_tag() {
        let mut raw = RawProcess {
            script: "serve".into(),
            ..RawProcess::default()
        };
        raw.tags.insert(
            "slow".into(),
            RawTag {
                color: Some("octarine".into()),
                condition: RawCondition {
                    field: "duration".into(),
                    value: "ms$".into(),
                },
            },
        );

        let err = processes_from_proxfile(
            proxfile(vec![("api", RawProcessEntry::Detailed(raw))]),
            &Environment::new(),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'api'") && msg.contains("'slow'"), "{msg}");
    }

    #[test]
    fn tag_without_field_uses_level_field() {
        let mut raw = RawProcess {
            script: "serve".into(),
            ..RawProcess::default()
        };
        raw.fields.level = Some("severity".into());
        raw.tags.insert(
            "debug".into(),
            RawTag {
                color: None,
                condition: RawCondition {
                    field: String::new(),
                    value: "/debug/i".into(),
                },
            },
        );

        let procs = processes_from_proxfile(
            proxfile(vec![("api", RawProcessEntry::Detailed(raw))]),
            &Environment::new(),
        )
        .unwrap();
        let rules = &procs[0].structured_output.tagging_rules;
        assert!(rules.iter().all(|r| r.field == "severity"));
        assert_eq!(procs[0].structured_output.color_for("debug"), None);
    }

    #[test]
    fn tag_without_value_is_rejected() {
        let mut raw = RawProcess {
            script: "serve".into(),
            ..RawProcess::default()
        };
        raw.tags.insert(
            "info".into(),
            RawTag {
                color: Some("blue".into()),
                condition: RawCondition::default(),
            },
        );

        let err = processes_from_proxfile(
            proxfile(vec![("api", RawProcessEntry::Detailed(raw))]),
            &Environment::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ProxError::ProcessFile(_)));
        let msg = err.to_string();
        assert!(msg.contains("'api'") && msg.contains("'info'"), "{msg}");
    }
}
