use proptest::prelude::*;

use prox::config::StructuredOutputConfig;
use prox::output::classify;
use prox::types::Format;
use prox_test_utils::builders::ProcessBuilder;

fn plain_line() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 :=._-]{0,40}"
}

fn config_for(format: Format) -> StructuredOutputConfig {
    ProcessBuilder::new("p", "p").format(format).build().structured_output
}

proptest! {
    #[test]
    fn test_classification_is_deterministic(line in plain_line()) {
        let cfg = StructuredOutputConfig::default();
        prop_assert_eq!(classify(&line, &cfg), classify(&line, &cfg));
    }

    #[test]
    fn test_plain_lines_are_displayed_unchanged(line in plain_line()) {
        for format in [Format::Auto, Format::Json, Format::Plain] {
            let c = classify(&line, &config_for(format));
            prop_assert_eq!(&c.message, &line);
        }
    }

    #[test]
    fn test_color_always_follows_the_tag(line in plain_line()) {
        let cfg = StructuredOutputConfig::default();
        let c = classify(&line, &cfg);
        match c.tag.as_deref() {
            Some(tag) => prop_assert_eq!(c.color, cfg.color_for(tag)),
            None => prop_assert_eq!(c.color, None),
        }
    }

    #[test]
    fn test_json_message_field_is_extracted(
        msg in "[a-zA-Z0-9 ]{0,30}",
        level in prop::sample::select(vec!["debug", "info", "warn", "error", "fatal"]),
    ) {
        let line = serde_json::json!({ "level": level, "msg": msg }).to_string();
        let c = classify(&line, &config_for(Format::Json));

        prop_assert_eq!(&c.message, &msg);
        let expected = match level {
            "warn" | "error" => Some("error"),
            "fatal" => Some("fatal"),
            _ => None,
        };
        prop_assert_eq!(c.tag.as_deref(), expected);
    }

    #[test]
    fn test_first_matching_rule_wins(line in "[a-z]{1,20}") {
        let cfg = ProcessBuilder::new("p", "p")
            .format(Format::Plain)
            .without_rules()
            .rule("first", "level", ".", None)
            .rule("second", "level", ".*", None)
            .build()
            .structured_output;

        let c = classify(&line, &cfg);
        prop_assert_eq!(c.tag.as_deref(), Some("first"));
    }
}
