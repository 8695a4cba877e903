use std::fmt;
use std::str::FromStr;

use owo_colors::AnsiColors;
use serde::{Serialize, Serializer};

/// How a process writes its output.
///
/// - `Auto`: decode lines that look like a JSON object, treat the rest as
///   plain text (default).
/// - `Json`: the process is expected to write one JSON object per line.
/// - `Plain`: never attempt to decode; rules match against the whole line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Auto,
    Json,
    Plain,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(Format::Auto),
            "json" => Ok(Format::Json),
            "plain" | "text" => Ok(Format::Plain),
            other => Err(format!(
                "invalid format: {other} (expected \"auto\", \"json\" or \"plain\")"
            )),
        }
    }
}

/// Terminal color a tag or prefix can be rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
            Color::Magenta => "magenta",
            Color::Cyan => "cyan",
            Color::White => "white",
            Color::BrightBlack => "bright-black",
            Color::BrightRed => "bright-red",
            Color::BrightGreen => "bright-green",
            Color::BrightYellow => "bright-yellow",
            Color::BrightBlue => "bright-blue",
            Color::BrightMagenta => "bright-magenta",
            Color::BrightCyan => "bright-cyan",
            Color::BrightWhite => "bright-white",
        }
    }

    pub fn ansi(self) -> AnsiColors {
        match self {
            Color::Black => AnsiColors::Black,
            Color::Red => AnsiColors::Red,
            Color::Green => AnsiColors::Green,
            Color::Yellow => AnsiColors::Yellow,
            Color::Blue => AnsiColors::Blue,
            Color::Magenta => AnsiColors::Magenta,
            Color::Cyan => AnsiColors::Cyan,
            Color::White => AnsiColors::White,
            Color::BrightBlack => AnsiColors::BrightBlack,
            Color::BrightRed => AnsiColors::BrightRed,
            Color::BrightGreen => AnsiColors::BrightGreen,
            Color::BrightYellow => AnsiColors::BrightYellow,
            Color::BrightBlue => AnsiColors::BrightBlue,
            Color::BrightMagenta => AnsiColors::BrightMagenta,
            Color::BrightCyan => AnsiColors::BrightCyan,
            Color::BrightWhite => AnsiColors::BrightWhite,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        let color = match normalized.as_str() {
            "black" => Color::Black,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "magenta" => Color::Magenta,
            "cyan" => Color::Cyan,
            "white" => Color::White,
            "bright-black" | "gray" | "grey" => Color::BrightBlack,
            "bright-red" => Color::BrightRed,
            "bright-green" => Color::BrightGreen,
            "bright-yellow" => Color::BrightYellow,
            "bright-blue" => Color::BrightBlue,
            "bright-magenta" => Color::BrightMagenta,
            "bright-cyan" => Color::BrightCyan,
            "bright-white" => Color::BrightWhite,
            other => return Err(format!("unknown color: {other}")),
        };
        Ok(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_names_are_case_and_separator_insensitive() {
        assert_eq!("RED".parse::<Color>(), Ok(Color::Red));
        assert_eq!("bright_blue".parse::<Color>(), Ok(Color::BrightBlue));
        assert_eq!("Bright-Cyan".parse::<Color>(), Ok(Color::BrightCyan));
        assert!("octarine".parse::<Color>().is_err());
    }

    #[test]
    fn format_parses_known_values() {
        assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
        assert_eq!("".parse::<Format>(), Ok(Format::Auto));
        assert!("xml".parse::<Format>().is_err());
    }
}
