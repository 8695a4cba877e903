// src/output/multiplexer.rs

//! Shared console output for all processes of a run.
//!
//! [`Output::next`] hands every process its own [`OutputWriter`]. Writers
//! classify lines on their own (classification is pure) and only take the
//! console lock to write one fully rendered line.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use owo_colors::OwoColorize;

use crate::config::{ProcessDefinition, StructuredOutputConfig};
use crate::output::classify::classify;
use crate::types::Color;

/// Prefix colors handed out in `next()` order. Red is left out so tagged
/// error lines stand out.
const PALETTE: [Color; 10] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Blue,
    Color::BrightCyan,
    Color::BrightYellow,
    Color::BrightGreen,
    Color::BrightMagenta,
    Color::BrightBlue,
];

const SEPARATOR: &str = "│";

struct Console {
    stream: Mutex<Box<dyn Write + Send>>,
    colors: bool,
    assigned: AtomicUsize,
}

/// The console all process output is multiplexed onto.
#[derive(Clone)]
pub struct Output {
    console: Arc<Console>,
}

impl Output {
    pub fn new(stream: impl Write + Send + 'static, colors: bool) -> Self {
        Self {
            console: Arc::new(Console {
                stream: Mutex::new(Box::new(stream)),
                colors,
                assigned: AtomicUsize::new(0),
            }),
        }
    }

    pub fn stdout(colors: bool) -> Self {
        Self::new(io::stdout(), colors)
    }

    pub fn colors_enabled(&self) -> bool {
        self.console.colors
    }

    /// Allocate the writer for one process.
    ///
    /// `padding` is the prefix width shared by every process of the run.
    pub fn next(&self, process: &ProcessDefinition, padding: usize) -> OutputWriter {
        let idx = self.console.assigned.fetch_add(1, Ordering::Relaxed);

        OutputWriter {
            name: process.name.clone(),
            padding,
            prefix_color: PALETTE[idx % PALETTE.len()],
            config: Arc::new(process.structured_output.clone()),
            console: Arc::clone(&self.console),
        }
    }
}

/// Width of the prefix column: the longest process name of the batch.
pub fn padding_width(processes: &[ProcessDefinition]) -> usize {
    processes
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0)
}

/// Line sink for a single process.
#[derive(Clone)]
pub struct OutputWriter {
    name: String,
    padding: usize,
    prefix_color: Color,
    config: Arc<StructuredOutputConfig>,
    console: Arc<Console>,
}

impl OutputWriter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classify a raw line without writing it.
    pub fn classify_line(&self, line: &str) -> ClassifiedLine {
        let classification = classify(line, &self.config);

        ClassifiedLine {
            prefix: format!("{:<width$}", self.name, width = self.padding),
            prefix_color: classification.color.unwrap_or(self.prefix_color),
            tag: classification.tag,
            color: classification.color,
            text: classification.message,
        }
    }

    /// Classify `line` and write it to the console as one unit.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let rendered = self.classify_line(line).render(self.console.colors);

        let mut stream = self
            .console
            .stream
            .lock()
            .map_err(|_| io::Error::other("console stream lock poisoned"))?;
        writeln!(stream, "{rendered}")?;
        stream.flush()
    }
}

/// One prefixed, classified unit of process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    /// Process name padded to the run's prefix width, without color codes.
    pub prefix: String,
    pub prefix_color: Color,
    pub tag: Option<String>,
    /// Color resolved from `tag`; also applied to `text`.
    pub color: Option<Color>,
    pub text: String,
}

impl ClassifiedLine {
    pub fn render(&self, colors: bool) -> String {
        if !colors {
            return format!("{} {SEPARATOR} {}", self.prefix, self.text);
        }

        let prefix = self.prefix.color(self.prefix_color.ansi());
        match self.color {
            Some(color) => format!("{prefix} {SEPARATOR} {}", self.text.color(color.ansi())),
            None => format!("{prefix} {SEPARATOR} {}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn procs(names: &[&str]) -> Vec<ProcessDefinition> {
        names
            .iter()
            .map(|n| ProcessDefinition::new(*n, "true"))
            .collect()
    }

    #[test]
    fn padding_is_longest_name() {
        let pp = procs(&["db", "web-server", "worker"]);
        assert_eq!(padding_width(&pp), "web-server".len());
        assert_eq!(padding_width(&[]), 0);
    }

    #[test]
    fn every_prefix_has_the_padding_width() {
        let pp = procs(&["db", "web-server", "worker"]);
        let width = padding_width(&pp);
        let output = Output::new(Buffer::default(), false);

        for p in &pp {
            let line = output.next(p, width).classify_line("hello");
            assert_eq!(line.prefix.len(), width);
            assert!(line.prefix.starts_with(&p.name));
        }
    }

    #[test]
    fn plain_rendering_has_no_escape_codes() {
        let buf = Buffer::default();
        let output = Output::new(buf.clone(), false);
        let writer = output.next(&ProcessDefinition::new("db", "true"), 6);

        writer.write_line(r#"{"level":"error","msg":"boom"}"#).unwrap();

        assert_eq!(buf.contents(), "db     │ boom\n");
    }

    #[test]
    fn tag_color_overrides_prefix_color() {
        let output = Output::new(Buffer::default(), true);
        let writer = output.next(&ProcessDefinition::new("db", "true"), 2);

        let tagged = writer.classify_line("FATAL: disk gone");
        assert_eq!(tagged.prefix_color, Color::Red);
        assert!(tagged.render(true).contains("\u{1b}["));

        let untagged = writer.classify_line("all good");
        assert_eq!(untagged.prefix_color, PALETTE[0]);
        assert_eq!(untagged.color, None);
    }

    #[test]
    fn prefix_colors_cycle_in_allocation_order() {
        let output = Output::new(Buffer::default(), true);
        let a = output.next(&ProcessDefinition::new("a", "true"), 1);
        let b = output.next(&ProcessDefinition::new("b", "true"), 1);

        assert_eq!(a.classify_line("x").prefix_color, PALETTE[0]);
        assert_eq!(b.classify_line("x").prefix_color, PALETTE[1]);
    }
}
