//! Categorized message output.
//!
//! The import pipeline never prints directly; it hands (category, text)
//! pairs to a `MessageSink`. The shipped sink renders to the console with
//! optional color, and `--json` runs swap in a silent sink so the summary
//! document is the only thing on stdout.

use console::style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Plain,
    Heading,
    Success,
    Error,
}

pub trait MessageSink {
    fn emit(&self, kind: MessageKind, text: &str);
}

/// Console sink with the output mode fixed at construction.
pub struct ConsoleSink {
    colors: bool,
}

impl ConsoleSink {
    pub fn new(colors: bool) -> Self {
        Self { colors }
    }
}

impl MessageSink for ConsoleSink {
    fn emit(&self, kind: MessageKind, text: &str) {
        let rendered = render(kind, text, self.colors);
        match kind {
            MessageKind::Error => eprintln!("{rendered}"),
            _ => println!("{rendered}"),
        }
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl MessageSink for NullSink {
    fn emit(&self, _kind: MessageKind, _text: &str) {}
}

/// Render a message the way `ConsoleSink` prints it, minus the I/O.
///
/// Headings get a leading blank line and a dotted underline. Success is
/// green, errors are red; with `colors` off the same layout is emitted
/// unstyled.
pub fn render(kind: MessageKind, text: &str, colors: bool) -> String {
    match kind {
        MessageKind::Plain => text.to_string(),
        MessageKind::Heading => {
            let title = if colors {
                style(text).bold().force_styling(true).to_string()
            } else {
                text.to_string()
            };
            format!("\n{title}\n............................")
        }
        MessageKind::Success => {
            if colors {
                style(text).green().force_styling(true).to_string()
            } else {
                text.to_string()
            }
        }
        MessageKind::Error => {
            if colors {
                style(text).red().force_styling(true).to_string()
            } else {
                text.to_string()
            }
        }
    }
}
