use std::io::{IsTerminal, Write};

use crate::events::{StreamEvent, decode_line};

/// Output format: pretty (ANSI colors) or text (plain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Text,
}

impl OutputFormat {
    /// Pick a format: explicit flag, then `FORMAT`, then terminal detection.
    pub fn detect(explicit: Option<Self>) -> Self {
        if let Some(fmt) = explicit {
            return fmt;
        }

        match std::env::var("FORMAT").as_deref() {
            Ok("pretty") => return Self::Pretty,
            Ok("text") => return Self::Text,
            _ => {}
        }

        // A PTY wrapper can leave stdout looking like a pipe, so TERM counts too
        if std::io::stdout().is_terminal() {
            return Self::Pretty;
        }
        match std::env::var("TERM") {
            Ok(term) if !term.is_empty() && term != "dumb" => Self::Pretty,
            _ => Self::Text,
        }
    }

    pub const fn style(self) -> &'static Style {
        match self {
            Self::Pretty => &PRETTY_STYLE,
            Self::Text => &TEXT_STYLE,
        }
    }
}

/// ANSI codes for pretty output
pub struct Style {
    bold_bright: &'static str,
    dim: &'static str,
    reset: &'static str,
    green: &'static str,
    red: &'static str,
    cyan: &'static str,
    tool_arrow: &'static str,
}

const PRETTY_STYLE: Style = Style {
    bold_bright: "\x1b[1;97m",
    dim: "\x1b[2m",
    reset: "\x1b[0m",
    green: "\x1b[32m",
    red: "\x1b[31m",
    cyan: "\x1b[36m",
    tool_arrow: "\u{25b6}",
};

const TEXT_STYLE: Style = Style {
    bold_bright: "",
    dim: "",
    reset: "",
    green: "",
    red: "",
    cyan: "",
    tool_arrow: ">>>",
};

/// Turns agent output lines into a compact human-readable trace.
///
/// Every line is written and flushed before the next one is read, so the
/// trace follows the agent in real time.
pub struct Translator<W: Write> {
    out: W,
    style: &'static Style,
}

impl<W: Write> Translator<W> {
    pub const fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            style: format.style(),
        }
    }

    /// The underlying sink, for banners written between agent runs.
    pub const fn out(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Decode and render one line of agent output.
    pub fn render_line(&mut self, line: &str) -> std::io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        for event in decode_line(line) {
            self.render_event(&event)?;
        }
        self.out.flush()
    }

    pub fn render_event(&mut self, event: &StreamEvent) -> std::io::Result<()> {
        let s = self.style;
        match event {
            StreamEvent::SessionStart { model } => {
                writeln!(self.out, "{}[Session started - {model}]{}", s.dim, s.reset)
            }
            StreamEvent::AssistantText { text } => {
                if text.is_empty() {
                    return Ok(());
                }
                writeln!(self.out, "{text}")
            }
            StreamEvent::ToolInvocation { name, summary } => match summary {
                Some(summary) => writeln!(
                    self.out,
                    "\n{} {}{name}{}: {}{summary}{}",
                    s.tool_arrow, s.bold_bright, s.reset, s.dim, s.reset
                ),
                None => writeln!(
                    self.out,
                    "\n{} {}{name}{}",
                    s.tool_arrow, s.bold_bright, s.reset
                ),
            },
            StreamEvent::ToolResult { is_error } => {
                if *is_error {
                    writeln!(self.out, " {}[ERROR]{}", s.red, s.reset)
                } else {
                    writeln!(self.out, " {}[OK]{}", s.green, s.reset)
                }
            }
            StreamEvent::RunSummary {
                duration_ms,
                total_cost_usd,
            } => writeln!(
                self.out,
                "\n{}[Done: {:.1}s, ${total_cost_usd:.4}]{}",
                s.cyan,
                duration_ms / 1000.0,
                s.reset
            ),
            StreamEvent::Raw { line } => writeln!(self.out, "{line}"),
        }
    }
}
