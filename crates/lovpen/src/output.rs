//! Colored terminal output.

use std::io::Write;

use console::{Style, Term};

#[derive(Clone, Copy)]
enum Tone {
    Plain,
    Good,
    Warn,
    Bad,
}

/// Status and diagnostics go to stderr; documents and listings go to stdout.
pub(crate) struct Output {
    status: Term,
    out: Term,
    dim: Style,
    heading: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            status: Term::stderr(),
            out: Term::stdout(),
            dim: Style::new().dim(),
            heading: Style::new().cyan().bold(),
        }
    }

    fn say(&self, tone: Tone, msg: &str) {
        let style = match tone {
            Tone::Plain => Style::new(),
            Tone::Good => Style::new().green(),
            Tone::Warn => Style::new().yellow(),
            Tone::Bad => Style::new().red().bold(),
        };
        // A closed stderr leaves nowhere to report to.
        let _ = self.status.write_line(&style.apply_to(msg).to_string());
    }

    pub(crate) fn info(&self, msg: &str) {
        self.say(Tone::Plain, msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.say(Tone::Good, msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.say(Tone::Warn, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.say(Tone::Bad, msg);
    }

    /// Section heading on stdout.
    pub(crate) fn heading(&self, msg: &str) {
        let _ = self
            .out
            .write_line(&self.heading.apply_to(msg).to_string());
    }

    /// A `name  detail` row on stdout, with the detail dimmed.
    pub(crate) fn row(&self, name: &str, detail: &str) {
        let _ = self
            .out
            .write_line(&format!("  {name:<20} {}", self.dim.apply_to(detail)));
    }

    /// Raw document text on stdout.
    pub(crate) fn document(&self, text: &str) -> std::io::Result<()> {
        let mut out = &self.out;
        out.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}
