//! Terminal capabilities and output styling

use std::sync::LazyLock;

use owo_colors::{OwoColorize, colors::css};

/// Columns below which output is stacked rather than laid out on one line.
const NARROW_COLUMNS: u16 = 80;

static COLOR: LazyLock<bool> =
    LazyLock::new(|| supports_color::on(supports_color::Stream::Stdout).is_some());

/// Detects terminal width, returning `None` if not available
fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(width, _)| width.0)
}

/// Whether the terminal is too narrow for single-line summaries
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|width| width < NARROW_COLUMNS)
}

#[derive(Clone, Copy)]
enum Style {
    Success,
    Warning,
    Info,
    Dim,
}

fn paint(text: &str, style: Style) -> String {
    if !*COLOR {
        return text.to_string();
    }
    match style {
        Style::Success => text.fg::<css::Green>().to_string(),
        Style::Warning => text.fg::<css::OrangeRed>().to_string(),
        Style::Info => text.fg::<css::LightBlue>().to_string(),
        Style::Dim => text.dimmed().to_string(),
    }
}

/// Extension trait for styling output, a no-op when stdout has no color
pub trait Colorize {
    /// Green, for completed work
    fn success(&self) -> String;
    /// Red-orange, for files that failed
    fn warning(&self) -> String;
    /// Blue, for detected values
    fn info(&self) -> String;
    /// Dimmed, for detail
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), Style::Success)
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), Style::Warning)
    }

    fn info(&self) -> String {
        paint(self.as_ref(), Style::Info)
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), Style::Dim)
    }
}
