//! The INF patcher.
//!
//! Patching is a single pass over the lines of the descriptor, followed by
//! appending the generated registry sections. Each line is checked against
//! three rules, in order; the first rule that applies decides the output for
//! that line:
//!
//! 1. `ExtensionId` lines in `[Version]` are replaced with the configured ID.
//! 2. Hardware ID lines matching a configured device are expanded into one
//!    line per subsystem ID.
//! 3. Blank lines in install sections are preceded by one `AddReg` line per
//!    registry function.
//!
//! Lines no rule applies to are copied unchanged.
//!
//! Patching is not idempotent. Patching an already patched file expands the
//! hardware IDs again and adds a second copy of the registry sections.

use crate::domain::{ConfigNode, hardware_id, section::Section};

/// Result of patching a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    /// The rewritten descriptor text.
    pub text: String,
    /// What the patcher changed.
    pub stats: PatchStats,
}

/// Counts of the changes made by a patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// `ExtensionId` lines replaced.
    pub extension_ids: usize,
    /// Hardware ID lines matched by a configured device.
    pub hardware_ids: usize,
    /// Lines produced by hardware ID expansion.
    pub expanded_lines: usize,
    /// `AddReg` lines inserted into install sections.
    pub add_reg_lines: usize,
    /// Registry sections appended.
    pub registry_sections: usize,
}

/// What to emit for a single input line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    /// Emit a new `ExtensionId` directive instead of the input line.
    ExtensionId(String),
    /// Emit the expanded hardware ID lines instead of the input line.
    Expand(Vec<String>),
    /// Emit these `AddReg` lines, then the input line.
    AddReg(Vec<String>),
    /// Emit the input line.
    Keep,
}

/// Scanner state carried from one line to the next.
struct Scan<'a> {
    config: &'a ConfigNode,
    section: Section,
    output: Vec<String>,
    stats: PatchStats,
}

impl<'a> Scan<'a> {
    fn new(config: &'a ConfigNode) -> Self {
        Self {
            config,
            section: Section::default(),
            output: Vec::new(),
            stats: PatchStats::default(),
        }
    }

    fn step(mut self, line: &str) -> Self {
        self.section = self.section.transition(line);

        match action(&self.section, line, self.config) {
            Action::ExtensionId(directive) => {
                self.stats.extension_ids += 1;
                self.output.push(directive);
            }
            Action::Expand(lines) => {
                self.stats.hardware_ids += 1;
                self.stats.expanded_lines += lines.len();
                self.output.extend(lines);
            }
            Action::AddReg(lines) => {
                self.stats.add_reg_lines += lines.len();
                self.output.extend(lines);
                self.output.push(line.to_string());
            }
            Action::Keep => self.output.push(line.to_string()),
        }

        self
    }

    fn finish(mut self) -> Patched {
        let functions = self.config.register_functions();
        self.stats.registry_sections = functions.len();
        self.output.extend(functions.render_tail());

        Patched {
            text: self.output.join("\n"),
            stats: self.stats,
        }
    }
}

/// Decides what to emit for `line`, given the section it belongs to.
fn action(section: &Section, line: &str, config: &ConfigNode) -> Action {
    if section.is_version() && line.contains("ExtensionId") {
        if let Some(id) = config.extension_id() {
            return Action::ExtensionId(format!("ExtensionId = {{{id}}}"));
        }
    }

    if let Some(lines) = hardware_id::expand(line, config.dev_ids(), config.subsys_ids()) {
        return Action::Expand(lines);
    }

    let functions = config.register_functions();
    if section.is_install() && line.trim().is_empty() && !functions.is_empty() {
        return Action::AddReg(
            functions
                .names()
                .map(|name| format!("AddReg = {name}"))
                .collect(),
        );
    }

    Action::Keep
}

/// Patches descriptor text with a component's configuration.
///
/// Lines are split on `\r\n`, a lone `\r` or `\n`, and on the other Unicode
/// line boundaries, then rejoined with `\n`.
#[must_use]
pub fn patch(text: &str, config: &ConfigNode) -> Patched {
    split_lines(text)
        .into_iter()
        .fold(Scan::new(config), Scan::step)
        .finish()
}

const fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0b}'
            | '\u{0c}'
            | '\u{1c}'..='\u{1e}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Splits text into lines. A final terminator does not start an empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..index]);
        start = index + c.len_utf8();
        if c == '\r' && chars.next_if(|&(_, next)| next == '\n').is_some() {
            start += 1;
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}
