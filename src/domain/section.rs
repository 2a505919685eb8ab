//! Section tracking for the line scanner.
//!
//! An INF file is a sequence of `[Name]` headed sections. The scanner only
//! needs to know which section the current line belongs to, which is the
//! name of the most recent header above it.

use std::sync::LazyLock;

use regex::RegexSet;

/// Section names whose blank lines receive `AddReg` references.
///
/// Patterns are anchored at the start of the name.
pub const INSTALL_SECTION_PATTERNS: [&str; 3] = [r"^PTL_.*IG$", r"^NPU_.*_Install$", r"^PTL_IG$"];

static INSTALL_SECTIONS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(INSTALL_SECTION_PATTERNS).expect("install section patterns are valid")
});

/// The section the scanner is currently in.
///
/// The default value is the implicit section before the first header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section(String);

impl Section {
    /// Creates a section with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The section name. Empty before the first header.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns the section after `line` has been seen.
    ///
    /// A header line switches to the section it names, any other line leaves
    /// the section unchanged.
    ///
    /// ```
    /// use dua::domain::section::Section;
    ///
    /// let section = Section::default()
    ///     .transition("[Version]")
    ///     .transition("Signature = \"$WINDOWS NT$\"");
    /// assert_eq!(section.name(), "Version");
    /// ```
    #[must_use]
    pub fn transition(self, line: &str) -> Self {
        header_name(line).map_or(self, Self::new)
    }

    /// Returns `true` inside the `[Version]` section.
    #[must_use]
    pub fn is_version(&self) -> bool {
        self.0 == "Version"
    }

    /// Returns `true` if this is a device install section.
    #[must_use]
    pub fn is_install(&self) -> bool {
        INSTALL_SECTIONS.is_match(&self.0)
    }
}

/// Parses a section header line, returning the section name.
///
/// The name is the first whitespace-separated token between the brackets.
/// Surrounding whitespace on the line is ignored, and `[]` names the empty
/// section.
#[must_use]
pub fn header_name(line: &str) -> Option<&str> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.split_whitespace().next().unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_parsed() {
        assert_eq!(header_name("[Version]"), Some("Version"));
        assert_eq!(header_name("  [Strings]  "), Some("Strings"));
        assert_eq!(header_name("[ PTL_IG extra tokens ]"), Some("PTL_IG"));
        assert_eq!(header_name("[]"), Some(""));
    }

    #[test]
    fn non_headers_are_rejected() {
        assert_eq!(header_name("Signature = \"$WINDOWS NT$\""), None);
        assert_eq!(header_name("[Version] ; comment"), None);
        assert_eq!(header_name(""), None);
        assert_eq!(header_name("%Dev% = Install, PCI\\VEN_8086&DEV_7D1D"), None);
    }

    #[test]
    fn transition_only_changes_on_headers() {
        let section = Section::default();
        assert_eq!(section.name(), "");

        let section = section.transition("; leading comment");
        assert_eq!(section.name(), "");

        let section = section.transition("[Version]");
        assert!(section.is_version());

        let section = section.transition("");
        assert!(section.is_version());

        let section = section.transition("[NPU_Device_Install.NT]");
        assert_eq!(section.name(), "NPU_Device_Install.NT");
        assert!(!section.is_version());
    }

    #[test]
    fn install_sections_match_patterns() {
        for name in ["PTL_IG", "PTL_XE3_IG", "PTL_HIG", "NPU_Device_Install", "NPU_A_B_Install"] {
            assert!(Section::new(name).is_install(), "{name} should match");
        }
    }

    #[test]
    fn other_sections_are_not_install_sections() {
        for name in [
            "",
            "Version",
            "PTL_IG.Services",
            "NPU_Install",
            "XPTL_IG",
            "NPU_Device_Install.NT",
            "npu_device_install",
        ] {
            assert!(!Section::new(name).is_install(), "{name} should not match");
        }
    }
}
