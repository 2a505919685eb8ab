//! Hardware ID expansion.
//!
//! A model line such as
//!
//! ```text
//! %NPU.DeviceDesc% = NPU_Device_Install, PCI\VEN_8086&DEV_7D1D
//! ```
//!
//! is rewritten into one line per configured subsystem ID, so that the
//! driver matches only the project's boards.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

/// Every hardware ID line handled by the expander contains this marker.
pub const VENDOR_DEVICE_MARKER: &str = r"PCI\VEN_8086&DEV_";

const SUBSYS_TOKEN: &str = "SUBSYS_";

static SUBSYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SUBSYS_[a-zA-Z0-9]+").expect("subsystem pattern is valid"));

/// Returns `true` if the line carries a vendor/device hardware ID.
#[must_use]
pub fn is_hardware_id_line(line: &str) -> bool {
    line.contains(VENDOR_DEVICE_MARKER)
}

/// Finds the first configured device ID matching the line.
///
/// An empty device ID matches any line. Otherwise `DEV_<id>` must occur in
/// the line. Device IDs are tried in order and the first match wins.
#[must_use]
pub fn matching_device<'a>(line: &str, dev_ids: &'a [String]) -> Option<&'a str> {
    dev_ids
        .iter()
        .map(String::as_str)
        .find(|id| id.is_empty() || line.contains(&format!("DEV_{id}")))
}

/// Expands a hardware ID line into one line per subsystem ID.
///
/// Returns `None` when the line is not a hardware ID line or no device ID
/// matches it, in which case the line is kept as it is.
///
/// A matched line with no subsystem IDs expands to nothing, removing the
/// line from the output.
#[must_use]
pub fn expand(line: &str, dev_ids: &[String], subsys_ids: &[String]) -> Option<Vec<String>> {
    if !is_hardware_id_line(line) {
        return None;
    }

    let device = matching_device(line, dev_ids)?;
    tracing::trace!(device, line, "expanding hardware ID");

    Some(
        subsys_ids
            .iter()
            .map(|subsys| with_subsystem(line, subsys))
            .collect(),
    )
}

/// Sets the subsystem ID of a hardware ID line.
///
/// Existing `SUBSYS_` tokens are replaced, otherwise `&SUBSYS_<id>` is
/// appended after any trailing whitespace is removed.
#[must_use]
pub fn with_subsystem(line: &str, subsys: &str) -> String {
    let token = format!("{SUBSYS_TOKEN}{subsys}");
    if line.contains(SUBSYS_TOKEN) {
        SUBSYS.replace_all(line, NoExpand(&token)).into_owned()
    } else {
        format!("{}&{token}", line.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r"%NPU.DeviceDesc% = NPU_Device_Install, PCI\VEN_8086&DEV_7D1D";
    const LINE_WITH_SUBSYS: &str =
        r"%iPTLGT% = PTL_IG, PCI\VEN_8086&DEV_B080&SUBSYS_00000000&REV_04";

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn subsystem_is_appended_when_absent() {
        assert_eq!(
            with_subsystem(&format!("{LINE}   "), "22E817AA"),
            format!("{LINE}&SUBSYS_22E817AA")
        );
    }

    #[test]
    fn existing_subsystem_is_replaced() {
        assert_eq!(
            with_subsystem(LINE_WITH_SUBSYS, "0BDA1028"),
            r"%iPTLGT% = PTL_IG, PCI\VEN_8086&DEV_B080&SUBSYS_0BDA1028&REV_04"
        );
    }

    #[test]
    fn replacement_is_literal() {
        assert_eq!(
            with_subsystem(LINE_WITH_SUBSYS, "$1"),
            r"%iPTLGT% = PTL_IG, PCI\VEN_8086&DEV_B080&SUBSYS_$1&REV_04"
        );
    }

    #[test]
    fn wildcard_expands_into_every_subsystem() {
        let lines = expand(LINE, &ids(&[""]), &ids(&["1234", "5678"])).unwrap();

        assert_eq!(
            lines,
            [format!("{LINE}&SUBSYS_1234"), format!("{LINE}&SUBSYS_5678")]
        );
    }

    #[test]
    fn first_matching_device_wins() {
        let dev_ids = ids(&["AAAA", "7D1D", ""]);
        assert_eq!(matching_device(LINE, &dev_ids), Some("7D1D"));

        let dev_ids = ids(&["", "7D1D"]);
        assert_eq!(matching_device(LINE, &dev_ids), Some(""));
    }

    #[test]
    fn device_ids_match_as_substrings() {
        assert_eq!(matching_device(LINE, &ids(&["7D1"])), Some("7D1"));
    }

    #[test]
    fn unmatched_lines_pass_through() {
        assert_eq!(expand(LINE, &ids(&["B080"]), &ids(&["1234"])), None);
        assert_eq!(expand(LINE, &[], &ids(&["1234"])), None);
        assert_eq!(
            expand(r"PCI\VEN_10DE&DEV_2684", &ids(&[""]), &ids(&["1234"])),
            None
        );
    }

    #[test]
    fn expansion_count_equals_subsystem_count() {
        for count in 0..5 {
            let subsys: Vec<String> = (0..count).map(|i| format!("{i:08X}")).collect();
            let lines = expand(LINE, &ids(&["X", "7D1D"]), &subsys).unwrap();
            assert_eq!(lines.len(), count);
        }
    }

    #[test]
    fn matched_line_without_subsystems_is_dropped() {
        assert_eq!(expand(LINE, &ids(&["7D1D"]), &[]), Some(Vec::new()));
    }
}
