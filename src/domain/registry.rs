//! Registry value declarations and the `[Section]` blocks generated from them.
//!
//! A project component may declare any number of registry functions. Each
//! function becomes an `AddReg` target: a section appended to the end of the
//! descriptor containing one `HKR` line per declared value.

use std::fmt;

use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess},
};

/// Comment line separating the original descriptor from the generated blocks.
pub const GENERATED_BANNER: &str = "; --- Generated Registry Sections ---";

/// The registry data type of a declared value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ValueType {
    /// A 32-bit integer, emitted verbatim.
    #[serde(rename = "dword", alias = "d")]
    Dword,
    /// A byte string, given as hex and emitted as comma-separated bytes.
    #[serde(rename = "binary", alias = "b")]
    Binary,
}

impl ValueType {
    /// The INF string token naming this registry type.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Dword => "%REG_DWORD%",
            Self::Binary => "%REG_BINARY%",
        }
    }
}

/// A single `(key, type, value)` registry declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawEntry")]
pub struct RegistryEntry {
    /// The registry value name.
    pub key: String,
    /// The registry data type.
    pub value_type: ValueType,
    /// The value as written in the configuration.
    pub value: String,
}

impl RegistryEntry {
    /// Creates a new entry.
    pub fn new(key: impl Into<String>, value_type: ValueType, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value_type,
            value: value.into(),
        }
    }

    /// Formats the entry as an `HKR` line.
    ///
    /// Binary values are normalised with [`format_binary`]. An odd number of
    /// hex digits is tolerated: the last token is left with a single digit.
    #[must_use]
    pub fn render(&self) -> String {
        let value = match self.value_type {
            ValueType::Dword => self.value.clone(),
            ValueType::Binary => {
                if clean_hex(&self.value).chars().count() % 2 == 1 {
                    tracing::warn!(
                        key = %self.key,
                        value = %self.value,
                        "binary registry value has an odd number of hex digits"
                    );
                }
                format_binary(&self.value)
            }
        };
        format!("HKR,, {}, {}, {value}", self.key, self.value_type.token())
    }
}

/// Configuration shape of a registry entry: a three element array.
#[derive(Deserialize)]
struct RawEntry(String, ValueType, Scalar);

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawEntry> for RegistryEntry {
    fn from(RawEntry(key, value_type, value): RawEntry) -> Self {
        let value = match value {
            Scalar::Text(text) => text,
            Scalar::Number(number) => number.to_string(),
        };
        Self {
            key,
            value_type,
            value,
        }
    }
}

/// A named registry section and the values it sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryFunction {
    /// Section name, referenced by the injected `AddReg` lines.
    pub name: String,
    /// Values written by the section, in declaration order.
    pub entries: Vec<RegistryEntry>,
}

impl RegistryFunction {
    /// Renders the section header followed by its value lines.
    pub fn render(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(format!("[{}]", self.name))
            .chain(self.entries.iter().map(RegistryEntry::render))
    }
}

/// The registry functions of a component, in the order they were declared.
///
/// Deserialized from a JSON object. Unlike a map type, the key order of the
/// source document is kept, since it determines both the `AddReg` order and
/// the order of the generated sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryFunctions(Vec<RegistryFunction>);

impl RegistryFunctions {
    /// An empty set of registry functions.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` if no registry functions are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of declared registry functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the registry functions in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, RegistryFunction> {
        self.0.iter()
    }

    /// The section names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|function| function.name.as_str())
    }

    /// Lines appended to the end of a patched descriptor.
    ///
    /// Empty when no functions are declared. Otherwise a blank line and a
    /// banner comment, then every section followed by a blank line.
    #[must_use]
    pub fn render_tail(&self) -> Vec<String> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![String::new(), GENERATED_BANNER.to_string()];
        for function in &self.0 {
            lines.extend(function.render());
            lines.push(String::new());
        }
        lines
    }
}

impl From<Vec<RegistryFunction>> for RegistryFunctions {
    fn from(functions: Vec<RegistryFunction>) -> Self {
        Self(functions)
    }
}

impl<'a> IntoIterator for &'a RegistryFunctions {
    type Item = &'a RegistryFunction;
    type IntoIter = std::slice::Iter<'a, RegistryFunction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de> Deserialize<'de> for RegistryFunctions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor;

        impl<'de> de::Visitor<'de> for OrderedVisitor {
            type Value = RegistryFunctions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of registry section names to lists of values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut functions = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, entries)) = map.next_entry::<String, Vec<RegistryEntry>>()? {
                    functions.push(RegistryFunction { name, entries });
                }
                Ok(RegistryFunctions(functions))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Formats a hex string as INF binary data.
///
/// Spaces and `0x` prefixes are removed and the remaining digits are grouped
/// into two-character bytes separated by `", "`. A trailing odd digit forms a
/// token of its own.
///
/// ```
/// use dua::domain::registry::format_binary;
///
/// assert_eq!(format_binary("DE AD BE EF"), "DE, AD, BE, EF");
/// assert_eq!(format_binary("0xFF00"), "FF, 00");
/// assert_eq!(format_binary("ABC"), "AB, C");
/// ```
#[must_use]
pub fn format_binary(hex: &str) -> String {
    let digits: Vec<char> = clean_hex(hex).chars().collect();
    digits
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(", ")
}

fn clean_hex(hex: &str) -> String {
    hex.replace(' ', "").replace("0x", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_values_are_grouped_into_bytes() {
        assert_eq!(format_binary("DE AD BE EF"), "DE, AD, BE, EF");
        assert_eq!(format_binary("0xFF00"), "FF, 00");
        assert_eq!(format_binary("0x01 0x02"), "01, 02");
        assert_eq!(format_binary(""), "");
    }

    #[test]
    fn odd_length_binary_keeps_trailing_digit() {
        assert_eq!(format_binary("12345"), "12, 34, 5");
        let entry = RegistryEntry::new("Blob", ValueType::Binary, "ABC");
        assert_eq!(entry.render(), "HKR,, Blob, %REG_BINARY%, AB, C");
    }

    #[test]
    fn dword_values_are_emitted_verbatim() {
        let entry = RegistryEntry::new("Setting1", ValueType::Dword, "1");
        assert_eq!(entry.render(), "HKR,, Setting1, %REG_DWORD%, 1");

        let entry = RegistryEntry::new("Mask", ValueType::Dword, "0x0000FFFF");
        assert_eq!(entry.render(), "HKR,, Mask, %REG_DWORD%, 0x0000FFFF");
    }

    #[test]
    fn entries_deserialize_from_arrays() {
        let entries: Vec<RegistryEntry> = serde_json::from_str(
            r#"[["A", "dword", 7], ["B", "d", "8"], ["C", "binary", "0A0B"], ["D", "b", "FF"]]"#,
        )
        .unwrap();

        assert_eq!(
            entries,
            vec![
                RegistryEntry::new("A", ValueType::Dword, "7"),
                RegistryEntry::new("B", ValueType::Dword, "8"),
                RegistryEntry::new("C", ValueType::Binary, "0A0B"),
                RegistryEntry::new("D", ValueType::Binary, "FF"),
            ]
        );
    }

    #[test]
    fn unknown_value_type_is_rejected() {
        let result: Result<Vec<RegistryEntry>, _> =
            serde_json::from_str(r#"[["A", "qword", 7]]"#);
        assert!(result.is_err());
    }

    #[test]
    fn functions_keep_declaration_order() {
        let functions: RegistryFunctions =
            serde_json::from_str(r#"{"Zeta": [], "Alpha": [], "Mid": []}"#).unwrap();

        assert_eq!(functions.names().collect::<Vec<_>>(), ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn tail_lists_every_section() {
        let functions: RegistryFunctions = serde_json::from_str(
            r#"{"NpuReg": [["Setting1", "dword", "1"]], "NpuBin": [["Blob", "binary", "DE AD"]]}"#,
        )
        .unwrap();

        assert_eq!(
            functions.render_tail(),
            [
                "",
                GENERATED_BANNER,
                "[NpuReg]",
                "HKR,, Setting1, %REG_DWORD%, 1",
                "",
                "[NpuBin]",
                "HKR,, Blob, %REG_BINARY%, DE, AD",
                "",
            ]
        );
    }

    #[test]
    fn empty_functions_render_nothing() {
        assert!(RegistryFunctions::new().render_tail().is_empty());
    }
}
