//! Fields of a DUA request issue.
//!
//! Requests are filed with an issue form, which renders every field as a
//! level three heading followed by the value:
//!
//! ```markdown
//! ### Project Name
//!
//! chogori
//!
//! ### Submission ID
//!
//! 1152921505698059287
//! ```

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Placeholder issue forms render for optional fields left empty.
const NO_RESPONSE: &str = "_No response_";

/// Values parsed from an issue body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFields {
    /// The project whose configuration is applied.
    pub project_name: Option<String>,
    /// The product description, also used as the existing product ID when
    /// submitting.
    pub product_id: Option<String>,
    /// The dashboard submission to download assets from.
    pub submission_id: Option<String>,
    /// An explicit existing product ID.
    pub existing_product_id: Option<String>,
}

fn field(heading: &str) -> Regex {
    RegexBuilder::new(&format!(r"###\s*{heading}\s*\n\s*(.+?)\s*(?:\n|$)"))
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .expect("issue field patterns are valid")
}

static PROJECT_NAME: LazyLock<Regex> = LazyLock::new(|| field(r"Project\s*Name"));
static PRODUCT_ID: LazyLock<Regex> = LazyLock::new(|| field(r"Product\s*ID"));
static SUBMISSION_ID: LazyLock<Regex> = LazyLock::new(|| field(r"Submission\s*ID"));
static EXISTING_PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| field(r"Existing\s*Product\s*ID"));

impl IssueFields {
    /// Parses the fields of an issue body. Missing fields are `None`.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        Self {
            project_name: capture(&PROJECT_NAME, body),
            product_id: capture(&PRODUCT_ID, body),
            submission_id: capture(&SUBMISSION_ID, body),
            existing_product_id: capture(&EXISTING_PRODUCT_ID, body),
        }
    }
}

fn capture(pattern: &Regex, body: &str) -> Option<String> {
    let value = pattern.captures(body)?.get(1)?.as_str().trim();
    if value.is_empty() || value == NO_RESPONSE || value.starts_with("###") {
        return None;
    }
    Some(value.to_string())
}
