use std::{collections::BTreeMap, io, path::Path, str::FromStr};

use serde::Deserialize;

use crate::domain::registry::RegistryFunctions;

/// Per-project patching configuration.
///
/// The file is a JSON document with a `project` object keyed by project name.
/// Each project is a tree of [`ConfigNode`]s addressed by dot-separated paths
/// such as `npu.extension` or `gfx.base`.
///
/// ```json
/// {
///   "project": {
///     "chogori": {
///       "npu": {
///         "extension": {
///           "dev_id": ["7D1D"],
///           "subsys_id": ["22E817AA"],
///           "extension_id": "1a2b3c4d-0000-0000-0000-000000000000",
///           "register_function": {
///             "NpuReg": [["Setting1", "dword", 1]]
///           }
///         }
///       }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    project: BTreeMap<String, ConfigNode>,
}

impl ProjectConfig {
    /// Loads the configuration from a JSON file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the JSON content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        content.parse()
    }

    /// Returns the configuration tree of the named project.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProjectMissing`] if the project is not declared.
    pub fn project(&self, name: &str) -> Result<&ConfigNode, ConfigError> {
        self.project
            .get(name)
            .ok_or_else(|| ConfigError::ProjectMissing {
                project: name.to_string(),
            })
    }

    /// The declared project names, sorted.
    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.project.keys().map(String::as_str)
    }
}

impl FromStr for ProjectConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(ConfigError::Parse)
    }
}

/// Errors that can occur while loading or querying the project configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{path}'")]
    Read {
        /// The configuration path.
        path: String,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The configuration is not valid JSON of the expected shape.
    #[error("failed to parse config file")]
    Parse(#[source] serde_json::Error),

    /// The requested project is not declared in the configuration.
    #[error("project '{project}' not found in config")]
    ProjectMissing {
        /// The requested project name.
        project: String,
    },
}

static EMPTY_NODE: ConfigNode = ConfigNode::empty();

/// A node of a project configuration tree.
///
/// Every node may carry patching settings; any other key names a child node.
/// Missing settings behave as empty, so an absent node and an empty node are
/// indistinguishable to the patcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigNode {
    /// Device IDs to match, in priority order. An empty string matches any
    /// device.
    #[serde(default)]
    dev_id: Vec<String>,

    /// Subsystem IDs every matched hardware ID is expanded into.
    #[serde(default)]
    subsys_id: Vec<String>,

    /// Replacement for the `ExtensionId` directive of extension INFs.
    #[serde(default)]
    extension_id: Option<String>,

    /// Registry sections to generate and reference from install sections.
    #[serde(default)]
    register_function: RegistryFunctions,

    #[serde(flatten)]
    children: BTreeMap<String, Self>,
}

impl ConfigNode {
    /// A node with no settings and no children.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            dev_id: Vec::new(),
            subsys_id: Vec::new(),
            extension_id: None,
            register_function: RegistryFunctions::new(),
            children: BTreeMap::new(),
        }
    }

    /// Resolves a dot-separated path below this node.
    ///
    /// A missing segment resolves to an empty node rather than an error.
    ///
    /// ```
    /// use dua::ProjectConfig;
    ///
    /// let config: ProjectConfig =
    ///     r#"{"project": {"demo": {"npu": {"extension": {"dev_id": ["7D1D"]}}}}}"#
    ///         .parse()
    ///         .unwrap();
    /// let demo = config.project("demo").unwrap();
    ///
    /// assert_eq!(demo.resolve("npu.extension").dev_ids(), ["7D1D"]);
    /// assert!(demo.resolve("gfx.base").dev_ids().is_empty());
    /// ```
    #[must_use]
    pub fn resolve(&self, path: &str) -> &Self {
        path.split('.').fold(self, |node, segment| {
            node.children.get(segment).unwrap_or(&EMPTY_NODE)
        })
    }

    /// Returns the named child node, if declared.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.get(name)
    }

    /// Device IDs in priority order.
    #[must_use]
    pub fn dev_ids(&self) -> &[String] {
        &self.dev_id
    }

    /// Subsystem IDs in expansion order.
    #[must_use]
    pub fn subsys_ids(&self) -> &[String] {
        &self.subsys_id
    }

    /// The configured extension ID, ignoring an empty value.
    #[must_use]
    pub fn extension_id(&self) -> Option<&str> {
        self.extension_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Registry functions in declaration order.
    #[must_use]
    pub const fn register_functions(&self) -> &RegistryFunctions {
        &self.register_function
    }

    /// Returns `true` if the node carries no settings and has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &EMPTY_NODE
    }
}
