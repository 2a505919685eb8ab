use std::fmt;

/// The kind of driver package an INF belongs to.
///
/// The kind selects which node of a project's configuration tree applies to
/// the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfType {
    /// NPU extension INF.
    NpuExtension,
    /// Graphics extension INF.
    GfxExtension,
    /// Graphics base INF.
    GfxBase,
}

/// Catalog file references identifying each INF type, in priority order.
///
/// Matching is case-insensitive and the first marker found wins.
pub const CATALOG_MARKERS: [(&str, InfType); 3] = [
    ("npu_extension.cat", InfType::NpuExtension),
    ("extinf_i.cat", InfType::GfxExtension),
    ("igdlh.cat", InfType::GfxBase),
];

impl InfType {
    /// Identifies the INF type from the catalog file it references.
    ///
    /// Returns `None` if the text references none of the known catalogs.
    ///
    /// ```
    /// use dua::InfType;
    ///
    /// let inf = "[Version]\nCatalogFile = NPU_Extension.cat\n";
    /// assert_eq!(InfType::identify(inf), Some(InfType::NpuExtension));
    /// assert_eq!(InfType::identify("[Version]\n"), None);
    /// ```
    #[must_use]
    pub fn identify(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        CATALOG_MARKERS
            .iter()
            .find(|(marker, _)| text.contains(marker))
            .map(|&(_, kind)| kind)
    }

    /// The configuration path holding this type's settings.
    #[must_use]
    pub const fn config_path(self) -> &'static str {
        match self {
            Self::NpuExtension => "npu.extension",
            Self::GfxExtension => "gfx.extension",
            Self::GfxBase => "gfx.base",
        }
    }

    /// A human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NpuExtension => "NPU Extension",
            Self::GfxExtension => "GFX Extension",
            Self::GfxBase => "GFX Base",
        }
    }
}

impl fmt::Display for InfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
