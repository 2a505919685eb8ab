//! Finding the INF file a product request refers to.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Product description keywords selecting the INF to patch, in priority
/// order. Every keyword of a rule must occur in the description.
pub const INF_RULES: [(&[&str], &str); 3] = [
    (&["graphics", "base"], "iigd_dch.inf"),
    (&["graphics", "ext"], "iigd_ext.inf"),
    (&["npu", "ext"], "npu_extension.inf"),
];

/// Returns the INF file name a product description refers to.
///
/// ```
/// use dua::workflow::locate::target_inf_name;
///
/// assert_eq!(target_inf_name("Graphics Base INF"), Some("iigd_dch.inf"));
/// assert_eq!(target_inf_name("NPU Ext INF Template"), Some("npu_extension.inf"));
/// assert_eq!(target_inf_name("Audio"), None);
/// ```
#[must_use]
pub fn target_inf_name(product: &str) -> Option<&'static str> {
    let product = product.to_lowercase();
    INF_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().all(|keyword| product.contains(keyword)))
        .map(|&(_, name)| name)
}

/// Finds the first file named `file_name` below `root`.
///
/// Names are compared case-insensitively and directories are walked in
/// file name order.
#[must_use]
pub fn find_file(root: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(file_name))
        })
        .map(walkdir::DirEntry::into_path)
}

/// Locates the INF a product description refers to inside an extracted
/// driver package.
#[must_use]
pub fn locate_inf(driver_root: &Path, product: &str) -> Option<PathBuf> {
    let Some(name) = target_inf_name(product) else {
        tracing::warn!("Could not match product name '{product}' to a known INF file");
        return None;
    };

    let found = find_file(driver_root, name);
    if found.is_none() {
        tracing::warn!("Target INF {name} not found in {}", driver_root.display());
    }
    found
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn product_keywords_select_inf() {
        assert_eq!(target_inf_name("Graphics Base"), Some("iigd_dch.inf"));
        assert_eq!(target_inf_name("GRAPHICS EXT"), Some("iigd_ext.inf"));
        assert_eq!(target_inf_name("graphics extension base"), Some("iigd_dch.inf"));
        assert_eq!(target_inf_name("NPU Extension"), Some("npu_extension.inf"));
    }

    #[test]
    fn incomplete_descriptions_select_nothing() {
        assert_eq!(target_inf_name("Graphics"), None);
        assert_eq!(target_inf_name("NPU Base"), None);
        assert_eq!(target_inf_name(""), None);
    }

    #[test]
    fn inf_is_found_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("Graphics").join("amd64");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("IIGD_DCH.INF"), "[Version]").unwrap();
        fs::write(tmp.path().join("readme.txt"), "").unwrap();

        assert_eq!(
            locate_inf(tmp.path(), "Graphics Base"),
            Some(nested.join("IIGD_DCH.INF"))
        );
    }

    #[test]
    fn first_match_in_name_order_wins() {
        let tmp = tempfile::tempdir().unwrap();
        for dir in ["b", "a"] {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
            fs::write(tmp.path().join(dir).join("npu_extension.inf"), "").unwrap();
        }

        assert_eq!(
            find_file(tmp.path(), "npu_extension.inf"),
            Some(tmp.path().join("a").join("npu_extension.inf"))
        );
    }

    #[test]
    fn missing_inf_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(locate_inf(tmp.path(), "Graphics Ext"), None);
        assert_eq!(locate_inf(tmp.path(), "Camera"), None);
    }
}
