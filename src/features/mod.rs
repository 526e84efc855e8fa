//! Locating and reading pre-extracted firmware feature artifacts.
//!
//! Every module receives a [`FeatureLocation`] per side instead of consulting
//! process-global state; path templates are expanded against it.

mod artifacts;
mod profile;

pub use artifacts::{load_json, read_line_set, read_lines, read_optional_line_set};
pub use profile::{is_truthy, to_set, FirmwareProfile, KeyMaterial};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Directory under the firmware root holding extractor output.
pub const OUTPUT_JSON_DIR: &str = "output_json";

/// Where one firmware's features live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureLocation {
    root: PathBuf,
    firmware_name: String,
    firmware_dir: String,
}

impl FeatureLocation {
    /// Resolve a firmware root.
    ///
    /// `firmware_dir` is `dir_override` when given, otherwise the first
    /// sub-directory (by name) of `<root>/output_json/`, otherwise the root's
    /// basename.
    pub fn resolve(root: impl Into<PathBuf>, dir_override: Option<&str>) -> Self {
        let root = root.into();
        let firmware_name = basename(&root);
        let firmware_dir = dir_override
            .map(str::to_string)
            .or_else(|| first_output_subdir(&root))
            .unwrap_or_else(|| firmware_name.clone());

        tracing::debug!(
            root = %root.display(),
            firmware_name = %firmware_name,
            firmware_dir = %firmware_dir,
            "resolved feature location"
        );

        Self {
            root,
            firmware_name,
            firmware_dir,
        }
    }

    /// The firmware root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Basename of the root, used as the firmware identifier.
    #[must_use]
    pub fn firmware_name(&self) -> &str {
        &self.firmware_name
    }

    /// The resolved `{firmware_dir}` value.
    #[must_use]
    pub fn firmware_dir(&self) -> &str {
        &self.firmware_dir
    }

    /// Substitute `{firmware_name}` and `{firmware_dir}` in `template`.
    #[must_use]
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{firmware_name}", &self.firmware_name)
            .replace("{firmware_dir}", &self.firmware_dir)
    }

    /// Expand `template` into a path; relative results are joined to the root.
    #[must_use]
    pub fn path_for(&self, template: &str) -> PathBuf {
        let expanded = PathBuf::from(self.expand(template));
        if expanded.is_absolute() {
            expanded
        } else {
            self.root.join(expanded)
        }
    }

    /// The first template whose expansion names an existing file.
    #[must_use]
    pub fn first_existing<S: AsRef<str>>(&self, templates: &[S]) -> Option<PathBuf> {
        templates
            .iter()
            .map(|t| self.path_for(t.as_ref()))
            .find(|p| p.is_file())
    }

    /// Whether both locations point at the same root.
    #[must_use]
    pub fn same_root(&self, other: &Self) -> bool {
        if self.root == other.root {
            return true;
        }
        match (self.root.canonicalize(), other.root.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

fn basename(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn first_output_subdir(root: &Path) -> Option<String> {
    let entries = std::fs::read_dir(root.join(OUTPUT_JSON_DIR)).ok()?;
    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_picks_first_sorted_subdir() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fw_a");
        std::fs::create_dir_all(root.join("output_json/zeta")).unwrap();
        std::fs::create_dir_all(root.join("output_json/alpha")).unwrap();
        std::fs::write(root.join("output_json/aaa.txt"), "not a dir").unwrap();

        let loc = FeatureLocation::resolve(&root, None);
        assert_eq!(loc.firmware_name(), "fw_a");
        assert_eq!(loc.firmware_dir(), "alpha");
    }

    #[test]
    fn test_resolve_falls_back_to_basename() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fw_b");
        std::fs::create_dir_all(&root).unwrap();

        let loc = FeatureLocation::resolve(&root, None);
        assert_eq!(loc.firmware_dir(), "fw_b");
    }

    #[test]
    fn test_override_wins() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fw_c");
        std::fs::create_dir_all(root.join("output_json/auto")).unwrap();

        let loc = FeatureLocation::resolve(&root, Some("manual"));
        assert_eq!(loc.firmware_dir(), "manual");
    }

    #[test]
    fn test_template_expansion() {
        let loc = FeatureLocation::resolve("/data/fw_d", Some("rootfs"));
        assert_eq!(
            loc.path_for("output_json/{firmware_dir}/{firmware_dir}_all_strings"),
            PathBuf::from("/data/fw_d/output_json/rootfs/rootfs_all_strings")
        );
        assert_eq!(
            loc.path_for("output_json/{firmware_name}/output.json"),
            PathBuf::from("/data/fw_d/output_json/fw_d/output.json")
        );
        assert_eq!(loc.path_for("/abs/{firmware_name}.json"), PathBuf::from("/abs/fw_d.json"));
    }

    #[test]
    fn test_first_existing_candidate() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fw_e");
        std::fs::create_dir_all(root.join("output_json/x")).unwrap();
        std::fs::write(root.join("output_json/x/second.txt"), "a\n").unwrap();

        let loc = FeatureLocation::resolve(&root, None);
        let found = loc.first_existing(&[
            "output_json/{firmware_dir}/first.txt",
            "output_json/{firmware_dir}/second.txt",
        ]);
        assert_eq!(found, Some(root.join("output_json/x/second.txt")));
    }
}
