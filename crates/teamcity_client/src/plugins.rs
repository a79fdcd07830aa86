//! TeamCity plugin metadata read from a server's plugin directories.
//!
//! Unpacked plugins carry a `teamcity-plugin.xml` descriptor. Only a handful of
//! elements are needed, so the descriptor is read with targeted patterns rather
//! than a full XML parser.

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::Error;

#[cfg(test)]
#[path = "plugins_tests.rs"]
mod tests;

pub const DESCRIPTOR_FILE_NAME: &str = "teamcity-plugin.xml";

const UNKNOWN: &str = "Unknown";

/// Metadata of one unpacked plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: String,
    pub vendor: String,
    /// TeamCity requirement text, `Unknown` when absent
    pub compatible_versions: String,
    pub path: PathBuf,
}

/// Everything found in a plugin directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PluginScan {
    /// Unpacked plugins that have a descriptor
    pub descriptors: Vec<PluginDescriptor>,
    /// Names of every plugin entry TeamCity would load: directories and `.zip` files
    pub installed: Vec<String>,
}

/// Whether a plugin declares support for a TeamCity version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compatibility {
    Yes,
    No,
    Unknown,
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Compatibility::Yes => "Yes",
            Compatibility::No => "No",
            Compatibility::Unknown => UNKNOWN,
        };
        f.write_str(label)
    }
}

/// Checks a requirement string against a target version by substring.
pub fn compatibility(compatible_versions: &str, target_version: &str) -> Compatibility {
    let compat = compatible_versions.trim();
    if compat.is_empty() || compat == UNKNOWN {
        Compatibility::Unknown
    } else if compat.contains(target_version) {
        Compatibility::Yes
    } else {
        Compatibility::No
    }
}

fn element_text(xml: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?s)<{0}\b[^>]*>(.*?)</{0}>", regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    re.captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
    let pattern = format!(
        r#"<{}\b[^>]*\b{}\s*=\s*"([^"]*)""#,
        regex::escape(tag),
        regex::escape(attr)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty() && !t.contains('<'))
}

/// Parses a descriptor. `fallback_name` is used when the descriptor has no name.
pub fn parse_descriptor(xml: &str, fallback_name: &str, path: &Path) -> PluginDescriptor {
    if !xml.contains("<teamcity-plugin") {
        return PluginDescriptor {
            name: fallback_name.to_string(),
            vendor: "Parse Error".to_string(),
            compatible_versions: "missing <teamcity-plugin> root element".to_string(),
            path: path.to_path_buf(),
        };
    }

    let info = element_text(xml, "info").unwrap_or_default();
    let name = non_empty(element_text(&info, "name")).unwrap_or_else(|| fallback_name.to_string());

    // <vendor> is either plain text or has <name>/<url> children.
    let vendor = element_text(&info, "vendor")
        .and_then(|v| non_empty(Some(v.clone())).or_else(|| non_empty(element_text(&v, "name"))))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let compatible_versions = element_text(xml, "requirements")
        .and_then(|r| non_empty(element_text(&r, "teamcity")))
        .or_else(|| {
            let min = attribute(xml, "requirements", "min-build");
            let max = attribute(xml, "requirements", "max-build");
            match (min, max) {
                (None, None) => None,
                (min, max) => Some(
                    [
                        min.map(|m| format!("min-build={m}")),
                        max.map(|m| format!("max-build={m}")),
                    ]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" "),
                ),
            }
        })
        .unwrap_or_else(|| UNKNOWN.to_string());

    PluginDescriptor {
        name,
        vendor,
        compatible_versions,
        path: path.to_path_buf(),
    }
}

/// Scans a plugin directory.
///
/// Every sub-directory and `.zip` file is listed as installed; sub-directories
/// with a descriptor are also parsed.
pub fn scan_plugin_dir(dir: &Path) -> Result<PluginScan, Error> {
    let read_dir = std::fs::read_dir(dir).map_err(|source| Error::PluginDir {
        path: dir.display().to_string(),
        source,
    })?;

    let mut scan = PluginScan::default();
    let mut entries: Vec<_> = read_dir.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();

        if path.is_dir() {
            scan.installed.push(file_name.clone());
            let descriptor_path = path.join(DESCRIPTOR_FILE_NAME);
            if !descriptor_path.is_file() {
                continue;
            }
            match std::fs::read_to_string(&descriptor_path) {
                Ok(xml) => scan.descriptors.push(parse_descriptor(&xml, &file_name, &path)),
                Err(e) => {
                    warn!(path = %descriptor_path.display(), error = %e, "Failed to read plugin descriptor");
                    scan.descriptors.push(PluginDescriptor {
                        name: file_name,
                        vendor: "Parse Error".to_string(),
                        compatible_versions: e.to_string(),
                        path,
                    });
                }
            }
        } else if file_name.to_ascii_lowercase().ends_with(".zip") {
            scan.installed.push(file_name);
        }
    }

    debug!(
        dir = %dir.display(),
        installed = scan.installed.len(),
        descriptors = scan.descriptors.len(),
        "Scanned plugin directory"
    );
    Ok(scan)
}
