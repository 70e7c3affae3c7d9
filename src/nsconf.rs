//! Name server configuration rendering.
//!
//! A JSON template describes a header, a per-zone item and a footer:
//!
//! ```json
//! {
//!   "header": "# Managed by zonedeploy, do not edit.\nzone:",
//!   "item": "  - domain: \"$zonename\"\n    file: \"$zonefile\"\n$zonevar",
//!   "defaultvar": "    template: default",
//!   "zonevars": { "example.com": "    template: signed", "*.arpa": "    template: reverse" }
//! }
//! ```
//!
//! Placeholders in `item` are `$zonename`, `$zonefile` (built file name),
//! `$zonepath` (built file path) and `$zonevar`. `$zonevar` is the first
//! `zonevars` entry matching one of the zone's wildcards, most specific
//! first, else `defaultvar`.

use crate::error::{PipelineError, Result};
use crate::zone::wildcards;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\$|([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)\})")
        .expect("placeholder pattern is valid")
});

const DEFAULT_TEMPLATE: &str = r##"{
  "header": "# Managed by zonedeploy, do not edit.\nzone:",
  "item": "  - domain: \"$zonename\"\n    file: \"$zonefile\"$zonevar",
  "defaultvar": ""
}"##;

/// Parsed configuration template
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfTemplate {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub footer: String,
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub defaultvar: String,
    #[serde(default)]
    pub zonevars: HashMap<String, String>,
}

/// A zone as seen by the configuration template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfZone {
    pub name: String,
    /// Built file path relative to the working directory
    pub path: PathBuf,
}

impl ConfTemplate {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::Template(e.to_string()))
    }

    /// The built-in Knot DNS zone list template
    pub fn builtin() -> Self {
        Self::parse(DEFAULT_TEMPLATE).unwrap_or_default()
    }

    /// Per-zone variable text for `zone`
    pub fn zonevar(&self, zone: &str) -> &str {
        wildcards(zone)
            .find_map(|w| self.zonevars.get(&w))
            .map(String::as_str)
            .unwrap_or(&self.defaultvar)
    }

    /// Renders the configuration for `zones` in the given order
    pub fn render(&self, zones: &[ConfZone]) -> Result<String> {
        let mut out = Vec::with_capacity(zones.len() + 2);
        if !self.header.is_empty() {
            out.push(substitute(&self.header, &HashMap::new())?);
        }
        for zone in zones {
            let file_name = zone
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let vars: HashMap<&str, String> = [
                ("zonename", zone.name.clone()),
                ("zonefile", file_name),
                ("zonepath", zone.path.display().to_string()),
                ("zonevar", self.zonevar(&zone.name).to_string()),
            ]
            .into();
            out.push(substitute(&self.item, &vars)?);
        }
        if !self.footer.is_empty() {
            out.push(substitute(&self.footer, &HashMap::new())?);
        }
        let mut text = out.join("\n");
        text.push('\n');
        Ok(text)
    }
}

fn substitute(template: &str, vars: &HashMap<&str, String>) -> Result<String> {
    let mut missing = None;
    let text = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
            return "$".to_string();
        };
        match vars.get(name.as_str()) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.as_str().to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(PipelineError::Template(format!(
            "unknown placeholder ${}",
            name
        ))),
        None => Ok(text.into_owned()),
    }
}
