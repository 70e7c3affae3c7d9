use super::{Result, ZoneError};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Characters ignored when comparing a file name with its `$ORIGIN`.
pub const NAME_PUNCTUATION: &[char] = &['/', '_', ',', ':', '-', '+', '*', '%', '^', '&', '#', '$'];

static SOA_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[^\s;]+\s+([0-9]+\s+)?(IN\s+)?SOA\s+").expect("SOA pattern is valid")
});

static ORIGIN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\$ORIGIN\s+([^ ]+)\.\s*(;.*)?$").expect("$ORIGIN pattern is valid")
});

/// Returns the first `$ORIGIN` declared before the SOA record, lower-cased
/// and without the trailing dot.
pub fn zone_origin(contents: &str) -> Option<String> {
    for line in contents.lines() {
        if SOA_LINE.is_match(line) {
            break;
        }
        if let Some(caps) = ORIGIN_LINE.captures(line) {
            return Some(caps[1].to_lowercase());
        }
    }
    None
}

/// Strips the punctuation set and lower-cases `name` for comparison.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !NAME_PUNCTUATION.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// File name without the zone suffix, lower-cased
pub fn stem_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| ZoneError::InvalidFileName(path.to_path_buf()))
}

/// Derives the canonical zone name of a zone file.
///
/// The in-file origin wins when present. It must agree with the file name
/// modulo punctuation unless `allow_divergence` is set.
pub fn zone_name(path: &Path, contents: &str, allow_divergence: bool) -> Result<String> {
    let stem = stem_name(path)?;
    match zone_origin(contents) {
        Some(origin) => {
            if normalize(&stem) != normalize(&origin) && !allow_divergence {
                return Err(ZoneError::OriginMismatch {
                    path: path.to_path_buf(),
                    origin,
                    stem,
                });
            }
            Ok(origin)
        }
        None => Ok(stem),
    }
}
