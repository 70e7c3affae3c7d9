//! Catalog zone synthesis (RFC 9432).
//!
//! The generated zone lists every other managed zone as a PTR member so
//! that name servers supporting catalog zones can provision them.

use super::render::SERIAL_MARKER;
use ring::digest;
use std::fmt::Write;

/// Member label of `zone`: the first 16 hex digits of its SHA-256
pub fn member_id(zone: &str) -> String {
    let hash = digest::digest(&digest::SHA256, zone.as_bytes());
    hex::encode(&hash.as_ref()[..8])
}

/// Renders catalog zone `catalog` listing `members`, with the serial left as
/// the auto-update placeholder.
pub fn render<'a>(catalog: &str, members: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "$ORIGIN {}.", catalog);
    let _ = writeln!(out, "$TTL 0");
    let _ = writeln!(out, "@ IN SOA invalid. invalid. (");
    let _ = writeln!(out, "        1 ; {}", SERIAL_MARKER);
    let _ = writeln!(out, "        3600 600 2147483646 0 )");
    let _ = writeln!(out, "@ IN NS invalid.");
    let _ = writeln!(out, "version IN TXT \"2\"");
    for zone in members {
        if zone == catalog {
            continue;
        }
        let _ = writeln!(out, "{}.zones IN PTR {}.", member_id(zone), zone);
    }
    out
}
