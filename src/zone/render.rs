use crate::serial::Serial;
use regex::Regex;
use std::sync::LazyLock;

/// Marker comment that follows a placeholder serial of `1` in the SOA record
pub const SERIAL_MARKER: &str = "SERIALAUTOUPDATE";

static SERIAL_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ism)(^.*?\sSOA\s[^)]+?\s)1\s*;\s*SERIALAUTOUPDATE")
        .expect("serial placeholder pattern is valid")
});

/// Result of substituting the serial placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Whether a placeholder was found and replaced
    pub substituted: bool,
}

/// Replaces the first `1 ; SERIALAUTOUPDATE` placeholder in the SOA record
/// with `serial`. Text without a placeholder is returned unchanged.
pub fn substitute_serial(contents: &str, serial: Serial) -> Rendered {
    match SERIAL_PLACEHOLDER.captures(contents) {
        Some(caps) => {
            let whole = caps.get(0).expect("group 0 always participates");
            let mut text = String::with_capacity(contents.len() + 10);
            text.push_str(&contents[..whole.start()]);
            text.push_str(&caps[1]);
            text.push_str(&serial.to_string());
            text.push_str(&contents[whole.end()..]);
            Rendered {
                text,
                substituted: true,
            }
        }
        None => Rendered {
            text: contents.to_string(),
            substituted: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONE: &str = "$ORIGIN example.com.\n\
$TTL 3600\n\
@ IN SOA ns1.example.com. hostmaster.example.com. (\n\
\x20       1 ; SERIALAUTOUPDATE\n\
\x20       3600 900 604800 86400 )\n\
@ IN NS ns1.example.com.\n";

    #[test]
    fn test_substitutes_placeholder() {
        let out = substitute_serial(ZONE, Serial(2024010100));
        assert!(out.substituted);
        assert!(out.text.contains("        2024010100\n        3600 900"));
        assert!(!out.text.contains(SERIAL_MARKER));
        assert!(out.text.starts_with("$ORIGIN example.com.\n"));
        assert!(out.text.ends_with("@ IN NS ns1.example.com.\n"));
    }

    #[test]
    fn test_single_line_soa() {
        let zone = "@ IN SOA ns1 admin 1;serialautoupdate\n 3600 900 604800 86400\n";
        let out = substitute_serial(zone, Serial(7));
        assert!(out.substituted);
        assert_eq!(out.text, "@ IN SOA ns1 admin 7\n 3600 900 604800 86400\n");
    }

    #[test]
    fn test_missing_placeholder() {
        let zone = "@ IN SOA ns1 admin 2024010100 3600 900 604800 86400\n";
        let out = substitute_serial(zone, Serial(5));
        assert!(!out.substituted);
        assert_eq!(out.text, zone);
    }

    #[test]
    fn test_only_first_placeholder_replaced() {
        let zone = "@ IN SOA a b 1 ; SERIALAUTOUPDATE\n; 1 ; SERIALAUTOUPDATE\n";
        let out = substitute_serial(zone, Serial(9));
        assert!(out.substituted);
        assert_eq!(out.text, "@ IN SOA a b 9\n; 1 ; SERIALAUTOUPDATE\n");
    }
}
