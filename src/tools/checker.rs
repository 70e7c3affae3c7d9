use super::command::CommandTemplate;
use crate::error::Result;
use crate::serial::Serial;
use crate::state::content_hash;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static LOADED_SERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^zone.*loaded serial ([0-9]+)").expect("loaded serial pattern is valid")
});

/// Outcome of a syntax check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub success: bool,
    pub diagnostics: String,
}

/// Outcome of compiling a zone into its normalized form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    /// Zero exit status and a serial was reported
    pub success: bool,
    pub serial: Option<Serial>,
    /// SHA-256 of the normalized zone text
    pub zone_hash: Option<String>,
    /// Normalized zone text
    pub compiled: String,
    pub diagnostics: String,
}

/// Validates zone file syntax
pub trait SyntaxChecker {
    fn check(&self, zone: &str, zone_file: &Path) -> Result<CheckOutcome>;
}

/// Loads a zone file and reports the serial it embeds
pub trait ZoneCompiler {
    fn compile(&self, zone: &str, zone_file: &Path) -> Result<CompileOutcome>;
}

/// [`SyntaxChecker`] running an external command such as `kzonecheck`
#[derive(Debug, Clone)]
pub struct CommandChecker {
    command: CommandTemplate,
}

impl CommandChecker {
    pub fn new(command: CommandTemplate) -> Self {
        Self { command }
    }
}

impl SyntaxChecker for CommandChecker {
    fn check(&self, zone: &str, zone_file: &Path) -> Result<CheckOutcome> {
        let output = self.command.run(zone, zone_file)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(CheckOutcome {
            success: output.status.success(),
            diagnostics: format!("{}{}", stdout, stderr).trim().to_string(),
        })
    }
}

/// [`ZoneCompiler`] running `named-compilezone` or a compatible command that
/// writes the normalized zone to stdout and `loaded serial N` to stderr
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    command: CommandTemplate,
}

impl CommandCompiler {
    pub fn new(command: CommandTemplate) -> Self {
        Self { command }
    }
}

impl ZoneCompiler for CommandCompiler {
    fn compile(&self, zone: &str, zone_file: &Path) -> Result<CompileOutcome> {
        let output = self.command.run(zone, zone_file)?;
        let diagnostics = String::from_utf8_lossy(&output.stderr).to_string();
        Ok(interpret_compile(
            output.status.success(),
            &output.stdout,
            diagnostics,
        ))
    }
}

/// Builds a [`CompileOutcome`] from a compiler's exit status and output.
///
/// A zero exit status without a `loaded serial` line is still a failure.
pub fn interpret_compile(exit_ok: bool, stdout: &[u8], diagnostics: String) -> CompileOutcome {
    let serial = parse_loaded_serial(&diagnostics);
    match serial {
        Some(serial) if exit_ok => CompileOutcome {
            success: true,
            serial: Some(serial),
            zone_hash: Some(content_hash(stdout)),
            compiled: String::from_utf8_lossy(stdout).to_string(),
            diagnostics,
        },
        _ => CompileOutcome {
            success: false,
            serial: None,
            zone_hash: None,
            compiled: String::new(),
            diagnostics,
        },
    }
}

/// Extracts the serial from a `zone example.com/IN: loaded serial N` line
pub fn parse_loaded_serial(diagnostics: &str) -> Option<Serial> {
    LOADED_SERIAL
        .captures(diagnostics)
        .and_then(|caps| caps[1].parse().ok())
}

/// Lines of compiled zone text whose PTR target ends inside the zone itself.
///
/// In a reverse zone this almost always means a host name was written
/// without its trailing dot and got the origin appended.
pub fn missing_trailing_dots(zone: &str, compiled: &str) -> Vec<String> {
    let suffix = format!(".{}.", zone).to_lowercase();
    compiled
        .lines()
        .filter(|line| {
            let mut fields = line.split_whitespace();
            let is_ptr = fields.by_ref().any(|f| f.eq_ignore_ascii_case("PTR"));
            is_ptr
                && fields
                    .next()
                    .is_some_and(|target| target.to_lowercase().ends_with(&suffix))
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loaded_serial() {
        let stderr = "zone example.com/IN: loaded serial 2024010100\nOK\n";
        assert_eq!(parse_loaded_serial(stderr), Some(Serial(2024010100)));
        assert_eq!(parse_loaded_serial("dns_master_load: error\n"), None);
    }

    #[test]
    fn test_zero_exit_without_serial_is_failure() {
        let outcome = interpret_compile(true, b"example.com. 3600 IN SOA ...", "OK\n".to_string());
        assert!(!outcome.success);
        assert_eq!(outcome.serial, None);
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        let stderr = "zone example.com/IN: loaded serial 5\n".to_string();
        let outcome = interpret_compile(false, b"", stderr);
        assert!(!outcome.success);
    }

    #[test]
    fn test_successful_compile_hashes_output() {
        let stderr = "zone example.com/IN: loaded serial 5\n".to_string();
        let outcome = interpret_compile(true, b"abc", stderr);
        assert!(outcome.success);
        assert_eq!(outcome.serial, Some(Serial(5)));
        assert_eq!(outcome.zone_hash.as_deref(), Some(content_hash(b"abc").as_str()));
        assert_eq!(outcome.compiled, "abc");
    }

    #[test]
    fn test_missing_trailing_dots() {
        let compiled = "\
1.2.0.192.in-addr.arpa. 3600 IN PTR host.example.com.
2.2.0.192.in-addr.arpa. 3600 IN PTR host.example.com.2.0.192.in-addr.arpa.
3.2.0.192.in-addr.arpa. 3600 IN A 192.0.2.3
";
        let bad = missing_trailing_dots("2.0.192.in-addr.arpa", compiled);
        assert_eq!(bad.len(), 1);
        assert!(bad[0].starts_with("2.2.0.192"));
    }
}
