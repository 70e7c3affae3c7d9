use std::fmt;
use std::path::PathBuf;

/// Zone data errors
#[derive(Debug)]
pub enum ZoneError {
    /// `$ORIGIN` names a different zone than the file name
    OriginMismatch {
        path: PathBuf,
        origin: String,
        stem: String,
    },
    /// Zone file could not be read
    Unreadable { path: PathBuf, source: std::io::Error },
    /// File name does not yield a zone name
    InvalidFileName(PathBuf),
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OriginMismatch { path, origin, stem } => write!(
                f,
                "{}: Zone origin {} differs from zone file name {}",
                path.display(),
                origin,
                stem
            ),
            Self::Unreadable { path, source } => {
                write!(f, "{}: Cannot read zone file: {}", path.display(), source)
            }
            Self::InvalidFileName(path) => {
                write!(f, "{}: Cannot derive a zone name", path.display())
            }
        }
    }
}

impl std::error::Error for ZoneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ZoneError>;
