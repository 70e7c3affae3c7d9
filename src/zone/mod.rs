pub mod catalog;
pub mod catzone;
pub mod errors;
pub mod origin;
pub mod render;

pub use catalog::{ZoneCatalog, ZoneFilter, ZoneSource, wildcards};
pub use errors::{Result, ZoneError};
pub use origin::zone_name;
pub use render::{Rendered, substitute_serial};

/// Zone constants
pub mod constants {
    /// Extension of zone source and built files
    pub const ZONE_EXTENSION: &str = "zone";

    /// Suffix used in VCS path filters
    pub const ZONE_SUFFIX: &str = ".zone";
}
