pub mod changeset;
pub mod config;
pub mod dns;
pub mod error;
pub mod nsconf;
pub mod pipeline;
pub mod serial;
pub mod state;
pub mod tools;
pub mod vcs;
pub mod zone;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, Tools};
pub use serial::Serial;
pub use state::PersistedState;
