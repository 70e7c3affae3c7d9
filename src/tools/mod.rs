//! External collaborators: zone checker, zone compiler and deploy script.

pub mod checker;
pub mod command;
pub mod deployer;

pub use checker::{
    CheckOutcome, CommandChecker, CommandCompiler, CompileOutcome, SyntaxChecker, ZoneCompiler,
    missing_trailing_dots,
};
pub use command::CommandTemplate;
pub use deployer::{Deployer, ScriptDeployer};
