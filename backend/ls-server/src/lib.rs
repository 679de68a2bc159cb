//! HTTP local server and host binary for the local-server subsystem.

pub mod cli;
pub mod error;
pub mod health;
pub mod launcher;
pub mod logger;
pub mod pair_command;
pub mod routes;
pub mod serve_command;
pub mod service_info;

#[cfg(test)]
mod tests;

pub use crate::cli::{Cli, Commands};
pub use crate::error::{Result as ServerResult, ServerError};
pub use crate::launcher::HttpServiceLauncher;
pub use crate::pair_command::PairArgs;
pub use crate::routes::build_router;
pub use crate::serve_command::ServeArgs;
pub use crate::service_info::ServiceInfo;
