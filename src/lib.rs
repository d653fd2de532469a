pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod http;
pub mod utils;

pub use adapters::{BridgeTransport, UploadStore};
pub use config::{CliArgs, RelayConfig};
pub use core::{orchestrator::SendOrchestrator, resolver::resolve, session::SessionMonitor};
pub use http::{router, AppState};
pub use utils::error::{RelayError, Result};
