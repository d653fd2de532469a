// Adapters layer: concrete implementations for external systems (bridge transport, upload storage).

pub mod bridge;
pub mod uploads;

pub use bridge::BridgeTransport;
pub use uploads::{StoredFile, UploadStore, UploadWriter};
