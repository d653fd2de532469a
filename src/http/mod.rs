pub mod response;
pub mod routes;
pub mod server;

pub use routes::{router, AppState};
