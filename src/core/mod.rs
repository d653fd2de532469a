pub mod orchestrator;
pub mod resolver;
pub mod session;
pub mod validator;

pub use crate::domain::model::{CanonicalAddress, Payload, Recipient, RejectionReason, SendOutcome};
pub use crate::domain::ports::{ConfigProvider, Transport};
pub use crate::utils::error::Result;
