use crate::domain::model::{ChatSummary, MessageContent, NumberId, SendOptions, SessionSnapshot};
use crate::utils::error::TransportError;
use async_trait::async_trait;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// The messaging session engine. Everything protocol-related lives behind this port.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn initialize(&self, client_id: &str) -> TransportResult<()>;

    async fn session_state(&self) -> TransportResult<SessionSnapshot>;

    /// Returns `None` when no account is registered at `address`.
    async fn get_number_id(&self, address: &str) -> TransportResult<Option<NumberId>>;

    async fn send_message(
        &self,
        address: &str,
        content: MessageContent,
        options: SendOptions,
    ) -> TransportResult<()>;

    async fn get_chats(&self) -> TransportResult<Vec<ChatSummary>>;
}

pub trait ConfigProvider: Send + Sync {
    fn bridge_url(&self) -> &str;
    fn client_id(&self) -> &str;
    fn upload_dir(&self) -> &str;
    fn max_file_size(&self) -> usize;
    fn allowed_types(&self) -> &str;
}
