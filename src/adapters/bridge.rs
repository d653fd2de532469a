use crate::domain::model::{
    ChatSummary, MessageContent, NumberId, SendOptions, SessionSnapshot,
};
use crate::domain::ports::{ConfigProvider, Transport, TransportResult};
use crate::utils::error::TransportError;
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};

/// Transport backed by a messaging-client bridge process that owns the
/// actual session and exposes it over HTTP.
#[derive(Debug, Clone)]
pub struct BridgeTransport {
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct InitializeRequest<'a> {
    #[serde(rename = "clientId")]
    client_id: &'a str,
}

#[derive(Serialize)]
struct NumberIdRequest<'a> {
    id: &'a str,
}

#[derive(Deserialize)]
struct NumberIdResponse {
    #[serde(rename = "numberId", default)]
    number_id: Option<NumberId>,
}

#[derive(Serialize)]
struct TextMessageRequest<'a> {
    #[serde(rename = "chatId")]
    chat_id: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl BridgeTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self::new(config.bridge_url())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-2xx reply into a `Remote` error carrying the bridge's message.
    async fn check(response: Response) -> TransportResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);

        Err(TransportError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> TransportResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| TransportError::InvalidResponse(format!("{}: {}", e, body)))
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn initialize(&self, client_id: &str) -> TransportResult<()> {
        tracing::debug!("Initializing bridge session at {}", self.base_url);
        let response = self
            .client
            .post(self.url("/session"))
            .json(&InitializeRequest { client_id })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn session_state(&self) -> TransportResult<SessionSnapshot> {
        let response = self.client.get(self.url("/session")).send().await?;
        let response = Self::check(response).await?;
        Self::parse(response).await
    }

    async fn get_number_id(&self, address: &str) -> TransportResult<Option<NumberId>> {
        let response = self
            .client
            .post(self.url("/number-id"))
            .json(&NumberIdRequest { id: address })
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body: NumberIdResponse = Self::parse(response).await?;
        Ok(body.number_id)
    }

    async fn send_message(
        &self,
        address: &str,
        content: MessageContent,
        options: SendOptions,
    ) -> TransportResult<()> {
        let request = match content {
            MessageContent::Text(body) => self.client.post(self.url("/messages")).json(
                &TextMessageRequest {
                    chat_id: address,
                    content: &body,
                },
            ),
            MessageContent::Media(media) => {
                let part = multipart::Part::bytes(media.data)
                    .file_name(media.filename)
                    .mime_str(&media.mime_type)
                    .map_err(|e| TransportError::InvalidResponse(format!("mime error: {e}")))?;

                let form = multipart::Form::new()
                    .text("chatId", address.to_string())
                    .text("caption", options.caption.unwrap_or_default())
                    .part("file", part);

                self.client.post(self.url("/messages/media")).multipart(form)
            }
        };

        let response = request.send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_chats(&self) -> TransportResult<Vec<ChatSummary>> {
        let response = self.client.get(self.url("/chats")).send().await?;
        let response = Self::check(response).await?;
        Self::parse(response).await
    }
}
