use crate::core::resolver::resolve;
use crate::core::validator::{check_group_id, validate};
use crate::domain::model::{
    CanonicalAddress, MessageContent, MessageMedia, Payload, Recipient, RejectionReason,
    SendOptions, SendOutcome,
};
use crate::domain::ports::Transport;
use crate::utils::error::TransportError;
use std::sync::Arc;

/// Resolves, validates and sends one message per call through the shared transport.
pub struct SendOrchestrator<T: Transport + ?Sized> {
    transport: Arc<T>,
}

impl<T: Transport + ?Sized> Clone for SendOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport + ?Sized> SendOrchestrator<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn send(&self, recipient: &Recipient, payload: Payload) -> SendOutcome {
        let raw = recipient.raw();

        // 群組路由只接受 @g.us，未通過前不碰 transport
        if let Recipient::Group(group_id) = recipient {
            if let Err(reason) = check_group_id(group_id) {
                tracing::warn!("Rejected group id {}: {:?}", group_id, reason);
                return SendOutcome::Rejected(reason);
            }
        }

        let address = resolve(raw);
        tracing::debug!("Resolved {} to {:?}", raw, address);

        match validate(self.transport.as_ref(), &address, raw).await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                tracing::warn!("Rejected destination {}: {:?}", raw, reason);
                return SendOutcome::Rejected(reason);
            }
            Err(e) => {
                tracing::error!("Failed to verify destination {}: {}", raw, e);
                return Self::map_failure(&e);
            }
        }

        match self.dispatch(&address, payload).await {
            Ok(()) => {
                tracing::info!("Message delivered to {}", raw);
                SendOutcome::Sent
            }
            Err(e) => {
                tracing::error!("Failed to send message to {}: {}", raw, e);
                Self::map_failure(&e)
            }
        }
    }

    async fn dispatch(
        &self,
        address: &CanonicalAddress,
        payload: Payload,
    ) -> Result<(), TransportError> {
        let (content, options) = match payload {
            Payload::Text(body) => (MessageContent::Text(body), SendOptions::default()),
            Payload::Media {
                file_path,
                mime_type,
                caption,
            } => {
                let media = MessageMedia::from_file_path(&file_path, &mime_type).await?;
                let options = SendOptions {
                    caption: Some(caption.unwrap_or_default()),
                };
                (MessageContent::Media(media), options)
            }
        };

        self.transport
            .send_message(address.as_str(), content, options)
            .await
    }

    fn map_failure(error: &TransportError) -> SendOutcome {
        if error.is_invalid_wid() {
            SendOutcome::Rejected(RejectionReason::InvalidAddressToken)
        } else {
            SendOutcome::TransportFailure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ChatSummary, NumberId, SessionSnapshot, SessionState};
    use crate::domain::ports::TransportResult;
    use async_trait::async_trait;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct SentMessage {
        address: String,
        content: MessageContent,
        options: SendOptions,
    }

    #[derive(Default)]
    struct MockTransport {
        registered: bool,
        send_error: Option<String>,
        lookup_error: Option<String>,
        lookups: Mutex<Vec<String>>,
        sent: Mutex<Vec<SentMessage>>,
    }

    impl MockTransport {
        fn registered() -> Self {
            Self {
                registered: true,
                ..Default::default()
            }
        }

        fn failing_send(message: &str) -> Self {
            Self {
                registered: true,
                send_error: Some(message.to_string()),
                ..Default::default()
            }
        }

        fn failing_lookup(message: &str) -> Self {
            Self {
                lookup_error: Some(message.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn initialize(&self, _client_id: &str) -> TransportResult<()> {
            Ok(())
        }

        async fn session_state(&self) -> TransportResult<SessionSnapshot> {
            Ok(SessionSnapshot {
                state: SessionState::Ready,
                reason: None,
            })
        }

        async fn get_number_id(&self, address: &str) -> TransportResult<Option<NumberId>> {
            self.lookups.lock().await.push(address.to_string());
            if let Some(message) = &self.lookup_error {
                return Err(TransportError::Remote {
                    status: 500,
                    message: message.clone(),
                });
            }
            Ok(self.registered.then(|| NumberId {
                user: address.trim_end_matches("@c.us").to_string(),
                server: "c.us".to_string(),
                serialized: address.to_string(),
            }))
        }

        async fn send_message(
            &self,
            address: &str,
            content: MessageContent,
            options: SendOptions,
        ) -> TransportResult<()> {
            self.sent.lock().await.push(SentMessage {
                address: address.to_string(),
                content,
                options,
            });
            match &self.send_error {
                Some(message) => Err(TransportError::Remote {
                    status: 500,
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }

        async fn get_chats(&self) -> TransportResult<Vec<ChatSummary>> {
            Ok(vec![])
        }
    }

    fn orchestrator(transport: MockTransport) -> (SendOrchestrator<MockTransport>, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        (SendOrchestrator::new(Arc::clone(&transport)), transport)
    }

    #[tokio::test]
    async fn test_send_text_to_local_number() {
        let (orchestrator, transport) = orchestrator(MockTransport::registered());

        let outcome = orchestrator
            .send(
                &Recipient::Contact("081234567".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::Sent);
        assert_eq!(*transport.lookups.lock().await, vec!["6281234567@c.us"]);

        let sent = transport.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].address, "6281234567@c.us");
        assert_eq!(sent[0].content, MessageContent::Text("hi".to_string()));
        assert_eq!(sent[0].options, SendOptions::default());
    }

    #[tokio::test]
    async fn test_unregistered_number_is_rejected_without_send() {
        let (orchestrator, transport) = orchestrator(MockTransport::default());

        let outcome = orchestrator
            .send(
                &Recipient::Contact("081234567".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::Rejected(RejectionReason::UnregisteredNumber));
        assert!(transport.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_registered_non_digit_number_is_rejected() {
        let (orchestrator, transport) = orchestrator(MockTransport::registered());

        let outcome = orchestrator
            .send(
                &Recipient::Contact("abc123".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::Rejected(RejectionReason::ContainsNonDigits));
        assert_eq!(*transport.lookups.lock().await, vec!["abc123@c.us"]);
        assert!(transport.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_group_id_never_reaches_transport() {
        let (orchestrator, transport) = orchestrator(MockTransport::registered());

        let outcome = orchestrator
            .send(
                &Recipient::Group("groupXYZ".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::Rejected(RejectionReason::InvalidGroupId));
        assert!(transport.lookups.lock().await.is_empty());
        assert!(transport.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_group_send_skips_existence_check() {
        let (orchestrator, transport) = orchestrator(MockTransport::default());

        let outcome = orchestrator
            .send(
                &Recipient::Group("120363001234567890@g.us".to_string()),
                Payload::Text("hello group".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::Sent);
        assert!(transport.lookups.lock().await.is_empty());
        assert_eq!(transport.sent.lock().await[0].address, "120363001234567890@g.us");
    }

    #[tokio::test]
    async fn test_contact_with_group_suffix_is_sent_as_group() {
        let (orchestrator, transport) = orchestrator(MockTransport::default());

        let outcome = orchestrator
            .send(
                &Recipient::Contact("1203630@g.us".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::Sent);
        assert!(transport.lookups.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_wid_maps_to_rejection() {
        let (orchestrator, _) = orchestrator(MockTransport::failing_send(
            "Evaluation failed: Error: invalid wid",
        ));

        let outcome = orchestrator
            .send(
                &Recipient::Contact("6281234567".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::Rejected(RejectionReason::InvalidAddressToken));
    }

    #[tokio::test]
    async fn test_other_send_errors_are_transport_failures() {
        let (orchestrator, transport) = orchestrator(MockTransport::failing_send("Session closed"));

        let outcome = orchestrator
            .send(
                &Recipient::Contact("6281234567".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::TransportFailure);
        // 不重試
        assert_eq!(transport.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_wid_during_lookup_is_rejected_without_send() {
        let (orchestrator, transport) = orchestrator(MockTransport::failing_lookup(
            "Evaluation failed: Error: invalid wid",
        ));

        let outcome = orchestrator
            .send(
                &Recipient::Contact("62812:34".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::Rejected(RejectionReason::InvalidAddressToken));
        assert_eq!(transport.lookups.lock().await.len(), 1);
        assert!(transport.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_transport_failure() {
        let (orchestrator, transport) = orchestrator(MockTransport::failing_lookup("Session closed"));

        let outcome = orchestrator
            .send(
                &Recipient::Contact("081234567".to_string()),
                Payload::Text("hi".to_string()),
            )
            .await;

        assert_eq!(outcome, SendOutcome::TransportFailure);
        assert!(transport.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_media_with_caption() {
        let (orchestrator, transport) = orchestrator(MockTransport::registered());
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let outcome = orchestrator
            .send(
                &Recipient::Contact("081234567@s.whatsapp.net".to_string()),
                Payload::Media {
                    file_path: file.path().to_path_buf(),
                    mime_type: "image/png".to_string(),
                    caption: Some("look".to_string()),
                },
            )
            .await;

        assert_eq!(outcome, SendOutcome::Sent);
        let sent = transport.sent.lock().await;
        assert_eq!(sent[0].address, "6281234567@c.us");
        assert_eq!(sent[0].options.caption.as_deref(), Some("look"));
        match &sent[0].content {
            MessageContent::Media(media) => {
                assert_eq!(media.mime_type, "image/png");
                assert_eq!(media.data, b"\x89PNG");
            }
            other => panic!("expected media content, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_media_without_caption_uses_empty_string() {
        let (orchestrator, transport) = orchestrator(MockTransport::registered());
        let file = NamedTempFile::new().unwrap();

        orchestrator
            .send(
                &Recipient::Contact("6281234567".to_string()),
                Payload::Media {
                    file_path: file.path().to_path_buf(),
                    mime_type: "application/pdf".to_string(),
                    caption: None,
                },
            )
            .await;

        assert_eq!(transport.sent.lock().await[0].options.caption.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_missing_media_file_is_transport_failure() {
        let (orchestrator, transport) = orchestrator(MockTransport::registered());

        let outcome = orchestrator
            .send(
                &Recipient::Contact("6281234567".to_string()),
                Payload::Media {
                    file_path: PathBuf::from("/nonexistent/file-123.png"),
                    mime_type: "image/png".to_string(),
                    caption: None,
                },
            )
            .await;

        assert_eq!(outcome, SendOutcome::TransportFailure);
        assert!(transport.sent.lock().await.is_empty());
    }
}
