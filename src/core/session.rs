use crate::domain::model::{SessionSnapshot, SessionState};
use crate::domain::ports::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Lifecycle signal emitted when the transport session changes state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    QrPending,
    Authenticated,
    Ready,
    AuthFailure(String),
    Disconnected(String),
}

impl SessionEvent {
    /// Maps a state transition to the event it represents, if any.
    pub fn from_transition(previous: Option<SessionState>, current: &SessionSnapshot) -> Option<Self> {
        if previous == Some(current.state) {
            return None;
        }

        let reason = || current.reason.clone().unwrap_or_default();
        match current.state {
            SessionState::Starting => None,
            SessionState::Qr => Some(SessionEvent::QrPending),
            SessionState::Authenticated => Some(SessionEvent::Authenticated),
            SessionState::Ready => Some(SessionEvent::Ready),
            SessionState::AuthFailure => Some(SessionEvent::AuthFailure(reason())),
            SessionState::Disconnected => Some(SessionEvent::Disconnected(reason())),
        }
    }
}

/// Follows the transport session and publishes readiness.
pub struct SessionMonitor<T: Transport + ?Sized> {
    transport: Arc<T>,
    poll_interval: Duration,
    state_tx: watch::Sender<SessionState>,
    last_state: Option<SessionState>,
}

impl<T: Transport + ?Sized> SessionMonitor<T> {
    pub fn new(transport: Arc<T>, poll_interval: Duration) -> (Self, watch::Receiver<SessionState>) {
        let (state_tx, state_rx) = watch::channel(SessionState::Starting);
        let monitor = Self {
            transport,
            poll_interval,
            state_tx,
            last_state: None,
        };
        (monitor, state_rx)
    }

    /// Polls until every receiver is dropped.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.state_tx.is_closed() {
                tracing::debug!("Session monitor stopped");
                return;
            }
            self.poll_once().await;
        }
    }

    pub async fn poll_once(&mut self) -> Option<SessionEvent> {
        let snapshot = match self.transport.session_state().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Failed to poll session state: {}", e);
                return None;
            }
        };

        let event = SessionEvent::from_transition(self.last_state, &snapshot);
        self.last_state = Some(snapshot.state);
        self.state_tx.send_replace(snapshot.state);

        if let Some(event) = &event {
            self.handle_event(event).await;
        }
        event
    }

    async fn handle_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::QrPending => {
                tracing::info!("Waiting for the session to be paired by QR code on the bridge");
            }
            SessionEvent::Authenticated => tracing::info!("Authenticated"),
            SessionEvent::AuthFailure(reason) => {
                tracing::error!("Authentication failure: {}", reason);
            }
            SessionEvent::Disconnected(reason) => {
                tracing::warn!("Client was logged out: {}", reason);
            }
            SessionEvent::Ready => {
                tracing::info!("✅ WhatsApp session is ready");
                self.log_groups().await;
            }
        }
    }

    async fn log_groups(&self) {
        let chats = match self.transport.get_chats().await {
            Ok(chats) => chats,
            Err(e) => {
                tracing::error!("Failed to list chats: {}", e);
                return;
            }
        };

        let groups: Vec<_> = chats.into_iter().filter(|chat| chat.is_group).collect();
        if groups.is_empty() {
            tracing::info!("No groups found");
            return;
        }

        tracing::info!("Found {} group(s)", groups.len());
        for (index, group) in groups.iter().enumerate() {
            tracing::info!(
                group = index + 1,
                name = %group.name,
                id = %group.id,
                "Group available"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ChatSummary, MessageContent, NumberId, SendOptions};
    use crate::domain::ports::TransportResult;
    use crate::utils::error::TransportError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct ScriptedTransport {
        states: Mutex<VecDeque<Option<SessionState>>>,
        chat_calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(states: Vec<Option<SessionState>>) -> Self {
            Self {
                states: Mutex::new(states.into()),
                chat_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn initialize(&self, _client_id: &str) -> TransportResult<()> {
            Ok(())
        }

        async fn session_state(&self) -> TransportResult<SessionSnapshot> {
            match self.states.lock().await.pop_front().flatten() {
                Some(state) => Ok(SessionSnapshot {
                    state,
                    reason: Some("LOGOUT".to_string()),
                }),
                None => Err(TransportError::InvalidResponse("bridge offline".to_string())),
            }
        }

        async fn get_number_id(&self, _address: &str) -> TransportResult<Option<NumberId>> {
            Ok(None)
        }

        async fn send_message(
            &self,
            _address: &str,
            _content: MessageContent,
            _options: SendOptions,
        ) -> TransportResult<()> {
            Ok(())
        }

        async fn get_chats(&self) -> TransportResult<Vec<ChatSummary>> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                ChatSummary {
                    id: "120363001234567890@g.us".to_string(),
                    name: "Ops".to_string(),
                    is_group: true,
                },
                ChatSummary {
                    id: "6281234567@c.us".to_string(),
                    name: "Budi".to_string(),
                    is_group: false,
                },
            ])
        }
    }

    #[test]
    fn test_repeated_state_emits_nothing() {
        let snapshot = SessionSnapshot {
            state: SessionState::Ready,
            reason: None,
        };
        assert_eq!(
            SessionEvent::from_transition(None, &snapshot),
            Some(SessionEvent::Ready)
        );
        assert_eq!(
            SessionEvent::from_transition(Some(SessionState::Ready), &snapshot),
            None
        );
    }

    #[tokio::test]
    async fn test_lifecycle_updates_readiness() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Some(SessionState::Qr),
            Some(SessionState::Authenticated),
            Some(SessionState::Ready),
            Some(SessionState::Ready),
            None,
            Some(SessionState::Disconnected),
        ]));
        let (mut monitor, state_rx) =
            SessionMonitor::new(Arc::clone(&transport), Duration::from_millis(10));

        assert_eq!(monitor.poll_once().await, Some(SessionEvent::QrPending));
        assert_eq!(monitor.poll_once().await, Some(SessionEvent::Authenticated));
        assert_eq!(monitor.poll_once().await, Some(SessionEvent::Ready));
        assert_eq!(*state_rx.borrow(), SessionState::Ready);
        assert_eq!(transport.chat_calls.load(Ordering::SeqCst), 1);

        // 同狀態與輪詢失敗都不發事件
        assert_eq!(monitor.poll_once().await, None);
        assert_eq!(monitor.poll_once().await, None);
        assert_eq!(*state_rx.borrow(), SessionState::Ready);

        assert_eq!(
            monitor.poll_once().await,
            Some(SessionEvent::Disconnected("LOGOUT".to_string()))
        );
        assert_eq!(*state_rx.borrow(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_run_stops_when_receivers_dropped() {
        let transport = Arc::new(ScriptedTransport::new(vec![Some(SessionState::Ready)]));
        let (monitor, state_rx) = SessionMonitor::new(transport, Duration::from_millis(5));
        drop(state_rx);

        tokio::time::timeout(Duration::from_secs(1), monitor.run())
            .await
            .expect("monitor should stop once nobody listens");
    }
}
