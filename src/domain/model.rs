use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const INDIVIDUAL_SUFFIX: &str = "@c.us";
pub const LEGACY_INDIVIDUAL_SUFFIX: &str = "@s.whatsapp.net";
pub const GROUP_SUFFIX: &str = "@g.us";
pub const COUNTRY_CODE: &str = "62";

/// Who the caller means to reach, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Contact(String),
    Group(String),
}

impl Recipient {
    pub fn raw(&self) -> &str {
        match self {
            Recipient::Contact(raw) | Recipient::Group(raw) => raw,
        }
    }
}

/// Address in the exact form the transport expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalAddress {
    Individual(String),
    Group(String),
}

impl CanonicalAddress {
    pub fn as_str(&self) -> &str {
        match self {
            CanonicalAddress::Individual(address) | CanonicalAddress::Group(address) => address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Media {
        file_path: PathBuf,
        mime_type: String,
        caption: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    UnregisteredNumber,
    ContainsNonDigits,
    InvalidGroupId,
    InvalidAddressToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Rejected(RejectionReason),
    TransportFailure,
}

/// Account information returned by the existence check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberId {
    pub user: String,
    pub server: String,
    #[serde(rename = "_serialized")]
    pub serialized: String,
}

/// Transport-native media object, loaded from a persisted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMedia {
    pub mime_type: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl MessageMedia {
    pub async fn from_file_path<P: AsRef<Path>>(path: P, mime_type: &str) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("file")
            .to_string();

        Ok(Self {
            mime_type: mime_type.to_string(),
            filename,
            data,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Media(MessageMedia),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "isGroup", default)]
    pub is_group: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Qr,
    Authenticated,
    Ready,
    AuthFailure,
    Disconnected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Starting => "starting",
            SessionState::Qr => "qr",
            SessionState::Authenticated => "authenticated",
            SessionState::Ready => "ready",
            SessionState::AuthFailure => "auth_failure",
            SessionState::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(default)]
    pub reason: Option<String>,
}
