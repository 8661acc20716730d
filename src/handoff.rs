//! Handoff results
//!
//! A handoff command does not answer directly; it returns connection details
//! for a specialized channel (a websocket, an SSE feed) the client opens
//! itself. Only the result shape lives here.

use crate::commands::CommandDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

const HANDOFF_TAG: &str = "handoff";
const HANDOFF_TAG_PREFIX: &str = "handoff:";

/// Channel type a client dispatches on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HandoffProtocol {
    WebSocket,
    WebRtc,
    Sse,
    HttpStream,
    Custom(String),
}

impl HandoffProtocol {
    pub fn as_str(&self) -> &str {
        match self {
            HandoffProtocol::WebSocket => "websocket",
            HandoffProtocol::WebRtc => "webrtc",
            HandoffProtocol::Sse => "sse",
            HandoffProtocol::HttpStream => "http-stream",
            HandoffProtocol::Custom(name) => name,
        }
    }
}

impl From<String> for HandoffProtocol {
    fn from(value: String) -> Self {
        match value.as_str() {
            "websocket" => HandoffProtocol::WebSocket,
            "webrtc" => HandoffProtocol::WebRtc,
            "sse" => HandoffProtocol::Sse,
            "http-stream" => HandoffProtocol::HttpStream,
            _ => HandoffProtocol::Custom(value),
        }
    }
}

impl From<&str> for HandoffProtocol {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<HandoffProtocol> for String {
    fn from(protocol: HandoffProtocol) -> Self {
        match protocol {
            HandoffProtocol::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for HandoffProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandoffCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_ms: Option<u64>,
}

/// Hints for the client deciding whether and how to connect
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandoffMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_latency: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
    /// RFC 3339 expiry of the credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<ReconnectPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandoffResult {
    pub protocol: HandoffProtocol,
    /// Full URL to connect to
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<HandoffCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HandoffMetadata>,
}

impl HandoffResult {
    pub fn new(protocol: impl Into<HandoffProtocol>, endpoint: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            endpoint: endpoint.into(),
            credentials: None,
            metadata: None,
        }
    }

    pub fn with_credentials(mut self, credentials: HandoffCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_metadata(mut self, metadata: HandoffMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Parses a command payload as a handoff
    pub fn from_value(value: &Value) -> Option<Self> {
        let handoff: HandoffResult = serde_json::from_value(value.clone()).ok()?;
        if handoff.protocol.as_str().is_empty() || handoff.endpoint.is_empty() {
            return None;
        }
        Some(handoff)
    }
}

/// Whether a command payload is a well-formed handoff
pub fn is_handoff(value: &Value) -> bool {
    HandoffResult::from_value(value).is_some()
}

/// A command hands off when flagged or tagged `handoff`
pub fn is_handoff_command(definition: &CommandDefinition) -> bool {
    definition.handoff || definition.has_tag(HANDOFF_TAG)
}

/// Protocol declared through a `handoff:<protocol>` tag
pub fn handoff_protocol(definition: &CommandDefinition) -> Option<HandoffProtocol> {
    if !is_handoff_command(definition) {
        return None;
    }
    definition
        .tags
        .iter()
        .find_map(|tag| tag.strip_prefix(HANDOFF_TAG_PREFIX))
        .filter(|protocol| !protocol.is_empty())
        .map(HandoffProtocol::from)
}
