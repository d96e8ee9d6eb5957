//! Request/response envelopes.
//!
//! Wire shape (positional arrays, signatures at the envelope level):
//!
//! ```json
//! { "req": [id, method, params, timestamp], "sig": ["0x..."] }
//! { "res": [id, method, result, timestamp], "sig": ["0x..."] }
//! ```
//!
//! A broadcast is a response with `id == 0`; its method names the kind.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::method;

/// Correlation id reserved for unsolicited server pushes.
pub const BROADCAST_ID: u64 = 0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Outgoing request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub req: (u64, String, Value, u64),
    pub sig: Vec<String>,
}

impl RequestFrame {
    /// Build an unsigned frame with an unassigned correlation id. The
    /// connection assigns the id before transmission; signing happens after
    /// the id and timestamp are final since the signature covers both.
    pub fn new(method: impl Into<String>, params: Value, timestamp: u64) -> Self {
        Self {
            req: (BROADCAST_ID, method.into(), params, timestamp),
            sig: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.req.0
    }

    pub fn set_id(&mut self, id: u64) {
        self.req.0 = id;
    }

    pub fn method(&self) -> &str {
        &self.req.1
    }

    pub fn params(&self) -> &Value {
        &self.req.2
    }

    pub fn timestamp(&self) -> u64 {
        self.req.3
    }

    /// Canonical bytes covered by the envelope signature: the serialized
    /// `req` array exactly as transmitted.
    pub fn signing_payload(&self) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(&self.req).map_err(|err| WireError::Encode(err.to_string()))
    }

    pub fn push_signature(&mut self, signature: impl Into<String>) {
        self.sig.push(signature.into());
    }

    pub fn to_text(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(|err| WireError::Encode(err.to_string()))
    }

    pub fn from_text(text: &str) -> Result<Self, WireError> {
        serde_json::from_str(text).map_err(|err| WireError::Decode(err.to_string()))
    }
}

/// Incoming response or broadcast envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub res: (u64, String, Value, u64),
    pub sig: Vec<String>,
}

impl ResponseFrame {
    pub fn new(id: u64, method: impl Into<String>, result: Value, timestamp: u64) -> Self {
        Self {
            res: (id, method.into(), result, timestamp),
            sig: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.res.0
    }

    pub fn method(&self) -> &str {
        &self.res.1
    }

    pub fn result(&self) -> &Value {
        &self.res.2
    }

    pub fn timestamp(&self) -> u64 {
        self.res.3
    }

    pub fn is_broadcast(&self) -> bool {
        self.res.0 == BROADCAST_ID
    }

    /// The remote-supplied error message, when this frame is an error reply.
    pub fn error_message(&self) -> Option<String> {
        if self.method() != method::ERROR {
            return None;
        }
        let message = match self.result() {
            Value::String(message) => message.clone(),
            other => other
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        };
        Some(message)
    }

    pub fn to_text(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(|err| WireError::Encode(err.to_string()))
    }

    pub fn from_text(text: &str) -> Result<Self, WireError> {
        serde_json::from_str(text).map_err(|err| WireError::Decode(err.to_string()))
    }
}

pub fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
