//! Wire messages.
//!
//! Outbound: `{"id": "<n>", "method": "<name>", "params": [...]}`.
//! Inbound success: `{"id": "<n>", "result": <any>}`.
//! Inbound error: `{"id": "<n>", "error": {"code": <int>, "message": "<text>"}}`.
//! Frames carrying neither an id nor a result/error are unsolicited and ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::identifier::RequestId;

/// Positional call arguments.
///
/// A lone value is wrapped into a one-element sequence; `null` means no
/// arguments; an array is taken as the argument list itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<Value>);

impl Params {
    /// No arguments.
    pub fn none() -> Self {
        Self::default()
    }

    /// Serialize any value and normalise it into positional arguments.
    pub fn from_serialize<T: Serialize>(value: T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self(Vec::new()),
            Value::Array(items) => Self(items),
            other => Self(vec![other]),
        }
    }
}

impl From<Option<Value>> for Params {
    fn from(value: Option<Value>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl From<Vec<Value>> for Params {
    fn from(items: Vec<Value>) -> Self {
        Self(items)
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

/// An outbound call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    pub params: Vec<Value>,
}

impl Request {
    pub fn new(id: RequestId, method: impl Into<String>, params: Params) -> Self {
        Self {
            id,
            method: method.into(),
            params: params.into_vec(),
        }
    }

    /// Encode as a text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Error object reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Successful reply to a request.
    Result { id: RequestId, result: Value },
    /// Failed reply. The id may be missing when the remote could not read it.
    Error {
        id: Option<RequestId>,
        error: RemoteError,
    },
    /// Anything not addressed to a request (server push, notifications).
    Unsolicited,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RemoteError>,
}

impl InboundFrame {
    /// Parse a raw text frame.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let frame: RawFrame = serde_json::from_str(raw)?;

        if let Some(error) = frame.error {
            return Ok(Self::Error {
                id: frame.id,
                error,
            });
        }

        match frame.id {
            Some(id) => Ok(Self::Result {
                id,
                result: frame.result.unwrap_or(Value::Null),
            }),
            None => Ok(Self::Unsolicited),
        }
    }
}
