// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The structured values the engine exchanges with transport collaborators
//! (§6): `Request`, `Response`, `StreamMessage`. Wire framing and encoding
//! are entirely the collaborators' responsibility — the engine only ever
//! sees opaque, already-framed values.

/// A stable identity shared by an RPC client and its (optional) stream peer
/// (§3: "correlated to its RPC peer by the shared unique id").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// A stream subscription identifier, unique within its owning stream client
/// (§4.3: "uniqueness across clients is not required").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

/// One positional argument, or one return value, in its wire-encoded form.
///
/// The engine never interprets these bytes; it hands them to the service
/// registry's decoder and compares decoded values for equality (never raw
/// bytes — two encodings of the same logical value must be considered equal,
/// per §4.3 and the §9 "result-equality comparison" design note).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedValue(pub Vec<u8>);

impl EncodedValue {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// An addressed call: service name, procedure name, positional arguments.
/// Immutable once constructed (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub service: String,
    pub procedure: String,
    pub arguments: Vec<EncodedValue>,
}

impl Request {
    pub fn new(
        service: impl Into<String>,
        procedure: impl Into<String>,
        arguments: Vec<EncodedValue>,
    ) -> Self {
        Self { service: service.into(), procedure: procedure.into(), arguments }
    }
}

/// Either a successful return value plus a server timestamp, or an error
/// carrying a human-readable message — exactly one of the two shapes (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success { value: EncodedValue, time: f64 },
    Error { message: String },
}

impl Response {
    pub fn success(value: EncodedValue, time: f64) -> Self {
        Self::Success { value, time }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Stamp the server timestamp onto a success response (§4.4.1:
    /// `Response.time = UniversalTime()`). No-op on an error response,
    /// which carries no timestamp field.
    pub fn with_time(self, time: f64) -> Self {
        match self {
            Self::Success { value, .. } => Self::Success { value, time },
            other @ Self::Error { .. } => other,
        }
    }
}

/// A batch of stream responses written to one stream client's outbound
/// channel in a single call, in the insertion order of their `StreamRequest`s
/// (§4.5, §5 "a stream batch's responses appear in the stream's insertion
/// order").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamMessage {
    pub entries: Vec<(StreamId, Response)>,
}

impl StreamMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stream_id: StreamId, response: Response) {
        self.entries.push((stream_id, response));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_exactly_one_shape() {
        let ok = Response::success(EncodedValue::new(vec![1]), 1.0);
        assert!(!ok.is_error());
        let err = Response::error("bad target");
        assert!(err.is_error());
    }

    #[test]
    fn with_time_only_stamps_success() {
        let err = Response::error("nope").with_time(42.0);
        assert_eq!(err, Response::error("nope"));
    }

    #[test]
    fn stream_message_batches_in_insertion_order() {
        let mut msg = StreamMessage::new();
        msg.push(StreamId(2), Response::success(EncodedValue::new(vec![2]), 1.0));
        msg.push(StreamId(1), Response::success(EncodedValue::new(vec![1]), 1.0));
        assert_eq!(msg.entries[0].0, StreamId(2));
        assert_eq!(msg.entries[1].0, StreamId(1));
        assert!(!msg.is_empty());
    }
}
