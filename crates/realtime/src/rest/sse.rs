//! Server-Sent Events decoding for the database's streaming endpoint.
//!
//! The byte stream is split into events here; [`apply_event`] folds each
//! event into a local mirror of the listened-to location.

use serde::Deserialize;
use serde_json::Value;

use icyxr_core::StoreError;

use crate::tree;

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE line parser. Chunks may split lines anywhere.
#[derive(Debug, Default)]
pub(crate) struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    /// Feed a chunk and return every event it completed.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = line
                .split_once(':')
                .map_or((line, ""), |(f, v)| (f, v.strip_prefix(' ').unwrap_or(v)));
            match field {
                "event" => self.event = Some(value.to_owned()),
                "data" => self.data.push(value.to_owned()),
                _ => {}
            }
        }

        events
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = SseEvent {
            event: self.event.take().unwrap_or_else(|| "message".to_owned()),
            data: self.data.join("\n"),
        };
        self.data.clear();
        Some(event)
    }
}

/// Whether an event changed the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Changed,
    Ignored,
}

#[derive(Deserialize)]
struct Payload {
    path: String,
    data: Value,
}

/// Fold one event into `mirror`.
///
/// # Errors
///
/// Returns `StoreError::Unavailable` when the server cancels the stream or
/// revokes the credentials, and `StoreError::Decode` for malformed payloads.
pub(crate) fn apply_event(
    mirror: &mut Value,
    event: &SseEvent,
    label: &str,
) -> Result<Applied, StoreError> {
    match event.event.as_str() {
        "put" => {
            let payload = parse_payload(&event.data, label)?;
            tree::write_at(mirror, &tree::segments_of(&payload.path), Some(payload.data));
            Ok(Applied::Changed)
        }
        "patch" => {
            let payload = parse_payload(&event.data, label)?;
            let Value::Object(fields) = payload.data else {
                return Err(decode(label, "patch data is not an object"));
            };
            tree::merge_at(mirror, &tree::segments_of(&payload.path), fields);
            Ok(Applied::Changed)
        }
        "cancel" => Err(StoreError::Unavailable(format!(
            "listener on {label} cancelled by server"
        ))),
        "auth_revoked" => Err(StoreError::Unavailable(format!(
            "credentials revoked while listening on {label}"
        ))),
        _ => Ok(Applied::Ignored),
    }
}

fn parse_payload(data: &str, label: &str) -> Result<Payload, StoreError> {
    serde_json::from_str(data).map_err(|e| decode(label, e))
}

fn decode(label: &str, message: impl std::fmt::Display) -> StoreError {
    StoreError::Decode {
        path: label.to_owned(),
        message: message.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parser_handles_split_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"event: put\ndata: {\"path\":\"/\",").is_empty());
        let events = parser.feed(b"\"data\":1}\r\n\r\n: comment\n\nevent: keep-alive\ndata: null\n\n");
        assert_eq!(
            events,
            [
                SseEvent {
                    event: "put".into(),
                    data: r#"{"path":"/","data":1}"#.into()
                },
                SseEvent {
                    event: "keep-alive".into(),
                    data: "null".into()
                },
            ]
        );
    }

    #[test]
    fn test_put_and_patch_update_mirror() {
        let mut mirror = Value::Null;
        let put = SseEvent {
            event: "put".into(),
            data: r#"{"path":"/","data":{"status":"waiting","userId":"u1"}}"#.into(),
        };
        let patch = SseEvent {
            event: "patch".into(),
            data: r#"{"path":"/","data":{"status":"active","adminId":"a1"}}"#.into(),
        };
        let nested = SseEvent {
            event: "put".into(),
            data: r#"{"path":"/messages/-M1","data":{"text":"hi"}}"#.into(),
        };

        assert_eq!(apply_event(&mut mirror, &put, "chat").unwrap(), Applied::Changed);
        apply_event(&mut mirror, &patch, "chat").unwrap();
        apply_event(&mut mirror, &nested, "chat").unwrap();

        assert_eq!(
            mirror,
            json!({
                "status": "active",
                "userId": "u1",
                "adminId": "a1",
                "messages": {"-M1": {"text": "hi"}}
            })
        );
    }

    #[test]
    fn test_put_null_at_root_clears_mirror() {
        let mut mirror = json!({"a": 1});
        let event = SseEvent {
            event: "put".into(),
            data: r#"{"path":"/","data":null}"#.into(),
        };
        apply_event(&mut mirror, &event, "x").unwrap();
        assert_eq!(mirror, Value::Null);
    }

    #[test]
    fn test_keep_alive_ignored_and_cancel_fails() {
        let mut mirror = Value::Null;
        let keep_alive = SseEvent {
            event: "keep-alive".into(),
            data: "null".into(),
        };
        assert_eq!(
            apply_event(&mut mirror, &keep_alive, "x").unwrap(),
            Applied::Ignored
        );

        let cancel = SseEvent {
            event: "cancel".into(),
            data: "permission denied".into(),
        };
        assert!(matches!(
            apply_event(&mut mirror, &cancel, "x"),
            Err(StoreError::Unavailable(_))
        ));
    }
}
