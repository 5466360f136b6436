//! Incremental Server-Sent Events decoder
//!
//! Bytes arrive in arbitrary chunks; complete events are handed out as soon
//! as their terminating blank line has been seen. Comment lines (the
//! keep-alives servers send on idle streams) are skipped. `id:` fields are
//! ignored; the latest `retry:` hint is kept for reconnect scheduling.

use std::time::Duration;

use bytes::{Buf, BytesMut};

/// One dispatched event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// `event:` field, if the server set one
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Push-based SSE line parser
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    event: Option<String>,
    data: Vec<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the transport
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete event, or `None` until more bytes arrive
    pub fn next_event(&mut self) -> Option<SseEvent> {
        while let Some(line) = self.take_line() {
            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    return Some(event);
                }
            } else {
                self.process_line(&line);
            }
        }
        None
    }

    /// Reconnect delay most recently requested by the server
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    /// Bytes buffered but not yet part of a complete line
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|&b| b == b'\n' || b == b'\r')?;

        let terminator = if self.buf[end] == b'\r' {
            match self.buf.get(end + 1) {
                Some(b'\n') => 2,
                Some(_) => 1,
                // A lone CR at the end may be the first half of CRLF
                None => return None,
            }
        } else {
            1
        };

        let line = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf.advance(end + terminator);
        Some(line)
    }

    fn process_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut SseDecoder) -> Vec<SseEvent> {
        std::iter::from_fn(|| decoder.next_event()).collect()
    }

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: {\"price\":\"1.00\"}\n\n");

        let events = decode_all(&mut decoder);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, r#"{"price":"1.00"}"#);
        assert_eq!(events[0].event, None);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"da");
        assert!(decoder.next_event().is_none());
        decoder.push(b"ta: abc\r");
        assert!(decoder.next_event().is_none());
        decoder.push(b"\n\r\n");

        assert_eq!(decoder.next_event().unwrap().data, "abc");
    }

    #[test]
    fn test_comments_and_keep_alives_are_skipped() {
        let mut decoder = SseDecoder::new();
        decoder.push(b":\n\n: keep-alive\n\ndata: x\n\n");

        let events = decode_all(&mut decoder);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn test_multiline_data_and_fields() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"event: price\nid: 7\ndata: a\ndata:b\n\n");

        let event = decoder.next_event().unwrap();
        assert_eq!(event.event.as_deref(), Some("price"));
        assert_eq!(event.data, "a\nb");
    }

    #[test]
    fn test_event_type_resets_between_events() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"event: other\ndata: 1\n\ndata: 2\n\n");

        let events = decode_all(&mut decoder);
        assert_eq!(events[0].event.as_deref(), Some("other"));
        assert_eq!(events[1].event, None);
    }

    #[test]
    fn test_event_without_data_is_dropped() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"event: ping\n\ndata: real\n\n");

        let events = decode_all(&mut decoder);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
        assert_eq!(events[0].event, None);
    }

    #[test]
    fn test_retry_hint_is_kept_without_data() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.retry(), None);

        decoder.push(b"retry: 1500\n\n");
        assert!(decoder.next_event().is_none());
        assert_eq!(decoder.retry(), Some(Duration::from_millis(1500)));

        decoder.push(b"retry: soon\ndata: x\n\n");
        assert_eq!(decoder.next_event().unwrap().data, "x");
        assert_eq!(decoder.retry(), Some(Duration::from_millis(1500)));
    }
}
