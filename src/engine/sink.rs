// Sat Jan 17 2026 - Alex

use crate::engine::result::KeyCount;
use crate::engine::termination::{CompletionCounter, ProtocolError};
use crate::engine::EngineError;
use crate::transport::wire::{Entry, WindowReader};
use crate::transport::{Envelope, Rank, Tag, TransportError};
use crate::window::WindowEvent;
use ahash::AHashMap;
use itertools::Itertools;

/// Terminal collector of window events.
///
/// Counts events recorded locally (when the sink rank also owns keys) and
/// those arriving from upstream producers, and knows the run is over once
/// every producer's marker is in.
pub struct Sink {
    producers: CompletionCounter,
    total: u64,
    keys: Option<AHashMap<String, u64>>,
}

impl Sink {
    pub fn new<I>(producers: I) -> Self
    where
        I: IntoIterator<Item = Rank>,
    {
        Self {
            producers: CompletionCounter::new("windows", producers),
            total: 0,
            keys: None,
        }
    }

    /// Keep a per-key tally for the debug listing.
    pub fn with_key_tally(mut self, enabled: bool) -> Self {
        self.keys = enabled.then(AHashMap::new);
        self
    }

    pub fn record(&mut self, event: &WindowEvent) {
        self.tally(&event.key);
    }

    fn tally(&mut self, key: &str) {
        self.total += 1;
        if let Some(keys) = self.keys.as_mut() {
            *keys.entry(key.to_string()).or_insert(0) += 1;
        }
    }

    /// Applies one window batch from an upstream producer. Returns the number
    /// of windows it carried and whether it held the producer's marker.
    pub fn absorb(&mut self, envelope: &Envelope) -> Result<(u64, bool), EngineError> {
        let source = envelope.source;
        let mut windows = 0;
        let mut marker = false;

        for entry in WindowReader::new(&envelope.payload) {
            let entry = entry.map_err(|error| TransportError::Malformed {
                source_rank: source,
                tag: Tag::Windows,
                error,
            })?;
            match entry {
                Entry::Data(record) => {
                    self.producers.check_data(source)?;
                    self.tally(&String::from_utf8_lossy(record.key));
                    windows += 1;
                }
                Entry::EndOfStream { sender } => {
                    if sender != source {
                        return Err(ProtocolError::SenderMismatch {
                            stream: "windows",
                            claimed: sender,
                            actual: source,
                        }
                        .into());
                    }
                    self.producers.record(sender)?;
                    marker = true;
                }
            }
        }
        Ok((windows, marker))
    }

    pub fn is_done(&self) -> bool {
        self.producers.is_done()
    }

    pub fn pending(&self) -> Vec<Rank> {
        self.producers.pending()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn finish(self) -> SinkSummary {
        let keys = self
            .keys
            .map(|keys| {
                keys.into_iter()
                    .sorted_by(|a, b| a.0.cmp(&b.0))
                    .map(|(key, windows)| KeyCount { key, windows })
                    .collect()
            })
            .unwrap_or_default();
        SinkSummary {
            total: self.total,
            keys,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SinkSummary {
    pub total: u64,
    pub keys: Vec<KeyCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::wire::BatchBuffer;
    use bytes::Bytes;

    fn envelope(source: Rank, payload: Bytes) -> Envelope {
        Envelope {
            source,
            tag: Tag::Windows,
            payload,
        }
    }

    #[test]
    fn test_counts_local_and_remote() {
        let mut sink = Sink::new([1, 2]).with_key_tally(true);
        sink.record(&WindowEvent::crossing(b"a", 3));

        let mut batch = BatchBuffer::new(256);
        batch.push_window(b"b", 3);
        batch.push_window(b"a", 3);
        batch.push_marker(1);
        assert_eq!(sink.absorb(&envelope(1, batch.take())).unwrap(), (2, true));
        assert!(!sink.is_done());

        batch.push_marker(2);
        assert_eq!(sink.absorb(&envelope(2, batch.take())).unwrap(), (0, true));
        assert!(sink.is_done());

        let summary = sink.finish();
        assert_eq!(summary.total, 3);
        let listing: Vec<_> = summary
            .keys
            .iter()
            .map(|k| (k.key.as_str(), k.windows))
            .collect();
        assert_eq!(listing, vec![("a", 2), ("b", 1)]);
    }

    #[test]
    fn test_no_producers() {
        let sink = Sink::new(Vec::new());
        assert!(sink.is_done());
        let summary = sink.finish();
        assert_eq!(summary.total, 0);
        assert!(summary.keys.is_empty());
    }

    #[test]
    fn test_window_after_marker_fails() {
        let mut sink = Sink::new([1, 2]);
        let mut batch = BatchBuffer::new(256);
        batch.push_marker(1);
        sink.absorb(&envelope(1, batch.take())).unwrap();

        batch.push_window(b"late", 3);
        assert!(matches!(
            sink.absorb(&envelope(1, batch.take())),
            Err(EngineError::Protocol(ProtocolError::DataAfterMarker { .. }))
        ));
    }

    #[test]
    fn test_forged_marker_fails() {
        let mut sink = Sink::new([1, 2]);
        let mut batch = BatchBuffer::new(256);
        batch.push_marker(2);
        assert!(matches!(
            sink.absorb(&envelope(1, batch.take())),
            Err(EngineError::Protocol(ProtocolError::SenderMismatch { .. }))
        ));
    }

    #[test]
    fn test_truncated_payload_fails() {
        let mut sink = Sink::new([1]);
        let bad = Bytes::from_static(&[3, b'a', b'b']);
        assert!(matches!(
            sink.absorb(&envelope(1, bad)),
            Err(EngineError::Transport(TransportError::Malformed { .. }))
        ));
    }
}
