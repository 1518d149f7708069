// Sat Jan 17 2026 - Alex

use crate::transport::Rank;
use indexmap::IndexMap;
use thiserror::Error;

/// Marker traffic that cannot happen in a correct run. Never recovered from.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{stream} marker from rank {sender}, which is not an upstream sender")]
    UnexpectedSender { stream: &'static str, sender: Rank },
    #[error("second {stream} marker from rank {sender}")]
    DuplicateMarker { stream: &'static str, sender: Rank },
    #[error("{stream} marker from rank {sender} after all {expected} senders finished")]
    MarkerAfterCompletion {
        stream: &'static str,
        sender: Rank,
        expected: usize,
    },
    #[error("{stream} data from rank {sender} after its end-of-stream marker")]
    DataAfterMarker { stream: &'static str, sender: Rank },
    #[error("{stream} marker claims rank {claimed} but came from rank {actual}")]
    SenderMismatch {
        stream: &'static str,
        claimed: Rank,
        actual: Rank,
    },
}

/// Counts end-of-stream markers for one incoming stream of one rank.
///
/// The stream is complete once every expected sender has sent exactly one
/// marker. The count only grows; any marker beyond that is a protocol error.
#[derive(Debug, Clone)]
pub struct CompletionCounter {
    stream: &'static str,
    senders: IndexMap<Rank, bool>,
    seen: usize,
}

impl CompletionCounter {
    pub fn new<I>(stream: &'static str, senders: I) -> Self
    where
        I: IntoIterator<Item = Rank>,
    {
        Self {
            stream,
            senders: senders.into_iter().map(|r| (r, false)).collect(),
            seen: 0,
        }
    }

    pub fn expected(&self) -> usize {
        self.senders.len()
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn is_done(&self) -> bool {
        self.seen == self.senders.len()
    }

    /// Senders whose marker is still outstanding.
    pub fn pending(&self) -> Vec<Rank> {
        self.senders
            .iter()
            .filter(|(_, done)| !**done)
            .map(|(&r, _)| r)
            .collect()
    }

    /// Records a marker. Returns true when it completes the stream.
    pub fn record(&mut self, sender: Rank) -> Result<bool, ProtocolError> {
        let expected = self.senders.len();
        let already_done = self.is_done();
        let stream = self.stream;

        let finished = self
            .senders
            .get_mut(&sender)
            .ok_or(ProtocolError::UnexpectedSender { stream, sender })?;
        if already_done {
            return Err(ProtocolError::MarkerAfterCompletion {
                stream,
                sender,
                expected,
            });
        }
        if *finished {
            return Err(ProtocolError::DuplicateMarker { stream, sender });
        }

        *finished = true;
        self.seen += 1;
        log::trace!("{} marker {}/{} from rank {}", stream, self.seen, expected, sender);
        Ok(self.is_done())
    }

    /// Data frames are only legal from senders that have not finished.
    pub fn check_data(&self, sender: Rank) -> Result<(), ProtocolError> {
        match self.senders.get(&sender) {
            None => Err(ProtocolError::UnexpectedSender {
                stream: self.stream,
                sender,
            }),
            Some(true) => Err(ProtocolError::DataAfterMarker {
                stream: self.stream,
                sender,
            }),
            Some(false) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completes_after_every_sender() {
        let mut counter = CompletionCounter::new("tokens", [1, 2, 3]);
        assert!(!counter.is_done());
        assert_eq!(counter.record(2), Ok(false));
        assert_eq!(counter.record(1), Ok(false));
        assert_eq!(counter.pending(), vec![3]);
        assert_eq!(counter.record(3), Ok(true));
        assert!(counter.is_done());
        assert_eq!(counter.seen(), 3);
    }

    #[test]
    fn test_no_senders_is_done_immediately() {
        let counter = CompletionCounter::new("windows", Vec::new());
        assert!(counter.is_done());
        assert_eq!(counter.expected(), 0);
    }

    #[test]
    fn test_duplicate_marker_rejected() {
        let mut counter = CompletionCounter::new("tokens", [1, 2]);
        counter.record(1).unwrap();
        assert_eq!(
            counter.record(1),
            Err(ProtocolError::DuplicateMarker { stream: "tokens", sender: 1 })
        );
    }

    #[test]
    fn test_marker_after_completion_rejected() {
        let mut counter = CompletionCounter::new("tokens", [4]);
        counter.record(4).unwrap();
        assert!(matches!(
            counter.record(4),
            Err(ProtocolError::MarkerAfterCompletion { expected: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let mut counter = CompletionCounter::new("windows", [1]);
        assert!(matches!(
            counter.record(7),
            Err(ProtocolError::UnexpectedSender { sender: 7, .. })
        ));
        assert!(counter.check_data(7).is_err());
    }

    #[test]
    fn test_data_after_marker_rejected() {
        let mut counter = CompletionCounter::new("tokens", [1, 2]);
        assert!(counter.check_data(1).is_ok());
        counter.record(1).unwrap();
        assert_eq!(
            counter.check_data(1),
            Err(ProtocolError::DataAfterMarker { stream: "tokens", sender: 1 })
        );
        assert!(counter.check_data(2).is_ok());
    }
}
