// Thu Jan 15 2026 - Alex

use crate::transport::{Envelope, Rank, SendHandle, Source, Tag, Transport, TransportError};
use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver, Select, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Builds the endpoints of an in-process fabric, one per rank.
pub struct LocalFabric;

impl LocalFabric {
    pub fn build(size: usize, capacity: usize) -> Vec<LocalTransport> {
        assert!(size > 0, "fabric needs at least one rank");
        assert!(capacity > 0, "inbox capacity must be positive");

        let (inbox_tx, inbox_rx): (Vec<_>, Vec<_>) = (0..size).map(|_| bounded(capacity)).unzip();
        let (abort_tx, abort_rx): (Vec<_>, Vec<_>) = (0..size).map(|_| bounded(1)).unzip();

        inbox_rx
            .into_iter()
            .zip(abort_rx)
            .enumerate()
            .map(|(rank, (inbox, abort_rx))| LocalTransport {
                rank,
                inbox,
                peers: inbox_tx.clone(),
                abort_rx,
                abort_peers: abort_tx.clone(),
                stash: Mutex::new(VecDeque::new()),
                aborted: AtomicBool::new(false),
            })
            .collect()
    }
}

/// One rank's endpoint.
///
/// Every rank owns a single bounded inbox. Messages that arrive while the rank
/// is waiting for something else (another tag, another source, or room in a
/// peer's inbox) are parked in a local stash, so two ranks sending to each
/// other can never wedge on full inboxes.
pub struct LocalTransport {
    rank: Rank,
    inbox: Receiver<Envelope>,
    peers: Vec<Sender<Envelope>>,
    abort_rx: Receiver<()>,
    abort_peers: Vec<Sender<()>>,
    stash: Mutex<VecDeque<Envelope>>,
    aborted: AtomicBool,
}

impl LocalTransport {
    fn peer(&self, dest: Rank) -> Result<&Sender<Envelope>, TransportError> {
        self.peers.get(dest).ok_or(TransportError::InvalidRank {
            rank: dest,
            size: self.peers.len(),
        })
    }

    fn check_aborted(&self) -> Result<(), TransportError> {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(TransportError::Aborted);
        }
        Ok(())
    }

    fn mark_aborted(&self) -> TransportError {
        self.aborted.store(true, Ordering::SeqCst);
        TransportError::Aborted
    }

    fn take_stashed(&self, source: Source, tag: Tag) -> Option<Envelope> {
        let mut stash = self.stash.lock();
        let index = stash
            .iter()
            .position(|e| e.tag == tag && source.matches(e.source))?;
        stash.remove(index)
    }

    fn recv_inbound(&self) -> Result<Envelope, TransportError> {
        crossbeam_channel::select! {
            recv(self.inbox) -> msg => msg.map_err(|_| TransportError::Disconnected(self.rank)),
            recv(self.abort_rx) -> _ => Err(self.mark_aborted()),
        }
    }

    fn deliver(&self, dest: Rank, envelope: Envelope) -> Result<(), TransportError> {
        let tx = self.peer(dest)?;
        let mut envelope = envelope;

        loop {
            self.check_aborted()?;
            match tx.try_send(envelope) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Disconnected(_)) => return Err(TransportError::Disconnected(dest)),
                Err(TrySendError::Full(back)) => envelope = back,
            }

            // Wait for room at the destination, but keep accepting our own
            // traffic meanwhile so the destination can make progress too.
            let mut sel = Select::new();
            let send_index = sel.send(tx);
            let recv_index = sel.recv(&self.inbox);
            let abort_index = sel.recv(&self.abort_rx);
            let oper = sel.select();
            match oper.index() {
                i if i == send_index => {
                    return oper
                        .send(tx, envelope)
                        .map_err(|_| TransportError::Disconnected(dest));
                }
                i if i == recv_index => {
                    let inbound = oper
                        .recv(&self.inbox)
                        .map_err(|_| TransportError::Disconnected(self.rank))?;
                    self.stash.lock().push_back(inbound);
                }
                i => {
                    debug_assert_eq!(i, abort_index);
                    let _ = oper.recv(&self.abort_rx);
                    return Err(self.mark_aborted());
                }
            }
        }
    }

    fn envelope(&self, tag: Tag, payload: Bytes) -> Envelope {
        Envelope {
            source: self.rank,
            tag,
            payload,
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            peers: self.abort_peers.clone(),
        }
    }

    pub fn stashed(&self) -> usize {
        self.stash.lock().len()
    }
}

/// Aborts every rank of a fabric without holding any endpoint.
#[derive(Clone)]
pub struct AbortHandle {
    peers: Vec<Sender<()>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        for tx in &self.peers {
            let _ = tx.try_send(());
        }
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, dest: Rank, tag: Tag, payload: Bytes) -> Result<(), TransportError> {
        log::trace!("rank {} -> {} {:?} {} bytes", self.rank, dest, tag, payload.len());
        self.deliver(dest, self.envelope(tag, payload))
    }

    fn send_async(&self, dest: Rank, tag: Tag, payload: Bytes) -> Result<SendHandle, TransportError> {
        self.check_aborted()?;
        let tx = self.peer(dest)?;
        match tx.try_send(self.envelope(tag, payload)) {
            Ok(()) => Ok(SendHandle::completed(dest)),
            Err(TrySendError::Full(envelope)) => Ok(SendHandle::pending(dest, envelope)),
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Disconnected(dest)),
        }
    }

    fn test(&self, handle: &mut SendHandle) -> Result<bool, TransportError> {
        let Some(envelope) = handle.take_pending() else {
            return Ok(true);
        };
        let tx = self.peer(handle.dest())?;
        match tx.try_send(envelope) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(envelope)) => {
                handle.restore(envelope);
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Disconnected(handle.dest())),
        }
    }

    fn wait(&self, mut handle: SendHandle) -> Result<(), TransportError> {
        match handle.take_pending() {
            Some(envelope) => self.deliver(handle.dest(), envelope),
            None => Ok(()),
        }
    }

    fn probe(&self, source: Source, tag: Tag) -> bool {
        let mut stash = self.stash.lock();
        if stash.iter().any(|e| e.tag == tag && source.matches(e.source)) {
            return true;
        }
        while let Ok(envelope) = self.inbox.try_recv() {
            let hit = envelope.tag == tag && source.matches(envelope.source);
            stash.push_back(envelope);
            if hit {
                return true;
            }
        }
        false
    }

    fn receive(&self, source: Source, tag: Tag) -> Result<Envelope, TransportError> {
        if let Some(envelope) = self.take_stashed(source, tag) {
            return Ok(envelope);
        }
        loop {
            self.check_aborted()?;
            let envelope = self.recv_inbound()?;
            if envelope.tag == tag && source.matches(envelope.source) {
                return Ok(envelope);
            }
            self.stash.lock().push_back(envelope);
        }
    }

    fn abort(&self) {
        log::warn!("rank {} aborting the run", self.rank);
        for (rank, tx) in self.abort_peers.iter().enumerate() {
            if rank != self.rank {
                let _ = tx.try_send(());
            }
        }
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.abort();
        }
    }
}
