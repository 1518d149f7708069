// Sat Jan 17 2026 - Alex

use crate::config::{Config, ConfigError};
use crate::corpus::{Chunk, Corpus, Partitioner};
use crate::engine::result::WorkerReport;
use crate::engine::sink::Sink;
use crate::engine::termination::{CompletionCounter, ProtocolError};
use crate::engine::topology::{Layout, Roles};
use crate::engine::EngineError;
use crate::output::{Phase, RunMetrics};
use crate::token::{KeyRouter, Routed, Token, Tokenizer};
use crate::transport::wire::{BatchBuffer, Entry, TokenReader};
use crate::transport::{Envelope, Rank, SendHandle, Source, Tag, Transport, TransportError};
use crate::utils::ScanProgress;
use crate::window::{WindowAggregator, WindowEvent, WindowKind, WindowParams};
use bytes::Bytes;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// The per-rank subset of [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub window: WindowParams,
    pub batch_capacity: usize,
    pub max_token_len: usize,
    pub scan_threads: usize,
    pub max_in_flight: usize,
    pub debug_keys: bool,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            window: WindowParams::new(config.window_size, config.slide_step)?,
            batch_capacity: config.batch_capacity,
            max_token_len: config.max_token_len,
            scan_threads: config.scan_threads,
            max_in_flight: config.max_in_flight,
            debug_keys: config.debug_keys,
        })
    }
}

/// One rank's control loop.
///
/// The same loop serves every topology; the rank's [`Roles`] decide which
/// stages run:
///
/// 1. reader: scan the chunk, apply local keys, batch the rest to their owners,
///    then send an end-of-stream marker to every remote owner
/// 2. owner: apply incoming token batches until every reader's marker is in,
///    flush residual windows, forward windows plus a marker to the sink
/// 3. sink: count windows until every producer's marker is in
///
/// Without a sink the owners' local window counts are summed at rank 0.
pub struct Worker<T: Transport> {
    transport: T,
    layout: Arc<Layout>,
    roles: Roles,
    settings: WorkerSettings,
    corpus: Corpus,
    metrics: RunMetrics,
    aggregator: WindowAggregator,
    tokens_in: CompletionCounter,
    sink: Option<Sink>,
    windows_out: BatchBuffer,
    in_flight: Vec<SendHandle>,
    progress: Option<ProgressBar>,
}

impl<T: Transport> Worker<T> {
    pub fn new(transport: T, layout: Arc<Layout>, corpus: Corpus, settings: WorkerSettings) -> Self {
        let rank = transport.rank();
        let roles = layout.roles(rank);
        let tokens_in = CompletionCounter::new(
            "tokens",
            if roles.is_owner() {
                layout.token_senders(rank)
            } else {
                Vec::new()
            },
        );
        let sink = roles
            .sink
            .then(|| Sink::new(layout.window_producers()).with_key_tally(settings.debug_keys));

        Self {
            transport,
            layout,
            roles,
            settings,
            corpus,
            metrics: RunMetrics::new(),
            aggregator: WindowAggregator::new(settings.window),
            tokens_in,
            sink,
            windows_out: BatchBuffer::new(settings.batch_capacity),
            in_flight: Vec::new(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    pub fn roles(&self) -> Roles {
        self.roles
    }

    /// Runs the loop to completion. Any failure aborts every peer before it
    /// is returned, so no other rank is left waiting on this one.
    pub fn run(mut self) -> Result<WorkerReport, EngineError> {
        let rank = self.rank();
        match self.execute() {
            Ok(report) => Ok(report),
            Err(e) => {
                if e.is_secondary() {
                    log::debug!("rank {} stopping: {}", rank, e);
                } else {
                    log::error!("rank {} failed: {}", rank, e);
                }
                self.transport.abort();
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<WorkerReport, EngineError> {
        let rank = self.rank();
        log::debug!("rank {} starting as {}", rank, self.roles);

        self.transport.barrier()?;
        let started = Instant::now();

        let chunk = match self.roles.reader {
            Some(index) => Some(self.read(index)?),
            None => None,
        };

        if self.roles.is_owner() {
            self.await_tokens()?;
            self.flush_windows()?;
        }

        if self.roles.sink {
            self.await_windows()?;
        }
        self.settle()?;

        let total = match self.layout.sink {
            Some(_) => self.sink.as_ref().map(|s| s.total()),
            None => {
                let local = if self.roles.is_owner() {
                    self.metrics.windows_produced()
                } else {
                    0
                };
                let network = Instant::now();
                let total = self.transport.reduce_sum(local, 0)?;
                self.metrics.record_since(Phase::Network, network);
                total
            }
        };

        self.transport.barrier()?;
        self.metrics.record_since(Phase::Total, started);

        if let Some(total) = total {
            log::info!("rank {} collected {} windows", rank, total);
        }
        log::debug!("rank {} done", rank);

        let keys = self
            .sink
            .take()
            .map(|sink| sink.finish().keys)
            .unwrap_or_default();

        Ok(WorkerReport {
            rank,
            roles: self.roles,
            chunk,
            total_windows: total,
            keys,
            metrics: self.metrics.clone(),
        })
    }

    fn read(&mut self, index: usize) -> Result<Chunk, EngineError> {
        let rank = self.rank();
        let corpus = self.corpus.clone();
        let data = corpus.as_slice();
        let chunk = Partitioner::new(self.layout.readers.len()).chunk(data, index)?;
        log::debug!("rank {} reading chunk {}", rank, chunk);

        let started = Instant::now();
        let tokenizer = Tokenizer::new(self.settings.max_token_len).with_overrun(true);
        let mut router = KeyRouter::new(
            self.layout.owners.clone(),
            rank,
            self.settings.batch_capacity,
        );
        let mut progress = ScanProgress::new(rank, chunk.len());
        if let Some(bar) = self.progress.take() {
            progress = progress.with_bar(bar);
        }

        if self.settings.scan_threads > 1 && chunk.len() > 1 {
            let parts = Partitioner::new(self.settings.scan_threads).split_range(data, chunk.range());
            let scanned: Vec<Vec<Token>> = parts
                .par_iter()
                .map(|part| tokenizer.tokenize(data, part.range()))
                .collect();
            for (part, tokens) in parts.iter().zip(scanned) {
                for token in tokens {
                    self.dispatch(&mut router, token.as_bytes())?;
                }
                progress.set(part.end - chunk.start);
            }
        } else {
            let mut tokens = tokenizer.tokens(data, chunk.range());
            while let Some(token) = tokens.next() {
                self.dispatch(&mut router, token.as_bytes())?;
                progress.set(tokens.position().saturating_sub(chunk.start));
            }
        }
        progress.finish();
        self.metrics.bytes_scanned += chunk.len() as u64;

        for (dest, batch) in router.finish(rank) {
            self.submit(dest, Tag::Tokens, batch)?;
        }
        self.metrics.markers_sent += self.layout.owners.iter().filter(|&&o| o != rank).count() as u64;
        self.metrics.record_since(Phase::Read, started);
        log::debug!(
            "rank {} finished reading: {} tokens, {} routed locally",
            rank,
            self.metrics.tokens_read,
            self.metrics.tokens_routed_local
        );
        Ok(chunk)
    }

    fn dispatch(&mut self, router: &mut KeyRouter, key: &[u8]) -> Result<(), EngineError> {
        self.metrics.tokens_read += 1;
        match router.route(key) {
            Routed::Local => {
                self.metrics.tokens_routed_local += 1;
                self.apply_token(key)?;
            }
            Routed::Buffered => self.metrics.tokens_sent += 1,
            Routed::Flushed { dest, batch } => {
                self.metrics.tokens_sent += 1;
                self.submit(dest, Tag::Tokens, batch)?;
                self.pump()?;
            }
        }
        Ok(())
    }

    fn apply_token(&mut self, key: &[u8]) -> Result<(), EngineError> {
        match self.aggregator.observe(key) {
            Some(event) => self.emit(event),
            None => Ok(()),
        }
    }

    fn apply_tokens(&mut self, envelope: &Envelope) -> Result<(), EngineError> {
        let started = Instant::now();
        let source = envelope.source;
        for entry in TokenReader::new(&envelope.payload) {
            let entry = entry.map_err(|error| TransportError::Malformed {
                source_rank: source,
                tag: Tag::Tokens,
                error,
            })?;
            match entry {
                Entry::Data(key) => {
                    self.tokens_in.check_data(source)?;
                    self.metrics.tokens_received += 1;
                    self.apply_token(key)?;
                }
                Entry::EndOfStream { sender } => {
                    if sender != source {
                        return Err(ProtocolError::SenderMismatch {
                            stream: "tokens",
                            claimed: sender,
                            actual: source,
                        }
                        .into());
                    }
                    self.metrics.markers_received += 1;
                    if self.tokens_in.record(sender)? {
                        log::debug!("rank {} received every token marker", self.rank());
                    }
                }
            }
        }
        self.metrics.record_since(Phase::Aggregate, started);
        Ok(())
    }

    /// Hands a window to the sink: recorded in place when this rank is the
    /// sink, batched towards it otherwise, kept as a local count when the
    /// run has no sink.
    fn emit(&mut self, event: WindowEvent) -> Result<(), EngineError> {
        match event.kind {
            WindowKind::Crossing => self.metrics.windows_emitted += 1,
            WindowKind::Flush => self.metrics.windows_flushed += 1,
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.record(&event);
            return Ok(());
        }
        if let Some(dest) = self.layout.sink {
            self.metrics.windows_forwarded += 1;
            if let Some(batch) = self.windows_out.push_window(event.key.as_bytes(), event.size) {
                self.submit(dest, Tag::Windows, batch)?;
            }
        }
        Ok(())
    }

    fn await_tokens(&mut self) -> Result<(), EngineError> {
        log::debug!(
            "rank {} waiting for token markers from {:?}",
            self.rank(),
            self.tokens_in.pending()
        );
        while !self.tokens_in.is_done() {
            self.settle()?;
            let envelope = self.receive(Source::Any, Tag::Tokens)?;
            self.apply_tokens(&envelope)?;
            if self.roles.sink {
                self.drain_windows()?;
            }
        }
        Ok(())
    }

    fn flush_windows(&mut self) -> Result<(), EngineError> {
        let rank = self.rank();
        let started = Instant::now();
        let aggregator = std::mem::replace(
            &mut self.aggregator,
            WindowAggregator::new(self.settings.window),
        );
        self.metrics.keys_owned = aggregator.keys() as u64;
        let (events, stats) = aggregator.flush();
        self.metrics.remainders_discarded += stats.discarded_remainders;
        log::debug!(
            "rank {} flushing {} keys: {} crossings, {} trailing windows",
            rank,
            self.metrics.keys_owned,
            stats.crossings,
            stats.flushed
        );

        for event in events {
            self.emit(event)?;
        }
        self.metrics.record_since(Phase::Aggregate, started);

        if let (Some(dest), false) = (self.layout.sink, self.roles.sink) {
            if let Some(full) = self.windows_out.push_marker(rank) {
                self.submit(dest, Tag::Windows, full)?;
            }
            let last = self.windows_out.take();
            self.submit(dest, Tag::Windows, last)?;
            self.metrics.markers_sent += 1;
        }
        Ok(())
    }

    fn await_windows(&mut self) -> Result<(), EngineError> {
        log::debug!("rank {} collecting windows", self.rank());
        while self.sink.as_ref().map_or(false, |s| !s.is_done()) {
            self.settle()?;
            let envelope = self.receive(Source::Any, Tag::Windows)?;
            self.absorb_windows(&envelope)?;
        }
        Ok(())
    }

    fn absorb_windows(&mut self, envelope: &Envelope) -> Result<(), EngineError> {
        if let Some(sink) = self.sink.as_mut() {
            let (_, marker) = sink.absorb(envelope)?;
            if marker {
                self.metrics.markers_received += 1;
            }
        }
        Ok(())
    }

    /// Applies whatever inbound traffic is already here without blocking.
    fn pump(&mut self) -> Result<(), EngineError> {
        self.poll_in_flight()?;
        if self.roles.is_owner() {
            while self.transport.probe(Source::Any, Tag::Tokens) {
                let envelope = self.receive(Source::Any, Tag::Tokens)?;
                self.apply_tokens(&envelope)?;
            }
        }
        if self.roles.sink {
            self.drain_windows()?;
        }
        Ok(())
    }

    fn drain_windows(&mut self) -> Result<(), EngineError> {
        while self.transport.probe(Source::Any, Tag::Windows) {
            let envelope = self.receive(Source::Any, Tag::Windows)?;
            self.absorb_windows(&envelope)?;
        }
        Ok(())
    }

    fn receive(&mut self, source: Source, tag: Tag) -> Result<Envelope, EngineError> {
        let started = Instant::now();
        let envelope = self.transport.receive(source, tag)?;
        self.metrics.record_since(Phase::Network, started);
        log::trace!(
            "rank {} <- {} {:?} {} bytes",
            self.rank(),
            envelope.source,
            tag,
            envelope.len()
        );
        Ok(envelope)
    }

    /// Starts a send. Batches to one destination leave in order: an earlier
    /// batch still queued for `dest` is completed first.
    fn submit(&mut self, dest: Rank, tag: Tag, payload: Bytes) -> Result<(), EngineError> {
        let started = Instant::now();
        if let Some(pos) = self.in_flight.iter().position(|h| h.dest() == dest) {
            let earlier = self.in_flight.remove(pos);
            self.transport.wait(earlier)?;
        }

        let handle = self.transport.send_async(dest, tag, payload)?;
        if !handle.is_complete() {
            self.in_flight.push(handle);
        }
        if self.in_flight.len() >= self.settings.max_in_flight {
            let oldest = self.in_flight.remove(0);
            self.transport.wait(oldest)?;
        }

        self.metrics.batches_sent += 1;
        self.metrics.record_since(Phase::Network, started);
        Ok(())
    }

    fn poll_in_flight(&mut self) -> Result<(), EngineError> {
        let mut still = Vec::with_capacity(self.in_flight.len());
        for mut handle in self.in_flight.drain(..) {
            if !self.transport.test(&mut handle)? {
                still.push(handle);
            }
        }
        self.in_flight = still;
        Ok(())
    }

    /// Completes every outstanding send.
    fn settle(&mut self) -> Result<(), EngineError> {
        if self.in_flight.is_empty() {
            return Ok(());
        }
        let started = Instant::now();
        let handles = std::mem::take(&mut self.in_flight);
        self.transport.wait_all(handles)?;
        self.metrics.record_since(Phase::Network, started);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::topology::TopologyKind;
    use crate::transport::{LocalFabric, LocalTransport};

    fn settings(window: u64, slide: u64) -> WorkerSettings {
        WorkerSettings {
            window: WindowParams::new(window, slide).unwrap(),
            batch_capacity: 64,
            max_token_len: 34,
            scan_threads: 1,
            max_in_flight: 2,
            debug_keys: true,
        }
    }

    #[test]
    fn test_single_rank_counts_reference_scenario() {
        let layout = Arc::new(Layout::build(TopologyKind::Symmetric, 1, true).unwrap());
        let transport = LocalFabric::build(1, 8).remove(0);
        let corpus = Corpus::from_bytes(b"a a a b a a".to_vec());

        let report = Worker::new(transport, layout, corpus, settings(3, 2))
            .run()
            .unwrap();
        assert_eq!(report.total_windows, Some(2));
        assert_eq!(report.metrics.tokens_read, 6);
        assert_eq!(report.metrics.tokens_routed_local, 6);
        assert_eq!(report.metrics.remainders_discarded, 2);
        assert_eq!(report.keys.len(), 1);
        assert_eq!(report.keys[0].key, "a");
    }

    #[test]
    fn test_pair_of_ranks_agrees_with_single_rank() {
        let text = b"the quick brown fox jumps over the lazy dog the fox the dog ".repeat(20);
        let layout = Arc::new(Layout::build(TopologyKind::Symmetric, 2, true).unwrap());
        let corpus = Corpus::from_bytes(text.clone());

        let handles: Vec<_> = LocalFabric::build(2, 4)
            .into_iter()
            .map(|transport| {
                let worker = Worker::new(transport, layout.clone(), corpus.clone(), settings(4, 2));
                std::thread::spawn(move || worker.run())
            })
            .collect();
        let reports: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        let single_layout = Arc::new(Layout::build(TopologyKind::Symmetric, 1, true).unwrap());
        let single = Worker::new(
            LocalFabric::build(1, 4).remove(0),
            single_layout,
            Corpus::from_bytes(text),
            settings(4, 2),
        )
        .run()
        .unwrap();

        assert_eq!(reports[0].total_windows, single.total_windows);
        assert_eq!(reports[1].total_windows, None);
        let read: u64 = reports.iter().map(|r| r.metrics.tokens_read).sum();
        assert_eq!(read, single.metrics.tokens_read);
    }

    /// Rank 2 of a root run, driven by hand: joins the start barrier, then
    /// sends rank 1 its marker followed by one more token.
    fn rogue_reader(transport: LocalTransport) -> Result<Envelope, TransportError> {
        transport.barrier()?;
        let mut batch = BatchBuffer::new(64);
        batch.push_marker(2);
        batch.push_token(b"late");
        transport.send(1, Tag::Tokens, batch.take())?;
        // nothing is ever sent here on this tag; only an abort ends the wait
        transport.receive(Source::Rank(0), Tag::Windows)
    }

    #[test]
    fn test_token_after_marker_aborts_every_rank() {
        let layout = Arc::new(Layout::build(TopologyKind::Root, 3, true).unwrap());
        let corpus = Corpus::from_bytes(b"a a a b a a".to_vec());
        let mut transports = LocalFabric::build(3, 64);
        let rogue = transports.pop().unwrap();

        let workers: Vec<_> = transports
            .into_iter()
            .map(|transport| {
                let worker = Worker::new(transport, layout.clone(), corpus.clone(), settings(3, 2));
                std::thread::spawn(move || worker.run())
            })
            .collect();
        let rogue = std::thread::spawn(move || rogue_reader(rogue));

        let results: Vec<_> = workers.into_iter().map(|h| h.join().unwrap()).collect();

        // the sink only stopped because rank 1 gave up
        let sink = results[0].as_ref().unwrap_err();
        assert!(sink.is_secondary(), "sink: {}", sink);

        assert!(matches!(
            results[1],
            Err(EngineError::Protocol(ProtocolError::DataAfterMarker {
                stream: "tokens",
                sender: 2
            }))
        ));
        assert!(!results[1].as_ref().unwrap_err().is_secondary());

        assert!(matches!(rogue.join().unwrap(), Err(TransportError::Aborted)));
    }
}
