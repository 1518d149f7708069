// Sun Jan 18 2026 - Alex

use std::io::Write;
use windowed_wordcount::config::{Config, ConfigError};
use windowed_wordcount::corpus::{Corpus, CorpusError};
use windowed_wordcount::engine::{Engine, EngineError, TopologyKind};

fn corpus_file(text: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text).unwrap();
    file.flush().unwrap();
    file
}

fn sample_text() -> Vec<u8> {
    let words = [
        "alpha", "beta", "gamma", "delta", "alpha", "alpha", "epsilon", "beta", "zeta", "alpha",
        "Beta", "GAMMA", "eta", "theta", "alpha",
    ];
    let mut text = Vec::new();
    for i in 0..600 {
        text.extend_from_slice(words[i % words.len()].as_bytes());
        text.push(if i % 11 == 0 { b'\n' } else { b' ' });
        if i % 37 == 0 {
            text.extend_from_slice(b"-- 42, ");
        }
    }
    text
}

fn total(config: Config, path: &std::path::Path) -> u64 {
    Engine::new(config.with_corpus(path))
        .unwrap()
        .run()
        .unwrap()
        .total_windows
}

#[test]
fn test_reference_scenario_single_worker() {
    let file = corpus_file(b"a a a b a a");
    let config = Config::new().with_workers(1).with_window(3, 2);
    assert_eq!(total(config, file.path()), 2);
}

#[test]
fn test_pipeline_matches_symmetric() {
    let file = corpus_file(&sample_text());
    let base = Config::new().with_window(5, 2).with_batch_capacity(128);

    let symmetric = total(base.clone().with_workers(3), file.path());
    // two readers, two reducers, one sink
    let pipeline = total(
        base.with_topology(TopologyKind::Pipeline).with_workers(5),
        file.path(),
    );
    assert!(symmetric > 0);
    assert_eq!(pipeline, symmetric);
}

#[test]
fn test_every_topology_and_worker_count_agrees() {
    let file = corpus_file(&sample_text());
    let base = Config::new().with_window(7, 3).with_batch_capacity(64).with_channel_capacity(2);
    let expected = total(base.clone().with_workers(1), file.path());

    for workers in 1..=6 {
        let symmetric = base.clone().with_workers(workers);
        assert_eq!(total(symmetric, file.path()), expected, "symmetric x{}", workers);
    }
    for workers in 2..=6 {
        let root = base.clone().with_topology(TopologyKind::Root).with_workers(workers);
        assert_eq!(total(root, file.path()), expected, "root x{}", workers);

        let no_sink = base
            .clone()
            .with_topology(TopologyKind::Pipeline)
            .with_pipeline_sink(false)
            .with_workers(workers);
        assert_eq!(total(no_sink, file.path()), expected, "pipeline without sink x{}", workers);
    }
    for workers in 3..=6 {
        let pipeline = base.clone().with_topology(TopologyKind::Pipeline).with_workers(workers);
        assert_eq!(total(pipeline, file.path()), expected, "pipeline x{}", workers);
    }
}

#[test]
fn test_scan_fan_out_matches_single_scan() {
    let file = corpus_file(&sample_text());
    let base = Config::new().with_window(4, 4).with_workers(2);
    let single = total(base.clone(), file.path());
    let fanned = total(base.with_scan_threads(4), file.path());
    assert_eq!(single, fanned);
}

#[test]
fn test_debug_keys_sum_to_total() {
    let file = corpus_file(&sample_text());
    let config = Config::new()
        .with_window(3, 1)
        .with_workers(4)
        .with_topology(TopologyKind::Root)
        .with_debug_keys(true)
        .with_corpus(file.path());
    let report = Engine::new(config).unwrap().run().unwrap();

    let listed: u64 = report.keys.iter().map(|k| k.windows).sum();
    assert_eq!(listed, report.total_windows);
    assert!(report.keys.windows(2).all(|w| w[0].key < w[1].key));
    assert!(report.keys.iter().any(|k| k.key == "alpha"));
    assert!(report.keys.iter().all(|k| k.key.bytes().all(|b| b.is_ascii_lowercase())));
}

#[test]
fn test_metrics_account_for_every_token() {
    let file = corpus_file(&sample_text());
    let config = Config::new()
        .with_workers(4)
        .with_topology(TopologyKind::Pipeline)
        .with_corpus(file.path());
    let report = Engine::new(config).unwrap().run().unwrap();

    let m = &report.metrics;
    assert_eq!(m.tokens_read, 600);
    assert_eq!(m.tokens_read, m.tokens_routed_local + m.tokens_sent);
    assert_eq!(m.tokens_sent, m.tokens_received);
    assert_eq!(m.markers_sent, m.markers_received);
    assert_eq!(m.bytes_scanned, sample_text().len() as u64);
    assert_eq!(report.ranks.len(), 4);
    let sink = report.rank(0).unwrap();
    assert!(sink.roles.sink);
    assert_eq!(sink.total_windows, Some(report.total_windows));
}

#[test]
fn test_missing_corpus_is_config_error() {
    let err = Engine::new(Config::new().with_workers(1)).err().unwrap();
    assert!(matches!(err, EngineError::Config(ConfigError::MissingCorpus)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_empty_corpus_is_corpus_error() {
    let file = corpus_file(b"");
    let err = Engine::new(Config::new().with_workers(1).with_corpus(file.path()))
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Corpus(CorpusError::Empty(_))));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_corpus_without_words() {
    let report = Engine::from_parts(
        Config::new().with_workers(3),
        Corpus::from_bytes(b"1234 ... \n\n 5678".to_vec()),
    )
    .unwrap()
    .run()
    .unwrap();
    assert_eq!(report.total_windows, 0);
    assert_eq!(report.metrics.tokens_read, 0);
}
