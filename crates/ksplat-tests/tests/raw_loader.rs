//! Raw `.splat` ingestion end to end.
//!
//! Covers the streaming path (size hint present), the buffered fallback
//! (no hint), the one-shot path, and the optimizer hand-off on each.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ksplat_decoder::{RawSplatAssembler, SplatDecoder};
use ksplat_loader::{
    BaselineOptimizer, CancelToken, LoadEvent, LoaderConfig, MemoryTransport, OptimizeError,
    OptimizeOptions, ProgressChannel, SplatLoader, SplatOptimizer,
};
use ksplat_tests::{raw_rows, splat};
use ksplat_types::{RAW_ROW_SIZE, SplatBuffer, UncompressedSplat};

fn config(stream: bool) -> LoaderConfig {
    LoaderConfig::default()
        .stream(stream)
        .granularity_bytes(10 * RAW_ROW_SIZE)
        .tick_delay(Duration::ZERO)
}

/// Every fifth splat is fully transparent.
fn scene(n: usize) -> Vec<UncompressedSplat> {
    (0..n).map(|i| splat(i, if i % 5 == 0 { 0 } else { 180 })).collect()
}

/// Records the splats it was handed, then defers to the baseline.
#[derive(Clone, Default)]
struct Spy {
    seen: Arc<Mutex<Vec<Vec<UncompressedSplat>>>>,
}

impl SplatOptimizer for Spy {
    fn optimize(
        &self,
        splats: Vec<UncompressedSplat>,
        options: &OptimizeOptions,
    ) -> Result<SplatBuffer, OptimizeError> {
        self.seen.lock().unwrap().push(splats.clone());
        BaselineOptimizer.optimize(splats, options)
    }
}

#[tokio::test]
async fn streamed_rows_keep_file_order_and_every_row() {
    let splats = scene(200);
    let mut transport = MemoryTransport::new(raw_rows(&splats)).with_chunk_size(100);
    let (mut channel, mut rx) = ProgressChannel::new();

    let buffer = SplatLoader::new(config(true))
        .load("scene.splat", &mut transport, &mut channel, &CancelToken::new())
        .await
        .unwrap();

    // The streamed buffer is not filtered; only an optimizer drops rows.
    assert_eq!(buffer.loaded_splat_count(), 200);
    let decoded: Vec<_> = buffer.loaded_uncompressed_splats().collect();
    assert_eq!(decoded[0].center, splats[0].center);
    assert_eq!(decoded[199].center, splats[199].center);

    let counts: Vec<usize> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|e| match e {
            LoadEvent::SectionBuilt(s) => Some(s.loaded_splat_count),
            LoadEvent::Progress(_) => None,
        })
        .collect();
    assert!(counts.len() > 2);
    assert!(counts.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(*counts.last().unwrap(), 200);
}

#[test]
fn assembler_never_converts_a_partial_row() {
    let rows = raw_rows(&scene(30));
    let mut assembler = RawSplatAssembler::new(rows.len(), 1).unwrap();
    for chunk in rows.chunks(45) {
        if let Some(tick) = assembler
            .push_chunk(&bytes::Bytes::copy_from_slice(chunk))
            .unwrap()
        {
            assert_eq!(tick.splat_count, tick.bytes_loaded / RAW_ROW_SIZE);
        }
    }
    let (buffer, splats) = assembler.finish().unwrap();
    assert_eq!(splats.len(), 30);
    assert_eq!(buffer.header().splat_count, 30);
}

#[tokio::test]
async fn fallback_and_one_shot_agree() {
    let rows = raw_rows(&scene(50));

    let mut unsized_transport = MemoryTransport::new(rows.clone())
        .with_chunk_size(64)
        .without_size_hint();
    let fallback = SplatLoader::new(config(true))
        .load("scene.splat", &mut unsized_transport, &mut (), &CancelToken::new())
        .await
        .unwrap();

    let mut transport = MemoryTransport::new(rows);
    let one_shot = SplatLoader::new(config(false))
        .load("scene.splat", &mut transport, &mut (), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(fallback.as_bytes(), one_shot.as_bytes());
    assert_eq!(one_shot.loaded_splat_count(), 40);
    let reparsed = SplatDecoder::decode(one_shot.as_bytes().to_vec()).unwrap();
    assert_eq!(reparsed.counters(), one_shot.counters());
}

#[tokio::test]
async fn optimizer_receives_rows_in_file_order() {
    let splats = scene(25);
    let spy = Spy::default();
    let options = OptimizeOptions {
        minimum_alpha: 100,
        section_size: 8,
        scene_center: Some([1.0, 2.0, 3.0]),
        ..OptimizeOptions::default()
    };

    let mut transport = MemoryTransport::new(raw_rows(&splats)).with_chunk_size(RAW_ROW_SIZE * 3);
    let buffer = SplatLoader::new(config(true).optimize(options))
        .with_optimizer(spy.clone())
        .load("scene.splat", &mut transport, &mut (), &CancelToken::new())
        .await
        .unwrap();

    let seen = spy.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let centers: Vec<_> = seen[0].iter().map(|s| s.center).collect();
    let expected: Vec<_> = splats.iter().map(|s| s.center).collect();
    assert_eq!(centers, expected);
    assert_eq!(buffer.loaded_splat_count(), 20);
    assert_eq!(buffer.section_headers().len(), 3);
    assert_eq!(buffer.header().scene_center, [1.0, 2.0, 3.0]);
}
