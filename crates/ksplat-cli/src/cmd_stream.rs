/// Implementation of `ksplat stream`.
///
/// Loads a file through [`FileTransport`] with the progressive loader and
/// prints the counters of every emitted tick:
///
/// ```text
/// tick 1: 1 section reached, 4402 splats loaded [4402]  31.25%
/// tick 2: 2 sections reached, 9000 splats loaded [8000, 1000]  62.50%
/// tick 3: 2 sections reached, 12000 splats loaded [8000, 4000]  100.00% (complete)
/// ```
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use ksplat_loader::{
    CancelToken, FileTransport, KsplatLoader, LoadObserver, LoaderConfig, ProgressUpdate,
    SplatLoader,
};
use ksplat_types::SplatBuffer;

use crate::StreamArgs;

/// Prints a line per emitted tick. The percentage comes from the progress
/// update that follows each tick.
#[derive(Default)]
struct TickPrinter {
    ticks: usize,
    pending: Option<String>,
}

impl TickPrinter {
    fn flush(&mut self, suffix: &str) {
        if let Some(line) = self.pending.take() {
            println!("{line}{suffix}");
        }
    }
}

impl LoadObserver for TickPrinter {
    fn on_section_built(&mut self, view: &SplatBuffer, load_complete: bool) {
        self.flush("");
        self.ticks += 1;
        let counts: Vec<String> = view
            .counters()
            .section_loaded_counts()
            .iter()
            .take(view.reached_section_count())
            .map(ToString::to_string)
            .collect();
        let reached = view.reached_section_count();
        let mut line = format!(
            "tick {}: {reached} section{} reached, {} splats loaded [{}]",
            self.ticks,
            if reached == 1 { "" } else { "s" },
            view.loaded_splat_count(),
            counts.join(", "),
        );
        if load_complete {
            line.push_str(" (complete)");
        }
        self.pending = Some(line);
    }

    fn on_progress(&mut self, update: &ProgressUpdate) {
        self.flush(&format!("  {}", update.label));
    }
}

/// Run the `ksplat stream` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the load fails.
pub fn run(args: &StreamArgs) -> Result<()> {
    let source = args
        .file
        .to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", args.file.display()))?
        .to_string();
    let config = LoaderConfig::default()
        .granularity_bytes(args.granularity)
        .tick_delay(Duration::from_millis(args.delay_ms));
    let raw = args.raw || is_raw_splat(&args.file);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let mut transport = FileTransport::new(args.chunk_size);
    let mut printer = TickPrinter::default();
    let cancel = CancelToken::new();
    let buffer = runtime
        .block_on(async {
            if raw {
                SplatLoader::new(config)
                    .load(&source, &mut transport, &mut printer, &cancel)
                    .await
            } else {
                KsplatLoader::new(config)
                    .load(&source, &mut transport, &mut printer, &cancel)
                    .await
            }
        })
        .with_context(|| format!("failed to load {}", args.file.display()))?;
    printer.flush("");

    println!(
        "loaded {} splats in {} sections over {} ticks",
        buffer.loaded_splat_count(),
        buffer.reached_section_count(),
        printer.ticks
    );
    Ok(())
}

fn is_raw_splat(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("splat"))
}
