//! curvebuf - draw a segment list into a buffer and watch it
//!
//! # Usage
//!
//! ```bash
//! curvebuf 1 100 0.5  0 400 -0.5
//! curvebuf --sr 48000 --length-ms 500 --curve 0.3 1 50 0 0.2 200
//! RUST_LOG=debug curvebuf --log curvebuf.log 1 100 0.5  0 400 -0.5
//! ```
//!
//! The terminal belongs to the UI, so logs are only written with `--log`.
//!
//! # Keyboard Shortcuts
//!
//! - R: re-send the list
//! - Space: render the next buffer from the current state
//! - +/-: nudge the curvature of trailing partial segments
//! - `:`: type a message (`list 1 100 0`, `set curve`, `curve -0.4`)
//! - Q / ESC: quit

mod ui;

use std::{
    fs::File,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use curvebuf::{
    engine::{MemoryBufferStore, WorkerScheduler},
    CurveWriter, WriterConfig,
};
use rtrb::RingBuffer;
use tracing_subscriber::EnvFilter;

use ui::CurveApp;

/// Name of the buffer the demo draws into.
const BUFFER_NAME: &str = "curve";

#[derive(Parser)]
#[command(name = "curvebuf")]
#[command(author, version, about = "Exponential-segment curves written into a buffer")]
struct Args {
    /// Sample rate in Hz
    #[arg(long, default_value = "44100")]
    sr: f32,

    /// Buffer length in milliseconds
    #[arg(long, default_value = "1000")]
    length_ms: f32,

    /// Curvature for a trailing partial segment (-1..1)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    curve: f32,

    /// Write logs to this file (filtered by RUST_LOG, default `warn`)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Segment list: target, duration ms, curvature, ...
    #[arg(allow_negative_numbers = true)]
    values: Vec<f32>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    if let Some(path) = &args.log {
        let file = File::create(path)
            .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    if !(args.sr.is_finite() && args.sr > 0.0) {
        return Err(eyre!("sample rate must be a positive number, got {}", args.sr));
    }
    if args.values.is_empty() {
        return Err(eyre!("nothing to draw: pass a list such as `1 100 0  0 200 0`"));
    }

    let frames = (args.length_ms.max(0.0) * args.sr * 0.001).round() as usize;
    let store = Arc::new(MemoryBufferStore::new());
    let buffer = store.insert(BUFFER_NAME, frames);
    let scheduler = Arc::new(WorkerScheduler::new());

    // Completions arrive on the scheduler thread
    let (completion_tx, completion_rx) = RingBuffer::<()>::new(64);
    let completion_tx = Mutex::new(completion_tx);

    let config = WriterConfig::new(args.sr).curvature_bias(args.curve);
    let writer = CurveWriter::new(config, store, scheduler)
        .with_buffer(BUFFER_NAME)
        .on_complete(move || {
            if let Ok(mut tx) = completion_tx.lock() {
                let _ = tx.push(());
            }
        });

    let mut app = CurveApp::new(writer, buffer, completion_rx, args.values);
    app.send_list();

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result.wrap_err("terminal UI failed")
}
