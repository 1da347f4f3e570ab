use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    },
    time::Duration,
};

use curvebuf::{
    engine::{BufferStore, ManualScheduler, MemoryBufferStore, WorkerScheduler},
    io::{converter::parse_message, Atom, BufferEvent, Message},
    CurveError, CurveWriter, WriterConfig, MAX_SEGMENTS,
};

type TestWriter = CurveWriter<MemoryBufferStore, ManualScheduler>;

struct Rig {
    writer: TestWriter,
    store: Arc<MemoryBufferStore>,
    scheduler: Arc<ManualScheduler>,
    completions: Arc<AtomicUsize>,
}

fn rig(sample_rate: f32, frames: usize) -> Rig {
    let store = Arc::new(MemoryBufferStore::new());
    store.insert("env", frames);
    let scheduler = Arc::new(ManualScheduler::new());
    let completions = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&completions);
    let writer = CurveWriter::new(
        WriterConfig::new(sample_rate),
        Arc::clone(&store),
        Arc::clone(&scheduler),
    )
    .with_buffer("env")
    .on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    scheduler.run_pending();

    Rig {
        writer,
        store,
        scheduler,
        completions,
    }
}

fn contents(store: &MemoryBufferStore, name: &str) -> Vec<f32> {
    store.get(name).expect("buffer").snapshot()
}

#[test]
fn two_linear_segments_rise_monotonically() {
    let mut rig = rig(44_100.0, 44_100);

    rig.writer
        .handle_message(Message::list(&[0.5, 100.0, 0.0, 1.0, 100.0, 0.0]))
        .unwrap();
    let samples = contents(&rig.store, "env");

    assert_eq!(samples[0], 0.0);
    for pair in samples.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-5, "{} then {}", pair[0], pair[1]);
    }
    assert!((samples[22_050] - 0.5).abs() < 1e-3);
    assert!((samples[44_099] - 1.0).abs() < 1e-3);
    assert_eq!(rig.writer.value(), 1.0);

    rig.scheduler.run_pending();
    assert_eq!(rig.completions.load(Ordering::SeqCst), 1);
}

#[test]
fn slope_changes_only_at_segment_boundary() {
    let mut rig = rig(1_000.0, 400);

    rig.writer
        .handle_message(Message::list(&[0.2, 1.0, 0.0, 1.0, 1.0, 0.0]))
        .unwrap();
    let samples = contents(&rig.store, "env");

    let first = samples[1] - samples[0];
    let second = samples[201] - samples[200];
    assert!((first - 0.001).abs() < 1e-5);
    assert!((second - 0.004).abs() < 1e-5);
    for i in 0..199 {
        assert!(((samples[i + 1] - samples[i]) - first).abs() < 1e-4);
    }
    for i in 200..399 {
        assert!(((samples[i + 1] - samples[i]) - second).abs() < 1e-4);
    }
}

#[test]
fn single_triple_and_empty_list_do_nothing() {
    let mut rig = rig(1_000.0, 100);
    let buffer = rig.store.get("env").unwrap();

    assert_eq!(rig.writer.list_values(&[1.0, 100.0, 0.0]), Ok(None));
    assert_eq!(rig.writer.list_values(&[]), Ok(None));
    assert_eq!(buffer.write_count(), 0);
    assert_eq!(rig.writer.value(), 0.0);
}

#[test]
fn non_float_element_aborts_before_any_change() {
    let mut rig = rig(1_000.0, 100);
    let buffer = rig.store.get("env").unwrap();

    let message = Message::List(vec![Atom::Float(1.0), Atom::from("x"), Atom::Float(2.0)]);
    let err = rig.writer.handle_message(message).unwrap_err();

    assert_eq!(
        err,
        CurveError::NonFloatElement {
            index: 1,
            found: "x".into()
        }
    );
    assert_eq!(buffer.write_count(), 0);

    let ints = Message::List(vec![Atom::Float(1.0), Atom::Int(2)]);
    assert!(matches!(
        rig.writer.handle_message(ints),
        Err(CurveError::NonFloatElement { index: 1, .. })
    ));
}

#[test]
fn partial_segment_follows_curvature_bias() {
    let mut rig = rig(1_000.0, 100);

    rig.writer.handle_message(Message::Curve(-0.8)).unwrap();
    rig.writer.list_values(&[1.0, 10.0]).unwrap();
    let samples = contents(&rig.store, "env");

    // Negative curvature leaves fast and settles slowly.
    assert!(samples[50] > 0.8, "midpoint {}", samples[50]);
    assert!(samples[99] > 0.99);
}

#[test]
fn lone_target_jumps_and_completes() {
    let mut rig = rig(1_000.0, 32);

    let outcome = rig.writer.list_values(&[0.7]).unwrap().expect("pass");
    assert!(outcome.completed);
    assert!(contents(&rig.store, "env").iter().all(|&s| s == 0.7));

    rig.scheduler.run_pending();
    assert_eq!(rig.completions.load(Ordering::SeqCst), 1);
}

#[test]
fn oversized_list_is_clamped() {
    let mut rig = rig(1_000.0, 1_000);

    let mut values = Vec::new();
    for i in 0..(MAX_SEGMENTS + 20) {
        values.extend_from_slice(&[(i % 2) as f32, 1.0, 0.0]);
    }
    values.push(5.0);

    rig.writer.list_values(&values).unwrap();
    assert_eq!(rig.writer.generator().segments().len(), MAX_SEGMENTS);
    assert!(contents(&rig.store, "env").iter().all(|&s| s <= 1.0));
}

#[test]
fn segment_spilling_past_the_buffer_continues_on_next_render() {
    // 101 frames split in halves rounds each segment up to 51 hops.
    let mut rig = rig(1_000.0, 101);

    let outcome = rig.writer.list_values(&[0.5, 1.0, 0.0, 1.0, 1.0, 0.0]).unwrap();
    assert_eq!(outcome.map(|o| o.completed), Some(false));
    assert_eq!(rig.writer.generator().remaining(), 1);
    rig.scheduler.run_pending();
    assert_eq!(rig.completions.load(Ordering::SeqCst), 0);

    let outcome = rig.writer.render().unwrap();
    assert!(outcome.completed);
    assert_eq!(outcome.ramp_samples, 1);

    let samples = contents(&rig.store, "env");
    assert!(samples[0] > 0.95 && samples[0] < 1.0);
    assert!(samples[1..].iter().all(|&s| s == 1.0));

    rig.scheduler.run_pending();
    assert_eq!(rig.completions.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_name_and_unknown_buffer_are_reported() {
    let store = Arc::new(MemoryBufferStore::new());
    let scheduler = Arc::new(ManualScheduler::new());
    let mut writer = CurveWriter::new(
        WriterConfig::new(1_000.0),
        Arc::clone(&store),
        Arc::clone(&scheduler),
    );

    assert_eq!(
        writer.list_values(&[1.0, 1.0]),
        Err(CurveError::MissingBufferName)
    );
    assert_eq!(
        writer.handle_message(Message::Set(vec![])),
        Err(CurveError::MissingBufferName)
    );

    writer.set("ghost").unwrap();
    scheduler.run_pending();
    assert_eq!(
        writer.list_values(&[1.0, 1.0]),
        Err(CurveError::BufferNotFound {
            name: "ghost".into()
        })
    );

    store.insert("ghost", 10);
    writer.handle_message(Message::Notify(BufferEvent::Rebound)).unwrap();
    assert!(writer.list_values(&[1.0, 1.0]).is_ok());
    assert!(writer.is_bound());
}

#[test]
fn empty_set_keeps_previous_binding() {
    let mut rig = rig(1_000.0, 10);

    assert!(rig.writer.handle_message(Message::Set(vec![])).is_err());
    assert!(rig
        .writer
        .handle_message(Message::Set(vec![Atom::Float(3.0)]))
        .is_err());

    rig.writer.list_values(&[1.0, 1.0]).unwrap();
    assert_eq!(rig.writer.buffer_name(), Some("env"));
    assert!(contents(&rig.store, "env")[9] > 0.8);
}

#[test]
fn zero_length_buffer_defaults_to_one_second() {
    let mut rig = rig(1_000.0, 0);

    rig.writer.list_values(&[1.0, 1.0]).unwrap();
    assert_eq!(rig.writer.buffer_frames(), 1_000);
    assert_eq!(contents(&rig.store, "env").len(), 1_000);
}

#[test]
fn lock_failure_leaves_writer_usable() {
    let mut rig = rig(1_000.0, 16);
    let handle = rig.store.resolve("env").unwrap();

    {
        let _held = rig.store.lock(&handle).expect("lock");
        assert_eq!(
            rig.writer.list_values(&[1.0, 1.0]),
            Err(CurveError::LockFailed { name: "env".into() })
        );
    }

    assert!(rig.writer.list_values(&[1.0, 1.0]).is_ok());
}

#[test]
fn modified_notification_picks_up_new_size() {
    let mut rig = rig(1_000.0, 10);
    rig.writer.list_values(&[1.0, 1.0]).unwrap();
    assert_eq!(rig.writer.buffer_frames(), 10);

    let handle = rig.store.resolve("env").unwrap();
    rig.store.set_size(&handle, 40);
    rig.writer.list_values(&[0.0, 1.0]).unwrap();
    assert_eq!(rig.writer.buffer_frames(), 10);

    rig.writer.notify(BufferEvent::Modified);
    rig.writer.list_values(&[1.0, 1.0]).unwrap();
    assert_eq!(rig.writer.buffer_frames(), 40);
    assert!(contents(&rig.store, "env")[39] > 0.9);
}

#[test]
fn rebinds_beyond_queue_capacity_still_land_on_latest() {
    let mut rig = rig(1_000.0, 8);
    let burst = rig.writer.config().rebind_queue + 4;
    for i in 0..burst {
        let name = format!("b{i}");
        rig.store.insert(&name, 8);
        rig.writer.set(&name).unwrap();
    }
    rig.scheduler.run_pending();

    rig.writer.list_values(&[0.5, 1.0]).unwrap();
    let latest = format!("b{}", burst - 1);
    assert_eq!(rig.writer.buffer_name(), Some(latest.as_str()));
    assert!(contents(&rig.store, &latest)[7] > 0.4);
    assert!(contents(&rig.store, "env").iter().all(|&s| s == 0.0));
    assert!(contents(&rig.store, "b0").iter().all(|&s| s == 0.0));
}

#[test]
fn rapid_rebinds_coalesce_to_latest() {
    let mut rig = rig(1_000.0, 8);
    for name in ["a", "b", "c"] {
        rig.store.insert(name, 8);
        rig.writer.handle_message(Message::set(name)).unwrap();
    }
    rig.scheduler.run_pending();

    rig.writer.list_values(&[1.0, 1.0]).unwrap();
    assert!(contents(&rig.store, "a").iter().all(|&s| s == 0.0));
    assert!(contents(&rig.store, "b").iter().all(|&s| s == 0.0));
    assert!(contents(&rig.store, "c")[7] > 0.8);
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    fn lines_containing(&self, needle: &str) -> usize {
        let text = String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned();
        text.lines().filter(|line| line.contains(needle)).count()
    }
}

#[test]
fn errors_are_logged_once_at_the_message_boundary() {
    let capture = LogCapture::default();
    let writer_capture = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::ERROR)
        .with_ansi(false)
        .with_writer(move || writer_capture.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let store = Arc::new(MemoryBufferStore::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let mut writer: TestWriter =
            CurveWriter::new(WriterConfig::new(1_000.0), store, scheduler).with_buffer("missing");

        // Direct calls hand the error back without logging it
        assert!(matches!(
            writer.list_values(&[1.0, 1.0]),
            Err(CurveError::BufferNotFound { .. })
        ));
        assert_eq!(capture.lines_containing("probably doesn't exist"), 0);

        assert_eq!(
            writer.handle_message(Message::Float(0.5)),
            Err(CurveError::InvalidInput)
        );
        assert_eq!(capture.lines_containing("invalid input"), 1);

        assert!(writer.handle_message(Message::list(&[1.0, 1.0])).is_err());
        assert_eq!(capture.lines_containing("probably doesn't exist"), 1);
    });
}

#[test]
fn text_messages_drive_the_writer() {
    let mut rig = rig(1_000.0, 20);

    for line in ["curve 0.5", "0 1 0 1 1 0"] {
        rig.writer.handle_message(parse_message(line).unwrap()).unwrap();
    }
    assert_eq!(rig.writer.curvature_bias(), 0.5);
    assert_eq!(rig.writer.value(), 1.0);
    assert_eq!(
        rig.writer.handle_message(parse_message("0.5").unwrap()),
        Err(CurveError::InvalidInput)
    );
}

#[test]
fn worker_scheduler_delivers_completion() {
    let store = Arc::new(MemoryBufferStore::new());
    store.insert("env", 256);
    let scheduler = Arc::new(WorkerScheduler::new());
    let (tx, rx) = mpsc::channel();

    let mut writer = CurveWriter::new(
        WriterConfig::new(48_000.0),
        Arc::clone(&store),
        Arc::clone(&scheduler),
    )
    .with_buffer("env")
    .on_complete(move || {
        let _ = tx.send(());
    });

    writer.list_values(&[1.0, 5.0, 0.3, 0.0, 5.0, -0.3]).unwrap();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}
