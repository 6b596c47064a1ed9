use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

const CRATE_NAMES: &[&str] = &["ministore", "ministore_server"];

/// Initialize the logger for testing.
///
/// This logs to the stdout registered by the Rust test runner, and only captures logs from the
/// calling crate.
///
/// # Example
///
/// ```
/// ministore_test::tracing::init();
/// ```
pub fn init() {
    let mut env_filter = EnvFilter::new("ERROR");

    // Add all internal modules with maximum log-level.
    for name in CRATE_NAMES {
        env_filter = env_filter.add_directive(format!("{name}=TRACE").parse().unwrap());
    }

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}

/// Runs `f` and returns its result along with all log lines it emitted on this thread.
///
/// Lines are formatted without timestamps, targets and colors, for example
/// ` WARN unknown driver type: bogus`.
///
/// # Example
///
/// ```
/// let ((), lines) = ministore_test::tracing::capture(|| tracing::warn!("hello"));
/// assert_eq!(lines.len(), 1);
/// ```
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let buffer = Arc::new(Mutex::new(Vec::new()));

    let make_writer = {
        let buffer = buffer.clone();
        move || CaptureWriter(buffer.clone())
    };

    let subscriber = tracing_subscriber::fmt()
        .with_writer(make_writer)
        .with_max_level(::tracing::Level::TRACE)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .finish();

    let result = ::tracing::subscriber::with_default(subscriber, f);

    let output = buffer.lock().unwrap();
    let lines = String::from_utf8_lossy(&output)
        .lines()
        .map(str::to_owned)
        .collect();

    (result, lines)
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
