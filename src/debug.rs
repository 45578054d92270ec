use parking_lot::Mutex;
/// Debug logging for scripthost
///
/// Controlled by the DEBUG_LEVEL environment variable:
/// - 0 or unset: No debugging
/// - 1: Errors only
/// - 2: Info level (runs, provider registration)
/// - 3: Debug level (bindings, capture)
/// - 4: Trace level (every operation, detailed info)
///
/// All output goes to /tmp/scripthost_debug.log on Unix/macOS,
/// or %TEMP%\scripthost_debug.log on Windows, so diagnostics never mix with
/// the script output on stdout/stderr. `log` records are routed here by
/// [`init_log_bridge`] and mirrored to stderr when RUST_LOG is set.
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    /// Level from DEBUG_LEVEL, `None` when unset or invalid.
    fn from_env() -> Option<Self> {
        let val = std::env::var("DEBUG_LEVEL").ok()?;
        match val.trim().parse::<u8>() {
            Ok(0) => Some(DebugLevel::Off),
            Ok(1) => Some(DebugLevel::Error),
            Ok(2) => Some(DebugLevel::Info),
            Ok(3) => Some(DebugLevel::Debug),
            Ok(4) => Some(DebugLevel::Trace),
            _ => None,
        }
    }

    fn from_level_filter(filter: log::LevelFilter) -> Self {
        match filter {
            log::LevelFilter::Off => DebugLevel::Off,
            log::LevelFilter::Error => DebugLevel::Error,
            log::LevelFilter::Warn | log::LevelFilter::Info => DebugLevel::Info,
            log::LevelFilter::Debug => DebugLevel::Debug,
            log::LevelFilter::Trace => DebugLevel::Trace,
        }
    }

    fn to_level_filter(self) -> log::LevelFilter {
        match self {
            DebugLevel::Off => log::LevelFilter::Off,
            DebugLevel::Error => log::LevelFilter::Error,
            DebugLevel::Info => log::LevelFilter::Info,
            DebugLevel::Debug => log::LevelFilter::Debug,
            DebugLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Global debug logger
struct DebugLogger {
    level: DebugLevel,
    file: Option<std::fs::File>,
}

impl DebugLogger {
    fn new() -> Self {
        DebugLogger {
            level: DebugLevel::from_env().unwrap_or(DebugLevel::Off),
            file: None,
        }
    }

    fn log_path() -> PathBuf {
        #[cfg(unix)]
        let log_path = PathBuf::from("/tmp/scripthost_debug.log");
        #[cfg(windows)]
        let log_path = std::env::temp_dir().join("scripthost_debug.log");
        log_path
    }

    /// Open the log file the first time something is written at a non-off level.
    fn ensure_file(&mut self) {
        if self.file.is_some() || self.level == DebugLevel::Off {
            return;
        }
        // Silently fail if the log file can't be opened
        if let Ok(f) = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(Self::log_path())
        {
            self.file = Some(f);
            self.write_raw(&format!(
                "\n{}\nscripthost debug session started at {} (level={:?})\n{}\n",
                "=".repeat(80),
                get_timestamp(),
                self.level,
                "=".repeat(80)
            ));
        }
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }

    fn log(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level <= self.level {
            let level_str = match level {
                DebugLevel::Error => "ERROR",
                DebugLevel::Info => "INFO ",
                DebugLevel::Debug => "DEBUG",
                DebugLevel::Trace => "TRACE",
                DebugLevel::Off => return,
            };
            self.ensure_file();
            self.write_raw(&format!(
                "[{}] [{}] [{}] {}\n",
                get_timestamp(),
                level_str,
                category,
                msg
            ));
        }
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

/// Set once the CLI or DEBUG_LEVEL chose a level; config may not override it.
static LEVEL_PINNED: AtomicBool = AtomicBool::new(false);

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new()))
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Check if debugging is enabled at given level
pub fn is_enabled(level: DebugLevel) -> bool {
    let logger = get_logger().lock();
    level <= logger.level
}

/// Log a message at specified level
pub fn log(level: DebugLevel, category: &str, msg: &str) {
    let mut logger = get_logger().lock();
    logger.log(level, category, msg);
}

/// Log formatted message
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    if is_enabled(level) {
        log(level, category, &format!("{}", args));
    }
}

fn set_level(level: DebugLevel) {
    get_logger().lock().level = level;
    log::set_max_level(level.to_level_filter());
}

/// `log` facade backend writing into the debug log file.
struct LogBridge {
    mirror_to_stderr: bool,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            log::Level::Error => DebugLevel::Error,
            log::Level::Warn | log::Level::Info => DebugLevel::Info,
            log::Level::Debug => DebugLevel::Debug,
            log::Level::Trace => DebugLevel::Trace,
        };
        let msg = format!("{}", record.args());
        log(level, record.target(), &msg);
        if self.mirror_to_stderr {
            eprintln!("[{}] {}: {}", record.level(), record.target(), msg);
        }
    }

    fn flush(&self) {}
}

/// Route `log` records to the debug log file.
///
/// Precedence: `cli_level` (from `--log-level`), then DEBUG_LEVEL. Without
/// either, the level stays off until [`apply_config_level`] sets it.
pub fn init_log_bridge(cli_level: Option<log::LevelFilter>) {
    let bridge = LogBridge {
        mirror_to_stderr: std::env::var_os("RUST_LOG").is_some(),
    };
    if log::set_boxed_logger(Box::new(bridge)).is_err() {
        return;
    }

    let pinned = cli_level
        .map(DebugLevel::from_level_filter)
        .or_else(DebugLevel::from_env);
    match pinned {
        Some(level) => {
            LEVEL_PINNED.store(true, Ordering::SeqCst);
            set_level(level);
        }
        None => set_level(DebugLevel::Off),
    }
}

/// Apply the config file's level unless the CLI or environment chose one.
pub fn apply_config_level(level: log::LevelFilter) {
    if !LEVEL_PINNED.load(Ordering::SeqCst) {
        set_level(DebugLevel::from_level_filter(level));
    }
}

// Convenience macros for logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Trace, $category, format_args!($($arg)*))
    };
}
