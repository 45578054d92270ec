//! Output capture and display-sink forwarding.
//!
//! [`OutputMultiplexer`] owns the process-wide standard output and error
//! destinations as one explicit shared resource. While intercepting, each
//! channel buffers written bytes until a flush boundary and then forwards the
//! buffered text to the [`DisplaySink`] as a single [`CapturedOutputRecord`].
//! When no sink is available the text passes through to the original
//! destination unchanged, so output is never dropped.
//!
//! Capture covers text written through the multiplexer: engine print hooks,
//! the `console` binding, forwarded interpreter output and [`OutputHandle`].
//! The process file descriptors are not redirected, so a Rust `println!` or
//! `eprintln!` inside a host object goes straight to the terminal. Host
//! objects that print should write through an [`OutputHandle`].
//!
//! Only one interception is active at a time. Concurrent runs share the same
//! destinations and would interleave; the runner serializes runs by default.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

/// Semantic color channel of captured text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTag {
    Normal,
    Error,
    /// Explicit RGB color chosen by a script.
    Custom(u8, u8, u8),
}

/// One of the two intercepted streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Out,
    Err,
}

impl Stream {
    fn color(self) -> ColorTag {
        match self {
            Stream::Out => ColorTag::Normal,
            Stream::Err => ColorTag::Error,
        }
    }
}

/// Text flushed from one channel as an atomic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutputRecord {
    pub text: String,
    pub color: ColorTag,
}

/// External destination (console/log panel) for captured output.
pub trait DisplaySink: Send + Sync {
    /// Whether the sink can currently display text.
    fn is_available(&self) -> bool;

    fn write(&self, text: &str, color: ColorTag);

    fn show(&self) {}

    fn hide(&self) {}

    fn clear(&self) {}
}

/// A writable destination such as the real stdout.
pub type Destination = Box<dyn Write + Send>;

#[derive(Debug)]
struct Channel {
    color: ColorTag,
    buffer: Vec<u8>,
}

impl Channel {
    fn new(stream: Stream) -> Self {
        Self {
            color: stream.color(),
            buffer: Vec::new(),
        }
    }

    fn take_record(&mut self) -> Option<CapturedOutputRecord> {
        if self.buffer.is_empty() {
            return None;
        }
        let bytes = std::mem::take(&mut self.buffer);
        Some(CapturedOutputRecord {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            color: self.color,
        })
    }
}

/// The normal/error interceptor pair installed by `begin()`.
#[derive(Debug)]
struct Interceptors {
    out: Channel,
    err: Channel,
}

impl Interceptors {
    fn new() -> Self {
        Self {
            out: Channel::new(Stream::Out),
            err: Channel::new(Stream::Err),
        }
    }

    fn channel_mut(&mut self, stream: Stream) -> &mut Channel {
        match stream {
            Stream::Out => &mut self.out,
            Stream::Err => &mut self.err,
        }
    }
}

struct MuxState {
    original_out: Destination,
    original_err: Destination,
    /// `Some` while intercepting.
    interceptors: Option<Interceptors>,
}

impl MuxState {
    fn original_mut(&mut self, stream: Stream) -> &mut Destination {
        match stream {
            Stream::Out => &mut self.original_out,
            Stream::Err => &mut self.original_err,
        }
    }
}

/// Captures script output and forwards it to a display sink.
pub struct OutputMultiplexer {
    state: Mutex<MuxState>,
    sink: RwLock<Option<Arc<dyn DisplaySink>>>,
}

static GLOBAL: OnceLock<Arc<OutputMultiplexer>> = OnceLock::new();

impl OutputMultiplexer {
    /// Multiplexer over the real process stdout/stderr.
    pub fn new() -> Self {
        Self::with_destinations(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Multiplexer over explicit original destinations.
    pub fn with_destinations(out: Destination, err: Destination) -> Self {
        Self {
            state: Mutex::new(MuxState {
                original_out: out,
                original_err: err,
                interceptors: None,
            }),
            sink: RwLock::new(None),
        }
    }

    /// The process-wide multiplexer bound to the real stdout/stderr.
    pub fn global() -> Arc<OutputMultiplexer> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(OutputMultiplexer::new())))
    }

    /// Install or remove the display sink.
    pub fn set_sink(&self, sink: Option<Arc<dyn DisplaySink>>) {
        *self.sink.write() = sink;
    }

    pub fn sink(&self) -> Option<Arc<dyn DisplaySink>> {
        self.sink.read().clone()
    }

    fn available_sink(&self) -> Option<Arc<dyn DisplaySink>> {
        self.sink
            .read()
            .as_ref()
            .filter(|sink| sink.is_available())
            .cloned()
    }

    /// Start intercepting. Returns `false` if interception was already active.
    pub fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if state.interceptors.is_some() {
            log::trace!("Output capture already active");
            return false;
        }
        state.interceptors = Some(Interceptors::new());
        log::debug!("Output capture started");
        true
    }

    /// Flush pending text and restore the original destinations. Idempotent.
    pub fn end(&self) {
        let pending = {
            let mut state = self.state.lock();
            let Some(mut interceptors) = state.interceptors.take() else {
                return;
            };
            [
                (Stream::Out, interceptors.out.take_record()),
                (Stream::Err, interceptors.err.take_record()),
            ]
        };

        for (stream, record) in pending {
            if let Some(record) = record
                && let Err(e) = self.forward(stream, record)
            {
                log::warn!("Failed to flush captured output: {}", e);
            }
        }
        log::debug!("Output capture ended");
    }

    pub fn is_intercepting(&self) -> bool {
        self.state.lock().interceptors.is_some()
    }

    /// Write bytes to a stream: buffered while intercepting, direct otherwise.
    pub fn write(&self, stream: Stream, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        match state.interceptors.as_mut() {
            Some(interceptors) => {
                interceptors
                    .channel_mut(stream)
                    .buffer
                    .extend_from_slice(bytes);
                Ok(())
            }
            None => state.original_mut(stream).write_all(bytes),
        }
    }

    /// Flush boundary: forward the buffered text of `stream` as one record.
    pub fn flush(&self, stream: Stream) -> io::Result<()> {
        let record = {
            let mut state = self.state.lock();
            match state.interceptors.as_mut() {
                Some(interceptors) => interceptors.channel_mut(stream).take_record(),
                None => return state.original_mut(stream).flush(),
            }
        };
        match record {
            Some(record) => self.forward(stream, record),
            None => Ok(()),
        }
    }

    /// Write one complete chunk of text and flush it.
    pub fn print(&self, stream: Stream, text: &str) -> io::Result<()> {
        self.write(stream, text.as_bytes())?;
        self.flush(stream)
    }

    /// Emit an already-complete record with an explicit color.
    ///
    /// Goes to the sink while intercepting and the sink is available,
    /// otherwise to the original destination of the matching stream.
    pub fn emit(&self, color: ColorTag, text: &str) -> io::Result<()> {
        let stream = match color {
            ColorTag::Error => Stream::Err,
            _ => Stream::Out,
        };
        // Keep ordering with text already buffered on the same channel.
        self.flush(stream)?;

        if self.is_intercepting()
            && let Some(sink) = self.available_sink()
        {
            sink.write(text, color);
            return Ok(());
        }
        let mut state = self.state.lock();
        let dest = state.original_mut(stream);
        dest.write_all(text.as_bytes())?;
        dest.flush()
    }

    fn forward(&self, stream: Stream, record: CapturedOutputRecord) -> io::Result<()> {
        if let Some(sink) = self.available_sink() {
            sink.write(&record.text, record.color);
            return Ok(());
        }
        let mut state = self.state.lock();
        let dest = state.original_mut(stream);
        dest.write_all(record.text.as_bytes())?;
        dest.flush()
    }

    /// Show the sink, if one is available.
    pub fn show_sink(&self) {
        if let Some(sink) = self.available_sink() {
            sink.show();
        }
    }

    /// Hide the sink, if one is available.
    pub fn hide_sink(&self) {
        if let Some(sink) = self.available_sink() {
            sink.hide();
        }
    }

    /// Clear the sink, if one is available.
    pub fn clear_sink(&self) {
        if let Some(sink) = self.available_sink() {
            sink.clear();
        }
    }

    /// Writer for the normal channel.
    pub fn stdout(self: &Arc<Self>) -> OutputHandle {
        OutputHandle {
            mux: Arc::clone(self),
            stream: Stream::Out,
        }
    }

    /// Writer for the error channel.
    pub fn stderr(self: &Arc<Self>) -> OutputHandle {
        OutputHandle {
            mux: Arc::clone(self),
            stream: Stream::Err,
        }
    }
}

impl Default for OutputMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OutputMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputMultiplexer")
            .field("intercepting", &self.is_intercepting())
            .finish_non_exhaustive()
    }
}

/// `io::Write` adapter over one multiplexer stream.
#[derive(Clone)]
pub struct OutputHandle {
    mux: Arc<OutputMultiplexer>,
    stream: Stream,
}

impl Write for OutputHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.mux.write(self.stream, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.mux.flush(self.stream)
    }
}

/// In-memory display sink that records everything written to it.
#[derive(Debug)]
pub struct MemorySink {
    records: Mutex<Vec<CapturedOutputRecord>>,
    available: AtomicBool,
    visible: AtomicBool,
    clears: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            visible: AtomicBool::new(false),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<CapturedOutputRecord> {
        self.records.lock().clone()
    }

    /// All recorded text concatenated.
    pub fn text(&self) -> String {
        self.records.lock().iter().map(|r| r.text.as_str()).collect()
    }

    /// Recorded text of one color.
    pub fn text_with(&self, color: ColorTag) -> String {
        self.records
            .lock()
            .iter()
            .filter(|r| r.color == color)
            .map(|r| r.text.as_str())
            .collect()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for MemorySink {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn write(&self, text: &str, color: ColorTag) {
        self.records.lock().push(CapturedOutputRecord {
            text: text.to_string(),
            color,
        });
    }

    fn show(&self) {
        self.visible.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.records.lock().clear();
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Cloneable in-memory destination, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
