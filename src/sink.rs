//! ANSI terminal display sink.
//!
//! Normal text goes to stdout, error text to stderr in red, and custom script
//! colors as 24-bit SGR sequences (`ESC[38;2;R;G;Bm`).

use std::io::{self, Write};

use parking_lot::Mutex;

use crate::scripting::{ColorTag, DisplaySink};

const RESET: &str = "\x1b[0m";
const ERROR_COLOR: &str = "\x1b[31m";
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

type Writer = Box<dyn Write + Send>;

/// Display sink writing to the terminal.
pub struct TerminalSink {
    out: Mutex<Writer>,
    err: Mutex<Writer>,
    color: bool,
}

impl TerminalSink {
    /// Sink on the process stdout/stderr.
    pub fn new(color: bool) -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), color)
    }

    pub fn with_writers(out: Writer, err: Writer, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            color,
        }
    }

    fn styled(&self, text: &str, color: ColorTag) -> String {
        let prefix = match (self.color, color) {
            (false, _) | (true, ColorTag::Normal) => return text.to_string(),
            (true, ColorTag::Error) => ERROR_COLOR.to_string(),
            (true, ColorTag::Custom(r, g, b)) => format!("\x1b[38;2;{r};{g};{b}m"),
        };
        // Reset before the line break so the color never bleeds into the prompt
        let body = text.trim_end_matches(['\r', '\n']);
        let tail = &text[body.len()..];
        format!("{prefix}{body}{RESET}{tail}")
    }
}

impl DisplaySink for TerminalSink {
    fn is_available(&self) -> bool {
        true
    }

    fn write(&self, text: &str, color: ColorTag) {
        let styled = self.styled(text, color);
        let mut dest = match color {
            ColorTag::Error => self.err.lock(),
            _ => self.out.lock(),
        };
        if let Err(e) = dest
            .write_all(styled.as_bytes())
            .and_then(|()| dest.flush())
        {
            log::warn!("Terminal sink write failed: {}", e);
        }
    }

    fn clear(&self) {
        if !self.color {
            return;
        }
        let mut out = self.out.lock();
        let _ = out.write_all(CLEAR_SCREEN.as_bytes());
        let _ = out.flush();
    }
}
