//! `console` binding.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::output::{ColorTag, OutputMultiplexer};
use crate::value::{Disposable, DomObject, DomValue, expect_args, str_arg};

/// Script access to the display sink.
///
/// Text written with a custom color goes straight to the sink while output is
/// being captured, otherwise to the original destination.
pub struct ConsoleBinding {
    output: Arc<OutputMultiplexer>,
    color: Mutex<Option<(u8, u8, u8)>>,
}

impl ConsoleBinding {
    pub fn new(output: Arc<OutputMultiplexer>) -> Self {
        Self {
            output,
            color: Mutex::new(None),
        }
    }

    fn current_color(&self) -> ColorTag {
        match *self.color.lock() {
            Some((r, g, b)) => ColorTag::Custom(r, g, b),
            None => ColorTag::Normal,
        }
    }

    fn emit(&self, color: ColorTag, text: &str) -> Result<DomValue, String> {
        self.output
            .emit(color, text)
            .map(|_| DomValue::Unit)
            .map_err(|e| format!("console write failed: {e}"))
    }
}

fn color_component(method: &str, args: &[DomValue], index: usize) -> Result<u8, String> {
    args[index]
        .as_int()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| format!("{method}() color components must be integers from 0 to 255"))
}

impl DomObject for ConsoleBinding {
    fn type_name(&self) -> &str {
        "Console"
    }

    fn methods(&self) -> &[&'static str] {
        &[
            "log",
            "print",
            "write",
            "println",
            "error",
            "clear",
            "set_text",
            "show",
            "hide",
            "set_text_color",
            "set_default_text_color",
        ]
    }

    fn call(&self, method: &str, args: &[DomValue]) -> Result<DomValue, String> {
        match method {
            "log" => {
                let line = args
                    .iter()
                    .map(DomValue::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                self.emit(self.current_color(), &format!("{line}\n"))
            }
            "print" | "write" => {
                expect_args(method, args, 1, 1)?;
                self.emit(self.current_color(), &args[0].to_string())
            }
            "println" => {
                expect_args(method, args, 0, 1)?;
                let text = args.first().cloned().unwrap_or_default();
                self.emit(self.current_color(), &format!("{text}\n"))
            }
            "error" => {
                expect_args(method, args, 1, 1)?;
                self.output.show_sink();
                self.emit(ColorTag::Error, &format!("{}\n", args[0]))
            }
            "clear" => {
                self.output.clear_sink();
                Ok(DomValue::Unit)
            }
            "set_text" => {
                expect_args(method, args, 1, 1)?;
                let text = str_arg(method, args, 0)?;
                self.output.clear_sink();
                self.emit(self.current_color(), text)
            }
            "show" => {
                self.output.show_sink();
                Ok(DomValue::Unit)
            }
            "hide" => {
                self.output.hide_sink();
                Ok(DomValue::Unit)
            }
            "set_text_color" => {
                expect_args(method, args, 3, 3)?;
                let rgb = (
                    color_component(method, args, 0)?,
                    color_component(method, args, 1)?,
                    color_component(method, args, 2)?,
                );
                *self.color.lock() = Some(rgb);
                Ok(DomValue::Unit)
            }
            "set_default_text_color" => {
                *self.color.lock() = None;
                Ok(DomValue::Unit)
            }
            _ => Err(format!("Console has no method '{method}'")),
        }
    }

    fn as_disposable(&self) -> Option<&dyn Disposable> {
        Some(self)
    }
}

impl Disposable for ConsoleBinding {
    /// Restores the default text color.
    fn dispose(&self) -> Result<(), String> {
        *self.color.lock() = None;
        Ok(())
    }
}
