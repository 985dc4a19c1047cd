//! `tracing` output for the browser: one console line per event, warnings and
//! errors through `console.warn` so devtools highlights them.

use std::io;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

/// Collects one formatted event and flushes it to the console on drop
pub struct ConsoleWriter {
    buf: Vec<u8>,
    warn: bool,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let Some(line) = console_line(&self.buf) else { return };
        let line = JsValue::from_str(&line);
        if self.warn {
            web_sys::console::warn_1(&line);
        } else {
            web_sys::console::log_1(&line);
        }
    }
}

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter { buf: Vec::new(), warn: false }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter { buf: Vec::new(), warn: is_warning(meta.level()) }
    }
}

fn is_warning(level: &Level) -> bool {
    *level <= Level::WARN
}

fn console_line(buf: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buf);
    let text = text.trim_end();
    (!text.is_empty()).then(|| text.to_string())
}

/// Route `tracing` events at `info` and above to the console. Safe to call twice.
pub fn init_console_tracing() {
    // no clock in the browser sandbox
    let _ = tracing_subscriber::fmt()
        .with_writer(Console)
        .with_ansi(false)
        .without_time()
        .with_max_level(Level::INFO)
        .try_init();
}
