// Logging and small formatting helpers
use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

/// Formats a length in meters the way the plant panels show it.
pub fn format_meters(meters: f64) -> String {
    if meters < 1.0 {
        format!("{:.0} cm", meters * 100.0)
    } else {
        format!("{:.2} m", meters)
    }
}

/// One formatted event; forwarded to the browser console when dropped.
pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        let msg = JsValue::from_str(line.trim_end());
        match self.level {
            Level::ERROR => web_sys::console::error_1(&msg),
            Level::WARN => web_sys::console::warn_1(&msg),
            Level::INFO => web_sys::console::info_1(&msg),
            _ => web_sys::console::log_1(&msg),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Console;

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buf: Vec::new(),
        }
    }
}

/// Installs the global subscriber. No timer: the wasm target has no system clock.
pub fn init_logging(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(Console)
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::format_meters;

    #[test]
    fn meters_format_switches_to_cm() {
        assert_eq!(format_meters(0.7), "70 cm");
        assert_eq!(format_meters(2.5), "2.50 m");
    }
}
