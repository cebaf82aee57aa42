//! Early debug console that logs to the serial port.

use core::fmt::Write;

use log::LevelFilter;
use spin::{Mutex, Once};

use crate::serial::SerialWriter;

pub struct Console {
    serial: Mutex<Option<SerialWriter>>,
}

static DEFAULT: Once<Console> = Once::new();

impl Console {
    /// Installs the console as the global logger and returns it.
    pub fn init() -> &'static Self {
        let console = Self::get();
        console.install();
        console
    }

    pub fn get() -> &'static Self {
        DEFAULT.call_once(|| Console {
            serial: Mutex::new(None),
        })
    }

    fn install(&'static self) {
        if log::set_logger(self).is_err() {
            return;
        }

        #[cfg(debug_assertions)]
        log::set_max_level(LevelFilter::Trace);

        #[cfg(not(debug_assertions))]
        log::set_max_level(LevelFilter::Info);
    }

    pub fn attach_serial(&self, serial: SerialWriter) {
        *self.serial.lock() = Some(serial);
    }

    /// Writes text straight to the serial port, bypassing the log format.
    pub fn write_str(&self, s: &str) {
        if let Some(serial) = &mut *self.serial.lock() {
            let _ = serial.write_str(s);
        }
    }
}

impl log::Log for Console {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if let Some(serial) = &mut *self.serial.lock() {
            // Nowhere to report a failed write.
            let _ = write_log_entry_to(serial, record);
        }
    }

    fn flush(&self) {}
}

fn write_log_entry_to(writer: &mut impl Write, record: &log::Record) -> core::fmt::Result {
    #[cfg(any(debug_assertions, feature = "detailed-logging"))]
    if let (Some(file), Some(line)) = (record.file(), record.line()) {
        return writeln!(
            writer,
            "{:>5} {}:{} {}",
            record.level(),
            file,
            line,
            record.args()
        );
    }

    writeln!(writer, "{:>5} {}", record.level(), record.args())
}
