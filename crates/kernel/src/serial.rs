use crate::console::Console;

// cSpell:ignore uart
pub struct SerialWriter {
    port: uart_16550::MmioSerialPort,
}

impl core::fmt::Write for SerialWriter {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.port.write_str(s)
    }
}

/// Brings up the 16550 UART at `address` and routes console output to it.
pub fn init(console: &Console, address: usize) {
    // SAFETY: `address` is the MMIO base of a 16550 UART that nothing else drives.
    let mut port = unsafe { uart_16550::MmioSerialPort::new(address) };
    port.init();
    console.attach_serial(SerialWriter { port });
}
