// cSpell:ignore kmain syscon

#![cfg_attr(not(test), no_std)]

mod arch;
mod console;
mod mem;
mod sbi;
mod serial;

use core::panic::PanicInfo;

use fdt::BootInfo;
use pmm::{HumanAddress, HumanSize, PAGE_SIZE};

pub use arch::park;
pub use sbi::{ResetReason, reboot, shutdown};

/// MMIO base of the 16550 UART on the QEMU `virt` machine.
pub const UART_BASE: usize = 0x1000_0000;

/// Kernel entry point, called by the boot stub with the firmware's device tree.
pub fn kernel_main(dtb: *const u8) -> ! {
    let console = console::Console::init();
    serial::init(console, UART_BASE);
    console.write_str(concat!("Aster kernel ", env!("CARGO_PKG_VERSION"), "\n"));

    // SAFETY: Firmware hands over a valid blob and leaves it in place.
    let info = unsafe { BootInfo::from_ptr(dtb) };
    log_boot_info(&info);

    let pmm = match mem::init_pmm(&info) {
        Ok(pmm) => pmm,
        Err(e) => {
            log::error!("failed to initialize physical memory manager: {}", e);
            shutdown(ResetReason::SystemFailure);
        }
    };

    // Smoke test: one page out and back.
    {
        let mut pmm = pmm.lock();
        match pmm.allocate(PAGE_SIZE) {
            Ok(page) => {
                log::debug!("test page at {}", page);
                pmm.free(page);
            }
            Err(e) => log::warn!("test allocation failed: {}", e),
        }
    }

    log::info!("boot complete");
    shutdown(ResetReason::None)
}

fn log_boot_info(info: &BootInfo) {
    log::info!(
        "device tree at {} ({}), boot hart {}",
        HumanAddress(info.dtb_base),
        HumanSize(info.dtb_size),
        info.boot_hart_id
    );
    log::info!("core count: {}", info.core_count);

    for region in info.memory_regions() {
        log::info!(
            "memory {}..{} ({})",
            HumanAddress(region.base),
            HumanAddress(region.end()),
            HumanSize(region.size)
        );
    }
    for region in info.reserved_regions() {
        log::debug!(
            "reserved {}..{} ({})",
            HumanAddress(region.base),
            HumanAddress(region.end()),
            HumanSize(region.size)
        );
    }
    for device in info.syscon_devices() {
        log::debug!("syscon {} at {}", device.name(), HumanAddress(device.base));
    }
}

/// Reports a panic and takes the machine down.
///
/// Debug builds power off so the failure stays on screen; release builds reboot.
pub fn handle_panic(info: &PanicInfo) -> ! {
    log::error!("kernel panic: {}", info);

    #[cfg(debug_assertions)]
    shutdown(ResetReason::SystemFailure);

    #[cfg(not(debug_assertions))]
    reboot();
}
