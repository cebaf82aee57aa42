//! The kernel's physical memory manager instance.

use fdt::{BootInfo, MemRegion};
use pmm::{AddressTranslator, HumanAddress, HumanSize, InitError, PhysicalMemoryManager};
use spin::{Mutex, Once};

unsafe extern "C" {
    static __kernel_start: u8;
    static __kernel_end: u8;
}

/// Paging is off during early boot, so physical addresses are used as-is.
static TRANSLATOR: AddressTranslator = AddressTranslator::hardware(0);

static PMM: Once<Mutex<PhysicalMemoryManager<'static>>> = Once::new();

/// Returns the physical range of the loaded kernel image, boot stack included.
pub fn kernel_image() -> MemRegion {
    let start = (&raw const __kernel_start) as usize;
    let end = (&raw const __kernel_end) as usize;
    MemRegion::new(start, end - start)
}

/// Initializes the global physical memory manager from the boot summary.
///
/// Firmware does not list the kernel image or the device tree blob, so both are excluded
/// from the gap search; the page arena is zeroed on init and must never land on them.
pub fn init_pmm(
    info: &BootInfo,
) -> Result<&'static Mutex<PhysicalMemoryManager<'static>>, InitError> {
    if let Some(pmm) = PMM.get() {
        log::warn!("physical memory manager already initialized");
        return Ok(pmm);
    }

    let image = kernel_image();
    log::debug!(
        "kernel image at {} ({})",
        HumanAddress(image.base),
        HumanSize(image.size)
    );
    let excluded = [image, info.dtb_region()];

    let pmm = PMM.try_call_once(|| {
        PhysicalMemoryManager::init_excluding(info, &excluded, &TRANSLATOR).map(Mutex::new)
    })?;

    {
        let guard = pmm.lock();
        log::info!("{} of {} pages free", guard.free_pages(), guard.page_count());
    }

    Ok(pmm)
}
