#[cfg(target_arch = "riscv64")]
mod riscv64;

#[cfg(target_arch = "riscv64")]
pub use riscv64::*;

/// Stops the current hart until an interrupt arrives, forever.
pub fn park() -> ! {
    loop {
        #[cfg(target_arch = "riscv64")]
        // SAFETY: `wfi` only pauses the hart.
        unsafe {
            core::arch::asm!("wfi");
        }
        #[cfg(not(target_arch = "riscv64"))]
        core::hint::spin_loop();
    }
}
