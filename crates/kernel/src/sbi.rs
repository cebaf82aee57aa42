//! Platform reset through the Supervisor Binary Interface.

use crate::arch;

/// System Reset extension ("SRST").
const EID_SYSTEM_RESET: usize = 0x5352_5354;
const FID_SYSTEM_RESET: usize = 0;
/// Legacy (v0.1) shutdown call.
const EID_LEGACY_SHUTDOWN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum ResetType {
    Shutdown = 0,
    ColdReboot = 1,
}

/// Reason reported to firmware alongside a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ResetReason {
    None = 0,
    SystemFailure = 1,
}

#[cfg(target_arch = "riscv64")]
fn system_reset(kind: ResetType, reason: ResetReason) -> isize {
    arch::sbi_call(EID_SYSTEM_RESET, FID_SYSTEM_RESET, kind as usize, reason as usize).error
}

#[cfg(target_arch = "riscv64")]
fn legacy_shutdown() {
    arch::sbi_call(EID_LEGACY_SHUTDOWN, 0, 0, 0);
}

// SBI_ERR_NOT_SUPPORTED
#[cfg(not(target_arch = "riscv64"))]
fn system_reset(_kind: ResetType, _reason: ResetReason) -> isize {
    -2
}

#[cfg(not(target_arch = "riscv64"))]
fn legacy_shutdown() {}

/// Powers the machine off. Never returns; parks the hart if firmware refuses.
pub fn shutdown(reason: ResetReason) -> ! {
    log::info!("shutting down ({:?})", reason);
    let error = system_reset(ResetType::Shutdown, reason);
    log::warn!("system reset failed with SBI error {}, trying legacy shutdown", error);
    legacy_shutdown();

    log::error!("firmware refused to shut down, parking");
    arch::park()
}

/// Performs a cold reboot. Never returns; parks the hart if firmware refuses.
pub fn reboot() -> ! {
    log::info!("rebooting");
    let error = system_reset(ResetType::ColdReboot, ResetReason::None);
    log::error!("reboot failed with SBI error {}, parking", error);
    arch::park()
}
