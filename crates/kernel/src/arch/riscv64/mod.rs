//! RISC-V entry point and SBI calls.

use core::arch::{asm, global_asm};

// OpenSBI enters in S-mode with a0 = hart id and a1 = device tree blob, paging off.
global_asm!(
    r#"
    .section .text.boot, "ax"
    .global _start
_start:
    la sp, __boot_stack_top

    la t0, __bss_start
    la t1, __bss_end
1:
    bgeu t0, t1, 2f
    sd zero, (t0)
    addi t0, t0, 8
    j 1b
2:
    call rust_entry
3:
    wfi
    j 3b
    "#
);

#[unsafe(no_mangle)]
extern "C" fn rust_entry(hart_id: usize, dtb: *const u8) -> ! {
    log::trace!("entered on hart {}", hart_id);
    crate::kernel_main(dtb)
}

/// Raw return pair of an SBI call.
#[derive(Debug, Clone, Copy)]
pub struct SbiRet {
    pub error: isize,
    pub value: usize,
}

/// Performs an SBI `ecall` with two arguments.
pub fn sbi_call(eid: usize, fid: usize, arg0: usize, arg1: usize) -> SbiRet {
    let error;
    let value;
    // SAFETY: The SBI implementation only reads a0, a1, a6 and a7 and writes a0 and a1.
    unsafe {
        asm!(
            "ecall",
            inlateout("a0") arg0 => error,
            inlateout("a1") arg1 => value,
            in("a6") fid,
            in("a7") eid,
            options(nostack),
        );
    }
    SbiRet { error, value }
}
