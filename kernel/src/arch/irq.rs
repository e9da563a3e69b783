//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 中断屏蔽
//!
//! 调度核心修改进程表、就绪队列和老化状态时都持有 [`InterruptGuard`]。
//! 守卫可以嵌套，离开作用域时恢复进入前的状态。
//!
//! 对应 Linux 的 local_irq_save()/local_irq_restore()

/// 屏蔽中断并返回守卫
#[inline]
pub fn disable() -> InterruptGuard {
    InterruptGuard::new()
}

#[cfg(all(feature = "riscv64", target_arch = "riscv64"))]
mod imp {
    use core::arch::asm;

    /// sstatus.SIE
    const SSTATUS_SIE: u64 = 1 << 1;

    pub struct InterruptGuard {
        sstatus: u64,
    }

    impl InterruptGuard {
        #[inline]
        pub fn new() -> Self {
            let sstatus: u64;
            // SAFETY: 只清除 SIE 位，原值保存在守卫里
            unsafe {
                asm!("csrrci {}, sstatus, 2", out(reg) sstatus, options(nomem, nostack));
            }
            Self { sstatus }
        }

        pub fn was_enabled(&self) -> bool {
            self.sstatus & SSTATUS_SIE != 0
        }
    }

    impl Drop for InterruptGuard {
        #[inline]
        fn drop(&mut self) {
            if self.was_enabled() {
                // SAFETY: 恢复进入守卫前的 SIE
                unsafe {
                    asm!("csrsi sstatus, 2", options(nomem, nostack));
                }
            }
        }
    }

    pub fn is_masked() -> bool {
        let sstatus: u64;
        // SAFETY: 只读 CSR
        unsafe {
            asm!("csrr {}, sstatus", out(reg) sstatus, options(nomem, nostack));
        }
        sstatus & SSTATUS_SIE == 0
    }
}

#[cfg(not(all(feature = "riscv64", target_arch = "riscv64")))]
mod imp {
    use core::sync::atomic::{AtomicU32, Ordering};

    /// 嵌套深度，非零即视为已屏蔽
    static DEPTH: AtomicU32 = AtomicU32::new(0);

    pub struct InterruptGuard {
        prev_depth: u32,
    }

    impl InterruptGuard {
        #[inline]
        pub fn new() -> Self {
            let prev_depth = DEPTH.fetch_add(1, Ordering::AcqRel);
            Self { prev_depth }
        }

        pub fn was_enabled(&self) -> bool {
            self.prev_depth == 0
        }
    }

    impl Drop for InterruptGuard {
        #[inline]
        fn drop(&mut self) {
            DEPTH.fetch_sub(1, Ordering::AcqRel);
        }
    }

    pub fn is_masked() -> bool {
        DEPTH.load(Ordering::Acquire) > 0
    }
}

pub use imp::{is_masked, InterruptGuard};
