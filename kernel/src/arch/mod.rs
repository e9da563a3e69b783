//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 架构相关代码
//!
//! 调度核心只通过两个接口接触硬件：
//! - [`ContextSwitch`]: 保存换出进程的寄存器，恢复换入进程的寄存器
//! - [`irq`]: 屏蔽中断的作用域守卫
//!
//! 当前实现：
//! - **host** - 宿主机实现，只记录切换序列，用于测试和场景模拟
//! - **RISC-V (riscv64)** - 真实的寄存器切换，需要 `riscv64` feature

pub mod host;
pub mod irq;

#[cfg(all(feature = "riscv64", target_arch = "riscv64"))]
pub mod riscv64;

pub use host::HostSwitch;

#[cfg(all(feature = "riscv64", target_arch = "riscv64"))]
pub use riscv64::context::Riscv64Switch;

use crate::process::CpuContext;
use crate::sched::pid::Pid;

/// 上下文切换原语
///
/// 调度核心在选出换入进程后调用一次。`save_into` 是换出进程的上下文，
/// `resume_from` 是换入进程的上下文，两者属于不同的 PCB。
///
/// 真实硬件上这个调用在换出进程下次被调度时才返回；
/// 宿主机实现立即返回。
pub trait ContextSwitch {
    fn switch_context(
        &mut self,
        prev: Pid,
        save_into: &mut CpuContext,
        next: Pid,
        resume_from: &CpuContext,
    );

    /// 换出进程已被 kill：不保存任何寄存器，只恢复 `resume_from`
    ///
    /// 真实硬件上这个调用不返回。
    fn restore_context(&mut self, prev: Pid, next: Pid, resume_from: &CpuContext);
}

/// 新进程初始上下文中的 `(ra, s0)`
///
/// riscv64 上新进程先进入 `__proc_start`，它打开中断后跳到 `s0` 中的入口；
/// 其他平台 `ra` 直接是入口，`s0` 不用。
#[cfg(all(feature = "riscv64", target_arch = "riscv64"))]
pub fn entry_frame(entry: usize) -> (u64, u64) {
    (riscv64::context::proc_start_addr() as u64, entry as u64)
}

#[cfg(not(all(feature = "riscv64", target_arch = "riscv64")))]
pub fn entry_frame(entry: usize) -> (u64, u64) {
    (entry as u64, 0)
}
