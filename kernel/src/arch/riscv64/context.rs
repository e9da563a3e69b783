//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! RISC-V 64-bit 上下文切换
//!
//! 遵循 Linux 内核的 __switch_to (arch/riscv/kernel/entry.S)：
//! 只保存/恢复被调用者保存寄存器 ra, sp, s0-s11，
//! 其余寄存器由调用约定保证已被调用者保存。
//!
//! 布局必须与 [`CpuContext`] 一致：
//!
//! | 偏移 | 寄存器 |
//! |------|--------|
//! | 0    | ra     |
//! | 8    | sp     |
//! | 16+  | s0-s11 |
//!
//! 新进程的 `ra` 是 `__proc_start`，`s0` 是入口函数。
//! 调度核心在切换期间屏蔽中断，换入的新进程不会经过守卫的 Drop，
//! 所以 `__proc_start` 先打开 `sstatus.SIE` 再调用入口。
//! 入口函数返回后停在 `wfi` 循环里，由调度者 kill。

use crate::arch::ContextSwitch;
use crate::process::CpuContext;
use crate::sched::pid::Pid;

core::arch::global_asm!(
    ".section .text.context_switch",
    ".globl __switch_to",
    ".align 2",
    "__switch_to:",
    // a0 = save_into, a1 = resume_from
    "sd ra, 0(a0)",
    "sd sp, 8(a0)",
    "sd s0, 16(a0)",
    "sd s1, 24(a0)",
    "sd s2, 32(a0)",
    "sd s3, 40(a0)",
    "sd s4, 48(a0)",
    "sd s5, 56(a0)",
    "sd s6, 64(a0)",
    "sd s7, 72(a0)",
    "sd s8, 80(a0)",
    "sd s9, 88(a0)",
    "sd s10, 96(a0)",
    "sd s11, 104(a0)",
    "ld ra, 0(a1)",
    "ld sp, 8(a1)",
    "ld s0, 16(a1)",
    "ld s1, 24(a1)",
    "ld s2, 32(a1)",
    "ld s3, 40(a1)",
    "ld s4, 48(a1)",
    "ld s5, 56(a1)",
    "ld s6, 64(a1)",
    "ld s7, 72(a1)",
    "ld s8, 80(a1)",
    "ld s9, 88(a1)",
    "ld s10, 96(a1)",
    "ld s11, 104(a1)",
    "ret",
    "",
    ".globl __restore_to",
    ".align 2",
    "__restore_to:",
    // a0 = resume_from，不保存任何寄存器
    "ld ra, 0(a0)",
    "ld sp, 8(a0)",
    "ld s0, 16(a0)",
    "ld s1, 24(a0)",
    "ld s2, 32(a0)",
    "ld s3, 40(a0)",
    "ld s4, 48(a0)",
    "ld s5, 56(a0)",
    "ld s6, 64(a0)",
    "ld s7, 72(a0)",
    "ld s8, 80(a0)",
    "ld s9, 88(a0)",
    "ld s10, 96(a0)",
    "ld s11, 104(a0)",
    "ret",
    "",
    ".globl __proc_start",
    ".align 2",
    "__proc_start:",
    // s0 = 入口函数
    "csrsi sstatus, 2",
    "jalr s0",
    "1:",
    "wfi",
    "j 1b",
);

extern "C" {
    fn __switch_to(save_into: *mut CpuContext, resume_from: *const CpuContext);
    fn __restore_to(resume_from: *const CpuContext) -> !;
    fn __proc_start() -> !;
}

/// 新进程启动跳板的地址
pub fn proc_start_addr() -> usize {
    __proc_start as usize
}

const _: () = assert!(core::mem::size_of::<CpuContext>() == 14 * 8);

/// 真实硬件上的上下文切换
#[derive(Debug, Default, Clone, Copy)]
pub struct Riscv64Switch;

impl ContextSwitch for Riscv64Switch {
    fn switch_context(
        &mut self,
        _prev: Pid,
        save_into: &mut CpuContext,
        _next: Pid,
        resume_from: &CpuContext,
    ) {
        // SAFETY: 两个上下文属于不同的 PCB，调用者持有中断屏蔽；
        // resume_from 要么由 __switch_to 保存，要么由 CpuContext::for_entry 构造
        unsafe { __switch_to(save_into, resume_from) }
    }

    fn restore_context(&mut self, _prev: Pid, _next: Pid, resume_from: &CpuContext) {
        // SAFETY: 换出进程已被 kill，它的栈在切换走之后才释放；
        // resume_from 的来源同 switch_context
        unsafe { __restore_to(resume_from) }
    }
}
