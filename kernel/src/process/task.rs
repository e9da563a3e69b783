//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程控制块 (Process Control Block)
//!
//! 每个进程表槽位一个 [`Pcb`]，以 PID 为下标。
//!
//! 关键设计要点：
//! 1. 任意时刻恰好一个 PCB 处于 [`ProcState::Current`]
//! 2. 保存的 CPU 上下文和栈由 PCB 独占，进程被 kill 时一并释放
//! 3. 优先级只能由调度核心修改，保证与就绪队列中的键一致

use alloc::boxed::Box;
use alloc::vec;
use core::fmt;

use crate::config::PROC_NAME_LEN;
use crate::sched::pid::{Pid, Prio};

/// 进程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProcState {
    /// 空闲槽位
    Free = 0,

    /// 正在 CPU 上运行
    Current = 1,

    /// 可运行，在就绪队列中等待
    Ready = 2,

    /// 已创建或被挂起，等待 resume
    Suspended = 3,

    /// 在睡眠队列中等待定时唤醒
    Sleeping = 4,

    /// 等待外部事件（由调度核心之外的代码管理）
    Waiting = 5,
}

/// 进程标志
pub mod proc_flags {
    use bitflags::bitflags;

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct ProcFlags: u32 {
            /// 保留的 idle 进程，不可被 kill / suspend / 改优先级
            const IDLE   = 0x0000_0001;
            /// 内核自身创建的进程
            const SYSTEM = 0x0000_0002;
        }
    }
}

pub use proc_flags::ProcFlags;

/// CPU 上下文 - 进程切换时保存/恢复的寄存器
///
/// 布局与 riscv64 的 `__switch_to` 一致：ra, sp, s0-s11
#[repr(C)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuContext {
    /// 返回地址，新进程为入口（riscv64 上为启动跳板）
    pub ra: u64,

    /// 栈指针
    pub sp: u64,

    /// 被调用者保存寄存器 s0-s11
    pub s: [u64; 12],
}

impl CpuContext {
    pub const fn zeroed() -> Self {
        Self { ra: 0, sp: 0, s: [0; 12] }
    }

    /// 新进程的初始上下文：第一次被切换到时从 `entry` 开始执行
    ///
    /// 返回地址和 s0 由 [`crate::arch::entry_frame`] 决定
    pub fn for_entry(entry: usize, stack_top: usize) -> Self {
        let (ra, s0) = crate::arch::entry_frame(entry);
        let mut s = [0; 12];
        s[0] = s0;
        Self { ra, sp: stack_top as u64, s }
    }
}

/// 进程入口函数
pub type ProcEntry = fn();

/// 进程栈
///
/// 生命周期与进程相同，kill 时随 PCB 一起释放
pub struct StackRegion {
    mem: Box<[u8]>,
}

impl StackRegion {
    pub fn alloc(size: usize) -> Self {
        Self {
            mem: vec![0u8; size].into_boxed_slice(),
        }
    }

    pub fn size(&self) -> usize {
        self.mem.len()
    }

    pub fn base(&self) -> usize {
        self.mem.as_ptr() as usize
    }

    /// 栈顶（向下增长，16 字节对齐）
    pub fn top(&self) -> usize {
        (self.base() + self.size()) & !0xf
    }
}

impl fmt::Debug for StackRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StackRegion({:#x}+{:#x})", self.base(), self.size())
    }
}

/// 定长进程名，超长时按字符边界截断
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProcName {
    buf: [u8; PROC_NAME_LEN],
    len: usize,
}

impl ProcName {
    pub const fn empty() -> Self {
        Self { buf: [0; PROC_NAME_LEN], len: 0 }
    }

    pub fn new(name: &str) -> Self {
        let mut out = Self::empty();
        for ch in name.chars() {
            let n = ch.len_utf8();
            if out.len + n > PROC_NAME_LEN {
                break;
            }
            ch.encode_utf8(&mut out.buf[out.len..out.len + n]);
            out.len += n;
        }
        out
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl fmt::Display for ProcName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ProcName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

/// 进程控制块
pub struct Pcb {
    state: ProcState,
    prio: Prio,
    name: ProcName,
    parent: Option<Pid>,
    context: CpuContext,
    stack: Option<StackRegion>,
    flags: ProcFlags,
}

impl Pcb {
    /// 空闲槽位
    pub const fn free() -> Self {
        Self {
            state: ProcState::Free,
            prio: 0,
            name: ProcName::empty(),
            parent: None,
            context: CpuContext::zeroed(),
            stack: None,
            flags: ProcFlags::empty(),
        }
    }

    /// idle 进程：使用启动栈，初始即为 Current
    pub fn new_idle(prio: Prio) -> Self {
        Self {
            state: ProcState::Current,
            prio,
            name: ProcName::new("prnull"),
            parent: None,
            context: CpuContext::zeroed(),
            stack: None,
            flags: ProcFlags::IDLE | ProcFlags::SYSTEM,
        }
    }

    /// 不带 idle 启动时占用 PID 0 的引导进程，可以被挂起或 kill
    pub fn new_boot(prio: Prio) -> Self {
        Self {
            state: ProcState::Current,
            prio,
            name: ProcName::new("boot"),
            parent: None,
            context: CpuContext::zeroed(),
            stack: None,
            flags: ProcFlags::SYSTEM,
        }
    }

    /// 新建进程，初始状态为 Suspended
    pub fn new_process(
        entry: ProcEntry,
        stack: StackRegion,
        prio: Prio,
        name: &str,
        parent: Option<Pid>,
    ) -> Self {
        let context = CpuContext::for_entry(entry as usize, stack.top());
        Self {
            state: ProcState::Suspended,
            prio,
            name: ProcName::new(name),
            parent,
            context,
            stack: Some(stack),
            flags: ProcFlags::empty(),
        }
    }

    pub fn state(&self) -> ProcState {
        self.state
    }

    pub fn prio(&self) -> Prio {
        self.prio
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    pub fn flags(&self) -> ProcFlags {
        self.flags
    }

    pub fn context(&self) -> &CpuContext {
        &self.context
    }

    pub fn stack(&self) -> Option<&StackRegion> {
        self.stack.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.state == ProcState::Free
    }

    pub fn is_idle(&self) -> bool {
        self.flags.contains(ProcFlags::IDLE)
    }

    pub(crate) fn set_state(&mut self, state: ProcState) {
        self.state = state;
    }

    /// 只能由调度核心调用：在就绪队列中的进程必须先出队再改
    pub(crate) fn set_prio(&mut self, prio: Prio) {
        self.prio = prio;
    }

    pub(crate) fn context_mut(&mut self) -> &mut CpuContext {
        &mut self.context
    }

    /// 释放槽位，返回进程栈（由调用者丢弃）
    pub(crate) fn release(&mut self) -> Option<StackRegion> {
        let stack = self.stack.take();
        *self = Self::free();
        stack
    }
}

impl fmt::Debug for Pcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pcb")
            .field("state", &self.state)
            .field("prio", &self.prio)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("flags", &self.flags)
            .field("stack", &self.stack)
            .finish()
    }
}
