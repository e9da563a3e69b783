//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! Rux 调度核心
//!
//! 单 CPU 严格优先级调度器：就绪队列、resched、推迟调度，
//! 以及防止低优先级进程饥饿的优先级老化。
//!
//! 宿主机上以 `std` 编译测试，其余情况下为 `no_std` + `alloc`。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch;
pub mod config;
pub mod console;
pub mod errno;
pub mod logger;
pub mod print;
pub mod process;
pub mod sched;

#[cfg(test)]
mod tests;

pub use sched::{AgingStrategy, Pid, Prio, SchedConfig, SchedError, SchedResult, SchedulerContext};
