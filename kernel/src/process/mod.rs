//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程管理模块
//!
//! - `task`: 进程控制块 (PCB)、进程状态、保存的 CPU 上下文、进程栈
//! - `table`: 定长进程表，PID 即下标

pub mod task;
pub mod table;

pub use task::{CpuContext, Pcb, ProcEntry, ProcFlags, ProcName, ProcState, StackRegion};
pub use table::ProcTable;
