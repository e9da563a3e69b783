//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! PID 与优先级类型
//!
//! PID 就是进程表的下标：
//! - PID 0: idle 进程，始终存在，优先级固定为 [`IDLE_PRIO`](crate::config::IDLE_PRIO)
//! - PID 1..NPROC: 普通进程

use crate::config::NPROC;

/// 进程标识符
pub type Pid = u32;

/// 调度优先级，数值越大越优先
pub type Prio = i32;

/// idle 进程
pub const PID_IDLE: Pid = 0;

/// PID 是否落在进程表范围内
#[inline]
pub fn pid_in_range(pid: Pid) -> bool {
    (pid as usize) < NPROC
}
