//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 调度核心错误类型
//!
//! 这里只有可恢复的错误。就绪队列与进程表失步、没有任何可运行进程
//! 这类不变式破坏直接 panic，不作为返回值传播。

use core::fmt;

use super::pid::{Pid, Prio};
use crate::errno::Errno;
use crate::process::ProcState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// PID 越界或指向空闲槽位
    InvalidProcessId(Pid),

    /// 进程表没有空闲槽位
    ProcessTableFull,

    /// 优先级不在 MIN_PRIO..=MAX_PRIO 之间
    InvalidPriority(Prio),

    /// 进程当前状态不允许该操作
    InvalidState { pid: Pid, state: ProcState },

    /// 请求的栈小于 MIN_STACK_SIZE
    StackTooSmall(usize),

    /// 对 idle 进程的修改操作
    NotPermitted(Pid),
}

pub type SchedResult<T> = Result<T, SchedError>;

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::InvalidProcessId(pid) => write!(f, "invalid process id {}", pid),
            SchedError::ProcessTableFull => f.write_str("process table full"),
            SchedError::InvalidPriority(prio) => write!(f, "invalid priority {}", prio),
            SchedError::InvalidState { pid, state } => {
                write!(f, "process {} is in state {:?}", pid, state)
            }
            SchedError::StackTooSmall(size) => write!(f, "stack size {} too small", size),
            SchedError::NotPermitted(pid) => write!(f, "operation not permitted on process {}", pid),
        }
    }
}

impl From<SchedError> for Errno {
    fn from(err: SchedError) -> Self {
        match err {
            SchedError::InvalidProcessId(_) => Errno::NoSuchProcess,
            SchedError::ProcessTableFull => Errno::TryAgain,
            SchedError::InvalidPriority(_)
            | SchedError::InvalidState { .. }
            | SchedError::StackTooSmall(_) => Errno::InvalidArgument,
            SchedError::NotPermitted(_) => Errno::OperationNotPermitted,
        }
    }
}
