//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 标准错误代码定义
//!
//! 和 include/uapi/asm-generic/errno.h 保持一致，只收录调度核心用到的代码。
//! 系统调用层把 [`crate::sched::SchedError`] 转成这里的负数返回值：
//!
//! ```rust
//! use rux_sched::errno::Errno;
//! use rux_sched::sched::SchedError;
//!
//! let errno: Errno = SchedError::ProcessTableFull.into();
//! assert_eq!(errno.as_neg_i32(), -11);
//! ```

/// 标准错误代码
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Errno {
    /// Operation not permitted (EPERM, 1)
    OperationNotPermitted = 1,

    /// No such process (ESRCH, 3)
    NoSuchProcess = 3,

    /// Try again (EAGAIN, 11)
    TryAgain = 11,

    /// Invalid argument (EINVAL, 22)
    InvalidArgument = 22,
}

impl Errno {
    /// 系统调用风格的负数返回值
    pub const fn as_neg_i32(self) -> i32 {
        -(self as i32)
    }

    /// 错误名称
    pub const fn name(self) -> &'static str {
        match self {
            Errno::OperationNotPermitted => "EPERM",
            Errno::NoSuchProcess => "ESRCH",
            Errno::TryAgain => "EAGAIN",
            Errno::InvalidArgument => "EINVAL",
        }
    }
}

pub const EPERM: i32 = Errno::OperationNotPermitted as i32;
pub const ESRCH: i32 = Errno::NoSuchProcess as i32;
pub const EAGAIN: i32 = Errno::TryAgain as i32;
pub const EINVAL: i32 = Errno::InvalidArgument as i32;
