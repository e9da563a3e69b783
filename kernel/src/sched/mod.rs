//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 调度器模块
//!
//! 调度器架构：
//! - 就绪队列 (queue): 按优先级降序的 PID 链表
//! - 老化 (aging): 防止低优先级进程饥饿
//! - 推迟调度 (defer): 多步更新期间暂停 resched
//! - 时钟 (clock) 与睡眠队列 (sleep)
//! - 调度入口: resched() -> ContextSwitch::switch_context()

pub mod aging;
pub mod clock;
pub mod defer;
pub mod error;
pub mod pid;
pub mod queue;
pub mod sched;
pub mod sleep;
pub mod starvation;

pub use aging::{AgingStrategy, BoostRecord, ResetPolicy};
pub use defer::{DeferState, Deferred};
pub use error::{SchedError, SchedResult};
pub use pid::{Pid, Prio, PID_IDLE};
pub use queue::{QueueEntry, QueueError, ReadyQueue};
pub use sched::{InvariantError, SchedConfig, SchedulerContext};
