//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 单元测试模块
//!
//! 宿主机上运行，上下文切换由 [`HostSwitch`] 记录：
//! ```bash
//! cargo test -p rux-sched
//! ```

mod aging;
mod clock;
mod defer;
mod queue;

use crate::arch::host::SwitchRecord;
use crate::arch::HostSwitch;
use crate::sched::{Pid, SchedConfig, SchedulerContext};

pub(crate) type HostContext = SchedulerContext<HostSwitch>;

/// 测试进程入口，宿主机上不会被执行
pub(crate) fn noop() {}

pub(crate) const STACK: usize = crate::config::MIN_STACK_SIZE;

/// 默认配置，时间片固定为 2 个滴答
pub(crate) fn new_ctx() -> HostContext {
    ctx_with(SchedConfig { quantum: 2, ..SchedConfig::default() })
}

pub(crate) fn ctx_with(config: SchedConfig) -> HostContext {
    SchedulerContext::with_config(HostSwitch::new(), config)
}

/// 创建并立即 resume
pub(crate) fn spawn(ctx: &mut HostContext, prio: i32, name: &str) -> Pid {
    let pid = ctx.create(noop, STACK, prio, name).unwrap();
    ctx.resume(pid).unwrap();
    check(ctx);
    pid
}

pub(crate) fn check(ctx: &HostContext) {
    if let Err(err) = ctx.check_invariants() {
        panic!("invariant broken: {} ({:?})", err, ctx.ready_queue());
    }
}

pub(crate) fn switches(ctx: &HostContext) -> Vec<(Pid, Pid)> {
    ctx.switcher()
        .records()
        .iter()
        .map(|&SwitchRecord { from, to, .. }| (from, to))
        .collect()
}
