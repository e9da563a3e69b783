//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 推迟调度
//!
//! 多步更新（例如一次唤醒多个进程）期间不希望每一步都触发 resched。
//! `begin_defer` 之后的 resched 只记下一个待处理标志，最外层的
//! `end_defer` 再统一执行一次。

use core::ops::{Deref, DerefMut};

use super::sched::SchedulerContext;
use crate::arch::ContextSwitch;

/// 嵌套计数 + 待处理标志
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeferState {
    count: u32,
    pending: bool,
}

impl DeferState {
    pub const fn new() -> Self {
        Self { count: 0, pending: false }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_active(&self) -> bool {
        self.count > 0
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// 加一层嵌套，返回之前的计数
    pub(crate) fn begin(&mut self) -> u32 {
        let prev = self.count;
        self.count += 1;
        prev
    }

    /// 减一层嵌套；返回是否需要立即执行被推迟的 resched
    ///
    /// 只有最外层的 end 会返回 true，此时标志已被清除
    pub(crate) fn end(&mut self) -> bool {
        if self.count == 0 {
            log::warn!("defer: end without matching begin");
            return false;
        }
        self.count -= 1;
        if self.count == 0 && self.pending {
            self.pending = false;
            return true;
        }
        false
    }

    pub(crate) fn mark_pending(&mut self) {
        self.pending = true;
    }
}

/// 作用域内推迟调度的守卫
///
/// 由 [`SchedulerContext::deferred`] 创建，drop 时执行 `end_defer`
pub struct Deferred<'a, S: ContextSwitch> {
    ctx: &'a mut SchedulerContext<S>,
}

impl<'a, S: ContextSwitch> Deferred<'a, S> {
    pub(crate) fn new(ctx: &'a mut SchedulerContext<S>) -> Self {
        ctx.begin_defer();
        Self { ctx }
    }
}

impl<S: ContextSwitch> Deref for Deferred<'_, S> {
    type Target = SchedulerContext<S>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<S: ContextSwitch> DerefMut for Deferred<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl<S: ContextSwitch> Drop for Deferred<'_, S> {
    fn drop(&mut self) {
        self.ctx.end_defer();
    }
}
