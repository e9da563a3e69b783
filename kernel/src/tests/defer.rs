//! 推迟调度测试

use super::{check, new_ctx, noop, spawn, STACK};
use crate::arch::ContextSwitch;
use crate::config::NPROC;
use crate::process::{CpuContext, ProcState};
use crate::sched::{Pid, SchedConfig, SchedError, SchedulerContext, PID_IDLE};

/// 把换出进程的 ra 改写成 0xdead，保存到错误的 PCB 时能被看出来
#[derive(Default)]
struct ClobberSwitch {
    restores: usize,
}

impl ContextSwitch for ClobberSwitch {
    fn switch_context(&mut self, _prev: Pid, save_into: &mut CpuContext, _next: Pid, _resume_from: &CpuContext) {
        save_into.ra = 0xdead;
    }

    fn restore_context(&mut self, _prev: Pid, _next: Pid, _resume_from: &CpuContext) {
        self.restores += 1;
    }
}

#[test]
fn nested_defer_runs_once_at_outermost_end() {
    let mut ctx = new_ctx();
    let a = ctx.create(noop, STACK, 30, "a").unwrap();
    let b = ctx.create(noop, STACK, 40, "b").unwrap();

    assert_eq!(ctx.begin_defer(), 0);
    assert_eq!(ctx.begin_defer(), 1);

    ctx.resume(a).unwrap();
    ctx.resume(b).unwrap();
    assert_eq!(ctx.getpid(), PID_IDLE);
    assert_eq!(ctx.switch_count(), 0);
    assert!(ctx.defer_state().is_pending());

    // 内层结束不触发
    ctx.end_defer();
    assert_eq!(ctx.getpid(), PID_IDLE);
    assert_eq!(ctx.defer_state().count(), 1);

    ctx.end_defer();
    assert_eq!(ctx.getpid(), b);
    assert_eq!(ctx.switch_count(), 1);
    assert!(!ctx.defer_state().is_pending());
    assert!(!ctx.defer_state().is_active());
    check(&ctx);
}

#[test]
fn end_without_pending_does_nothing() {
    let mut ctx = new_ctx();
    ctx.begin_defer();
    ctx.end_defer();
    assert_eq!(ctx.switch_count(), 0);

    // 不配对的 end 被忽略
    ctx.end_defer();
    assert_eq!(ctx.defer_state().count(), 0);
}

#[test]
fn guard_defers_until_drop() {
    let mut ctx = new_ctx();
    let a = ctx.create(noop, STACK, 30, "a").unwrap();
    let b = ctx.create(noop, STACK, 20, "b").unwrap();

    {
        let mut guard = ctx.deferred();
        guard.resume(b).unwrap();
        guard.resume(a).unwrap();
        assert_eq!(guard.getpid(), PID_IDLE);
        assert!(guard.defer_state().is_active());
    }

    assert_eq!(ctx.getpid(), a);
    assert_eq!(ctx.switch_count(), 1);
    check(&ctx);
}

#[test]
fn suspend_current_inside_defer() {
    let mut ctx = new_ctx();
    let a = spawn(&mut ctx, 30, "a");

    ctx.begin_defer();
    ctx.suspend(a).unwrap();
    // 被推迟的 resched 执行前没有 Current 进程
    assert_eq!(ctx.state(a), Ok(ProcState::Suspended));
    check(&ctx);

    ctx.end_defer();
    assert_eq!(ctx.getpid(), PID_IDLE);
    check(&ctx);
}

#[test]
fn kill_current_inside_defer() {
    let mut ctx = new_ctx();
    let a = spawn(&mut ctx, 30, "a");
    let b = spawn(&mut ctx, 20, "b");

    ctx.begin_defer();
    ctx.kill(a).unwrap();

    // 切换之前：getpid 仍是 a，但 a 已查不到，栈还没释放
    assert_eq!(ctx.getpid(), a);
    assert_eq!(ctx.state(a), Err(SchedError::InvalidProcessId(a)));
    assert_eq!(ctx.parent(a), Err(SchedError::InvalidProcessId(a)));
    assert!(ctx.has_dead_stack());
    assert_eq!(ctx.sleep(3), Err(SchedError::InvalidState { pid: a, state: ProcState::Free }));
    check(&ctx);

    ctx.end_defer();
    assert_eq!(ctx.getpid(), b);
    assert!(!ctx.has_dead_stack());
    let last = ctx.switcher().last().unwrap();
    assert_eq!((last.from, last.to, last.saved), (a, b, false));
    check(&ctx);
}

#[test]
fn create_after_killing_current_keeps_new_context() {
    let mut ctx = SchedulerContext::with_config(
        ClobberSwitch::default(),
        SchedConfig { quantum: 2, ..SchedConfig::default() },
    );
    let a = ctx.create(noop, STACK, 30, "a").unwrap();
    ctx.resume(a).unwrap();
    assert_eq!(ctx.getpid(), a);

    // 让分配游标绕回到 a
    for _ in a as usize + 1..NPROC {
        let tmp = ctx.create(noop, STACK, 1, "tmp").unwrap();
        ctx.kill(tmp).unwrap();
    }

    ctx.begin_defer();
    ctx.kill(a).unwrap();
    let b = ctx.create(noop, STACK, 20, "b").unwrap();
    assert_ne!(b, a);
    assert_eq!(ctx.parent(b), Ok(None));
    let initial = ctx.procs().get(b).unwrap().context().clone();
    assert_eq!(initial.ra as usize, noop as usize);
    assert_eq!(ctx.check_invariants(), Ok(()));

    // 换出进程已死：只恢复，不保存
    ctx.end_defer();
    assert_eq!(ctx.getpid(), PID_IDLE);
    assert_eq!(ctx.switcher().restores, 1);
    assert!(!ctx.has_dead_stack());
    assert_eq!(ctx.procs().get(b).unwrap().context(), &initial);
    assert_eq!(ctx.check_invariants(), Ok(()));

    // 之后的正常切换保存到 idle，不碰 b
    ctx.resume(b).unwrap();
    assert_eq!(ctx.getpid(), b);
    assert_eq!(ctx.procs().get(PID_IDLE).unwrap().context().ra, 0xdead);
    assert_eq!(ctx.procs().get(b).unwrap().context(), &initial);

    // 切换完成后 a 的 PID 可以再分配
    let c = ctx.create(noop, STACK, 10, "c").unwrap();
    assert_eq!(ctx.parent(c), Ok(Some(b)));
}

#[test]
fn clock_tick_respects_defer() {
    let mut ctx = new_ctx();
    let a = spawn(&mut ctx, 20, "a");
    let b = spawn(&mut ctx, 20, "b");
    assert_eq!(ctx.getpid(), a);

    ctx.begin_defer();
    ctx.clock_tick();
    ctx.clock_tick();
    assert_eq!(ctx.getpid(), a);

    ctx.end_defer();
    assert_eq!(ctx.getpid(), b);
    check(&ctx);
}

#[test]
fn interrupt_guard_nests() {
    use crate::arch::irq;

    let outer = irq::disable();
    let inner = irq::disable();
    assert!(irq::is_masked());
    assert!(!inner.was_enabled());
    drop(inner);
    assert!(irq::is_masked());
    drop(outer);
}
