//! 时钟、时间片与睡眠测试

use super::{check, ctx_with, new_ctx, spawn};
use crate::process::ProcState;
use crate::sched::aging::{AgingStrategy, ResetPolicy};
use crate::sched::clock::Clock;
use crate::sched::sleep::SleepQueue;
use crate::sched::{SchedConfig, SchedError, PID_IDLE};

#[test]
fn clock_counts_ticks_and_seconds() {
    let mut clock = Clock::new(4, 3);
    for _ in 0..9 {
        clock.advance();
    }
    assert_eq!(clock.now(), 9);
    assert_eq!(clock.seconds(), 2);

    assert!(!clock.consume_slice());
    assert!(!clock.consume_slice());
    assert!(clock.consume_slice());
    assert_eq!(clock.remaining_slice(), 3);
}

#[test]
fn slice_expiry_rotates_equal_priorities() {
    let mut ctx = new_ctx();
    let a = spawn(&mut ctx, 10, "a");
    let b = spawn(&mut ctx, 10, "b");
    assert_eq!(ctx.getpid(), a);

    ctx.clock_tick();
    assert_eq!(ctx.getpid(), a);
    ctx.clock_tick();
    assert_eq!(ctx.getpid(), b);
    ctx.clock_tick();
    ctx.clock_tick();
    assert_eq!(ctx.getpid(), a);
    check(&ctx);
}

#[test]
fn slice_expiry_keeps_higher_priority() {
    let mut ctx = new_ctx();
    let a = spawn(&mut ctx, 30, "a");
    spawn(&mut ctx, 10, "b");
    for _ in 0..10 {
        ctx.clock_tick();
    }
    assert_eq!(ctx.getpid(), a);
    assert_eq!(ctx.switch_count(), 1);
}

#[test]
fn sleep_and_wake() {
    let mut ctx = new_ctx();
    let b = spawn(&mut ctx, 10, "b");
    let a = spawn(&mut ctx, 30, "a");

    ctx.sleep(3).unwrap();
    assert_eq!(ctx.state(a), Ok(ProcState::Sleeping));
    assert_eq!(ctx.getpid(), b);
    assert_eq!(ctx.sleep_queue().next_wake(), Some(3));
    check(&ctx);

    ctx.clock_tick();
    ctx.clock_tick();
    assert_eq!(ctx.state(a), Ok(ProcState::Sleeping));

    // 唤醒后优先级更高，立即抢占
    ctx.clock_tick();
    assert_eq!(ctx.getpid(), a);
    assert!(ctx.sleep_queue().is_empty());
    check(&ctx);
}

#[test]
fn sleep_zero_is_yield() {
    let mut ctx = new_ctx();
    let a = spawn(&mut ctx, 20, "a");
    let b = spawn(&mut ctx, 20, "b");

    ctx.sleep(0).unwrap();
    assert_eq!(ctx.getpid(), b);
    assert_eq!(ctx.state(a), Ok(ProcState::Ready));
}

#[test]
fn idle_cannot_sleep() {
    let mut ctx = new_ctx();
    assert_eq!(ctx.sleep(5), Err(SchedError::NotPermitted(PID_IDLE)));
}

#[test]
fn kill_sleeping_process() {
    let mut ctx = new_ctx();
    let a = spawn(&mut ctx, 30, "a");
    ctx.sleep(10).unwrap();
    assert_eq!(ctx.getpid(), PID_IDLE);

    ctx.kill(a).unwrap();
    assert!(ctx.sleep_queue().is_empty());
    for _ in 0..12 {
        ctx.clock_tick();
    }
    assert_eq!(ctx.getpid(), PID_IDLE);
    check(&ctx);
}

#[test]
fn time_boost_preempts_current() {
    let mut ctx = ctx_with(SchedConfig { quantum: 100, ..SchedConfig::default() });
    let a = spawn(&mut ctx, 30, "a");
    let starved = spawn(&mut ctx, 28, "starved");
    let strategy = AgingStrategy::TimeTriggered {
        step: 5,
        cap: 50,
        threshold_ticks: 2,
        reset: ResetPolicy::OnBoost,
    };
    ctx.set_monitored(starved, strategy).unwrap();

    ctx.clock_tick();
    assert_eq!(ctx.getpid(), a);

    ctx.clock_tick();
    assert_eq!(ctx.get_prio(starved), Ok(33));
    assert_eq!(ctx.getpid(), starved);
    check(&ctx);
}

#[test]
fn sleep_queue_orders_by_wake_time() {
    let mut q = SleepQueue::new();
    assert!(q.insert(1, 30));
    assert!(q.insert(2, 10));
    assert!(q.insert(3, 20));
    assert!(q.insert(4, 10));

    assert_eq!(q.pop_due(5), None);
    let due: Vec<_> = core::iter::from_fn(|| q.pop_due(20)).map(|e| e.pid).collect();
    // 同一时刻按入队顺序
    assert_eq!(due, vec![2, 4, 3]);
    assert_eq!(q.len(), 1);
    assert_eq!(q.next_wake(), Some(30));
}

#[test]
fn sleep_queue_remove() {
    let mut q = SleepQueue::new();
    for (pid, wake) in [(1, 50), (2, 40), (3, 30), (4, 20), (5, 10)] {
        q.insert(pid, wake);
    }
    assert_eq!(q.remove(3).map(|e| e.wake_at), Some(30));
    assert_eq!(q.remove(3), None);
    assert!(!q.contains(3));

    let order: Vec<_> = core::iter::from_fn(|| q.pop_due(u64::MAX)).map(|e| e.pid).collect();
    assert_eq!(order, vec![5, 4, 2, 1]);
}

#[test]
fn sleep_far_future_saturates() {
    let mut ctx = new_ctx();
    let a = spawn(&mut ctx, 20, "a");
    ctx.clock_tick();

    ctx.sleep(u64::MAX).unwrap();
    assert_eq!(ctx.state(a), Ok(ProcState::Sleeping));
    assert_eq!(ctx.sleep_queue().next_wake(), Some(u64::MAX));
    assert_eq!(ctx.getpid(), PID_IDLE);
    check(&ctx);

    for _ in 0..10 {
        ctx.clock_tick();
    }
    assert_eq!(ctx.state(a), Ok(ProcState::Sleeping));
    check(&ctx);
}
