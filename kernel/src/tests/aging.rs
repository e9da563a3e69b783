//! 老化策略测试
//!
//! `evaluate` 是纯函数，这里不需要调度器

use crate::process::ProcState;
use crate::sched::aging::{
    AgingEvent, AgingState, AgingStrategy, Boost, Candidate, ResetPolicy, BOOST_HISTORY,
};

const PSTARV: u32 = 5;

fn switch_strategy() -> AgingStrategy {
    AgingStrategy::ContextSwitchTriggered { step: 2, cap: 50 }
}

fn time_strategy(reset: ResetPolicy) -> AgingStrategy {
    AgingStrategy::TimeTriggered { step: 5, cap: 50, threshold_ticks: 2, reset }
}

fn ready(prio: i32) -> Candidate {
    Candidate { pid: PSTARV, state: ProcState::Ready, prio }
}

fn switch(outgoing: u32, incoming: u32) -> AgingEvent {
    AgingEvent::Switch { outgoing, incoming }
}

#[test]
fn switch_triggered_boosts_bystander() {
    let mut state = AgingState::new();
    state.start(PSTARV, switch_strategy(), Some(0));

    assert_eq!(
        state.evaluate(switch(1, 2), ready(25)),
        Some(Boost { pid: PSTARV, from: 25, to: 27 })
    );
    // 换出或换入的就是被监视进程时不提升
    assert_eq!(state.evaluate(switch(PSTARV, 2), ready(25)), None);
    assert_eq!(state.evaluate(switch(1, PSTARV), ready(25)), None);
    // 时钟事件对切换策略无效
    assert_eq!(state.evaluate(AgingEvent::Tick { now: 100 }, ready(25)), None);
}

#[test]
fn only_ready_monitored_process_is_boosted() {
    let mut state = AgingState::new();
    assert_eq!(state.evaluate(switch(1, 2), ready(25)), None);

    state.start(PSTARV, switch_strategy(), None);
    for s in [ProcState::Suspended, ProcState::Sleeping, ProcState::Current, ProcState::Waiting] {
        let c = Candidate { pid: PSTARV, state: s, prio: 25 };
        assert_eq!(state.evaluate(switch(1, 2), c), None);
    }

    let other = Candidate { pid: 9, state: ProcState::Ready, prio: 25 };
    assert_eq!(state.evaluate(switch(1, 2), other), None);
}

#[test]
fn idempotent_at_cap() {
    let mut state = AgingState::new();
    state.start(PSTARV, switch_strategy(), Some(0));

    assert_eq!(
        state.evaluate(switch(1, 2), ready(49)),
        Some(Boost { pid: PSTARV, from: 49, to: 50 })
    );
    assert_eq!(state.evaluate(switch(1, 2), ready(50)), None);
    // 已经高于上限（例如被手动调高）也不变
    assert_eq!(state.evaluate(switch(1, 2), ready(60)), None);
}

#[test]
fn evaluate_does_not_mutate() {
    let mut state = AgingState::new();
    state.start(PSTARV, time_strategy(ResetPolicy::OnBoost), Some(0));

    let first = state.evaluate(AgingEvent::Tick { now: 2 }, ready(25));
    let second = state.evaluate(AgingEvent::Tick { now: 2 }, ready(25));
    assert_eq!(first, second);
    assert_eq!(state.last_boost_at(), None);
    assert_eq!(state.boost_count(), 0);
}

#[test]
fn time_triggered_resets_on_boost() {
    let mut state = AgingState::new();
    state.start(PSTARV, time_strategy(ResetPolicy::OnBoost), Some(0));

    assert_eq!(state.evaluate(AgingEvent::Tick { now: 1 }, ready(25)), None);
    let boost = state.evaluate(AgingEvent::Tick { now: 2 }, ready(25)).unwrap();
    assert_eq!(boost.to, 30);
    state.record(boost, 2);

    // 从提升时刻重新计时
    assert_eq!(state.evaluate(AgingEvent::Tick { now: 3 }, ready(30)), None);
    let boost = state.evaluate(AgingEvent::Tick { now: 4 }, ready(30)).unwrap();
    assert_eq!(boost.to, 35);
    state.record(boost, 4);

    let waited: Vec<u64> = state.history().map(|r| r.waited).collect();
    assert_eq!(waited, vec![2, 4]);
}

#[test]
fn time_triggered_reset_on_run_boosts_every_tick() {
    let mut state = AgingState::new();
    state.start(PSTARV, time_strategy(ResetPolicy::OnRun), Some(0));

    let boost = state.evaluate(AgingEvent::Tick { now: 2 }, ready(25)).unwrap();
    state.record(boost, 2);

    // 同一滴答不重复提升，下一滴答继续提升
    assert_eq!(state.evaluate(AgingEvent::Tick { now: 2 }, ready(30)), None);
    assert!(state.evaluate(AgingEvent::Tick { now: 3 }, ready(30)).is_some());
}

#[test]
fn running_clears_wait_reference() {
    let mut state = AgingState::new();
    state.start(PSTARV, time_strategy(ResetPolicy::OnBoost), Some(0));

    state.note_not_ready(PSTARV);
    assert_eq!(state.ready_since(), None);
    assert_eq!(state.evaluate(AgingEvent::Tick { now: 10 }, ready(25)), None);

    state.note_ready(PSTARV, 10);
    assert_eq!(state.evaluate(AgingEvent::Tick { now: 11 }, ready(25)), None);
    assert!(state.evaluate(AgingEvent::Tick { now: 12 }, ready(25)).is_some());

    // 其他进程的状态变化不影响
    state.note_not_ready(7);
    assert_eq!(state.ready_since(), Some(10));
}

#[test]
fn history_is_bounded() {
    let mut state = AgingState::new();
    state.start(PSTARV, switch_strategy(), Some(0));

    for tick in 0..(BOOST_HISTORY as u64 + 8) {
        state.record(Boost { pid: PSTARV, from: 1, to: 2 }, tick);
    }
    assert_eq!(state.boost_count(), BOOST_HISTORY);
    assert_eq!(state.history().next().map(|r| r.at_tick), Some(8));

    state.reset();
    assert_eq!(state.monitored(), None);
    assert_eq!(state.boost_count(), 0);
}

#[test]
fn strategies_from_config() {
    use crate::config::{AGING_CAP, AGING_SWITCH_STEP, AGING_THRESHOLD_TICKS, AGING_TIME_STEP};

    let s = AgingStrategy::switch_triggered();
    assert_eq!(s.step(), AGING_SWITCH_STEP);
    assert_eq!(s.cap(), AGING_CAP);

    match AgingStrategy::time_triggered() {
        AgingStrategy::TimeTriggered { step, threshold_ticks, .. } => {
            assert_eq!(step, AGING_TIME_STEP);
            assert_eq!(threshold_ticks, AGING_THRESHOLD_TICKS);
        }
        other => panic!("unexpected {:?}", other),
    }
}
