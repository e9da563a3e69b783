//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 饥饿预防（优先级老化）
//!
//! 严格优先级调度下，只要一直有更高优先级的进程可运行，低优先级进程就永远
//! 得不到 CPU。这里对一个被监视的进程逐步提升优先级，给出等待上界。
//!
//! 两种触发方式，每次运行选定其一：
//! - [`AgingStrategy::ContextSwitchTriggered`]: 每次发生上下文切换，且被监视
//!   进程就绪、既不是换出也不是换入的进程时，提升 `step`
//! - [`AgingStrategy::TimeTriggered`]: 每个时钟滴答检查被监视进程的就绪等待
//!   时间，达到阈值就提升 `step`
//!
//! 两者都在达到 `cap` 后不再提升。
//!
//! [`AgingState::evaluate`] 是纯函数，只给出决定；把新优先级写回进程表、
//! 在就绪队列中先摘除再重新插入，由调度核心完成。

use alloc::collections::VecDeque;

use super::pid::{Pid, Prio};
use crate::config::{
    AGING_CAP, AGING_RESET_ON_BOOST, AGING_SWITCH_STEP, AGING_THRESHOLD_TICKS, AGING_TIME_STEP,
};
use crate::process::ProcState;

/// 保留的提升记录条数
pub const BOOST_HISTORY: usize = 32;

/// 时间触发时，等待计时的参考点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// 每次提升后从提升时刻重新计时；进程运行时完全清零
    OnBoost,
    /// 只在进程运行时清零；超过阈值后每个滴答都提升
    OnRun,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        if AGING_RESET_ON_BOOST {
            ResetPolicy::OnBoost
        } else {
            ResetPolicy::OnRun
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingStrategy {
    ContextSwitchTriggered {
        step: Prio,
        cap: Prio,
    },
    TimeTriggered {
        step: Prio,
        cap: Prio,
        threshold_ticks: u64,
        reset: ResetPolicy,
    },
}

impl AgingStrategy {
    /// 按 Kernel.toml 配置的上下文切换触发策略
    pub fn switch_triggered() -> Self {
        AgingStrategy::ContextSwitchTriggered {
            step: AGING_SWITCH_STEP,
            cap: AGING_CAP,
        }
    }

    /// 按 Kernel.toml 配置的时间触发策略
    pub fn time_triggered() -> Self {
        AgingStrategy::TimeTriggered {
            step: AGING_TIME_STEP,
            cap: AGING_CAP,
            threshold_ticks: AGING_THRESHOLD_TICKS,
            reset: ResetPolicy::default(),
        }
    }

    pub fn cap(&self) -> Prio {
        match *self {
            AgingStrategy::ContextSwitchTriggered { cap, .. } => cap,
            AgingStrategy::TimeTriggered { cap, .. } => cap,
        }
    }

    pub fn step(&self) -> Prio {
        match *self {
            AgingStrategy::ContextSwitchTriggered { step, .. } => step,
            AgingStrategy::TimeTriggered { step, .. } => step,
        }
    }
}

impl Default for AgingStrategy {
    fn default() -> Self {
        Self::switch_triggered()
    }
}

/// 触发老化检查的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingEvent {
    /// 调度核心完成了一次 outgoing -> incoming 的选择
    Switch { outgoing: Pid, incoming: Pid },
    /// 时钟滴答
    Tick { now: u64 },
}

/// 被监视进程在事件发生时的快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub pid: Pid,
    pub state: ProcState,
    pub prio: Prio,
}

/// 一次提升决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boost {
    pub pid: Pid,
    pub from: Prio,
    pub to: Prio,
}

/// 已执行的提升
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostRecord {
    pub pid: Pid,
    pub from: Prio,
    pub to: Prio,
    pub at_tick: u64,
    /// 距离进入就绪状态的滴答数
    pub waited: u64,
}

/// 全局老化状态（不是每进程的）
#[derive(Debug)]
pub struct AgingState {
    monitored: Option<Pid>,
    strategy: AgingStrategy,
    ready_since: Option<u64>,
    last_boost_at: Option<u64>,
    history: VecDeque<BoostRecord>,
}

impl AgingState {
    pub fn new() -> Self {
        Self {
            monitored: None,
            strategy: AgingStrategy::default(),
            ready_since: None,
            last_boost_at: None,
            history: VecDeque::new(),
        }
    }

    pub fn monitored(&self) -> Option<Pid> {
        self.monitored
    }

    pub fn strategy(&self) -> AgingStrategy {
        self.strategy
    }

    pub fn ready_since(&self) -> Option<u64> {
        self.ready_since
    }

    pub fn last_boost_at(&self) -> Option<u64> {
        self.last_boost_at
    }

    /// 最近的提升记录（旧的在前）
    pub fn history(&self) -> impl Iterator<Item = &BoostRecord> + '_ {
        self.history.iter()
    }

    pub fn boost_count(&self) -> usize {
        self.history.len()
    }

    /// 开始一次新的监视；`ready_at` 为进程当前已就绪时的时刻
    pub fn start(&mut self, pid: Pid, strategy: AgingStrategy, ready_at: Option<u64>) {
        self.reset();
        self.monitored = Some(pid);
        self.strategy = strategy;
        self.ready_since = ready_at;
    }

    /// 清空全部状态（停止监视或被监视进程终止）
    pub fn reset(&mut self) {
        self.monitored = None;
        self.ready_since = None;
        self.last_boost_at = None;
        self.history.clear();
    }

    fn is_monitored(&self, pid: Pid) -> bool {
        self.monitored == Some(pid)
    }

    /// 进程进入 Ready
    pub fn note_ready(&mut self, pid: Pid, now: u64) {
        if self.is_monitored(pid) {
            self.ready_since = Some(now);
            self.last_boost_at = None;
        }
    }

    /// 进程成为 Current 或离开就绪状态
    pub fn note_not_ready(&mut self, pid: Pid) {
        if self.is_monitored(pid) {
            self.ready_since = None;
            self.last_boost_at = None;
        }
    }

    /// 决定是否提升被监视进程（不修改任何状态）
    pub fn evaluate(&self, event: AgingEvent, candidate: Candidate) -> Option<Boost> {
        if !self.is_monitored(candidate.pid) || candidate.state != ProcState::Ready {
            return None;
        }

        match (self.strategy, event) {
            (
                AgingStrategy::ContextSwitchTriggered { step, cap },
                AgingEvent::Switch { outgoing, incoming },
            ) => {
                if candidate.pid == outgoing || candidate.pid == incoming {
                    return None;
                }
                bump(candidate, step, cap)
            }
            (
                AgingStrategy::TimeTriggered { step, cap, threshold_ticks, reset },
                AgingEvent::Tick { now },
            ) => {
                let since = self.ready_since?;
                let reference = match reset {
                    ResetPolicy::OnBoost => self.last_boost_at.unwrap_or(since),
                    ResetPolicy::OnRun => {
                        // 同一个滴答内最多提升一次
                        if self.last_boost_at == Some(now) {
                            return None;
                        }
                        since
                    }
                };
                if now.saturating_sub(reference) >= threshold_ticks {
                    bump(candidate, step, cap)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// 记录已执行的提升
    pub fn record(&mut self, boost: Boost, now: u64) {
        self.last_boost_at = Some(now);
        let waited = self.ready_since.map_or(0, |since| now.saturating_sub(since));
        if self.history.len() == BOOST_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(BoostRecord {
            pid: boost.pid,
            from: boost.from,
            to: boost.to,
            at_tick: now,
            waited,
        });
    }
}

impl Default for AgingState {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(candidate: Candidate, step: Prio, cap: Prio) -> Option<Boost> {
    if candidate.prio >= cap {
        return None;
    }
    Some(Boost {
        pid: candidate.pid,
        from: candidate.prio,
        to: candidate.prio.saturating_add(step).min(cap),
    })
}
