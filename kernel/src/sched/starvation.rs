//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 饥饿实验
//!
//! 三个进程：P1 (40)、P2 (35)、Pstarv (25)。没有老化时 Pstarv 永远
//! 得不到 CPU；开启老化后记录它第一次运行前经过了多少次切换或多少个滴答。
//!
//! 进程的行为由 [`Workload`] 脚本化：宿主机上没有真正执行进程代码，
//! 驱动循环根据当前进程的脚本调用 `sleep` 或 `clock_tick`。

use alloc::vec::Vec;

use super::aging::{AgingStrategy, BoostRecord};
use super::error::{SchedError, SchedResult};
use super::pid::{Pid, Prio};
use super::sched::SchedulerContext;
use crate::arch::ContextSwitch;
use crate::config::MIN_STACK_SIZE;
use crate::println;

pub const P1_PRIO: Prio = 40;
pub const P2_PRIO: Prio = 35;
pub const PSTARV_PRIO: Prio = 25;

/// 进程在 CPU 上时做什么
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// 一直计算，直到时钟中断
    CpuBound,
    /// 每次运行都立即睡眠指定滴答
    Sleeper(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct ScenarioProc {
    pub name: &'static str,
    pub prio: Prio,
    pub workload: Workload,
}

/// 一次实验的结果
#[derive(Debug, Clone)]
pub struct StarvationReport {
    pub strategy: AgingStrategy,
    pub starved: Pid,
    /// 从实验开始到 Pstarv 第一次成为 Current 的切换次数
    pub switches_until_run: Option<u64>,
    /// 从实验开始到 Pstarv 第一次成为 Current 的滴答数
    pub ticks_until_run: Option<u64>,
    pub boosts: Vec<BoostRecord>,
    pub final_prio: Prio,
}

impl StarvationReport {
    pub fn ran(&self) -> bool {
        self.switches_until_run.is_some()
    }

    pub fn print(&self) {
        println!("starvation: strategy {:?}", self.strategy);
        for b in &self.boosts {
            println!(
                "  tick {:>6}: pid {} {} -> {} (waited {})",
                b.at_tick, b.pid, b.from, b.to, b.waited
            );
        }
        match (self.switches_until_run, self.ticks_until_run) {
            (Some(sw), Some(ticks)) => println!(
                "starvation: pid {} ran after {} switches / {} ticks, prio {}",
                self.starved, sw, ticks, self.final_prio
            ),
            _ => println!(
                "starvation: pid {} never ran, prio {}",
                self.starved, self.final_prio
            ),
        }
    }
}

fn scripted_entry() {}

/// P1 每次运行都睡眠一个滴答，与 P2 交替；每次交替都是一次切换
pub fn run_switch_scenario<S: ContextSwitch>(
    ctx: &mut SchedulerContext<S>,
    strategy: AgingStrategy,
) -> SchedResult<StarvationReport> {
    let procs = [
        ScenarioProc { name: "P1", prio: P1_PRIO, workload: Workload::Sleeper(1) },
        ScenarioProc { name: "P2", prio: P2_PRIO, workload: Workload::CpuBound },
        ScenarioProc { name: "Pstarv", prio: PSTARV_PRIO, workload: Workload::CpuBound },
    ];
    run_scenario(ctx, &procs, 2, strategy)
}

/// P1、P2 都一直计算；只有时钟驱动老化
pub fn run_time_scenario<S: ContextSwitch>(
    ctx: &mut SchedulerContext<S>,
    strategy: AgingStrategy,
) -> SchedResult<StarvationReport> {
    let procs = [
        ScenarioProc { name: "P1", prio: P1_PRIO, workload: Workload::CpuBound },
        ScenarioProc { name: "P2", prio: P2_PRIO, workload: Workload::CpuBound },
        ScenarioProc { name: "Pstarv", prio: PSTARV_PRIO, workload: Workload::CpuBound },
    ];
    run_scenario(ctx, &procs, 2, strategy)
}

/// 通用驱动：创建并监视 `procs[starved]`，运行到它第一次成为 Current
/// 或超过滴答上限
///
/// 无论成功还是中途出错，已经创建的实验进程都会被 kill
pub fn run_scenario<S: ContextSwitch>(
    ctx: &mut SchedulerContext<S>,
    procs: &[ScenarioProc],
    starved: usize,
    strategy: AgingStrategy,
) -> SchedResult<StarvationReport> {
    if starved >= procs.len() {
        return Err(SchedError::InvalidProcessId(starved as Pid));
    }

    let mut pids = Vec::with_capacity(procs.len());
    let result = drive(ctx, procs, starved, strategy, &mut pids);

    for &pid in pids.iter().rev() {
        if let Err(err) = ctx.kill(pid) {
            log::warn!("starvation: cleanup of pid {} failed: {}", pid, err);
        }
    }
    if result.is_err() {
        log::warn!("starvation: aborted, {} processes cleaned up", pids.len());
    }
    result
}

/// 实验主体；创建的 PID 依次记入 `pids`，由调用者清理
fn drive<S: ContextSwitch>(
    ctx: &mut SchedulerContext<S>,
    procs: &[ScenarioProc],
    starved: usize,
    strategy: AgingStrategy,
    pids: &mut Vec<Pid>,
) -> SchedResult<StarvationReport> {
    for p in procs {
        pids.push(ctx.create(scripted_entry, MIN_STACK_SIZE, p.prio, p.name)?);
    }
    let target = pids[starved];
    ctx.set_monitored(target, strategy)?;

    let max_ticks = tick_limit(strategy, procs[starved].prio, ctx.config().quantum);
    let start_switches = ctx.switch_count();
    let start_tick = ctx.clock().now();

    log::info!("starvation: start, monitored pid {} ({:?})", target, strategy);

    {
        // 全部就绪后统一调度一次
        let mut guard = ctx.deferred();
        for &pid in pids.iter() {
            guard.resume(pid)?;
        }
    }

    let mut ran = false;
    while ctx.clock().now() - start_tick <= max_ticks {
        let curr = ctx.getpid();
        if curr == target {
            ran = true;
            break;
        }
        let workload = pids
            .iter()
            .position(|&pid| pid == curr)
            .map_or(Workload::CpuBound, |i| procs[i].workload);
        match workload {
            Workload::CpuBound => ctx.clock_tick(),
            Workload::Sleeper(ticks) => ctx.sleep(ticks)?,
        }
    }

    if !ran {
        log::warn!("starvation: pid {} did not run within {} ticks", target, max_ticks);
    }

    Ok(StarvationReport {
        strategy,
        starved: target,
        switches_until_run: ran.then(|| ctx.switch_count() - start_switches),
        ticks_until_run: ran.then(|| ctx.clock().now() - start_tick),
        boosts: ctx.aging().history().copied().collect(),
        final_prio: ctx.get_prio(target)?,
    })
}

/// 足够 Pstarv 被提升到上限再多跑几个时间片的滴答数
fn tick_limit(strategy: AgingStrategy, prio: Prio, quantum: u32) -> u64 {
    let step = strategy.step().max(1);
    let boosts = ((strategy.cap() - prio).max(0) + step - 1) / step;
    let per_boost = match strategy {
        AgingStrategy::ContextSwitchTriggered { .. } => 2,
        AgingStrategy::TimeTriggered { threshold_ticks, .. } => threshold_ticks.max(1),
    };
    per_boost * (boosts as u64 + 1) + 4 * u64::from(quantum) + 16
}
