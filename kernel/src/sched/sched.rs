//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 调度核心
//!
//! 单 CPU 严格优先级调度：
//! - 就绪队列按优先级降序，同优先级先进先出
//! - 当前进程只有在优先级严格高于队头时才继续运行
//! - 时间片用完、唤醒、resume、老化提升都会触发 resched
//!
//! 全部状态集中在 [`SchedulerContext`]，调用者以 `&mut` 传入，
//! 不使用全局可变量。每个操作在修改状态前都屏蔽中断。
//!
//! 调度入口: resched() -> 选出 incoming -> ContextSwitch::switch_context()

use core::fmt;

use super::aging::{AgingEvent, AgingState, AgingStrategy, Boost, Candidate};
use super::clock::Clock;
use super::defer::{DeferState, Deferred};
use super::error::{SchedError, SchedResult};
use super::pid::{Pid, Prio, PID_IDLE};
use super::queue::ReadyQueue;
use super::sleep::SleepQueue;
use crate::arch::{irq, ContextSwitch};
use crate::config::{
    CLK_TICKS_PER_SEC, IDLE_PRIO, KERNEL_NAME, KERNEL_VERSION, MAX_PRIO, MIN_PRIO, MIN_STACK_SIZE,
    QUANTUM,
};
use crate::process::{Pcb, ProcEntry, ProcState, ProcTable, StackRegion};

/// 运行时可调的调度参数，默认值取自 Kernel.toml
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfig {
    /// 时间片长度（滴答）
    pub quantum: u32,
    pub ticks_per_sec: u32,
    pub min_stack_size: usize,
    /// PID 0 是否为 idle 进程；为 false 时 PID 0 是可以被挂起的引导进程
    pub idle: bool,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            quantum: QUANTUM,
            ticks_per_sec: CLK_TICKS_PER_SEC,
            min_stack_size: MIN_STACK_SIZE,
            idle: true,
        }
    }
}

/// [`SchedulerContext::check_invariants`] 发现的问题
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantError {
    /// 不止一个进程处于 Current
    MultipleCurrent(Pid, Pid),
    /// 没有 Current 进程，且没有被推迟的 resched
    NoCurrent,
    /// Current 进程与记录的 currpid 不一致
    CurrentMismatch { currpid: Pid, found: Pid },
    /// Ready 进程不在就绪队列中
    ReadyNotQueued(Pid),
    /// 就绪队列中的进程不是 Ready
    QueuedNotReady(Pid),
    /// 队列中的键与进程优先级不一致
    StaleKey { pid: Pid, key: Prio, prio: Prio },
    /// 相邻两项不是降序
    OrderViolation { before: Pid, after: Pid },
    /// Sleeping 进程与睡眠队列不一致
    SleepMismatch(Pid),
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::MultipleCurrent(a, b) => write!(f, "processes {} and {} are both current", a, b),
            InvariantError::NoCurrent => f.write_str("no current process"),
            InvariantError::CurrentMismatch { currpid, found } => {
                write!(f, "currpid is {} but process {} is current", currpid, found)
            }
            InvariantError::ReadyNotQueued(pid) => write!(f, "ready process {} not queued", pid),
            InvariantError::QueuedNotReady(pid) => write!(f, "queued process {} not ready", pid),
            InvariantError::StaleKey { pid, key, prio } => {
                write!(f, "process {} queued with key {} but has priority {}", pid, key, prio)
            }
            InvariantError::OrderViolation { before, after } => {
                write!(f, "queue order violated between {} and {}", before, after)
            }
            InvariantError::SleepMismatch(pid) => write!(f, "sleep queue out of sync for {}", pid),
        }
    }
}

pub struct SchedulerContext<S: ContextSwitch> {
    procs: ProcTable,
    ready: ReadyQueue,
    sleepers: SleepQueue,
    aging: AgingState,
    defer: DeferState,
    clock: Clock,
    config: SchedConfig,
    currpid: Pid,
    switches: u64,
    /// 被 kill 的当前进程的栈，切换走之后才释放
    dead_stack: Option<StackRegion>,
    /// currpid 已被 kill，槽位已释放但还没有切换走
    current_dead: bool,
    switcher: S,
}

impl<S: ContextSwitch> SchedulerContext<S> {
    pub fn new(switcher: S) -> Self {
        Self::with_config(switcher, SchedConfig::default())
    }

    /// 初始化调度器，PID 0 作为第一个 Current 进程
    pub fn with_config(switcher: S, config: SchedConfig) -> Self {
        let mut procs = ProcTable::new();
        let boot = if config.idle {
            Pcb::new_idle(IDLE_PRIO)
        } else {
            Pcb::new_boot(IDLE_PRIO)
        };
        procs.install(PID_IDLE, boot);

        log::info!(
            "sched: {} v{} init, nproc={} quantum={} idle={}",
            KERNEL_NAME,
            KERNEL_VERSION,
            procs.capacity(),
            config.quantum,
            config.idle
        );

        Self {
            procs,
            ready: ReadyQueue::new(),
            sleepers: SleepQueue::new(),
            aging: AgingState::new(),
            defer: DeferState::new(),
            clock: Clock::new(config.ticks_per_sec, config.quantum),
            config,
            currpid: PID_IDLE,
            switches: 0,
            dead_stack: None,
            current_dead: false,
            switcher,
        }
    }

    // ---------------------------------------------------------------
    // 进程管理
    // ---------------------------------------------------------------

    /// 创建进程，初始为 Suspended，父进程为当前进程
    ///
    /// 当前进程已被 kill 而切换尚未发生时，新进程没有父进程，
    /// 且不会拿到 currpid 这个 PID
    pub fn create(
        &mut self,
        entry: ProcEntry,
        stack_size: usize,
        prio: Prio,
        name: &str,
    ) -> SchedResult<Pid> {
        let _irq = irq::disable();

        check_prio(prio)?;
        if stack_size < self.config.min_stack_size {
            return Err(SchedError::StackTooSmall(stack_size));
        }

        let reserved = self.current_dead.then_some(self.currpid);
        let parent = (!self.current_dead).then_some(self.currpid);
        let pid = self.procs.alloc_pid(reserved)?;
        let stack = StackRegion::alloc(stack_size);
        let pcb = Pcb::new_process(entry, stack, prio, name, parent);
        self.procs.install(pid, pcb);

        log::info!("create: pid {} ({}) prio {} stack {:#x}", pid, name, prio, stack_size);
        Ok(pid)
    }

    /// Suspended -> Ready，返回 resume 时的优先级
    pub fn resume(&mut self, pid: Pid) -> SchedResult<Prio> {
        let _irq = irq::disable();

        let pcb = self.procs.get(pid)?;
        if pcb.state() != ProcState::Suspended {
            return Err(SchedError::InvalidState { pid, state: pcb.state() });
        }
        let prio = pcb.prio();

        self.make_ready(pid);
        log::debug!("resume: pid {} prio {}", pid, prio);
        self.resched();
        Ok(prio)
    }

    /// Ready|Current -> Suspended，返回当前优先级
    pub fn suspend(&mut self, pid: Pid) -> SchedResult<Prio> {
        let _irq = irq::disable();

        let pcb = self.procs.get(pid)?;
        if pcb.is_idle() {
            return Err(SchedError::NotPermitted(pid));
        }
        let (state, prio) = (pcb.state(), pcb.prio());

        match state {
            ProcState::Ready => {
                self.queue_remove(pid);
                self.procs.slot_mut(pid).set_state(ProcState::Suspended);
                self.aging.note_not_ready(pid);
                log::debug!("suspend: pid {}", pid);
            }
            ProcState::Current => {
                self.procs.slot_mut(pid).set_state(ProcState::Suspended);
                log::debug!("suspend: pid {} (current)", pid);
                self.resched();
            }
            _ => return Err(SchedError::InvalidState { pid, state }),
        }
        Ok(prio)
    }

    /// 终止进程，释放槽位和栈
    pub fn kill(&mut self, pid: Pid) -> SchedResult<()> {
        let _irq = irq::disable();

        let pcb = self.procs.get(pid)?;
        if pcb.is_idle() {
            return Err(SchedError::NotPermitted(pid));
        }
        let state = pcb.state();

        match state {
            ProcState::Ready => {
                self.queue_remove(pid);
            }
            ProcState::Sleeping => {
                self.sleepers.remove(pid);
            }
            _ => {}
        }

        if self.aging.monitored() == Some(pid) {
            log::info!("aging: monitored pid {} killed, reset", pid);
            self.aging.reset();
        }

        let stack = self.procs.slot_mut(pid).release();
        log::info!("kill: pid {} (was {:?})", pid, state);

        if state == ProcState::Current {
            // 仍运行在这个栈上，切换走之后再释放
            self.dead_stack = stack;
            self.current_dead = true;
            self.resched();
        }
        Ok(())
    }

    /// 修改优先级，返回旧值
    ///
    /// 在就绪队列中的进程先出队再按新优先级入队，随后重新调度
    pub fn change_priority(&mut self, pid: Pid, new_prio: Prio) -> SchedResult<Prio> {
        let _irq = irq::disable();

        check_prio(new_prio)?;
        let pcb = self.procs.get(pid)?;
        if pcb.is_idle() {
            return Err(SchedError::NotPermitted(pid));
        }
        let (state, old) = (pcb.state(), pcb.prio());

        if state == ProcState::Ready {
            self.queue_remove(pid);
            self.procs.slot_mut(pid).set_prio(new_prio);
            self.queue_insert(pid, new_prio);
        } else {
            self.procs.slot_mut(pid).set_prio(new_prio);
        }
        log::debug!("chprio: pid {} {} -> {}", pid, old, new_prio);

        if matches!(state, ProcState::Ready | ProcState::Current) {
            self.resched();
        }
        Ok(old)
    }

    pub fn get_prio(&self, pid: Pid) -> SchedResult<Prio> {
        Ok(self.procs.get(pid)?.prio())
    }

    pub fn state(&self, pid: Pid) -> SchedResult<ProcState> {
        Ok(self.procs.get(pid)?.state())
    }

    pub fn name(&self, pid: Pid) -> SchedResult<&str> {
        Ok(self.procs.get(pid)?.name())
    }

    pub fn parent(&self, pid: Pid) -> SchedResult<Option<Pid>> {
        Ok(self.procs.get(pid)?.parent())
    }

    /// 当前进程
    ///
    /// 当前进程在推迟区内被 kill 后，直到被推迟的 resched 执行前
    /// 仍返回它的 PID，但该 PID 已查不到 PCB
    pub fn getpid(&self) -> Pid {
        self.currpid
    }

    // ---------------------------------------------------------------
    // 饥饿预防
    // ---------------------------------------------------------------

    /// 指定被监视的进程和老化策略，清除之前的全部老化状态
    pub fn set_monitored(&mut self, pid: Pid, strategy: AgingStrategy) -> SchedResult<()> {
        let _irq = irq::disable();

        let pcb = self.procs.get(pid)?;
        if pcb.is_idle() {
            return Err(SchedError::NotPermitted(pid));
        }
        let ready_at = if pcb.state() == ProcState::Ready {
            Some(self.clock.now())
        } else {
            None
        };

        self.aging.start(pid, strategy, ready_at);
        log::info!("aging: monitoring pid {} with {:?}", pid, strategy);
        Ok(())
    }

    pub fn clear_monitored(&mut self) {
        let _irq = irq::disable();
        if let Some(pid) = self.aging.monitored() {
            log::info!("aging: stop monitoring pid {}", pid);
        }
        self.aging.reset();
    }

    // ---------------------------------------------------------------
    // 让出 CPU / 时钟
    // ---------------------------------------------------------------

    /// 主动让出 CPU，同优先级的就绪进程会得到运行
    pub fn yield_now(&mut self) {
        let _irq = irq::disable();
        self.resched();
    }

    /// 当前进程睡眠 `ticks` 个滴答，0 等价于 yield
    pub fn sleep(&mut self, ticks: u64) -> SchedResult<()> {
        let _irq = irq::disable();

        if ticks == 0 {
            self.resched();
            return Ok(());
        }

        let pid = self.currpid;
        let pcb = self.procs.slot(pid);
        if pcb.is_idle() {
            return Err(SchedError::NotPermitted(pid));
        }
        if pcb.state() != ProcState::Current {
            return Err(SchedError::InvalidState { pid, state: pcb.state() });
        }

        let wake_at = self.clock.now().saturating_add(ticks);
        if !self.sleepers.insert(pid, wake_at) {
            panic!("QueueInvariantViolation: sleep queue full inserting pid {}", pid);
        }
        self.procs.slot_mut(pid).set_state(ProcState::Sleeping);
        log::trace!("sleep: pid {} until tick {}", pid, wake_at);

        self.resched();
        Ok(())
    }

    /// 时钟中断
    ///
    /// 唤醒到期的睡眠进程、执行时间触发的老化、消耗时间片；
    /// 三者任一需要时重新调度
    pub fn clock_tick(&mut self) {
        let _irq = irq::disable();

        let now = self.clock.advance();

        let mut woke = false;
        while let Some(entry) = self.sleepers.pop_due(now) {
            log::trace!("wakeup: pid {} at tick {}", entry.pid, now);
            self.make_ready(entry.pid);
            woke = true;
        }

        let boost_preempts = self.age_on_tick(now);

        let expired = self.clock.consume_slice();
        if expired {
            log::trace!("tick {}: time slice of pid {} expired", now, self.currpid);
        }

        if woke || boost_preempts || expired {
            self.resched();
        }
    }

    // ---------------------------------------------------------------
    // 推迟调度
    // ---------------------------------------------------------------

    /// 进入推迟区，返回之前的嵌套层数
    pub fn begin_defer(&mut self) -> u32 {
        let _irq = irq::disable();
        self.defer.begin()
    }

    /// 离开推迟区；最外层离开且有被推迟的 resched 时立即执行
    pub fn end_defer(&mut self) {
        let _irq = irq::disable();
        if self.defer.end() {
            log::debug!("defer: running deferred resched");
            self.resched();
        }
    }

    /// 作用域守卫形式的 begin_defer/end_defer
    pub fn deferred(&mut self) -> Deferred<'_, S> {
        Deferred::new(self)
    }

    // ---------------------------------------------------------------
    // 调度核心
    // ---------------------------------------------------------------

    /// 重新调度
    ///
    /// 当前进程仍为 Current 且优先级严格高于队头时不切换；
    /// 否则放回就绪队列，取出队头作为新的当前进程
    pub fn resched(&mut self) {
        let _irq = irq::disable();

        if self.defer.is_active() {
            self.defer.mark_pending();
            log::trace!("resched: deferred");
            return;
        }

        let outgoing = self.currpid;
        let now = self.clock.now();
        let outgoing_dead = core::mem::replace(&mut self.current_dead, false);

        let out = self.procs.slot(outgoing);
        if !outgoing_dead && out.state() == ProcState::Current {
            let prio = out.prio();
            match self.ready.peek_highest_priority() {
                None => return,
                Some(top) if prio > top => return,
                Some(_) => {}
            }
            self.procs.slot_mut(outgoing).set_state(ProcState::Ready);
            self.queue_insert(outgoing, prio);
            self.aging.note_ready(outgoing, now);
        }

        let incoming = match self.ready.remove_highest() {
            Some(entry) => entry.pid,
            None => self.idle_fallback(),
        };

        self.procs.slot_mut(incoming).set_state(ProcState::Current);
        self.currpid = incoming;
        self.clock.reset_slice();
        self.aging.note_not_ready(incoming);

        self.age_on_switch(outgoing, incoming, now);

        if outgoing == incoming {
            return;
        }

        self.switches += 1;

        if outgoing_dead {
            // 换出进程的槽位已释放，没有地方保存它的寄存器
            log::debug!(
                "context switch: {} (exited) -> {} ({})",
                outgoing,
                incoming,
                self.procs.slot(incoming).name()
            );
            let resume_from = self.procs.slot(incoming).context();
            self.switcher.restore_context(outgoing, incoming, resume_from);
        } else {
            log::debug!(
                "context switch: {} ({}) -> {} ({})",
                outgoing,
                self.procs.slot(outgoing).name(),
                incoming,
                self.procs.slot(incoming).name()
            );
            let (save_into, resume_from) = self.procs.context_pair(outgoing, incoming);
            self.switcher.switch_context(outgoing, save_into, incoming, resume_from);
        }

        // 已经离开了被 kill 的进程的栈
        self.dead_stack = None;
    }

    fn idle_fallback(&self) -> Pid {
        let idle = self.procs.slot(PID_IDLE);
        if idle.is_idle() && !idle.is_free() {
            return PID_IDLE;
        }
        panic!("SchedulerStarvation: ready queue empty and no idle process");
    }

    fn make_ready(&mut self, pid: Pid) {
        let prio = self.procs.slot(pid).prio();
        self.procs.slot_mut(pid).set_state(ProcState::Ready);
        self.queue_insert(pid, prio);
        self.aging.note_ready(pid, self.clock.now());
    }

    fn queue_insert(&mut self, pid: Pid, prio: Prio) {
        if let Err(err) = self.ready.insert(pid, prio) {
            panic!("QueueInvariantViolation: {}", err);
        }
    }

    fn queue_remove(&mut self, pid: Pid) -> Prio {
        match self.ready.remove_by_id(pid) {
            Ok(prio) => prio,
            Err(err) => panic!("QueueInvariantViolation: {}", err),
        }
    }

    fn monitored_candidate(&self) -> Option<Candidate> {
        let pid = self.aging.monitored()?;
        let pcb = self.procs.get(pid).ok()?;
        Some(Candidate { pid, state: pcb.state(), prio: pcb.prio() })
    }

    /// 上下文切换触发的老化
    fn age_on_switch(&mut self, outgoing: Pid, incoming: Pid, now: u64) {
        let Some(candidate) = self.monitored_candidate() else {
            return;
        };
        if let Some(boost) = self.aging.evaluate(AgingEvent::Switch { outgoing, incoming }, candidate) {
            self.apply_boost(boost, now);
        }
    }

    /// 时间触发的老化；返回被提升的进程是否应当抢占当前进程
    fn age_on_tick(&mut self, now: u64) -> bool {
        let Some(candidate) = self.monitored_candidate() else {
            return false;
        };
        match self.aging.evaluate(AgingEvent::Tick { now }, candidate) {
            Some(boost) => {
                self.apply_boost(boost, now);
                boost.to > self.procs.slot(self.currpid).prio()
            }
            None => false,
        }
    }

    /// 写回新优先级：先出队再按新键入队
    fn apply_boost(&mut self, boost: Boost, now: u64) {
        self.queue_remove(boost.pid);
        self.procs.slot_mut(boost.pid).set_prio(boost.to);
        self.queue_insert(boost.pid, boost.to);
        self.aging.record(boost, now);

        let waited = self.aging.history().last().map_or(0, |r| r.waited);
        log::info!(
            "aging: boost pid {} {} -> {} at tick {} (waited {} ticks)",
            boost.pid,
            boost.from,
            boost.to,
            now,
            waited
        );
    }

    // ---------------------------------------------------------------
    // 检查与查询
    // ---------------------------------------------------------------

    /// 检查进程表、就绪队列、睡眠队列之间的一致性
    ///
    /// 推迟区内挂起当前进程后，在被推迟的 resched 执行前允许没有 Current 进程
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut current: Option<Pid> = None;
        for (pid, pcb) in self.procs.iter() {
            match pcb.state() {
                ProcState::Current => {
                    if let Some(first) = current {
                        return Err(InvariantError::MultipleCurrent(first, pid));
                    }
                    current = Some(pid);
                }
                ProcState::Ready if !self.ready.contains(pid) => {
                    return Err(InvariantError::ReadyNotQueued(pid));
                }
                _ => {}
            }
            if (pcb.state() == ProcState::Sleeping) != self.sleepers.contains(pid) {
                return Err(InvariantError::SleepMismatch(pid));
            }
        }

        match current {
            Some(found) if found != self.currpid => {
                return Err(InvariantError::CurrentMismatch { currpid: self.currpid, found });
            }
            None if !self.defer.is_pending() => return Err(InvariantError::NoCurrent),
            _ => {}
        }

        let mut prev: Option<(Pid, Prio)> = None;
        for entry in self.ready.iter() {
            let pcb = match self.procs.get(entry.pid) {
                Ok(pcb) if pcb.state() == ProcState::Ready => pcb,
                _ => return Err(InvariantError::QueuedNotReady(entry.pid)),
            };
            if pcb.prio() != entry.prio {
                return Err(InvariantError::StaleKey {
                    pid: entry.pid,
                    key: entry.prio,
                    prio: pcb.prio(),
                });
            }
            if let Some((before, before_prio)) = prev {
                if before_prio < entry.prio {
                    return Err(InvariantError::OrderViolation { before, after: entry.pid });
                }
            }
            prev = Some((entry.pid, entry.prio));
        }

        for sleeper in self.sleepers.iter() {
            match self.procs.get(sleeper.pid) {
                Ok(pcb) if pcb.state() == ProcState::Sleeping => {}
                _ => return Err(InvariantError::SleepMismatch(sleeper.pid)),
            }
        }

        Ok(())
    }

    pub fn procs(&self) -> &ProcTable {
        &self.procs
    }

    pub fn ready_queue(&self) -> &ReadyQueue {
        &self.ready
    }

    pub fn sleep_queue(&self) -> &SleepQueue {
        &self.sleepers
    }

    pub fn aging(&self) -> &AgingState {
        &self.aging
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn defer_state(&self) -> DeferState {
        self.defer
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    /// 被 kill 的当前进程的栈是否还在等待释放
    pub fn has_dead_stack(&self) -> bool {
        self.dead_stack.is_some()
    }

    /// 实际发生的上下文切换次数
    pub fn switch_count(&self) -> u64 {
        self.switches
    }

    pub fn switcher(&self) -> &S {
        &self.switcher
    }

    pub fn switcher_mut(&mut self) -> &mut S {
        &mut self.switcher
    }
}

fn check_prio(prio: Prio) -> SchedResult<()> {
    if (MIN_PRIO..=MAX_PRIO).contains(&prio) {
        Ok(())
    } else {
        Err(SchedError::InvalidPriority(prio))
    }
}
