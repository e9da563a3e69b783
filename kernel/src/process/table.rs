//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程表
//!
//! 定长数组，PID 即下标。所有对外查找都做边界检查，
//! 越界或指向空闲槽位的 PID 返回 [`SchedError::InvalidProcessId`]。

use core::array;

use super::task::{CpuContext, Pcb, ProcState};
use crate::config::NPROC;
use crate::sched::pid::{pid_in_range, Pid, PID_IDLE};
use crate::sched::{SchedError, SchedResult};

pub struct ProcTable {
    slots: [Pcb; NPROC],

    /// 下一次分配从这里开始查找，避免刚释放的 PID 被立即复用
    next_pid: Pid,
}

impl ProcTable {
    pub fn new() -> Self {
        Self {
            slots: array::from_fn(|_| Pcb::free()),
            next_pid: PID_IDLE + 1,
        }
    }

    /// 查找在用的 PCB
    pub fn get(&self, pid: Pid) -> SchedResult<&Pcb> {
        if !pid_in_range(pid) {
            return Err(SchedError::InvalidProcessId(pid));
        }
        let pcb = &self.slots[pid as usize];
        if pcb.is_free() {
            return Err(SchedError::InvalidProcessId(pid));
        }
        Ok(pcb)
    }

    /// 查找在用的 PCB（可变）
    pub fn get_mut(&mut self, pid: Pid) -> SchedResult<&mut Pcb> {
        if !pid_in_range(pid) {
            return Err(SchedError::InvalidProcessId(pid));
        }
        let pcb = &mut self.slots[pid as usize];
        if pcb.is_free() {
            return Err(SchedError::InvalidProcessId(pid));
        }
        Ok(pcb)
    }

    /// 按下标直接访问槽位，不论是否空闲
    ///
    /// 只给调度核心在不变式已保证 PID 合法的路径上使用
    pub(crate) fn slot(&self, pid: Pid) -> &Pcb {
        &self.slots[pid as usize]
    }

    pub(crate) fn slot_mut(&mut self, pid: Pid) -> &mut Pcb {
        &mut self.slots[pid as usize]
    }

    /// 分配一个空闲槽位（PID 0 保留给 idle）
    ///
    /// `reserved` 即使空闲也不会被分配
    pub(crate) fn alloc_pid(&mut self, reserved: Option<Pid>) -> SchedResult<Pid> {
        let user_slots = (NPROC - 1) as Pid;
        for _ in 0..user_slots {
            let pid = self.next_pid;
            self.next_pid = if pid as usize + 1 >= NPROC { PID_IDLE + 1 } else { pid + 1 };
            if self.slots[pid as usize].is_free() && reserved != Some(pid) {
                return Ok(pid);
            }
        }
        Err(SchedError::ProcessTableFull)
    }

    pub(crate) fn install(&mut self, pid: Pid, pcb: Pcb) {
        self.slots[pid as usize] = pcb;
    }

    /// 同时借出换出进程的上下文（写）和换入进程的上下文（读）
    pub(crate) fn context_pair(&mut self, prev: Pid, next: Pid) -> (&mut CpuContext, &CpuContext) {
        assert_ne!(prev, next, "context_pair: prev == next");
        let (p, n) = (prev as usize, next as usize);
        if p < n {
            let (lo, hi) = self.slots.split_at_mut(n);
            (lo[p].context_mut(), hi[0].context())
        } else {
            let (lo, hi) = self.slots.split_at_mut(p);
            (hi[0].context_mut(), lo[n].context())
        }
    }

    /// 遍历所有在用的 PCB
    pub fn iter(&self) -> impl Iterator<Item = (Pid, &Pcb)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, pcb)| !pcb.is_free())
            .map(|(pid, pcb)| (pid as Pid, pcb))
    }

    /// 处于指定状态的进程数
    pub fn count_in(&self, state: ProcState) -> usize {
        self.slots.iter().filter(|pcb| pcb.state() == state).count()
    }

    pub fn capacity(&self) -> usize {
        NPROC
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new()
    }
}
