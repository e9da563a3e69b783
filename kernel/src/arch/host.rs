//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 宿主机上下文切换
//!
//! 不切换任何寄存器，只按顺序记录每次切换。调用立即返回，
//! 相当于换入进程已经开始运行。

use alloc::vec::Vec;

use super::ContextSwitch;
use crate::process::CpuContext;
use crate::sched::pid::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchRecord {
    pub from: Pid,
    pub to: Pid,
    /// 是否保存了换出进程的上下文；换出进程已被 kill 时为 false
    pub saved: bool,
}

#[derive(Debug, Default)]
pub struct HostSwitch {
    records: Vec<SwitchRecord>,
}

impl HostSwitch {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn records(&self) -> &[SwitchRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<SwitchRecord> {
        self.records.last().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 取走已记录的切换
    pub fn take(&mut self) -> Vec<SwitchRecord> {
        core::mem::take(&mut self.records)
    }
}

impl ContextSwitch for HostSwitch {
    fn switch_context(
        &mut self,
        prev: Pid,
        _save_into: &mut CpuContext,
        next: Pid,
        _resume_from: &CpuContext,
    ) {
        self.records.push(SwitchRecord { from: prev, to: next, saved: true });
    }

    fn restore_context(&mut self, prev: Pid, next: Pid, _resume_from: &CpuContext) {
        self.records.push(SwitchRecord { from: prev, to: next, saved: false });
    }
}
