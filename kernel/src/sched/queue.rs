//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 就绪队列
//!
//! 按优先级降序排列的 PID 链表，同优先级先进先出。
//!
//! 节点直接以 PID 为下标存放在定长数组里（每个进程最多在队列中出现一次），
//! 因此：
//! - `insert` 从队头线性查找插入点，O(n)
//! - `remove_highest` / `remove_by_id` 为 O(1)
//!
//! 节点记录的是入队时的优先级。进程在队中时若要改优先级，
//! 调用者必须 `remove_by_id` 后再 `insert`，不能原地修改键值。

use core::fmt;

use super::pid::{pid_in_range, Pid, Prio};
use crate::config::NPROC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// PID 已在队列中
    Duplicate(Pid),

    /// PID 不在队列中
    NotFound(Pid),

    /// PID 超出进程表范围
    OutOfRange(Pid),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Duplicate(pid) => write!(f, "pid {} already queued", pid),
            QueueError::NotFound(pid) => write!(f, "pid {} not queued", pid),
            QueueError::OutOfRange(pid) => write!(f, "pid {} out of range", pid),
        }
    }
}

/// 队列中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub pid: Pid,
    pub prio: Prio,
}

#[derive(Clone, Copy)]
struct QNode {
    key: Prio,
    prev: Option<Pid>,
    next: Option<Pid>,
    linked: bool,
}

impl QNode {
    const EMPTY: QNode = QNode { key: 0, prev: None, next: None, linked: false };
}

pub struct ReadyQueue {
    nodes: [QNode; NPROC],
    head: Option<Pid>,
    tail: Option<Pid>,
    len: usize,
}

impl ReadyQueue {
    pub const fn new() -> Self {
        Self {
            nodes: [QNode::EMPTY; NPROC],
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, pid: Pid) -> bool {
        pid_in_range(pid) && self.nodes[pid as usize].linked
    }

    /// 入队时记录的优先级
    pub fn key_of(&self, pid: Pid) -> Option<Prio> {
        if self.contains(pid) {
            Some(self.nodes[pid as usize].key)
        } else {
            None
        }
    }

    /// 按优先级插入
    ///
    /// 插在第一个优先级严格低于 `prio` 的节点之前，
    /// 因此同优先级的进程排在已有进程之后
    pub fn insert(&mut self, pid: Pid, prio: Prio) -> Result<(), QueueError> {
        if !pid_in_range(pid) {
            return Err(QueueError::OutOfRange(pid));
        }
        if self.nodes[pid as usize].linked {
            return Err(QueueError::Duplicate(pid));
        }

        let mut curr = self.head;
        while let Some(c) = curr {
            if self.nodes[c as usize].key < prio {
                break;
            }
            curr = self.nodes[c as usize].next;
        }

        // 插在 curr 之前；curr 为 None 时插在队尾
        let prev = match curr {
            Some(c) => self.nodes[c as usize].prev,
            None => self.tail,
        };

        self.nodes[pid as usize] = QNode { key: prio, prev, next: curr, linked: true };

        match prev {
            Some(p) => self.nodes[p as usize].next = Some(pid),
            None => self.head = Some(pid),
        }
        match curr {
            Some(c) => self.nodes[c as usize].prev = Some(pid),
            None => self.tail = Some(pid),
        }

        self.len += 1;
        Ok(())
    }

    /// 取出队头（优先级最高、最早入队）的进程
    pub fn remove_highest(&mut self) -> Option<QueueEntry> {
        let pid = self.head?;
        let prio = self.unlink(pid);
        Some(QueueEntry { pid, prio })
    }

    /// 从队列中摘除指定进程，返回入队时的优先级
    pub fn remove_by_id(&mut self, pid: Pid) -> Result<Prio, QueueError> {
        if !pid_in_range(pid) {
            return Err(QueueError::OutOfRange(pid));
        }
        if !self.nodes[pid as usize].linked {
            return Err(QueueError::NotFound(pid));
        }
        Ok(self.unlink(pid))
    }

    /// 队头优先级，队列为空时返回 None
    pub fn peek_highest_priority(&self) -> Option<Prio> {
        self.head.map(|pid| self.nodes[pid as usize].key)
    }

    /// 从队头到队尾遍历
    pub fn iter(&self) -> Iter<'_> {
        Iter { queue: self, curr: self.head }
    }

    fn unlink(&mut self, pid: Pid) -> Prio {
        let node = self.nodes[pid as usize];

        match node.prev {
            Some(p) => self.nodes[p as usize].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.nodes[n as usize].prev = node.prev,
            None => self.tail = node.prev,
        }

        self.nodes[pid as usize] = QNode::EMPTY;
        self.len -= 1;
        node.key
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadyQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|e| (e.pid, e.prio)))
            .finish()
    }
}

pub struct Iter<'a> {
    queue: &'a ReadyQueue,
    curr: Option<Pid>,
}

impl Iterator for Iter<'_> {
    type Item = QueueEntry;

    fn next(&mut self) -> Option<QueueEntry> {
        let pid = self.curr?;
        let node = &self.queue.nodes[pid as usize];
        self.curr = node.next;
        Some(QueueEntry { pid, prio: node.key })
    }
}
