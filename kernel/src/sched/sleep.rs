//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 睡眠队列
//!
//! 以唤醒时刻为键的定长最小堆。唤醒时刻相同的进程按入队顺序出队
//! （键中带一个递增序号）。

use super::pid::Pid;
use crate::config::NPROC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepEntry {
    pub pid: Pid,
    pub wake_at: u64,
    seq: u64,
}

impl SleepEntry {
    const EMPTY: SleepEntry = SleepEntry { pid: 0, wake_at: u64::MAX, seq: u64::MAX };

    fn key(&self) -> (u64, u64) {
        (self.wake_at, self.seq)
    }
}

pub struct SleepQueue {
    heap: [SleepEntry; NPROC],
    size: usize,
    seq: u64,
}

impl SleepQueue {
    pub const fn new() -> Self {
        Self {
            heap: [SleepEntry::EMPTY; NPROC],
            size: 0,
            seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.position(pid).is_some()
    }

    /// 最早的唤醒时刻
    pub fn next_wake(&self) -> Option<u64> {
        if self.size == 0 {
            None
        } else {
            Some(self.heap[0].wake_at)
        }
    }

    /// 加入睡眠队列；队列已满时返回 false
    ///
    /// 每个进程最多入队一次，容量等于进程表大小，正常路径不会满
    pub fn insert(&mut self, pid: Pid, wake_at: u64) -> bool {
        if self.size == NPROC {
            return false;
        }
        let idx = self.size;
        self.heap[idx] = SleepEntry { pid, wake_at, seq: self.seq };
        self.seq += 1;
        self.size += 1;
        self.sift_up(idx);
        true
    }

    /// 取出一个唤醒时刻不晚于 `now` 的进程
    pub fn pop_due(&mut self, now: u64) -> Option<SleepEntry> {
        if self.size == 0 || self.heap[0].wake_at > now {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// 把指定进程移出睡眠队列（被 kill 时）
    pub fn remove(&mut self, pid: Pid) -> Option<SleepEntry> {
        let idx = self.position(pid)?;
        Some(self.remove_at(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SleepEntry> + '_ {
        self.heap[..self.size].iter()
    }

    fn position(&self, pid: Pid) -> Option<usize> {
        self.heap[..self.size].iter().position(|e| e.pid == pid)
    }

    fn remove_at(&mut self, idx: usize) -> SleepEntry {
        let entry = self.heap[idx];
        self.size -= 1;
        if idx != self.size {
            self.heap[idx] = self.heap[self.size];
            self.heap[self.size] = SleepEntry::EMPTY;
            // 换上来的元素可能需要上浮也可能需要下沉
            self.sift_down(idx);
            self.sift_up(idx);
        } else {
            self.heap[idx] = SleepEntry::EMPTY;
        }
        entry
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) >> 1;
            if self.heap[parent].key() > self.heap[i].key() {
                self.heap.swap(parent, i);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;

            if left < self.size && self.heap[left].key() < self.heap[smallest].key() {
                smallest = left;
            }
            if right < self.size && self.heap[right].key() < self.heap[smallest].key() {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.heap.swap(i, smallest);
            i = smallest;
        }
    }
}

impl Default for SleepQueue {
    fn default() -> Self {
        Self::new()
    }
}
