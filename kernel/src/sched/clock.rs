//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 时钟
//!
//! 单调递增的滴答计数、秒计数，以及当前进程剩余的时间片

#[derive(Debug, Clone)]
pub struct Clock {
    ticks: u64,
    ticks_per_sec: u32,
    /// 当前秒内已经过的滴答
    sub_ticks: u32,
    seconds: u64,
    /// 当前进程剩余的滴答数，归零即抢占
    preempt: u32,
    quantum: u32,
}

impl Clock {
    pub fn new(ticks_per_sec: u32, quantum: u32) -> Self {
        let quantum = quantum.max(1);
        Self {
            ticks: 0,
            ticks_per_sec: ticks_per_sec.max(1),
            sub_ticks: 0,
            seconds: 0,
            preempt: quantum,
            quantum,
        }
    }

    /// 启动以来的滴答数
    pub fn now(&self) -> u64 {
        self.ticks
    }

    /// 启动以来的整秒数
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn quantum(&self) -> u32 {
        self.quantum
    }

    pub fn remaining_slice(&self) -> u32 {
        self.preempt
    }

    /// 前进一个滴答，返回新的时刻
    pub fn advance(&mut self) -> u64 {
        self.ticks += 1;
        self.sub_ticks += 1;
        if self.sub_ticks >= self.ticks_per_sec {
            self.sub_ticks = 0;
            self.seconds += 1;
        }
        self.ticks
    }

    /// 消耗一个滴答的时间片；用完时返回 true 并重新装满
    pub fn consume_slice(&mut self) -> bool {
        self.preempt = self.preempt.saturating_sub(1);
        if self.preempt == 0 {
            self.preempt = self.quantum;
            return true;
        }
        false
    }

    /// 新进程上 CPU 时重新装满时间片
    pub fn reset_slice(&mut self) {
        self.preempt = self.quantum;
    }
}
