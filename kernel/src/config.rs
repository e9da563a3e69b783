//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 内核配置
//!
//! 常量由 build.rs 根据 Kernel.toml 生成

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// 空闲进程的优先级，低于任何合法的用户优先级
pub const IDLE_PRIO: i32 = 0;

/// 用户进程允许的最低优先级
pub const MIN_PRIO: i32 = 1;

/// 时间触发阈值换算成时钟滴答
pub const AGING_THRESHOLD_TICKS: u64 = AGING_THRESHOLD_SECS * CLK_TICKS_PER_SEC as u64;
