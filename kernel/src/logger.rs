//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 内核日志
//!
//! 实现 `log::Log`，所有 `log::info!` 等调用最终写到控制台：
//!
//! ```text
//! [ INFO sched] context switch: 1 (P1) -> 2 (P2)
//! ```

use log::{LevelFilter, Log, Metadata, Record};

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // 去掉 crate 前缀，只保留模块名
        let target = record
            .target()
            .rsplit("::")
            .next()
            .unwrap_or(record.target());
        crate::println!("[{:>5} {}] {}", record.level(), target, record.args());
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// 安装内核日志器，级别取自配置 `LOG_LEVEL`
///
/// 重复调用是安全的：只有第一次会安装。
pub fn init() {
    init_with_level(parse_level(crate::config::LOG_LEVEL));
}

/// 安装内核日志器并指定级别
pub fn init_with_level(level: LevelFilter) {
    log::set_max_level(level);
    if log::set_logger(&LOGGER).is_ok() {
        log::info!("logger: installed, level={}", level);
    }
}

/// 解析日志级别字符串，未知值按 `Info` 处理
pub fn parse_level(s: &str) -> LevelFilter {
    match s {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}
