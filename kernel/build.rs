//! Rux 调度核心构建脚本
//!
//! 这个脚本在编译前运行，负责：
//! 1. 解析 Kernel.toml 配置文件
//! 2. 校验调度相关参数
//! 3. 生成配置代码 ($OUT_DIR/config.rs)

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KernelConfig {
    general: General,
    process: Process,
    scheduler: Scheduler,
    aging: Aging,
    debug: DebugSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct General {
    name: String,
    version: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            name: "Rux".to_string(),
            version: "0.1.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Process {
    nproc: usize,
    min_stack_size: usize,
    name_len: usize,
}

impl Default for Process {
    fn default() -> Self {
        Self {
            nproc: 64,
            min_stack_size: 1024,
            name_len: 16,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Scheduler {
    max_prio: i32,
    quantum_ticks: u32,
    clk_ticks_per_sec: u32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            max_prio: 63,
            quantum_ticks: 2,
            clk_ticks_per_sec: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Aging {
    switch_step: i32,
    time_step: i32,
    cap: i32,
    threshold_secs: u64,
    reset: String,
}

impl Default for Aging {
    fn default() -> Self {
        Self {
            switch_step: 2,
            time_step: 5,
            cap: 50,
            threshold_secs: 2,
            reset: "boost".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DebugSection {
    log_level: String,
}

impl Default for DebugSection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let config_path = manifest_dir.join("../Kernel.toml");

    println!("cargo:rerun-if-changed={}", config_path.display());
    println!("cargo:rerun-if-changed=build.rs");

    // Kernel.toml 缺失时全部使用默认值
    let config: KernelConfig = match fs::read_to_string(&config_path) {
        Ok(content) => toml::from_str(&content).expect("Kernel.toml 解析失败"),
        Err(_) => {
            println!("cargo:warning=Kernel.toml not found, using defaults");
            KernelConfig::default()
        }
    };

    validate(&config);

    generate_config_code(&config);
}

fn validate(config: &KernelConfig) {
    let p = &config.process;
    let s = &config.scheduler;
    let a = &config.aging;

    assert!(p.nproc >= 2, "process.nproc 至少为 2 (idle + 一个用户进程)");
    assert!(p.name_len > 0, "process.name_len 必须大于 0");
    assert!(s.max_prio >= 1, "scheduler.max_prio 必须 >= 1");
    assert!(s.quantum_ticks > 0, "scheduler.quantum_ticks 必须大于 0");
    assert!(s.clk_ticks_per_sec > 0, "scheduler.clk_ticks_per_sec 必须大于 0");
    assert!(a.switch_step > 0 && a.time_step > 0, "aging 步长必须大于 0");
    assert!(
        a.cap >= 1 && a.cap <= s.max_prio,
        "aging.cap 必须在 1..=scheduler.max_prio 之间"
    );
    assert!(
        a.reset == "boost" || a.reset == "run",
        "aging.reset 只能是 \"boost\" 或 \"run\""
    );
}

fn generate_config_code(config: &KernelConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // include! 不接受内部属性，这里只能用 `///` 注释
    let code = format!(
        r#"// Rux 调度核心配置（自动生成）
//
// 此文件由 build.rs 根据 Kernel.toml 自动生成，请勿手动修改

// ============================================================
// 基本信息
// ============================================================

/// 内核名称
pub const KERNEL_NAME: &str = "{}";

/// 内核版本
pub const KERNEL_VERSION: &str = "{}";

// ============================================================
// 进程配置
// ============================================================

/// 进程表槽位数
pub const NPROC: usize = {};

/// 最小进程栈 (字节)
pub const MIN_STACK_SIZE: usize = {};

/// 进程名最大长度 (字节)
pub const PROC_NAME_LEN: usize = {};

// ============================================================
// 调度器配置
// ============================================================

/// 最高优先级
pub const MAX_PRIO: i32 = {};

/// 时间片滴答数
pub const QUANTUM: u32 = {};

/// 每秒时钟滴答数
pub const CLK_TICKS_PER_SEC: u32 = {};

// ============================================================
// 饥饿预防配置
// ============================================================

/// 上下文切换触发的提升步长
pub const AGING_SWITCH_STEP: i32 = {};

/// 时间触发的提升步长
pub const AGING_TIME_STEP: i32 = {};

/// 提升上限
pub const AGING_CAP: i32 = {};

/// 时间触发阈值 (秒)
pub const AGING_THRESHOLD_SECS: u64 = {};

/// 每次提升后重置就绪计时
pub const AGING_RESET_ON_BOOST: bool = {};

// ============================================================
// 调试配置
// ============================================================

/// 日志级别
pub const LOG_LEVEL: &str = "{}";
"#,
        config.general.name,
        config.general.version,
        config.process.nproc,
        config.process.min_stack_size,
        config.process.name_len,
        config.scheduler.max_prio,
        config.scheduler.quantum_ticks,
        config.scheduler.clk_ticks_per_sec,
        config.aging.switch_step,
        config.aging.time_step,
        config.aging.cap,
        config.aging.threshold_secs,
        config.aging.reset == "boost",
        config.debug.log_level,
    );

    let config_file = out_dir.join("config.rs");

    // 只有内容变化时才写入，避免每次编译都更新文件时间戳
    let existing_content = fs::read_to_string(&config_file).unwrap_or_default();
    if existing_content != code {
        fs::write(&config_file, &code).expect("写入配置文件失败");
    }
}
