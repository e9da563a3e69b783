//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 控制台输出
//!
//! 调度核心本身不驱动任何设备，输出经由一个可替换的写入函数：
//! 板级代码注册 UART 写函数，宿主机测试注册标准输出。
//! 未注册时输出被丢弃。

use spin::Mutex;

/// 控制台写入函数
pub type ConsoleSink = fn(&str);

static SINK: Mutex<Option<ConsoleSink>> = Mutex::new(None);

/// 注册控制台写入函数（覆盖之前的注册）
pub fn set_sink(sink: ConsoleSink) {
    *SINK.lock() = Some(sink);
}

/// 注销控制台写入函数
pub fn clear_sink() {
    *SINK.lock() = None;
}

/// 是否已注册写入函数
pub fn has_sink() -> bool {
    SINK.lock().is_some()
}

/// 写入字符串
pub fn write_str(s: &str) {
    // 先复制出函数指针，避免在持锁期间回调
    let sink = *SINK.lock();
    if let Some(sink) = sink {
        sink(s);
    }
}

/// putchar 收到的不完整 UTF-8 序列
struct PartialChar {
    buf: [u8; 4],
    len: usize,
}

static PARTIAL: Mutex<PartialChar> = Mutex::new(PartialChar { buf: [0; 4], len: 0 });

/// 写入单个字节
///
/// 多字节 UTF-8 字符逐字节传入时先缓存，凑齐后整体写出；
/// 无效序列被丢弃，ASCII 字节会打断未完成的序列
pub fn putchar(c: u8) {
    let mut out = [0u8; 4];
    let n = {
        let mut partial = PARTIAL.lock();
        if c.is_ascii() {
            partial.len = 0;
            out[0] = c;
            1
        } else {
            let len = partial.len;
            partial.buf[len] = c;
            partial.len = len + 1;
            let decoded = core::str::from_utf8(&partial.buf[..len + 1])
                .map(|s| s.len())
                .map_err(|e| e.error_len());
            match decoded {
                Ok(n) => {
                    out[..n].copy_from_slice(&partial.buf[..n]);
                    partial.len = 0;
                    n
                }
                // 序列还没结束
                Err(None) if len + 1 < 4 => 0,
                Err(_) => {
                    partial.len = 0;
                    0
                }
            }
        }
    };
    if n > 0 {
        if let Ok(s) = core::str::from_utf8(&out[..n]) {
            write_str(s);
        }
    }
}
