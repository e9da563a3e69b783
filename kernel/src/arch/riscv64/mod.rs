//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! RISC-V 64位架构支持
//!
//! 只提供调度核心需要的上下文切换；中断屏蔽见 [`crate::arch::irq`]

pub mod context;
