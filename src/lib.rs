//! # Flow-Dissector: 按流的应用层协议分类器
//!
//! 深度包检测引擎中的协议识别核心：对每条流逐包调用仍然合格的协议匹配器，
//! 一旦确认即定格，一旦排除即永不再试。
//!
//! ## 特性
//!
//! - **无状态匹配器**: 匹配器是纯函数，可在多线程间共享
//! - **位掩码调度**: 选择条件过滤 + 单调增长的排除集合
//! - **启动期注册**: 协议表构建一次，之后只读
//!
//! ## 快速开始
//!
//! 用 [`EngineBuilder`] 启用需要的匹配器，为每条流创建 [`FlowState`]，
//! 然后把数据包交给 [`DispatchEngine::process_packet`]。

#![deny(missing_docs)]
#![warn(clippy::all)]

// 工具模块（日志宏需要最先定义）
#[macro_use]
pub mod utils;

// 核心模块
pub mod core;
pub mod error;

// 协议匹配器
pub mod protocols;

// 构造器
pub mod builder;

// 重新导出核心类型
pub use crate::core::{
    engine::{DispatchEngine, DispatchOutcome, DispatchStats, EngineConfig},
    flow::FlowState,
    matcher::{Decision, ProtocolMatcher},
    packet::{IpVersion, Packet, PacketView, TransportHeader, TransportKind},
    protocol::{Classification, ConfidenceLevel, ProtocolId},
    registry::{BitmaskParticipation, MatcherRegistration, ProtocolRegistry, UnconfiguredPolicy},
};

pub use crate::builder::EngineBuilder;
pub use crate::error::{ClassifierError, Result};

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 库描述
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
