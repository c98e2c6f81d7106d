//! 错误处理模块
//!
//! 分类结果（确认/排除/弃权）不是错误。这里只定义启动阶段的配置错误：
//! 协议表在处理任何数据包之前构建完成，任何一条错误都必须让启动失败。

use crate::core::protocol::ProtocolId;
use thiserror::Error;

/// Flow-Dissector的结果类型
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// 分类器错误类型
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// 同一协议被重复注册
    #[error("Protocol {protocol} registered twice (first as slot {existing_slot})")]
    DuplicateProtocol {
        /// 协议标识
        protocol: ProtocolId,
        /// 已占用的槽位
        existing_slot: u32,
    },

    /// 匹配器名称重复
    #[error("Matcher name already in use: {name}")]
    DuplicateName {
        /// 匹配器名称
        name: String,
    },

    /// 缺少匹配器
    #[error("No matcher supplied for {name} ({protocol})")]
    MissingMatcher {
        /// 匹配器名称
        name: String,
        /// 协议标识
        protocol: ProtocolId,
    },

    /// 选择位掩码缺少IP版本位或传输层位，匹配器永远不会被调用
    #[error("Empty selection bitmask for {name}")]
    EmptySelection {
        /// 匹配器名称
        name: String,
    },

    /// 非法名称
    #[error("Invalid matcher name: {reason}")]
    InvalidName {
        /// 原因
        reason: String,
    },

    /// 配置错误
    #[error("Configuration error: {message}")]
    ConfigError {
        /// 错误消息
        message: String,
    },

    /// 内部错误
    #[error("Internal error: {message}")]
    InternalError {
        /// 错误消息
        message: String,
    },
}

impl ClassifierError {
    /// 创建重复协议错误
    pub fn duplicate_protocol(protocol: ProtocolId, existing_slot: u32) -> Self {
        Self::DuplicateProtocol {
            protocol,
            existing_slot,
        }
    }

    /// 创建重复名称错误
    pub fn duplicate_name<S: Into<String>>(name: S) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// 创建缺少匹配器错误
    pub fn missing_matcher<S: Into<String>>(name: S, protocol: ProtocolId) -> Self {
        Self::MissingMatcher {
            name: name.into(),
            protocol,
        }
    }

    /// 创建空选择位掩码错误
    pub fn empty_selection<S: Into<String>>(name: S) -> Self {
        Self::EmptySelection { name: name.into() }
    }

    /// 创建非法名称错误
    pub fn invalid_name<S: Into<String>>(reason: S) -> Self {
        Self::InvalidName {
            reason: reason.into(),
        }
    }

    /// 创建配置错误
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// 创建内部错误
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// 检查是否为可恢复错误
    ///
    /// 注册阶段的错误会破坏整个进程生命周期内的协议表，没有可恢复的情况。
    pub fn is_recoverable(&self) -> bool {
        false
    }

    /// 检查是否为配置相关错误
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::InternalError { .. })
    }

    /// 获取错误代码
    pub fn error_code(&self) -> u32 {
        match self {
            Self::DuplicateProtocol { .. } => 2001,
            Self::DuplicateName { .. } => 2002,
            Self::MissingMatcher { .. } => 2003,
            Self::EmptySelection { .. } => 2004,
            Self::InvalidName { .. } => 2005,
            Self::ConfigError { .. } => 2008,
            Self::InternalError { .. } => 2999,
        }
    }
}

/// 从anyhow::Error转换
impl From<anyhow::Error> for ClassifierError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal_error(err.to_string())
    }
}

/// 从serde_json::Error转换
impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        Self::config_error(format!("JSON error: {}", err))
    }
}
