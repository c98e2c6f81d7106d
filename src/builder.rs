//! 引擎构造器模块
//!
//! 提供链式API来组装协议表并创建调度引擎。协议表只在 `build` 中构建一次，
//! 任何注册错误都会让 `build` 失败，调用方应当在处理数据包之前终止启动。

use crate::core::{
    engine::{DispatchEngine, EngineConfig},
    protocol::{ConfidenceLevel, ProtocolId},
    registry::{MatcherRegistration, ProtocolRegistry},
};
use crate::error::Result;
use std::collections::BTreeSet;

/// 引擎构造器
///
/// # 示例
///
/// ```rust
/// use flow_dissector::EngineBuilder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = EngineBuilder::new()
///     .enable_all()
///     .with_max_packets_per_flow(8)
///     .build()?;
/// assert!(!engine.registry().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EngineBuilder {
    enabled_protocols: BTreeSet<ProtocolId>,
    custom_matchers: Vec<MatcherRegistration>,
    config: EngineConfig,
    first_slot: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// 创建新的构造器
    pub fn new() -> Self {
        Self {
            enabled_protocols: BTreeSet::new(),
            custom_matchers: Vec::new(),
            config: EngineConfig::default(),
            first_slot: 0,
        }
    }

    /// 启用CIP I/O匹配器
    #[cfg(feature = "cipio")]
    pub fn enable_cipio(mut self) -> Self {
        self.enabled_protocols.insert(ProtocolId::CipIo);
        self
    }

    /// 启用EtherNet/IP匹配器
    #[cfg(feature = "enip")]
    pub fn enable_enip(mut self) -> Self {
        self.enabled_protocols.insert(ProtocolId::Enip);
        self
    }

    /// 启用所有内置匹配器
    pub fn enable_all(mut self) -> Self {
        #[cfg(feature = "enip")]
        self.enabled_protocols.insert(ProtocolId::Enip);
        #[cfg(feature = "cipio")]
        self.enabled_protocols.insert(ProtocolId::CipIo);
        self
    }

    /// 使用完整配置
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置单流数据包上限
    pub fn with_max_packets_per_flow(mut self, max: u32) -> Self {
        self.config.max_packets_per_flow = max;
        self
    }

    /// 设置未配置置信度
    pub fn with_unconfigured_confidence(mut self, confidence: ConfidenceLevel) -> Self {
        self.config.unconfigured_confidence = confidence;
        self
    }

    /// 设置首个槽位编号
    pub fn with_first_slot(mut self, slot: u32) -> Self {
        self.first_slot = slot;
        self
    }

    /// 添加自定义匹配器，排在内置匹配器之后
    pub fn add_custom_matcher(mut self, registration: MatcherRegistration) -> Self {
        self.custom_matchers.push(registration);
        self
    }

    /// 构建协议表
    pub fn build_registry(self) -> Result<(ProtocolRegistry, EngineConfig)> {
        let mut registry = ProtocolRegistry::new();
        let mut next_id = self.first_slot;

        for protocol in &self.enabled_protocols {
            match protocol {
                #[cfg(feature = "enip")]
                ProtocolId::Enip => {
                    crate::protocols::init_enip(&mut registry, &mut next_id)?;
                }
                #[cfg(feature = "cipio")]
                ProtocolId::CipIo => {
                    crate::protocols::init_cipio(&mut registry, &mut next_id)?;
                }
                _ => {}
            }
        }
        for registration in self.custom_matchers {
            registry.register(&mut next_id, registration)?;
        }
        Ok((registry, self.config))
    }

    /// 构建调度引擎
    pub fn build(self) -> Result<DispatchEngine> {
        let (registry, config) = self.build_registry()?;
        DispatchEngine::new(registry, config)
    }
}
