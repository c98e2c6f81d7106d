//! 匹配器注册表模块
//!
//! 启动阶段把匹配器逐个绑定到协议表中：分配顺序槽位、登记选择条件、
//! 维护聚合检测位掩码。表构建完成后交给调度引擎，之后只读。

use crate::core::bitmask::{ProtocolBitmask, SelectionBitmask};
use crate::core::engine::EngineConfig;
use crate::core::matcher::ProtocolMatcher;
use crate::core::protocol::{ConfidenceLevel, ProtocolId};
use crate::error::{ClassifierError, Result};
use crate::dissector_debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 确认结果未携带置信度时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnconfiguredPolicy {
    /// 记为未知置信度，直到匹配器明确给出
    SaveAsUnknown,
    /// 使用引擎配置中的默认置信度
    SaveAsUnconfigured,
}

impl UnconfiguredPolicy {
    /// 根据引擎配置得出补全用的置信度
    pub fn resolve(self, config: &EngineConfig) -> ConfidenceLevel {
        match self {
            Self::SaveAsUnknown => ConfidenceLevel::Unknown,
            Self::SaveAsUnconfigured => config.unconfigured_confidence,
        }
    }
}

/// 协议是否参与聚合检测位掩码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitmaskParticipation {
    /// 加入聚合检测位掩码
    AddToDetectionBitmask,
    /// 不加入
    Exclude,
}

/// 一次注册请求
#[derive(Clone)]
pub struct MatcherRegistration {
    /// 匹配器名称
    pub name: String,
    /// 协议标识
    pub protocol: ProtocolId,
    /// 匹配器
    pub matcher: Option<Arc<dyn ProtocolMatcher>>,
    /// 选择条件
    pub selection: SelectionBitmask,
    /// 未配置置信度策略
    pub unconfigured: UnconfiguredPolicy,
    /// 聚合位掩码参与方式
    pub participation: BitmaskParticipation,
}

impl MatcherRegistration {
    /// 以匹配器自身的名称和协议创建注册请求
    ///
    /// 默认选择条件为 IPv4/IPv6 上的 TCP 或 UDP，
    /// 未配置策略为 `SaveAsUnknown`，并加入聚合检测位掩码。
    pub fn new(matcher: Arc<dyn ProtocolMatcher>) -> Self {
        Self {
            name: matcher.name().to_string(),
            protocol: matcher.protocol(),
            matcher: Some(matcher),
            selection: SelectionBitmask::V4_V6_TCP_OR_UDP,
            unconfigured: UnconfiguredPolicy::SaveAsUnknown,
            participation: BitmaskParticipation::AddToDetectionBitmask,
        }
    }

    /// 设置选择条件
    pub fn with_selection(mut self, selection: SelectionBitmask) -> Self {
        self.selection = selection;
        self
    }

    /// 设置未配置置信度策略
    pub fn with_unconfigured(mut self, policy: UnconfiguredPolicy) -> Self {
        self.unconfigured = policy;
        self
    }

    /// 设置聚合位掩码参与方式
    pub fn with_participation(mut self, participation: BitmaskParticipation) -> Self {
        self.participation = participation;
        self
    }
}

impl fmt::Debug for MatcherRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistration")
            .field("name", &self.name)
            .field("protocol", &self.protocol)
            .field("has_matcher", &self.matcher.is_some())
            .field("selection", &self.selection)
            .field("unconfigured", &self.unconfigured)
            .field("participation", &self.participation)
            .finish()
    }
}

/// 已注册的匹配器，字段在注册后不可修改
#[derive(Clone)]
pub struct RegisteredMatcher {
    slot: u32,
    name: String,
    protocol: ProtocolId,
    matcher: Arc<dyn ProtocolMatcher>,
    selection: SelectionBitmask,
    unconfigured: UnconfiguredPolicy,
    participation: BitmaskParticipation,
}

impl RegisteredMatcher {
    /// 注册槽位
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 协议标识
    pub fn protocol(&self) -> ProtocolId {
        self.protocol
    }

    /// 匹配器
    pub fn matcher(&self) -> &dyn ProtocolMatcher {
        self.matcher.as_ref()
    }

    /// 选择条件
    pub fn selection(&self) -> SelectionBitmask {
        self.selection
    }

    /// 未配置置信度策略
    pub fn unconfigured(&self) -> UnconfiguredPolicy {
        self.unconfigured
    }

    /// 聚合位掩码参与方式
    pub fn participation(&self) -> BitmaskParticipation {
        self.participation
    }
}

impl fmt::Debug for RegisteredMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredMatcher")
            .field("slot", &self.slot)
            .field("name", &self.name)
            .field("protocol", &self.protocol)
            .field("selection", &self.selection)
            .finish()
    }
}

/// 协议匹配器注册表
#[derive(Default)]
pub struct ProtocolRegistry {
    entries: Vec<RegisteredMatcher>,
    by_protocol: HashMap<ProtocolId, usize>,
    detection_bitmask: ProtocolBitmask,
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("matchers_count", &self.entries.len())
            .field("detection_bitmask", &self.detection_bitmask)
            .finish()
    }
}

impl ProtocolRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册匹配器
    ///
    /// 使用 `*next_id` 作为槽位，成功后递增。任何错误都不会修改注册表或计数器。
    pub fn register(&mut self, next_id: &mut u32, registration: MatcherRegistration) -> Result<u32> {
        let MatcherRegistration {
            name,
            protocol,
            matcher,
            selection,
            unconfigured,
            participation,
        } = registration;

        if name.trim().is_empty() {
            return Err(ClassifierError::invalid_name(format!(
                "empty name for protocol {}",
                protocol
            )));
        }
        if protocol.is_unknown() {
            return Err(ClassifierError::config_error(format!(
                "{} cannot be registered under the Unknown protocol",
                name
            )));
        }
        let matcher = matcher.ok_or_else(|| ClassifierError::missing_matcher(name.as_str(), protocol))?;
        if matcher.protocol() != protocol {
            return Err(ClassifierError::config_error(format!(
                "matcher {} handles {} but was registered as {}",
                matcher.name(),
                matcher.protocol(),
                protocol
            )));
        }
        if let Some(&index) = self.by_protocol.get(&protocol) {
            return Err(ClassifierError::duplicate_protocol(protocol, self.entries[index].slot));
        }
        if self.entries.iter().any(|e| e.name == name) {
            return Err(ClassifierError::duplicate_name(name));
        }
        if !selection.is_satisfiable() {
            return Err(ClassifierError::empty_selection(name));
        }

        let slot = *next_id;
        dissector_debug!(
            "register {} ({}) slot={} selection={:?}",
            name,
            protocol,
            slot,
            selection
        );

        self.by_protocol.insert(protocol, self.entries.len());
        if participation == BitmaskParticipation::AddToDetectionBitmask {
            self.detection_bitmask.add(protocol);
        }
        self.entries.push(RegisteredMatcher {
            slot,
            name,
            protocol,
            matcher,
            selection,
            unconfigured,
            participation,
        });
        *next_id += 1;
        Ok(slot)
    }

    /// 按注册顺序获取全部匹配器
    pub fn entries(&self) -> &[RegisteredMatcher] {
        &self.entries
    }

    /// 按协议查找
    pub fn get(&self, protocol: ProtocolId) -> Option<&RegisteredMatcher> {
        self.by_protocol.get(&protocol).map(|&i| &self.entries[i])
    }

    /// 按名称查找
    pub fn get_by_name(&self, name: &str) -> Option<&RegisteredMatcher> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// 聚合检测位掩码
    pub fn detection_bitmask(&self) -> ProtocolBitmask {
        self.detection_bitmask
    }

    /// 已注册的协议集合
    pub fn registered_protocols(&self) -> ProtocolBitmask {
        ProtocolBitmask::from_protocols(self.entries.iter().map(|e| e.protocol))
    }

    /// 匹配器数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
