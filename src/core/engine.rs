//! 调度引擎模块
//!
//! 对每个数据包计算其选择位，按注册顺序调用仍然合格的匹配器，
//! 直到某个匹配器确认协议或全部被排除。

use crate::core::bitmask::ProtocolBitmask;
use crate::core::flow::FlowState;
use crate::core::matcher::{apply_decision, Applied};
use crate::core::packet::PacketView;
use crate::core::protocol::{Classification, ConfidenceLevel, ProtocolId};
use crate::core::registry::{ProtocolRegistry, RegisteredMatcher};
use crate::error::{ClassifierError, Result};
use crate::{dissector_info, dissector_trace, dissector_warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 实例ID（多引擎实例时区分日志）
    pub instance_id: String,
    /// `SaveAsUnconfigured` 协议确认时未给出置信度所使用的默认值
    pub unconfigured_confidence: ConfidenceLevel,
    /// 单条流最多调度的数据包数，超过后放弃分类
    pub max_packets_per_flow: u32,
    /// 是否记录每个判定
    pub log_decisions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            unconfigured_confidence: ConfidenceLevel::MatchByPort,
            max_packets_per_flow: 32,
            log_decisions: false,
        }
    }
}

impl EngineConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从JSON加载配置，缺省字段取默认值
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.max_packets_per_flow == 0 {
            return Err(ClassifierError::config_error(
                "max_packets_per_flow must be greater than zero",
            ));
        }
        Ok(())
    }

    /// 设置实例ID
    pub fn with_instance_id<S: Into<String>>(mut self, instance_id: S) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// 设置未配置置信度
    pub fn with_unconfigured_confidence(mut self, confidence: ConfidenceLevel) -> Self {
        self.unconfigured_confidence = confidence;
        self
    }

    /// 设置单流数据包上限
    pub fn with_max_packets_per_flow(mut self, max: u32) -> Self {
        self.max_packets_per_flow = max;
        self
    }

    /// 启用判定日志
    pub fn enable_decision_log(mut self) -> Self {
        self.log_decisions = true;
        self
    }
}

/// 单个数据包的调度结果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// 流此前已完成分类，未调用任何匹配器
    AlreadyClassified(Classification),
    /// 本数据包完成了分类
    Classified(Classification),
    /// 仍有候选协议，等待后续数据包
    Pending {
        /// 本次调用的匹配器数
        invoked: usize,
        /// 其中弃权的数量
        abstained: usize,
    },
    /// 所有候选协议均已排除
    Exhausted,
    /// 超过单流数据包上限
    GaveUp,
}

impl DispatchOutcome {
    /// 是否为终态
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }

    /// 分类结果
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            Self::AlreadyClassified(c) | Self::Classified(c) => Some(c),
            _ => None,
        }
    }
}

/// 调度统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchStats {
    /// 调度的数据包数
    pub packets_dispatched: u64,
    /// 匹配器调用次数
    pub matcher_invocations: u64,
    /// 确认次数
    pub confirmations: u64,
    /// 排除次数
    pub exclusions: u64,
    /// 弃权次数
    pub abstentions: u64,
    /// 被拒绝的确认次数
    pub rejections: u64,
    /// 放弃分类的流数
    pub flows_given_up: u64,
    /// 各协议确认次数
    pub protocol_counts: HashMap<ProtocolId, u64>,
}

impl DispatchStats {
    /// 创建空统计
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取确认率（按调度的数据包计）
    pub fn confirmation_rate(&self) -> f64 {
        if self.packets_dispatched == 0 {
            0.0
        } else {
            self.confirmations as f64 / self.packets_dispatched as f64
        }
    }

    /// 获取最常见的协议
    pub fn most_common_protocol(&self) -> Option<ProtocolId> {
        self.protocol_counts
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(protocol, _)| *protocol)
    }

    fn merge(&mut self, tally: &Tally) {
        self.packets_dispatched += 1;
        self.matcher_invocations += tally.invoked as u64;
        self.exclusions += tally.excluded as u64;
        self.abstentions += tally.abstained as u64;
        self.rejections += tally.rejected as u64;
        if let Some(protocol) = tally.confirmed {
            self.confirmations += 1;
            *self.protocol_counts.entry(protocol).or_insert(0) += 1;
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    invoked: usize,
    excluded: usize,
    abstained: usize,
    rejected: usize,
    confirmed: Option<ProtocolId>,
}

/// 调度引擎
///
/// 持有构建完成的协议表；表在引擎生命周期内只读，
/// 因此 `&DispatchEngine` 可以在多个线程间共享，每条流各自独占 `&mut FlowState`。
#[derive(Debug)]
pub struct DispatchEngine {
    registry: ProtocolRegistry,
    config: EngineConfig,
    stats: RwLock<DispatchStats>,
}

impl DispatchEngine {
    /// 用构建完成的注册表创建引擎
    pub fn new(registry: ProtocolRegistry, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        if registry.is_empty() {
            return Err(ClassifierError::config_error("no matcher registered"));
        }
        Ok(Self {
            registry,
            config,
            stats: RwLock::new(DispatchStats::new()),
        })
    }

    /// 协议表
    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// 引擎配置
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 统计快照
    pub fn stats(&self) -> Result<DispatchStats> {
        self.stats
            .read()
            .map_err(|_| ClassifierError::internal_error("Failed to read dispatch stats"))
            .map(|stats| stats.clone())
    }

    /// 当前数据包上仍然合格的匹配器（按注册顺序）
    pub fn eligible_matchers<'e>(
        &'e self,
        flow: &FlowState,
        packet: &PacketView<'_>,
    ) -> Vec<&'e RegisteredMatcher> {
        let bits = packet.selection_bits();
        self.registry
            .entries()
            .iter()
            .filter(|entry| !flow.is_excluded(entry.protocol()))
            .filter(|entry| entry.selection().accepts(bits))
            .collect()
    }

    /// 仍可能在该流上运行且未被排除的协议
    ///
    /// 选择条件与流的 IP版本、传输层不相交的匹配器不计入。
    pub fn remaining_candidates(&self, flow: &FlowState) -> ProtocolBitmask {
        let flow_bits = flow.selection_bits();
        ProtocolBitmask::from_protocols(
            self.registry
                .entries()
                .iter()
                .filter(|entry| entry.selection().matches_flow(flow_bits))
                .map(|entry| entry.protocol())
                .filter(|protocol| !flow.is_excluded(*protocol)),
        )
    }

    fn is_exhausted(&self, flow: &FlowState) -> bool {
        let detection = self.registry.detection_bitmask();
        if !detection.is_empty() && flow.excluded().is_superset(&detection) {
            return true;
        }
        self.remaining_candidates(flow).is_empty()
    }

    /// 调度一个数据包
    pub fn process_packet(&self, flow: &mut FlowState, packet: &PacketView<'_>) -> DispatchOutcome {
        if let Some(classification) = flow.detected() {
            return DispatchOutcome::AlreadyClassified(classification.clone());
        }
        if flow.packets_seen() >= self.config.max_packets_per_flow {
            return DispatchOutcome::GaveUp;
        }
        flow.record_packet(packet.payload_len());

        if self.is_exhausted(flow) {
            return DispatchOutcome::Exhausted;
        }

        let mut tally = Tally::default();
        let mut outcome = None;
        for entry in self.eligible_matchers(flow, packet) {
            let decision = entry.matcher().evaluate(&self.config, flow, packet);
            tally.invoked += 1;
            let fallback = entry.unconfigured().resolve(&self.config);

            match apply_decision(flow, entry.protocol(), decision, fallback) {
                Applied::Confirmed(classification) => {
                    if self.config.log_decisions {
                        dissector_info!(
                            "[{}] {} confirmed {}",
                            self.config.instance_id,
                            entry.name(),
                            classification
                        );
                    }
                    tally.confirmed = Some(classification.protocol);
                    outcome = Some(DispatchOutcome::Classified(classification));
                    break;
                }
                Applied::Excluded => {
                    if self.config.log_decisions {
                        dissector_trace!("[{}] {} excluded", self.config.instance_id, entry.name());
                    }
                    tally.excluded += 1;
                }
                Applied::Abstained => tally.abstained += 1,
                Applied::Rejected => {
                    dissector_warn!(
                        "[{}] {} confirmed an excluded protocol, ignored",
                        self.config.instance_id,
                        entry.name()
                    );
                    tally.rejected += 1;
                }
            }
        }

        let outcome = outcome.unwrap_or_else(|| {
            if self.is_exhausted(flow) {
                DispatchOutcome::Exhausted
            } else {
                DispatchOutcome::Pending {
                    invoked: tally.invoked,
                    abstained: tally.abstained,
                }
            }
        });

        if let Ok(mut stats) = self.stats.write() {
            stats.merge(&tally);
            if flow.packets_seen() >= self.config.max_packets_per_flow && !outcome.is_final() {
                stats.flows_given_up += 1;
            }
        }
        outcome
    }

    /// 依次调度一组数据包，遇到终态即停止，返回最后一次的结果
    pub fn process_flow<'p, I>(&self, flow: &mut FlowState, packets: I) -> Option<DispatchOutcome>
    where
        I: IntoIterator<Item = PacketView<'p>>,
    {
        let mut last = None;
        for packet in packets {
            let outcome = self.process_packet(flow, &packet);
            let done = outcome.is_final();
            last = Some(outcome);
            if done {
                break;
            }
        }
        last
    }
}
