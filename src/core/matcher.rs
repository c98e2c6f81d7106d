//! 匹配器接口模块
//!
//! 每个协议一个无状态匹配器：输入引擎配置、流状态和当前数据包，输出一个判定。
//! 判定对流状态的影响统一由 [`apply_decision`] 落地，匹配器本身不写任何状态。

use crate::core::engine::EngineConfig;
use crate::core::flow::FlowState;
use crate::core::packet::PacketView;
use crate::core::protocol::{Classification, ConfidenceLevel, ProtocolId};
use std::fmt;

/// 匹配器判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// 确认协议（终态，正向）
    Confirm {
        /// 确认的协议
        protocol: ProtocolId,
        /// 子协议
        sub_protocol: ProtocolId,
        /// 置信度，`None` 时按注册时的未配置策略补全
        confidence: Option<ConfidenceLevel>,
    },
    /// 排除自身协议（终态，负向）
    Exclude,
    /// 暂不判定，下一个数据包再调用
    Abstain,
}

impl Decision {
    /// 以指定置信度确认协议，子协议未知
    pub fn confirm(protocol: ProtocolId, confidence: ConfidenceLevel) -> Self {
        Self::Confirm {
            protocol,
            sub_protocol: ProtocolId::Unknown,
            confidence: Some(confidence),
        }
    }

    /// 确认协议但不给出置信度
    pub fn confirm_unconfigured(protocol: ProtocolId) -> Self {
        Self::Confirm {
            protocol,
            sub_protocol: ProtocolId::Unknown,
            confidence: None,
        }
    }

    /// 是否为终态判定
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Abstain)
    }

    /// 是否为确认
    pub fn is_confirm(&self) -> bool {
        matches!(self, Self::Confirm { .. })
    }
}

/// 协议匹配器接口
///
/// 实现必须是纯函数：不持有可变状态、不做I/O、不阻塞，
/// 因此同一个实例可以被多个线程在不同流上并发调用。
pub trait ProtocolMatcher: Send + Sync {
    /// 匹配器名称
    fn name(&self) -> &str;

    /// 负责的协议
    fn protocol(&self) -> ProtocolId;

    /// 对当前数据包作出判定
    fn evaluate(&self, config: &EngineConfig, flow: &FlowState, packet: &PacketView<'_>) -> Decision;
}

/// 函数形式的匹配器
pub type MatcherFn = fn(&EngineConfig, &FlowState, &PacketView<'_>) -> Decision;

/// 将普通函数包装成匹配器
#[derive(Clone)]
pub struct FnMatcher {
    name: &'static str,
    protocol: ProtocolId,
    func: MatcherFn,
}

impl FnMatcher {
    /// 创建函数匹配器
    pub fn new(name: &'static str, protocol: ProtocolId, func: MatcherFn) -> Self {
        Self {
            name,
            protocol,
            func,
        }
    }
}

impl fmt::Debug for FnMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMatcher")
            .field("name", &self.name)
            .field("protocol", &self.protocol)
            .finish()
    }
}

impl ProtocolMatcher for FnMatcher {
    fn name(&self) -> &str {
        self.name
    }

    fn protocol(&self) -> ProtocolId {
        self.protocol
    }

    fn evaluate(&self, config: &EngineConfig, flow: &FlowState, packet: &PacketView<'_>) -> Decision {
        (self.func)(config, flow, packet)
    }
}

/// 判定落地后的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// 流被确认为该分类
    Confirmed(Classification),
    /// 协议被加入排除集合
    Excluded,
    /// 暂未判定
    Abstained,
    /// 确认被拒绝：流已分类或目标协议已被排除
    Rejected,
}

/// 把判定写入流状态
///
/// `owner` 是作出判定的匹配器所负责的协议，排除时加入排除集合的就是它。
/// `fallback` 用于补全没有携带置信度的确认。
pub fn apply_decision(
    flow: &mut FlowState,
    owner: ProtocolId,
    decision: Decision,
    fallback: ConfidenceLevel,
) -> Applied {
    match decision {
        Decision::Confirm {
            protocol,
            sub_protocol,
            confidence,
        } => {
            let classification =
                Classification::new(protocol, sub_protocol, confidence.unwrap_or(fallback));
            if flow.set_detected(classification.clone()) {
                Applied::Confirmed(classification)
            } else {
                Applied::Rejected
            }
        }
        Decision::Exclude => {
            flow.mark_excluded(owner);
            Applied::Excluded
        }
        Decision::Abstain => Applied::Abstained,
    }
}
