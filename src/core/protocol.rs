//! 协议定义模块
//!
//! 定义应用层协议标识、置信度等级以及确认后的分类结果。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 应用层协议标识
///
/// 数值固定，作为协议位掩码中的位序号使用，新增协议只能追加在末尾。
/// `Modbus` 到 `OpcUa` 是预留编号，本库不带内置匹配器，
/// 供 `EngineBuilder::add_custom_matcher` 注册的外部匹配器使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ProtocolId {
    /// 未知协议，同时用作“未知子协议”占位
    Unknown = 0,
    /// EtherNet/IP 封装层（TCP 44818）
    Enip = 1,
    /// CIP I/O 隐式报文（UDP 2222）
    CipIo = 2,
    /// Modbus/TCP
    Modbus = 3,
    /// DNP3
    Dnp3 = 4,
    /// IEC 60870-5-104
    Iec60870 = 5,
    /// Siemens S7comm
    S7Comm = 6,
    /// BACnet/IP
    Bacnet = 7,
    /// PROFINET IO
    ProfinetIo = 8,
    /// OPC UA 二进制
    OpcUa = 9,
}

impl ProtocolId {
    /// 最大协议数值（不含）
    pub const COUNT: usize = 10;

    /// 协议的数值标识
    pub fn id(self) -> u16 {
        self as u16
    }

    /// 由数值还原协议标识
    pub fn from_id(id: u16) -> Option<Self> {
        Self::all().into_iter().find(|p| p.id() == id)
    }

    /// 协议短名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Enip => "EthernetIP",
            Self::CipIo => "CIPIO",
            Self::Modbus => "Modbus",
            Self::Dnp3 => "DNP3",
            Self::Iec60870 => "IEC60870",
            Self::S7Comm => "S7Comm",
            Self::Bacnet => "BACnet",
            Self::ProfinetIo => "PROFINET_IO",
            Self::OpcUa => "OPC-UA",
        }
    }

    /// 是否为未知占位
    pub fn is_unknown(self) -> bool {
        self == Self::Unknown
    }

    /// 获取所有协议标识（含 Unknown）
    pub fn all() -> Vec<ProtocolId> {
        vec![
            Self::Unknown,
            Self::Enip,
            Self::CipIo,
            Self::Modbus,
            Self::Dnp3,
            Self::Iec60870,
            Self::S7Comm,
            Self::Bacnet,
            Self::ProfinetIo,
            Self::OpcUa,
        ]
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 置信度等级
///
/// 有序：越靠后越可信。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    /// 未知
    Unknown,
    /// 仅凭端口猜测
    MatchByPort,
    /// 仅凭IP地址猜测
    MatchByIp,
    /// 部分深度包检测
    DpiPartial,
    /// 来自缓存的深度包检测结果
    DpiCache,
    /// 深度包检测
    Dpi,
}

impl ConfidenceLevel {
    /// 是否由载荷检测得出
    pub fn is_dpi(self) -> bool {
        matches!(self, Self::DpiPartial | Self::DpiCache | Self::Dpi)
    }
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::MatchByPort => write!(f, "Match by port"),
            Self::MatchByIp => write!(f, "Match by IP"),
            Self::DpiPartial => write!(f, "DPI (partial)"),
            Self::DpiCache => write!(f, "DPI (cache)"),
            Self::Dpi => write!(f, "DPI"),
        }
    }
}

/// 流的最终分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// 确认的协议
    pub protocol: ProtocolId,
    /// 子协议，未细分时为 Unknown
    pub sub_protocol: ProtocolId,
    /// 置信度
    pub confidence: ConfidenceLevel,
    /// 确认时间
    pub detected_at: DateTime<Utc>,
}

impl Classification {
    /// 创建新的分类结果
    pub fn new(protocol: ProtocolId, sub_protocol: ProtocolId, confidence: ConfidenceLevel) -> Self {
        Self {
            protocol,
            sub_protocol,
            confidence,
            detected_at: Utc::now(),
        }
    }

    /// 检查置信度是否达到阈值
    pub fn is_confident(&self, threshold: ConfidenceLevel) -> bool {
        self.confidence >= threshold
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub_protocol.is_unknown() {
            write!(f, "{} [{}]", self.protocol, self.confidence)
        } else {
            write!(f, "{}.{} [{}]", self.protocol, self.sub_protocol, self.confidence)
        }
    }
}
