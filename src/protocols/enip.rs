//! EtherNet/IP 封装层匹配器
//!
//! TCP 载荷前两个字节（大端）是封装命令码，只接受已定义的十个命令。
//! 选择条件要求载荷且排除重传，握手和纯 ACK 段不会送到这里；
//! 直接调用时空载荷按长度不足排除。

use crate::core::bitmask::SelectionBitmask;
use crate::core::engine::EngineConfig;
use crate::core::flow::FlowState;
use crate::core::matcher::{Decision, ProtocolMatcher};
use crate::core::packet::{PacketView, TransportKind};
use crate::core::protocol::{ConfidenceLevel, ProtocolId};
use crate::core::registry::{
    BitmaskParticipation, MatcherRegistration, ProtocolRegistry, UnconfiguredPolicy,
};
use crate::error::Result;
use crate::{dissector_debug, dissector_info};
use std::sync::Arc;

/// 注册名
pub const ENIP_NAME: &str = "EthernetIP";

/// 最小载荷长度：至少包含命令码
pub const ENIP_MIN_PAYLOAD_LEN: usize = 4;

/// 封装命令码
pub mod command {
    /// NOP
    pub const NOP: u16 = 0x0000;
    /// ListServices
    pub const LIST_SERVICES: u16 = 0x0004;
    /// ListIdentity
    pub const LIST_IDENTITY: u16 = 0x0063;
    /// ListInterfaces
    pub const LIST_INTERFACES: u16 = 0x0064;
    /// RegisterSession
    pub const REGISTER_SESSION: u16 = 0x0065;
    /// UnRegisterSession
    pub const UNREGISTER_SESSION: u16 = 0x0066;
    /// SendRRData
    pub const SEND_RR_DATA: u16 = 0x006F;
    /// SendUnitData
    pub const SEND_UNIT_DATA: u16 = 0x0070;
    /// IndicateStatus
    pub const INDICATE_STATUS: u16 = 0x0072;
    /// Cancel
    pub const CANCEL: u16 = 0x0073;
}

/// 全部合法命令码
pub const ENIP_COMMANDS: [u16; 10] = [
    command::NOP,
    command::LIST_SERVICES,
    command::LIST_IDENTITY,
    command::LIST_INTERFACES,
    command::REGISTER_SESSION,
    command::UNREGISTER_SESSION,
    command::SEND_RR_DATA,
    command::SEND_UNIT_DATA,
    command::INDICATE_STATUS,
    command::CANCEL,
];

/// EtherNet/IP 匹配器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnipMatcher;

impl EnipMatcher {
    /// 创建匹配器
    pub fn new() -> Self {
        Self
    }

    /// 读取命令码
    pub fn command(payload: &[u8]) -> Option<u16> {
        match payload {
            [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }
}

impl ProtocolMatcher for EnipMatcher {
    fn name(&self) -> &str {
        ENIP_NAME
    }

    fn protocol(&self) -> ProtocolId {
        ProtocolId::Enip
    }

    fn evaluate(&self, _config: &EngineConfig, _flow: &FlowState, packet: &PacketView<'_>) -> Decision {
        dissector_debug!("search ENIP");

        if packet.transport_kind() != TransportKind::Tcp {
            return Decision::Exclude;
        }
        if packet.payload_len() < ENIP_MIN_PAYLOAD_LEN {
            return Decision::Exclude;
        }

        match Self::command(packet.payload) {
            Some(cmd) if ENIP_COMMANDS.contains(&cmd) => {
                dissector_info!("found ENIP");
                Decision::confirm(ProtocolId::Enip, ConfidenceLevel::Dpi)
            }
            _ => Decision::Exclude,
        }
    }
}

/// 将 EtherNet/IP 匹配器注册到协议表
pub fn init_enip(registry: &mut ProtocolRegistry, next_id: &mut u32) -> Result<u32> {
    registry.register(
        next_id,
        MatcherRegistration::new(Arc::new(EnipMatcher::new()))
            .with_selection(SelectionBitmask::V4_V6_TCP_WITH_PAYLOAD_NO_RETRANSMISSION)
            .with_unconfigured(UnconfiguredPolicy::SaveAsUnknown)
            .with_participation(BitmaskParticipation::AddToDetectionBitmask),
    )
}
