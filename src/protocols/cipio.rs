//! CIP I/O 匹配器
//!
//! EtherNet/IP 隐式（I/O）报文走 UDP 2222，一个报文至少包含一个 6 字节的数据项。
//! 单个数据包即可判定，不会弃权。

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

/// CIP I/O 知名端口
pub const CIPIO_PORT: u16 = 2222;

/// CIP I/O 最小载荷长度
pub const CIPIO_MIN_PAYLOAD_LEN: usize = 6;

/// 注册名
pub const CIPIO_NAME: &str = "CIPIO";

/// CIP I/O 匹配器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipIoMatcher {
    port: u16,
    min_payload_len: usize,
}

impl Default for CipIoMatcher {
    fn default() -> Self {
        Self {
            port: CIPIO_PORT,
            min_payload_len: CIPIO_MIN_PAYLOAD_LEN,
        }
    }
}

impl CipIoMatcher {
    /// 使用知名端口和最小长度创建匹配器
    pub fn new() -> Self {
        Self::default()
    }

    /// 目的端口
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 最小载荷长度
    pub fn min_payload_len(&self) -> usize {
        self.min_payload_len
    }
}

impl ProtocolMatcher for CipIoMatcher {
    fn name(&self) -> &str {
        CIPIO_NAME
    }

    fn protocol(&self) -> ProtocolId {
        ProtocolId::CipIo
    }

    fn evaluate(&self, _config: &EngineConfig, _flow: &FlowState, packet: &PacketView<'_>) -> Decision {
        dissector_debug!("search CIPIO");

        if packet.transport_kind() != TransportKind::Udp {
            return Decision::Exclude;
        }
        if packet.dst_port() != Some(self.port) {
            return Decision::Exclude;
        }
        if packet.payload_len() < self.min_payload_len {
            return Decision::Exclude;
        }

        dissector_info!("found CIPIO");
        Decision::confirm(ProtocolId::CipIo, ConfidenceLevel::Dpi)
    }
}

/// 将 CIP I/O 匹配器注册到协议表
pub fn init_cipio(registry: &mut ProtocolRegistry, next_id: &mut u32) -> Result<u32> {
    registry.register(
        next_id,
        MatcherRegistration::new(Arc::new(CipIoMatcher::new()))
            .with_selection(SelectionBitmask::V4_V6_UDP)
            .with_unconfigured(UnconfiguredPolicy::SaveAsUnknown)
            .with_participation(BitmaskParticipation::AddToDetectionBitmask),
    )
}
