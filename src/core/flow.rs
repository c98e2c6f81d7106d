//! 流状态模块
//!
//! 每条连接一个 [`FlowState`]，由调度引擎创建和回收。
//! 匹配结果只通过两个入口写入：一次性的 [`FlowState::set_detected`]
//! 和单调增长的 [`FlowState::mark_excluded`]。

use crate::core::bitmask::{ProtocolBitmask, SelectionBitmask};
use crate::core::packet::{IpVersion, PacketView, TransportKind};
use crate::core::protocol::{Classification, ProtocolId};
use serde::{Deserialize, Serialize};

/// 单条流的分类状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
    ip_version: IpVersion,
    transport: TransportKind,
    src_port: u16,
    dst_port: u16,
    packets_seen: u32,
    payload_bytes: u64,
    detected: Option<Classification>,
    excluded: ProtocolBitmask,
}

impl FlowState {
    /// 创建新的流状态
    pub fn new(ip_version: IpVersion, transport: TransportKind, src_port: u16, dst_port: u16) -> Self {
        Self {
            ip_version,
            transport,
            src_port,
            dst_port,
            packets_seen: 0,
            payload_bytes: 0,
            detected: None,
            excluded: ProtocolBitmask::empty(),
        }
    }

    /// 按首个数据包建立流状态
    pub fn from_packet(packet: &PacketView<'_>) -> Self {
        Self::new(
            packet.ip_version,
            packet.transport_kind(),
            packet.transport.src_port().unwrap_or(0),
            packet.transport.dst_port().unwrap_or(0),
        )
    }

    /// IP版本
    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    /// 传输层类型
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// 源端口
    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    /// 目的端口
    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    /// 已调度的数据包数
    pub fn packets_seen(&self) -> u32 {
        self.packets_seen
    }

    /// 累计载荷字节数
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    /// 已确认的分类
    pub fn detected(&self) -> Option<&Classification> {
        self.detected.as_ref()
    }

    /// 已确认的协议
    pub fn detected_protocol(&self) -> ProtocolId {
        self.detected
            .as_ref()
            .map_or(ProtocolId::Unknown, |c| c.protocol)
    }

    /// 是否已完成分类
    pub fn is_classified(&self) -> bool {
        self.detected.is_some()
    }

    /// 排除集合
    pub fn excluded(&self) -> ProtocolBitmask {
        self.excluded
    }

    /// 协议是否已被排除
    pub fn is_excluded(&self, protocol: ProtocolId) -> bool {
        self.excluded.contains(protocol)
    }

    /// 将协议永久排除，重复调用无副作用
    ///
    /// 已确认的协议不能再被排除。返回本次调用是否新增了排除项。
    pub fn mark_excluded(&mut self, protocol: ProtocolId) -> bool {
        if self.detected_protocol() == protocol && self.is_classified() {
            return false;
        }
        self.excluded.add(protocol)
    }

    /// 流自身的 IP版本和传输层位
    pub fn selection_bits(&self) -> SelectionBitmask {
        let ip = match self.ip_version {
            IpVersion::V4 => SelectionBitmask::IPV4,
            IpVersion::V6 => SelectionBitmask::IPV6,
        };
        match self.transport {
            TransportKind::Tcp => ip | SelectionBitmask::TCP,
            TransportKind::Udp => ip | SelectionBitmask::UDP,
            TransportKind::Other(_) => ip,
        }
    }

    /// 写入确认结果
    ///
    /// 每条流只能写入一次，且不接受已排除的协议；拒绝时返回 `false`，原结果不变。
    pub fn set_detected(&mut self, classification: Classification) -> bool {
        if self.detected.is_some() || self.excluded.contains(classification.protocol) {
            return false;
        }
        self.detected = Some(classification);
        true
    }

    /// 记录一个数据包
    pub(crate) fn record_packet(&mut self, payload_len: usize) {
        self.packets_seen = self.packets_seen.saturating_add(1);
        self.payload_bytes = self.payload_bytes.saturating_add(payload_len as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::ConfidenceLevel;

    fn udp_flow() -> FlowState {
        FlowState::new(IpVersion::V4, TransportKind::Udp, 40000, 2222)
    }

    #[test]
    fn test_mark_excluded_is_idempotent() {
        let mut flow = udp_flow();
        assert!(flow.mark_excluded(ProtocolId::Enip));
        assert!(!flow.mark_excluded(ProtocolId::Enip));
        assert!(flow.is_excluded(ProtocolId::Enip));
        assert_eq!(flow.excluded().len(), 1);
    }

    #[test]
    fn test_detected_written_once() {
        let mut flow = udp_flow();
        let first = Classification::new(ProtocolId::CipIo, ProtocolId::Unknown, ConfidenceLevel::Dpi);
        let second = Classification::new(ProtocolId::Modbus, ProtocolId::Unknown, ConfidenceLevel::Dpi);

        assert!(flow.set_detected(first));
        assert!(!flow.set_detected(second));
        assert_eq!(flow.detected_protocol(), ProtocolId::CipIo);
    }

    #[test]
    fn test_excluded_protocol_cannot_be_detected() {
        let mut flow = udp_flow();
        flow.mark_excluded(ProtocolId::CipIo);
        let c = Classification::new(ProtocolId::CipIo, ProtocolId::Unknown, ConfidenceLevel::Dpi);
        assert!(!flow.set_detected(c));
        assert!(!flow.is_classified());
    }

    #[test]
    fn test_detected_protocol_cannot_be_excluded() {
        let mut flow = udp_flow();
        let c = Classification::new(ProtocolId::CipIo, ProtocolId::Unknown, ConfidenceLevel::Dpi);
        assert!(flow.set_detected(c));

        assert!(!flow.mark_excluded(ProtocolId::CipIo));
        assert!(!flow.is_excluded(ProtocolId::CipIo));
        assert_eq!(flow.detected_protocol(), ProtocolId::CipIo);

        // 其他协议仍可排除
        assert!(flow.mark_excluded(ProtocolId::Enip));
    }

    #[test]
    fn test_flow_selection_bits() {
        let bits = udp_flow().selection_bits();
        assert_eq!(bits, SelectionBitmask::IPV4 | SelectionBitmask::UDP);
    }

    #[test]
    fn test_record_packet_accumulates() {
        let mut flow = udp_flow();
        flow.record_packet(10);
        flow.record_packet(0);
        assert_eq!(flow.packets_seen(), 2);
        assert_eq!(flow.payload_bytes(), 10);
    }
}
