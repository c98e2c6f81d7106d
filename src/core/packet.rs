//! 数据包视图模块
//!
//! 由上游流层整理好的单个数据包：IP版本、传输层头部字段和应用层载荷。
//! 匹配器只能读取 [`PacketView`]。

use crate::core::bitmask::SelectionBitmask;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IP版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpVersion {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

/// 传输层类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// TCP
    Tcp,
    /// UDP
    Udp,
    /// 其他IP协议号
    Other(u8),
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
            Self::Other(proto) => write!(f, "IP/{}", proto),
        }
    }
}

/// 传输层头部
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportHeader {
    /// TCP头部字段
    Tcp {
        /// 源端口
        src_port: u16,
        /// 目的端口
        dst_port: u16,
        /// 标志位
        flags: u8,
        /// 是否为重传
        retransmission: bool,
    },
    /// UDP头部字段
    Udp {
        /// 源端口
        src_port: u16,
        /// 目的端口
        dst_port: u16,
    },
    /// 无端口概念的其他协议
    Other(u8),
}

impl TransportHeader {
    /// 传输层类型
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Tcp { .. } => TransportKind::Tcp,
            Self::Udp { .. } => TransportKind::Udp,
            Self::Other(proto) => TransportKind::Other(*proto),
        }
    }

    /// 源端口
    pub fn src_port(&self) -> Option<u16> {
        match self {
            Self::Tcp { src_port, .. } | Self::Udp { src_port, .. } => Some(*src_port),
            Self::Other(_) => None,
        }
    }

    /// 目的端口
    pub fn dst_port(&self) -> Option<u16> {
        match self {
            Self::Tcp { dst_port, .. } | Self::Udp { dst_port, .. } => Some(*dst_port),
            Self::Other(_) => None,
        }
    }
}

/// 当前数据包的只读视图，仅在一次匹配器调用期间有效
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'a> {
    /// IP版本
    pub ip_version: IpVersion,
    /// 传输层头部
    pub transport: TransportHeader,
    /// 应用层载荷
    pub payload: &'a [u8],
}

impl<'a> PacketView<'a> {
    /// 创建UDP数据包视图
    pub fn udp(ip_version: IpVersion, src_port: u16, dst_port: u16, payload: &'a [u8]) -> Self {
        Self {
            ip_version,
            transport: TransportHeader::Udp { src_port, dst_port },
            payload,
        }
    }

    /// 创建TCP数据包视图
    pub fn tcp(ip_version: IpVersion, src_port: u16, dst_port: u16, payload: &'a [u8]) -> Self {
        Self {
            ip_version,
            transport: TransportHeader::Tcp {
                src_port,
                dst_port,
                flags: 0,
                retransmission: false,
            },
            payload,
        }
    }

    /// 传输层类型
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// 目的端口
    pub fn dst_port(&self) -> Option<u16> {
        self.transport.dst_port()
    }

    /// 载荷长度
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// 数据包自身属性构成的位掩码，供选择条件过滤
    pub fn selection_bits(&self) -> SelectionBitmask {
        let mut bits = match self.ip_version {
            IpVersion::V4 => SelectionBitmask::IPV4,
            IpVersion::V6 => SelectionBitmask::IPV6,
        };
        match self.transport {
            TransportHeader::Tcp { retransmission, .. } => {
                bits = bits | SelectionBitmask::TCP;
                if !retransmission {
                    bits = bits | SelectionBitmask::NO_RETRANSMISSION;
                }
            }
            TransportHeader::Udp { .. } => {
                bits = bits | SelectionBitmask::UDP | SelectionBitmask::NO_RETRANSMISSION;
            }
            TransportHeader::Other(_) => {}
        }
        if !self.payload.is_empty() {
            bits = bits | SelectionBitmask::PAYLOAD;
        }
        bits
    }
}

/// 持有载荷的数据包，供上游组件缓存后再生成视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// IP版本
    pub ip_version: IpVersion,
    /// 传输层头部
    pub transport: TransportHeader,
    /// 应用层载荷
    pub payload: Bytes,
}

impl Packet {
    /// 创建新的数据包
    pub fn new(ip_version: IpVersion, transport: TransportHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            ip_version,
            transport,
            payload: payload.into(),
        }
    }

    /// 借出只读视图
    pub fn view(&self) -> PacketView<'_> {
        PacketView {
            ip_version: self.ip_version,
            transport: self.transport,
            payload: &self.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_selection_bits() {
        let view = PacketView::udp(IpVersion::V6, 5000, 2222, b"abcdef");
        let bits = view.selection_bits();
        assert!(bits.contains(SelectionBitmask::IPV6 | SelectionBitmask::UDP));
        assert!(bits.contains(SelectionBitmask::PAYLOAD));
        assert!(!bits.intersects(SelectionBitmask::TCP | SelectionBitmask::IPV4));
    }

    #[test]
    fn test_tcp_retransmission_bits() {
        let payload = Bytes::from_static(b"\x00\x65\x00\x04");
        let packet = Packet::new(
            IpVersion::V4,
            TransportHeader::Tcp {
                src_port: 50000,
                dst_port: 44818,
                flags: 0x18,
                retransmission: true,
            },
            payload,
        );
        let bits = packet.view().selection_bits();
        assert!(bits.contains(SelectionBitmask::TCP | SelectionBitmask::PAYLOAD));
        assert!(!bits.contains(SelectionBitmask::NO_RETRANSMISSION));
        assert_eq!(packet.view().dst_port(), Some(44818));
    }

    #[test]
    fn test_other_transport_has_no_ports() {
        let view = PacketView {
            ip_version: IpVersion::V4,
            transport: TransportHeader::Other(47),
            payload: &[],
        };
        assert_eq!(view.dst_port(), None);
        assert_eq!(view.transport_kind().to_string(), "IP/47");
    }
}
