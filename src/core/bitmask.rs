//! 位掩码模块
//!
//! 协议集合位掩码（用于排除集合与聚合检测集合）以及匹配器的选择条件位掩码。
//! 两者都是 `Copy` 值类型，随流状态复制，不存在共享可变全局标志。

use crate::core::protocol::ProtocolId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};

const WORD_BITS: usize = 64;
const WORDS: usize = 4;

/// 协议集合位掩码
///
/// 固定宽度（256 位），按 `ProtocolId` 数值置位。
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolBitmask {
    words: [u64; WORDS],
}

impl ProtocolBitmask {
    /// 可容纳的协议数
    pub const CAPACITY: usize = WORD_BITS * WORDS;

    /// 空集合
    pub const fn empty() -> Self {
        Self { words: [0; WORDS] }
    }

    /// 由协议列表构建
    pub fn from_protocols<I: IntoIterator<Item = ProtocolId>>(protocols: I) -> Self {
        let mut mask = Self::empty();
        for protocol in protocols {
            mask.add(protocol);
        }
        mask
    }

    fn locate(protocol: ProtocolId) -> (usize, u64) {
        let bit = protocol.id() as usize;
        (bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
    }

    /// 加入协议，返回此前是否不在集合中
    pub fn add(&mut self, protocol: ProtocolId) -> bool {
        let (word, bit) = Self::locate(protocol);
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }

    /// 移除协议
    pub fn remove(&mut self, protocol: ProtocolId) {
        let (word, bit) = Self::locate(protocol);
        self.words[word] &= !bit;
    }

    /// 成员判断
    pub fn contains(&self, protocol: ProtocolId) -> bool {
        let (word, bit) = Self::locate(protocol);
        self.words[word] & bit != 0
    }

    /// 并集
    pub fn union(&self, other: &Self) -> Self {
        let mut words = self.words;
        for (w, o) in words.iter_mut().zip(other.words.iter()) {
            *w |= *o;
        }
        Self { words }
    }

    /// 交集
    pub fn intersection(&self, other: &Self) -> Self {
        let mut words = self.words;
        for (w, o) in words.iter_mut().zip(other.words.iter()) {
            *w &= *o;
        }
        Self { words }
    }

    /// 检查 `other` 是否是本集合的子集
    pub fn is_superset(&self, other: &Self) -> bool {
        self.intersection(other) == *other
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// 集合大小
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// 遍历集合中的协议（按数值升序）
    pub fn iter(&self) -> impl Iterator<Item = ProtocolId> + '_ {
        ProtocolId::all().into_iter().filter(move |p| self.contains(*p))
    }
}

impl BitOr for ProtocolBitmask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(&rhs)
    }
}

impl BitAnd for ProtocolBitmask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(&rhs)
    }
}

impl fmt::Debug for ProtocolBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// 匹配器选择条件位掩码
///
/// 描述匹配器可以运行的 (IP版本 × 传输层) 组合以及载荷限定条件。
/// 一个数据包被映射成一个恰好带有其自身属性的位掩码，
/// 与匹配器的选择条件逐组检查（见 [`SelectionBitmask::accepts`]）。
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionBitmask(u32);

impl SelectionBitmask {
    /// IPv4
    pub const IPV4: Self = Self(1 << 0);
    /// IPv6
    pub const IPV6: Self = Self(1 << 1);
    /// TCP
    pub const TCP: Self = Self(1 << 2);
    /// UDP
    pub const UDP: Self = Self(1 << 3);
    /// 要求载荷非空
    pub const PAYLOAD: Self = Self(1 << 4);
    /// 排除TCP重传
    pub const NO_RETRANSMISSION: Self = Self(1 << 5);

    /// IPv4 或 IPv6 上的 UDP
    pub const V4_V6_UDP: Self = Self(Self::IPV4.0 | Self::IPV6.0 | Self::UDP.0);
    /// IPv4 或 IPv6 上的 TCP
    pub const V4_V6_TCP: Self = Self(Self::IPV4.0 | Self::IPV6.0 | Self::TCP.0);
    /// IPv4 或 IPv6 上的 TCP 或 UDP
    pub const V4_V6_TCP_OR_UDP: Self = Self(Self::V4_V6_TCP.0 | Self::UDP.0);
    /// IPv4 或 IPv6 上带载荷的 UDP
    pub const V4_V6_UDP_WITH_PAYLOAD: Self = Self(Self::V4_V6_UDP.0 | Self::PAYLOAD.0);
    /// IPv4 或 IPv6 上带载荷、非重传的 TCP
    pub const V4_V6_TCP_WITH_PAYLOAD_NO_RETRANSMISSION: Self =
        Self(Self::V4_V6_TCP.0 | Self::PAYLOAD.0 | Self::NO_RETRANSMISSION.0);

    const IP_BITS: u32 = Self::IPV4.0 | Self::IPV6.0;
    const TRANSPORT_BITS: u32 = Self::TCP.0 | Self::UDP.0;

    /// 空位掩码
    pub const fn empty() -> Self {
        Self(0)
    }

    /// 原始位
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// 由原始位构建，丢弃未定义的位
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0x3f)
    }

    /// 是否包含全部指定位
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// 是否存在公共位
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// 并集
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// 交集
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// 是否为空
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 检查本选择条件是否接受由数据包属性构成的位掩码 `packet`
    ///
    /// IP版本组、传输层组各自需要有交集；限定位（载荷、非重传）
    /// 是要求，只有数据包同时具备时才接受。
    pub const fn accepts(self, packet: Self) -> bool {
        let ip_ok = self.0 & Self::IP_BITS & packet.0 != 0;
        let transport_ok = self.0 & Self::TRANSPORT_BITS & packet.0 != 0;
        let required = self.0 & !(Self::IP_BITS | Self::TRANSPORT_BITS);
        ip_ok && transport_ok && packet.0 & required == required
    }

    /// 只比较 IP版本组和传输层组
    ///
    /// 流的 IP版本和传输层在其生命周期内不变，这里为假的匹配器永远不会在该流上运行。
    pub const fn matches_flow(self, flow: Self) -> bool {
        self.0 & Self::IP_BITS & flow.0 != 0 && self.0 & Self::TRANSPORT_BITS & flow.0 != 0
    }

    /// 是否至少含有一个IP版本位和一个传输层位
    pub const fn is_satisfiable(self) -> bool {
        self.0 & Self::IP_BITS != 0 && self.0 & Self::TRANSPORT_BITS != 0
    }
}

impl BitOr for SelectionBitmask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for SelectionBitmask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl fmt::Debug for SelectionBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::IPV4, "IPV4"),
            (Self::IPV6, "IPV6"),
            (Self::TCP, "TCP"),
            (Self::UDP, "UDP"),
            (Self::PAYLOAD, "PAYLOAD"),
            (Self::NO_RETRANSMISSION, "NO_RETRANSMISSION"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "SelectionBitmask({})", set.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_bitmask_membership() {
        let mut mask = ProtocolBitmask::empty();
        assert!(mask.is_empty());
        assert!(mask.add(ProtocolId::CipIo));
        assert!(!mask.add(ProtocolId::CipIo));
        assert!(mask.contains(ProtocolId::CipIo));
        assert!(!mask.contains(ProtocolId::Enip));
        assert_eq!(mask.len(), 1);

        mask.remove(ProtocolId::CipIo);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_protocol_bitmask_set_ops() {
        let a = ProtocolBitmask::from_protocols([ProtocolId::CipIo, ProtocolId::Enip]);
        let b = ProtocolBitmask::from_protocols([ProtocolId::Enip, ProtocolId::Modbus]);

        let both = a & b;
        assert_eq!(both.iter().collect::<Vec<_>>(), vec![ProtocolId::Enip]);
        assert_eq!((a | b).len(), 3);
        assert!((a | b).is_superset(&a));
        assert!(!a.is_superset(&b));
    }

    #[test]
    fn test_selection_accepts_udp_only() {
        let packet_v4_udp = SelectionBitmask::IPV4 | SelectionBitmask::UDP;
        let packet_v6_tcp = SelectionBitmask::IPV6 | SelectionBitmask::TCP;

        assert!(SelectionBitmask::V4_V6_UDP.accepts(packet_v4_udp));
        assert!(!SelectionBitmask::V4_V6_UDP.accepts(packet_v6_tcp));
        assert!(SelectionBitmask::V4_V6_TCP_OR_UDP.accepts(packet_v6_tcp));
    }

    #[test]
    fn test_selection_qualifiers_are_requirements() {
        let bare = SelectionBitmask::IPV4 | SelectionBitmask::TCP;
        let with_payload = bare | SelectionBitmask::PAYLOAD | SelectionBitmask::NO_RETRANSMISSION;

        let selection = SelectionBitmask::V4_V6_TCP_WITH_PAYLOAD_NO_RETRANSMISSION;
        assert!(!selection.accepts(bare));
        assert!(selection.accepts(with_payload));
        // 无限定位的选择条件也接受带载荷的数据包
        assert!(SelectionBitmask::V4_V6_TCP.accepts(with_payload));
    }

    #[test]
    fn test_selection_satisfiable_and_flow_match() {
        assert!(SelectionBitmask::V4_V6_UDP.is_satisfiable());
        assert!(!SelectionBitmask::PAYLOAD.is_satisfiable());
        assert!(!(SelectionBitmask::IPV4 | SelectionBitmask::PAYLOAD).is_satisfiable());
        assert!(!SelectionBitmask::UDP.is_satisfiable());

        let udp_flow = SelectionBitmask::IPV4 | SelectionBitmask::UDP;
        let enip = SelectionBitmask::V4_V6_TCP_WITH_PAYLOAD_NO_RETRANSMISSION;
        assert!(!enip.matches_flow(udp_flow));
        // 限定位不影响流级别的判断
        assert!(enip.matches_flow(SelectionBitmask::IPV6 | SelectionBitmask::TCP));
    }

    #[test]
    fn test_selection_debug() {
        let text = format!("{:?}", SelectionBitmask::V4_V6_UDP);
        assert_eq!(text, "SelectionBitmask(IPV4 | IPV6 | UDP)");
    }
}
