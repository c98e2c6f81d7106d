//! 核心抽象模块
//!
//! 包含协议标识、位掩码、流状态、匹配器接口、注册表和调度引擎。

pub mod bitmask;
pub mod engine;
pub mod flow;
pub mod matcher;
pub mod packet;
pub mod protocol;
pub mod registry;

pub use bitmask::{ProtocolBitmask, SelectionBitmask};
pub use engine::{DispatchEngine, DispatchOutcome, DispatchStats, EngineConfig};
pub use flow::FlowState;
pub use matcher::{apply_decision, Applied, Decision, FnMatcher, MatcherFn, ProtocolMatcher};
pub use packet::{IpVersion, Packet, PacketView, TransportHeader, TransportKind};
pub use protocol::{Classification, ConfidenceLevel, ProtocolId};
pub use registry::{
    BitmaskParticipation, MatcherRegistration, ProtocolRegistry, RegisteredMatcher,
    UnconfiguredPolicy,
};
