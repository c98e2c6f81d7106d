//! 协议匹配器模块
//!
//! 每个协议一个子模块，提供匹配器实现和对应的 `init_*` 注册函数。

#[cfg(feature = "cipio")]
pub mod cipio;
#[cfg(feature = "enip")]
pub mod enip;

#[cfg(feature = "cipio")]
pub use cipio::{init_cipio, CipIoMatcher, CIPIO_MIN_PAYLOAD_LEN, CIPIO_PORT};
#[cfg(feature = "enip")]
pub use enip::{init_enip, EnipMatcher, ENIP_COMMANDS, ENIP_MIN_PAYLOAD_LEN};

use crate::core::registry::ProtocolRegistry;
use crate::error::Result;

/// 按固定顺序注册所有已编译的匹配器
#[allow(unused_variables)]
pub fn init_all(registry: &mut ProtocolRegistry, next_id: &mut u32) -> Result<()> {
    #[cfg(feature = "enip")]
    init_enip(registry, next_id)?;
    #[cfg(feature = "cipio")]
    init_cipio(registry, next_id)?;
    Ok(())
}
