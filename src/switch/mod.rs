//! 交换机模块
//!
//! 出端口队列、PFC 暂停门控与 MMU 驱动的转发管线。

mod events;
mod port;
#[allow(clippy::module_inception)]
mod switch;

pub use switch::SwitchNode;
pub use events::PfcSwitchAutoResume;
pub use port::{QueuedPacket, SwitchPort};
