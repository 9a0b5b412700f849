//! 交换机缓冲管理模块
//!
//! MMU：缓冲准入、headroom/共享池记账、PFC 阈值与 ECN 标记判定。

mod ecn;
#[allow(clippy::module_inception)]
mod mmu;
mod queue;

pub use ecn::EcnConfig;
pub use mmu::{MmuConfig, SwitchMmu};
pub use queue::MmuQueue;
