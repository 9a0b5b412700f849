//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：节点、链路、数据包、路由与拓扑。

// 子模块声明
mod events;
mod id;
mod link;
mod net_world;
mod network;
mod node;
mod packet;
mod routing;
mod stats;

// 重新导出公共接口
pub use events::{DeliverPacket, PortWake};
pub use id::{LinkId, NodeId};
pub use link::Link;
pub use net_world::NetWorld;
pub use network::Network;
pub use node::NodeKind;
pub use packet::{
    CONTROL_PKT_BYTES, DEFAULT_MTU_BYTES, Ecn, ETH_IP_OVERHEAD_BYTES, PFC_FRAME_BYTES, PacketBody,
    Packet, PfcFrame, PfcKind, QBB_HEADER_BYTES, QbbFlag, QbbHeader, max_payload_bytes,
};
pub use routing::RoutingTable;
pub use stats::Stats;
