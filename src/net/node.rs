//! 节点类型
//!
//! 网络节点是一个封闭集合：主机（RDMA 发送/接收端）与交换机
//! （MMU + PFC 端口）。用枚举而不是运行时名字查找做分发。

use super::id::{LinkId, NodeId};
use super::network::Network;
use super::packet::Packet;
use crate::host::HostNode;
use crate::sim::Simulator;
use crate::switch::SwitchNode;

/// 网络节点。
#[derive(Debug)]
pub enum NodeKind {
    Host(HostNode),
    Switch(SwitchNode),
}

impl NodeKind {
    pub fn id(&self) -> NodeId {
        match self {
            NodeKind::Host(h) => h.id(),
            NodeKind::Switch(s) => s.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeKind::Host(h) => h.name(),
            NodeKind::Switch(s) => s.name(),
        }
    }

    /// 处理到达的数据包。`via` 为承载链路（用于交换机还原入端口）。
    pub fn on_packet(
        &mut self,
        pkt: Packet,
        via: Option<LinkId>,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        match self {
            NodeKind::Host(h) => h.on_packet(pkt, sim, net),
            NodeKind::Switch(s) => s.on_packet(pkt, via, sim, net),
        }
    }

    /// 唤醒一个发送端口（主机只有端口 0）。
    pub fn on_wake(&mut self, port: usize, sim: &mut Simulator, net: &mut Network) {
        match self {
            NodeKind::Host(h) => h.on_wake(sim, net),
            NodeKind::Switch(s) => s.on_wake(port, sim, net),
        }
    }
}
