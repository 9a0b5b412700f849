//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、数据包转发和统计信息。
//! 链路只做序列化/传播；所有排队与准入都在端口/MMU 层。

use std::collections::HashMap;

use super::events::DeliverPacket;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::node::NodeKind;
use super::packet::Packet;
use super::routing::RoutingTable;
use super::stats::Stats;
use crate::host::{HostNode, HostPort};
use crate::mmu::SwitchMmu;
use crate::sim::{SimTime, Simulator};
use crate::switch::SwitchNode;
use tracing::{debug, trace};

/// 网络拓扑
pub struct Network {
    nodes: Vec<Option<NodeKind>>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    pub routing: RoutingTable,
    next_pkt_id: u64,
    pub stats: Stats,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            edges: HashMap::new(),
            routing: RoutingTable::new(0),
            next_pkt_id: 0,
            stats: Stats::default(),
        }
    }
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>, port: HostPort) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Some(NodeKind::Host(HostNode::new(id, name, port))));
        id
    }

    /// 添加交换机节点
    pub fn add_switch(&mut self, name: impl Into<String>, mmu: SwitchMmu) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Some(NodeKind::Switch(SwitchNode::new(id, name, mmu))));
        id
    }

    /// 连接两个节点（创建单向链路）。
    ///
    /// 若 `from` 是交换机则同时注册一个出端口（及其 MMU 队列组）；
    /// 若 `from` 是主机则注册其上行链路与线速。
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, bandwidth_bps));
        self.edges.insert((from, to), id);
        self.routing.mark_dirty();

        match self.nodes[from.0].as_mut().expect("node exists") {
            NodeKind::Host(h) => h.attach_uplink(id, bandwidth_bps),
            NodeKind::Switch(s) => s.add_port(id, to),
        }
        id
    }

    /// 基于当前拓扑重建路由表（必须在所有 connect 之后调用）。
    pub fn build_routes(&mut self) {
        let n = self.nodes.len();
        let mut adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        let mut rev_adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for link in &self.links {
            adj[link.from.0].push(link.to);
            rev_adj[link.to.0].push(link.from);
        }
        self.routing.ensure_built(&adj, &rev_adj);
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.edges.get(&(from, to)).copied()
    }

    /// 分配数据包标识符。
    pub fn next_packet_id(&mut self) -> u64 {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        id
    }

    /// 将数据包交付给节点处理
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, to: NodeId, via: Option<LinkId>, pkt: Packet, sim: &mut Simulator) {
        debug!("📬 将数据包交付给节点处理");

        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let mut node = self.nodes[to.0].take().expect("node exists");
        node.on_packet(pkt, via, sim, self);
        self.nodes[to.0] = Some(node);
    }

    /// 唤醒节点的发送端口。
    pub fn wake_port(&mut self, id: NodeId, port: usize, sim: &mut Simulator) {
        let mut node = self.nodes[id.0].take().expect("node exists");
        node.on_wake(port, sim, self);
        self.nodes[id.0] = Some(node);
    }

    /// 沿链路发送数据包：占用序列化时间并调度到达事件。
    ///
    /// 返回序列化完成（depart）时刻，调用方据此调度下一次端口唤醒。
    /// 调用方是链路的唯一发送者，应只在链路空闲时调用。
    pub fn transmit_on(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) -> SimTime {
        let link = &mut self.links[link_id.0];
        let now = sim.now();
        let start = now.max(link.busy_until);
        let tx_time = link.tx_time(pkt.size_bytes);
        let depart = start.saturating_add(tx_time);
        link.busy_until = depart;
        let arrive = depart.saturating_add(link.latency);

        trace!(
            link_id = ?link_id,
            pkt_id = pkt.id,
            ?start,
            ?depart,
            ?arrive,
            "链路开始序列化发送"
        );

        sim.schedule(
            arrive,
            DeliverPacket {
                to: link.to,
                via: Some(link_id),
                pkt,
            },
        );
        depart
    }

    /// 把主机节点临时取出执行 `f`（定时器事件回调主机端口用）。
    pub fn with_host<F>(&mut self, id: NodeId, sim: &mut Simulator, f: F)
    where
        F: FnOnce(&mut HostNode, &mut Simulator, &mut Network),
    {
        let mut node = self.nodes[id.0].take().expect("node exists");
        if let NodeKind::Host(h) = &mut node {
            f(h, sim, self);
        }
        self.nodes[id.0] = Some(node);
    }

    /// 把交换机节点临时取出执行 `f`。
    pub fn with_switch<F>(&mut self, id: NodeId, sim: &mut Simulator, f: F)
    where
        F: FnOnce(&mut SwitchNode, &mut Simulator, &mut Network),
    {
        let mut node = self.nodes[id.0].take().expect("node exists");
        if let NodeKind::Switch(s) = &mut node {
            f(s, sim, self);
        }
        self.nodes[id.0] = Some(node);
    }

    /// 主机节点访问（测试与脚本用）。
    pub fn host(&self, id: NodeId) -> Option<&HostNode> {
        match self.nodes[id.0].as_ref() {
            Some(NodeKind::Host(h)) => Some(h),
            _ => None,
        }
    }

    pub fn host_mut(&mut self, id: NodeId) -> Option<&mut HostNode> {
        match self.nodes[id.0].as_mut() {
            Some(NodeKind::Host(h)) => Some(h),
            _ => None,
        }
    }

    /// 交换机节点访问（测试与脚本用）。
    pub fn switch(&self, id: NodeId) -> Option<&SwitchNode> {
        match self.nodes[id.0].as_ref() {
            Some(NodeKind::Switch(s)) => Some(s),
            _ => None,
        }
    }

    pub fn switch_mut(&mut self, id: NodeId) -> Option<&mut SwitchNode> {
        match self.nodes[id.0].as_mut() {
            Some(NodeKind::Switch(s)) => Some(s),
            _ => None,
        }
    }

    /// 数据包作为有效载荷被主机消费时的统计。
    pub(crate) fn on_delivered(&mut self, payload_bytes: u32) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += payload_bytes as u64;
    }
}
