//! 交换机
//!
//! 入方向先问 MMU 准入，未获准入即丢弃并计数；获准后记账并在
//! 必要时向上游发 Pause。出队时释放记账、评估 ECN 标记并在必要
//! 时向上游发 Resume。

use std::collections::HashMap;

use super::events::PfcSwitchAutoResume;
use super::port::{QueuedPacket, SwitchPort};
use crate::mmu::SwitchMmu;
use crate::net::{
    LinkId, Network, NodeId, PFC_FRAME_BYTES, Packet, PacketBody, PfcFrame, PfcKind, PortWake,
    QbbHeader,
};
use crate::rdma::FlowKey;
use crate::sim::{SimTime, Simulator};
use tracing::{debug, trace, warn};

/// 交换机节点。
#[derive(Debug)]
pub struct SwitchNode {
    id: NodeId,
    name: String,
    pub mmu: SwitchMmu,
    ports: Vec<SwitchPort>,
    link_to_port: HashMap<LinkId, usize>,
}

impl SwitchNode {
    pub fn new(id: NodeId, name: impl Into<String>, mmu: SwitchMmu) -> Self {
        Self {
            id,
            name: name.into(),
            mmu,
            ports: Vec::new(),
            link_to_port: HashMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self, index: usize) -> &SwitchPort {
        &self.ports[index]
    }

    pub fn n_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn port_to(&self, peer: NodeId) -> Option<usize> {
        self.ports.iter().position(|p| p.peer == peer)
    }

    /// 注册一个出端口并在 MMU 中建立相应的记账条目。
    pub(crate) fn add_port(&mut self, link: LinkId, peer: NodeId) {
        let idx = self.mmu.add_port();
        debug_assert_eq!(idx, self.ports.len());
        self.ports
            .push(SwitchPort::new(link, peer, self.mmu.n_priorities()));
        self.link_to_port.insert(link, idx);
    }

    fn control_index(&self) -> usize {
        self.mmu.n_priorities() as usize
    }

    pub fn on_packet(
        &mut self,
        pkt: Packet,
        via: Option<LinkId>,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        // 入端口 = 朝向上一跳的端口（链路是单向的，按对端节点配对）
        let in_port = via
            .and_then(|l| self.port_to(net.link(l).from))
            .unwrap_or(0);
        self.ports[in_port].rx_bytes += pkt.size_bytes as u64;

        match pkt.body {
            PacketBody::Pfc(frame) => self.receive_pfc(in_port, frame, sim, net),
            PacketBody::Data(qbb) => self.forward_data(in_port, pkt, qbb, sim, net),
        }
    }

    /// 对端的 Pause/Resume 作用在收到帧的端口上。
    fn receive_pfc(
        &mut self,
        port: usize,
        frame: PfcFrame,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let idx = (frame.priority as usize).min(self.control_index());
        self.ports[port].pause_timers[idx].cancel();
        match frame.kind {
            PfcKind::Pause if frame.quanta > 0 => {
                self.ports[port].paused[idx] = true;
                let quantum = net.link(self.ports[port].link).pause_quantum();
                let dur = SimTime(quantum.0.saturating_mul(frame.quanta as u64));
                debug!(port, priority = idx, ?dur, "⏸️ 端口收到 Pause");
                let node = self.id;
                self.ports[port].pause_timers[idx] =
                    sim.schedule_timer(dur, |handle| PfcSwitchAutoResume {
                        node,
                        port,
                        priority: idx as u32,
                        handle,
                    });
            }
            PfcKind::Pause | PfcKind::Resume => {
                debug!(port, priority = idx, "▶️ 端口收到 Resume");
                self.ports[port].paused[idx] = false;
                self.try_transmit(port, sim, net);
            }
        }
    }

    pub(crate) fn on_pfc_auto_resume(
        &mut self,
        port: usize,
        priority: u32,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        debug!(port, priority, "⏲️ 端口 Pause 到期，自动恢复");
        self.ports[port].paused[priority as usize] = false;
        self.try_transmit(port, sim, net);
    }

    fn forward_data(
        &mut self,
        in_port: usize,
        pkt: Packet,
        qbb: QbbHeader,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        // 选路：按流哈希在等价最短路下一跳中确定性选取
        let flow_hash = FlowKey::new(pkt.src, pkt.dst, qbb.src_port, qbb.dst_port).hash();
        let Some(next_hop) = net.routing.pick_ecmp(self.id, pkt.dst, flow_hash) else {
            warn!(dst = ?pkt.dst, "无可用路由，丢弃数据包");
            return;
        };
        let Some(out_link) = net.link_between(self.id, next_hop) else {
            warn!(?next_hop, "下一跳无链路，丢弃数据包");
            return;
        };
        let out_port = self.link_to_port[&out_link];

        let qindex = (pkt.priority as usize).min(self.control_index());
        if qindex != self.control_index() {
            let size = pkt.size_bytes;
            let admitted = self
                .mmu
                .check_ingress_admission(in_port, pkt.priority, size)
                && self.mmu.check_egress_admission(out_port, pkt.priority, size);
            if !admitted {
                trace!(pkt_id = pkt.id, in_port, "🚫 准入被拒，丢弃");
                self.ports[in_port].ingress_drops += 1;
                net.stats.ingress_drops += 1;
                return;
            }
            self.mmu.update_ingress_admission(in_port, pkt.priority, size);
            self.mmu.update_egress_admission(out_port, pkt.priority, size);

            // 准入后评估是否需要向上游施压
            if self.mmu.check_should_send_pfc_pause(in_port, qindex as u32) {
                self.mmu.set_pause(in_port, qindex as u32);
                self.emit_pfc(in_port, PfcKind::Pause, qindex as u32, u16::MAX, sim, net);
            }
        }

        self.ports[out_port].enqueue(qindex, QueuedPacket { pkt, in_port });
        self.try_transmit(out_port, sim, net);
    }

    /// 向某端口的上游邻居发送 PFC 帧（入控制队列，即刻尝试发送）。
    fn emit_pfc(
        &mut self,
        port: usize,
        kind: PfcKind,
        priority: u32,
        quanta: u16,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        debug!(port, ?kind, priority, "📣 发送 PFC 帧");
        let pkt = Packet {
            id: net.next_packet_id(),
            src: self.id,
            dst: self.ports[port].peer,
            size_bytes: PFC_FRAME_BYTES,
            priority: self.mmu.control_priority(),
            ecn: Default::default(),
            body: PacketBody::Pfc(PfcFrame {
                kind,
                priority,
                quanta,
            }),
        };
        let ctrl = self.control_index();
        self.ports[port].enqueue(ctrl, QueuedPacket { pkt, in_port: port });
        self.try_transmit(port, sim, net);
    }

    pub fn on_wake(&mut self, port: usize, sim: &mut Simulator, net: &mut Network) {
        self.try_transmit(port, sim, net);
    }

    /// 链路空闲时出队一个包发出；出队伴随 MMU 释放、ECN 标记与
    /// 可能的 Resume。
    fn try_transmit(&mut self, port: usize, sim: &mut Simulator, net: &mut Network) {
        let link = self.ports[port].link;
        if net.link(link).busy_until > sim.now() {
            return;
        }
        let Some((queued, qindex)) = self.ports[port].dequeue() else {
            return;
        };
        let QueuedPacket { mut pkt, in_port } = queued;

        if qindex != self.control_index() {
            let size = pkt.size_bytes;
            self.mmu
                .remove_from_ingress_admission(in_port, qindex as u32, size);
            self.mmu
                .remove_from_egress_admission(port, qindex as u32, size);
            if self.mmu.check_should_set_ecn(port, qindex as u32) {
                trace!(pkt_id = pkt.id, port, "🟡 标记 ECN CE");
                pkt.ecn = crate::net::Ecn::Ce;
            }
            if self.mmu.check_should_send_pfc_resume(in_port, qindex as u32) {
                self.mmu.set_resume(in_port, qindex as u32);
                self.emit_pfc(in_port, PfcKind::Resume, qindex as u32, 0, sim, net);
            }
        }

        self.ports[port].tx_bytes += pkt.size_bytes as u64;
        let depart = net.transmit_on(link, pkt, sim);
        sim.schedule(
            depart,
            PortWake {
                node: self.id,
                port,
                handle: None,
            },
        );
    }
}
