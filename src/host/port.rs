//! 主机端口
//!
//! RDMA 主机侧的发送调度与接收处理：严格控制包优先、IRN 重传
//! 轮询、新数据轮询、DCQCN 速率控制与 PFC 暂停门控。

use std::collections::{HashMap, VecDeque};

use super::config::{CcMode, HostPortConfig, RtxMode};
use super::events::{DcqcnAlphaTimer, DcqcnDecTimer, DcqcnIncTimer, IrnTimeout, PfcHostAutoResume};
use crate::error::ConfigError;
use crate::net::{
    CONTROL_PKT_BYTES, Ecn, LinkId, Network, NodeId, Packet, PacketBody, PfcKind, PortWake,
    QbbFlag, QbbHeader, max_payload_bytes,
};
use crate::rdma::{FlowKey, RxQueuePair, TxIrnState, TxQueuePair};
use crate::sim::{SimTime, Simulator, TimerHandle};
use tracing::{debug, error, info, trace, warn};

/// 主机端口统计。
#[derive(Debug, Default, Clone, Copy)]
pub struct HostStats {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub irn_rtx_bytes: u64,
    pub irn_rtx_rx_bytes: u64,
    pub tx_completed_flows: u32,
    pub acked_completed_flows: u32,
    pub rx_completed_flows: u32,
}

/// 主机节点：一个上行端口。
#[derive(Debug)]
pub struct HostNode {
    id: NodeId,
    name: String,
    pub port: HostPort,
}

impl HostNode {
    pub fn new(id: NodeId, name: impl Into<String>, port: HostPort) -> Self {
        Self {
            id,
            name: name.into(),
            port,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attach_uplink(&mut self, link: LinkId, bandwidth_bps: u64) {
        self.port.attach_uplink(link, bandwidth_bps);
    }

    /// 注册一条发送流。
    pub fn add_flow(
        &mut self,
        key: FlowKey,
        priority: u32,
        size_bytes: u64,
        start_time: SimTime,
        sim: &mut Simulator,
    ) -> Result<(), ConfigError> {
        let id = self.id;
        self.port
            .add_tx_queue_pair(id, key, priority, size_bytes, start_time, sim)
    }

    /// 预告一条接收流的期望大小（接收端队列对按首包惰性创建）。
    pub fn expect_flow(&mut self, key: FlowKey, size_bytes: u64) {
        self.port.register_rx_size(key, size_bytes);
    }

    pub fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        let id = self.id;
        self.port.receive(id, pkt, sim, net);
    }

    pub fn on_wake(&mut self, sim: &mut Simulator, net: &mut Network) {
        let id = self.id;
        self.port.try_transmit(id, sim, net);
    }
}

/// 主机端口状态。
#[derive(Debug)]
pub struct HostPort {
    config: HostPortConfig,
    uplink: Option<LinkId>,
    line_rate_bps: u64,
    /// 每个优先级的暂停状态，索引 n_priorities 是控制队列
    paused: Vec<bool>,
    /// 暂停自动恢复定时器，与 paused 同索引
    pause_timers: Vec<TimerHandle>,
    control_queue: VecDeque<Packet>,
    tx_qps: Vec<TxQueuePair>,
    /// 四元组哈希 → tx_qps 下标
    tx_table: HashMap<u64, usize>,
    /// 每条流待重传的序列号队列
    rtx_queues: Vec<VecDeque<u32>>,
    rtx_queuing_cnt: usize,
    /// 轮询游标：上次服务的流下标
    last_qp_index: usize,
    rx_qps: HashMap<u64, RxQueuePair>,
    /// 预先登记的接收流大小
    rx_sizes: HashMap<u64, u64>,
    /// DCQCN 空闲时挂起的唤醒
    next_wake: TimerHandle,
    pub stats: HostStats,
}

impl HostPort {
    pub fn new(config: HostPortConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = (config.n_priorities + 1) as usize;
        Ok(Self {
            config,
            uplink: None,
            line_rate_bps: 0,
            paused: vec![false; n],
            pause_timers: vec![TimerHandle::expired(); n],
            control_queue: VecDeque::new(),
            tx_qps: Vec::new(),
            tx_table: HashMap::new(),
            rtx_queues: Vec::new(),
            rtx_queuing_cnt: 0,
            last_qp_index: 0,
            rx_qps: HashMap::new(),
            rx_sizes: HashMap::new(),
            next_wake: TimerHandle::expired(),
            stats: HostStats::default(),
        })
    }

    pub fn config(&self) -> &HostPortConfig {
        &self.config
    }

    fn control_index(&self) -> usize {
        self.config.n_priorities as usize
    }

    pub fn is_paused(&self, priority: u32) -> bool {
        self.paused[priority as usize]
    }

    pub fn tx_queue_pair(&self, index: usize) -> Option<&TxQueuePair> {
        self.tx_qps.get(index)
    }

    pub fn tx_queue_pairs(&self) -> &[TxQueuePair] {
        &self.tx_qps
    }

    pub fn rx_queue_pair(&self, key: &FlowKey) -> Option<&RxQueuePair> {
        self.rx_qps.get(&key.hash())
    }

    pub(crate) fn attach_uplink(&mut self, link: LinkId, bandwidth_bps: u64) {
        self.uplink = Some(link);
        self.line_rate_bps = bandwidth_bps;
    }

    pub fn register_rx_size(&mut self, key: FlowKey, size_bytes: u64) {
        self.rx_sizes.insert(key.hash(), size_bytes);
    }

    /// 登记一条发送流并在其开始时刻调度首次发送。
    pub fn add_tx_queue_pair(
        &mut self,
        node: NodeId,
        key: FlowKey,
        priority: u32,
        size_bytes: u64,
        start_time: SimTime,
        sim: &mut Simulator,
    ) -> Result<(), ConfigError> {
        if priority >= self.config.n_priorities {
            return Err(ConfigError::PriorityOutOfRange {
                index: priority,
                max: self.config.n_priorities - 1,
            });
        }
        let mut qp = TxQueuePair::new(key, priority, start_time, size_bytes);
        if self.config.cc_mode == CcMode::Dcqcn {
            qp.setup_rate(self.line_rate_bps, self.line_rate_bps);
        }
        self.tx_qps.push(qp);
        self.tx_table.insert(key.hash(), self.tx_qps.len() - 1);
        self.rtx_queues.push(VecDeque::new());

        sim.schedule(
            start_time,
            PortWake {
                node,
                port: 0,
                handle: None,
            },
        );
        info!(?key, priority, size_bytes, ?start_time, "📝 登记发送流");
        Ok(())
    }

    /*
     * 发送
     */

    /// 链路空闲时选一个包发出，并在序列化完成时刻调度下一次唤醒。
    pub fn try_transmit(&mut self, node: NodeId, sim: &mut Simulator, net: &mut Network) {
        let Some(link) = self.uplink else {
            return;
        };
        // 链路忙：序列化完成时已有唤醒在途
        if net.link(link).busy_until > sim.now() {
            return;
        }
        if let Some(pkt) = self.pick_packet(node, sim, net) {
            let depart = net.transmit_on(link, pkt, sim);
            sim.schedule(
                depart,
                PortWake {
                    node,
                    port: 0,
                    handle: None,
                },
            );
        } else if self.config.cc_mode == CcMode::Dcqcn {
            self.schedule_rate_wake(node, sim);
        }
    }

    /// 发送调度：控制包 → IRN 重传轮询 → 新数据轮询。
    fn pick_packet(
        &mut self,
        node: NodeId,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Option<Packet> {
        let now = sim.now();

        // 控制包：除非控制优先级本身被暂停
        if (!self.paused[self.control_index()] || !self.config.pfc_enabled)
            && !self.control_queue.is_empty()
        {
            let pkt = self.control_queue.pop_front().expect("non-empty");
            self.stats.tx_bytes += pkt.size_bytes as u64;
            trace!(pkt_id = pkt.id, "发出控制包");
            return Some(pkt);
        }

        // IRN 重传
        if self.config.rtx_mode == RtxMode::Irn && self.rtx_queuing_cnt > 0 {
            let flow_cnt = self.tx_qps.len();
            for i in 0..flow_cnt {
                let qidx = (self.last_qp_index + i + 1) % flow_cnt;
                if self.rtx_queues[qidx].is_empty() {
                    continue;
                }
                let seq = *self.rtx_queues[qidx].front().expect("non-empty");
                let state = self.tx_qps[qidx].irn.state(seq);

                if self.config.cc_mode == CcMode::Dcqcn && self.tx_qps[qidx].next_avail > now {
                    continue;
                }

                self.rtx_queues[qidx].pop_front();
                self.rtx_queuing_cnt -= 1;

                if matches!(state, TxIrnState::Nack | TxIrnState::Unack) {
                    self.last_qp_index = qidx;
                    self.arm_irn_timer(node, qidx, seq, sim);
                    let payload = match self.tx_qps[qidx].irn.payload_bytes(seq) {
                        Ok(p) => p,
                        Err(e) => {
                            error!(%e, "重传序号越界");
                            debug_assert!(false, "{e}");
                            continue;
                        }
                    };
                    let pkt = self.regen_data(qidx, seq, payload, net);
                    if self.config.cc_mode == CcMode::Dcqcn {
                        self.update_next_avail(qidx, SimTime::ZERO, pkt.size_bytes, now);
                    }
                    self.stats.tx_bytes += pkt.size_bytes as u64;
                    self.stats.irn_rtx_bytes += pkt.size_bytes as u64;
                    debug!(seq, qp = qidx, "🔁 重传数据包");
                    return Some(pkt);
                } else if self.config.cc_mode == CcMode::Dcqcn
                    && self.tx_qps[qidx].next_avail <= now
                {
                    // 已被后续确认解决的表项：白耗一次配额，避免
                    // next_avail 落在过去导致饿转
                    self.update_next_avail(qidx, SimTime(1), 0, now);
                }
            }
        }

        // 新数据
        let flow_cnt = self.tx_qps.len();
        for i in 0..flow_cnt {
            let qidx = (self.last_qp_index + i + 1) % flow_cnt;
            let qp = &self.tx_qps[qidx];
            if self.config.pfc_enabled && self.paused[qp.priority as usize] {
                continue;
            }
            if qp.is_tx_finished() {
                continue;
            }
            if qp.start_time > now {
                continue;
            }
            if self.config.rtx_mode == RtxMode::Irn
                && qp.irn.window_size() >= self.config.irn.max_bitmap_size
            {
                continue;
            }
            if self.config.cc_mode == CcMode::Dcqcn && qp.next_avail > now {
                continue;
            }

            self.last_qp_index = qidx;
            let (pkt, seq) = self.gen_data(qidx, net);
            if self.tx_qps[qidx].is_tx_finished() && !self.tx_qps[qidx].tx_finish_reported {
                self.tx_qps[qidx].tx_finish_reported = true;
                self.stats.tx_completed_flows += 1;
                info!(key = ?self.tx_qps[qidx].key, "✅ 流发送完成（确认可能未齐）");
            }
            if self.config.rtx_mode == RtxMode::Irn {
                self.arm_irn_timer(node, qidx, seq, sim);
            }
            if self.config.cc_mode == CcMode::Dcqcn {
                self.update_next_avail(qidx, SimTime::ZERO, pkt.size_bytes, now);
            }
            self.stats.tx_bytes += pkt.size_bytes as u64;
            return Some(pkt);
        }

        None
    }

    /// 无包可发时，在最早的速率限制器可用时刻调度一次唤醒。
    fn schedule_rate_wake(&mut self, node: NodeId, sim: &mut Simulator) {
        let now = sim.now();
        let mut min_avail = SimTime::MAX;
        for qp in &self.tx_qps {
            if self.config.rtx_mode != RtxMode::Irn && qp.is_tx_finished() {
                continue;
            }
            if self.config.rtx_mode == RtxMode::Irn && qp.is_acked_finished() {
                continue;
            }
            min_avail = min_avail.min(qp.next_avail);
        }
        if min_avail < SimTime::MAX && min_avail > now {
            // 取代（并取消）上一个挂起的唤醒
            self.next_wake.cancel();
            let delay = SimTime(min_avail.0 - now.0);
            self.next_wake = sim.schedule_timer(delay, |handle| PortWake {
                node,
                port: 0,
                handle: Some(handle),
            });
            trace!(?min_avail, "调度速率限制唤醒");
        }
    }

    fn gen_data(&mut self, qidx: usize, net: &mut Network) -> (Packet, u32) {
        let max_payload = max_payload_bytes(self.config.mtu_bytes) as u64;
        let id = net.next_packet_id();
        let qp = &mut self.tx_qps[qidx];
        let payload = qp.remain_bytes().min(max_payload) as u32;
        let seq = if self.config.rtx_mode == RtxMode::Irn {
            qp.irn.send_new_packet(payload)
        } else {
            0
        };
        let qbb = QbbHeader {
            src_port: qp.key.src_port,
            dst_port: qp.key.dst_port,
            seq: qp.tx_bytes as u32,
            irn_ack: seq,
            irn_nack: 0,
            flag: QbbFlag::None,
            cnp: false,
        };
        let pkt = Packet {
            id,
            src: qp.key.src,
            dst: qp.key.dst,
            size_bytes: payload + CONTROL_PKT_BYTES,
            priority: qp.priority,
            ecn: Ecn::Ect0,
            body: PacketBody::Data(qbb),
        };
        qp.tx_bytes += payload as u64;
        (pkt, seq)
    }

    fn regen_data(&mut self, qidx: usize, seq: u32, payload: u32, net: &mut Network) -> Packet {
        let id = net.next_packet_id();
        let qp = &self.tx_qps[qidx];
        let qbb = QbbHeader {
            src_port: qp.key.src_port,
            dst_port: qp.key.dst_port,
            seq: 0,
            irn_ack: seq,
            irn_nack: 0,
            flag: QbbFlag::None,
            cnp: false,
        };
        Packet {
            id,
            src: qp.key.src,
            dst: qp.key.dst,
            size_bytes: payload + CONTROL_PKT_BYTES,
            priority: qp.priority,
            ecn: Ecn::Ect0,
            body: PacketBody::Data(qbb),
        }
    }

    fn gen_ack(
        &self,
        data_key: FlowKey,
        received_bytes: u64,
        irn_ack: u32,
        cnp: bool,
        net: &mut Network,
    ) -> Packet {
        let rev = data_key.swapped();
        Packet {
            id: net.next_packet_id(),
            src: rev.src,
            dst: rev.dst,
            size_bytes: CONTROL_PKT_BYTES,
            priority: self.config.n_priorities,
            ecn: Ecn::NotEct,
            body: PacketBody::Data(QbbHeader {
                src_port: rev.src_port,
                dst_port: rev.dst_port,
                seq: received_bytes as u32,
                irn_ack,
                irn_nack: 0,
                flag: QbbFlag::Ack,
                cnp,
            }),
        }
    }

    fn gen_sack(
        &self,
        data_key: FlowKey,
        received_bytes: u64,
        irn_ack: u32,
        irn_nack: u32,
        cnp: bool,
        net: &mut Network,
    ) -> Packet {
        let mut pkt = self.gen_ack(data_key, received_bytes, irn_ack, cnp, net);
        if let PacketBody::Data(qbb) = &mut pkt.body {
            qbb.irn_nack = irn_nack;
            qbb.flag = QbbFlag::Sack;
        }
        pkt
    }

    /*
     * IRN 定时器
     */

    /// 按窗口占用选择 RTO 并武装该序号的重传定时器。
    fn arm_irn_timer(&mut self, node: NodeId, qidx: usize, seq: u32, sim: &mut Simulator) {
        let win = self.tx_qps[qidx].irn.window_size();
        let delay = if win <= self.config.irn.rto_low_threshold {
            self.config.irn.rto_low
        } else {
            self.config.irn.rto_high
        };
        let handle = sim.schedule_timer(delay, |handle| IrnTimeout {
            node,
            qp: qidx,
            seq,
            handle,
        });
        if let Err(e) = self.tx_qps[qidx].irn.set_rtx_timer(seq, handle) {
            error!(%e, "武装重传定时器失败");
            debug_assert!(false, "{e}");
        }
    }

    /// 重传超时触发：槽位仍未解决则重新排队。
    pub(crate) fn on_irn_timeout(
        &mut self,
        node: NodeId,
        qp: usize,
        seq: u32,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let state = self.tx_qps[qp].irn.state(seq);
        if matches!(state, TxIrnState::Nack | TxIrnState::Unack) {
            debug!(qp, seq, "⏰ 重传超时，重新排队");
            self.rtx_queues[qp].push_back(seq);
            self.rtx_queuing_cnt += 1;
            self.try_transmit(node, sim, net);
        }
    }

    /*
     * 接收
     */

    pub fn receive(&mut self, node: NodeId, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        self.stats.rx_bytes += pkt.size_bytes as u64;
        match pkt.body {
            PacketBody::Pfc(frame) => {
                if !self.config.pfc_enabled {
                    return;
                }
                self.receive_pfc(node, frame.kind, frame.priority, frame.quanta, sim, net);
            }
            PacketBody::Data(qbb) => match qbb.flag {
                QbbFlag::None => self.receive_data(node, &pkt, qbb, sim, net),
                QbbFlag::Ack => self.receive_ack(node, &pkt, qbb, sim, net),
                QbbFlag::Sack => self.receive_sack(node, &pkt, qbb, sim, net),
            },
        }
    }

    fn receive_pfc(
        &mut self,
        node: NodeId,
        kind: PfcKind,
        priority: u32,
        quanta: u16,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let idx = (priority as usize).min(self.control_index());
        // 任何新的 Pause/Resume 都取代旧的自动恢复定时器
        self.pause_timers[idx].cancel();
        match kind {
            PfcKind::Pause if quanta > 0 => {
                self.paused[idx] = true;
                let quantum = self
                    .uplink
                    .map(|l| net.link(l).pause_quantum())
                    .unwrap_or(SimTime::ZERO);
                let dur = SimTime(quantum.0.saturating_mul(quanta as u64));
                debug!(priority = idx, quanta, ?dur, "⏸️ 收到 Pause");
                self.pause_timers[idx] = sim.schedule_timer(dur, |handle| PfcHostAutoResume {
                    node,
                    priority: idx as u32,
                    handle,
                });
            }
            // 零时长的 Pause 是显式 Resume
            PfcKind::Pause | PfcKind::Resume => {
                debug!(priority = idx, "▶️ 收到 Resume");
                self.paused[idx] = false;
                self.try_transmit(node, sim, net);
            }
        }
    }

    /// 自动恢复定时器到期。
    pub(crate) fn on_pfc_auto_resume(
        &mut self,
        node: NodeId,
        priority: u32,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        debug!(priority, "⏲️ Pause 到期，自动恢复");
        self.paused[priority as usize] = false;
        self.try_transmit(node, sim, net);
    }

    fn receive_data(
        &mut self,
        node: NodeId,
        pkt: &Packet,
        qbb: QbbHeader,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let key = FlowKey::new(pkt.src, pkt.dst, qbb.src_port, qbb.dst_port);
        let hash = key.hash();
        let payload = pkt.payload_bytes() as u64;
        let is_ce = pkt.ecn.is_ce();

        if !self.rx_qps.contains_key(&hash) {
            let size = match self.rx_sizes.get(&hash) {
                Some(&s) => s,
                None => {
                    warn!(?key, "收到未登记流的数据包，按无界流接收");
                    u64::MAX
                }
            };
            self.rx_qps
                .insert(hash, RxQueuePair::new(key, pkt.priority, size));
        }

        enum Reply {
            Ack { irn_ack: u32 },
            Sack { irn_ack: u32, irn_nack: u32 },
            None,
        }

        let (reply, delivered, received_bytes, finished) = {
            let qp = self.rx_qps.get_mut(&hash).expect("inserted above");
            let was_finished = qp.is_finished();
            match self.config.rtx_mode {
                RtxMode::None => {
                    qp.received_bytes += payload;
                    (
                        Reply::None,
                        payload,
                        qp.received_bytes,
                        !was_finished && qp.is_finished(),
                    )
                }
                RtxMode::Irn => {
                    let expected = qp.irn.next_sequence_number();
                    let seq = qbb.irn_ack;
                    if seq < expected {
                        // 窗口内：重传或补洞
                        if !qp.irn.is_received(seq) {
                            qp.received_bytes += payload;
                            qp.irn.update(seq);
                            (
                                Reply::Ack { irn_ack: seq },
                                payload,
                                qp.received_bytes,
                                !was_finished && qp.is_finished(),
                            )
                        } else {
                            // 重复包：单独统计，不计入有效字节
                            qp.rtx_rx_bytes += payload;
                            self.stats.irn_rtx_rx_bytes += payload;
                            (Reply::Ack { irn_ack: seq }, 0, qp.received_bytes, false)
                        }
                    } else if seq == expected {
                        qp.received_bytes += payload;
                        qp.irn.update(seq);
                        (
                            Reply::Ack { irn_ack: seq },
                            payload,
                            qp.received_bytes,
                            !was_finished && qp.is_finished(),
                        )
                    } else {
                        // 乱序：补 NACK 空洞并报告 SACK
                        qp.received_bytes += payload;
                        qp.irn.update(seq);
                        (
                            Reply::Sack {
                                irn_ack: seq,
                                irn_nack: expected,
                            },
                            payload,
                            qp.received_bytes,
                            !was_finished && qp.is_finished(),
                        )
                    }
                }
            }
        };

        if delivered > 0 {
            net.on_delivered(delivered as u32);
        }
        if finished {
            self.stats.rx_completed_flows += 1;
            info!(?key, "🎉 流接收完成");
        }

        match reply {
            Reply::Ack { irn_ack } => {
                let ack = self.gen_ack(key, received_bytes, irn_ack, is_ce, net);
                self.control_queue.push_back(ack);
                self.try_transmit(node, sim, net);
            }
            Reply::Sack { irn_ack, irn_nack } => {
                let sack = self.gen_sack(key, received_bytes, irn_ack, irn_nack, is_ce, net);
                self.control_queue.push_back(sack);
                self.try_transmit(node, sim, net);
            }
            Reply::None => {}
        }
    }

    /// 以发送端视角查发送流表：ACK/SACK 的四元组方向与数据相反。
    fn lookup_tx(&self, pkt: &Packet, qbb: &QbbHeader) -> Option<usize> {
        let key = FlowKey::new(pkt.src, pkt.dst, qbb.src_port, qbb.dst_port);
        self.tx_table.get(&key.swapped().hash()).copied()
    }

    fn receive_ack(
        &mut self,
        node: NodeId,
        pkt: &Packet,
        qbb: QbbHeader,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        if self.config.rtx_mode != RtxMode::Irn {
            return;
        }
        let Some(idx) = self.lookup_tx(pkt, &qbb) else {
            warn!(pkt_id = pkt.id, "收到未知流的 ACK");
            return;
        };
        let was_finished = self.tx_qps[idx].is_acked_finished();
        if let Err(e) = self.tx_qps[idx].irn.ack(qbb.irn_ack) {
            error!(%e, "ACK 处理失败");
            debug_assert!(false, "{e}");
            return;
        }
        let qp = &mut self.tx_qps[idx];
        if self.config.cc_mode == CcMode::Dcqcn && qp.is_acked_finished() {
            qp.dcqcn.cleanup_timers();
            if !was_finished {
                self.stats.acked_completed_flows += 1;
                info!(key = ?self.tx_qps[idx].key, "🏁 流全部确认完成");
            }
        } else if self.config.cc_mode == CcMode::Dcqcn && qbb.cnp {
            self.dcqcn_cnp_received(node, idx, sim);
        }
        // 位图推进可能放开发送窗口
        self.try_transmit(node, sim, net);
    }

    fn receive_sack(
        &mut self,
        node: NodeId,
        pkt: &Packet,
        qbb: QbbHeader,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        if self.config.rtx_mode != RtxMode::Irn {
            return;
        }
        let Some(idx) = self.lookup_tx(pkt, &qbb) else {
            warn!(pkt_id = pkt.id, "收到未知流的 SACK");
            return;
        };
        if let Err(e) = self.tx_qps[idx].irn.sack(qbb.irn_ack, qbb.irn_nack) {
            error!(%e, "SACK 处理失败");
            debug_assert!(false, "{e}");
            return;
        }
        for seq in qbb.irn_nack..qbb.irn_ack {
            self.rtx_queues[idx].push_back(seq);
            self.rtx_queuing_cnt += 1;
        }
        if self.config.cc_mode == CcMode::Dcqcn && qbb.cnp && !self.tx_qps[idx].is_acked_finished()
        {
            self.dcqcn_cnp_received(node, idx, sim);
        }
        self.try_transmit(node, sim, net);
    }

    /*
     * DCQCN
     */

    fn update_next_avail(&mut self, qidx: usize, gap: SimTime, size_bytes: u32, now: SimTime) {
        let qp = &mut self.tx_qps[qidx];
        let rate = if self.config.dcqcn.is_rate_bound {
            qp.rate_bps
        } else {
            qp.max_rate_bps
        };
        let sending = gap.saturating_add(SimTime::for_bytes_at(size_bytes as u64, rate));
        qp.next_avail = now.saturating_add(sending);
    }

    /// 收到拥塞通知。首个通知立即把速率降到线速的配置比例并启动
    /// alpha 与降速定时器。
    fn dcqcn_cnp_received(&mut self, node: NodeId, qidx: usize, sim: &mut Simulator) {
        let qp = &mut self.tx_qps[qidx];
        qp.dcqcn.alpha_cnp_arrived = true;
        qp.dcqcn.decrease_cnp_arrived = true;
        if qp.dcqcn.first_cnp {
            qp.dcqcn.alpha = 1.0;
            qp.dcqcn.alpha_cnp_arrived = false;
            let new_rate =
                (self.config.dcqcn.rate_frac_on_first_cnp * qp.rate_bps as f64) as u64;
            qp.dcqcn.target_rate_bps = new_rate;
            qp.rate_bps = new_rate;
            qp.dcqcn.first_cnp = false;
            debug!(qp = qidx, new_rate, "🐢 首个拥塞通知，立即降速");
            self.dcqcn_schedule_update_alpha(node, qidx, sim);
            // 降速定时器晚 1ns，保证 alpha 先更新
            self.dcqcn_schedule_dec_rate(node, qidx, SimTime(1), sim);
        }
    }

    fn dcqcn_schedule_update_alpha(&mut self, node: NodeId, qidx: usize, sim: &mut Simulator) {
        let handle = sim.schedule_timer(self.config.dcqcn.alpha_resume_interval, |handle| {
            DcqcnAlphaTimer {
                node,
                qp: qidx,
                handle,
            }
        });
        let qp = &mut self.tx_qps[qidx];
        qp.dcqcn.alpha_timer.cancel();
        qp.dcqcn.alpha_timer = handle;
    }

    pub(crate) fn on_dcqcn_alpha_timer(&mut self, node: NodeId, qidx: usize, sim: &mut Simulator) {
        let g = self.config.dcqcn.g;
        let qp = &mut self.tx_qps[qidx];
        qp.dcqcn.alpha = if qp.dcqcn.alpha_cnp_arrived {
            (1.0 - g) * qp.dcqcn.alpha + g
        } else {
            (1.0 - g) * qp.dcqcn.alpha
        };
        qp.dcqcn.alpha_cnp_arrived = false;
        self.dcqcn_schedule_update_alpha(node, qidx, sim);
    }

    fn dcqcn_schedule_dec_rate(
        &mut self,
        node: NodeId,
        qidx: usize,
        delta: SimTime,
        sim: &mut Simulator,
    ) {
        let delay = self.config.dcqcn.dec_rate_interval.saturating_add(delta);
        let handle = sim.schedule_timer(delay, |handle| DcqcnDecTimer {
            node,
            qp: qidx,
            handle,
        });
        let qp = &mut self.tx_qps[qidx];
        qp.dcqcn.decrease_timer.cancel();
        qp.dcqcn.decrease_timer = handle;
    }

    pub(crate) fn on_dcqcn_dec_timer(&mut self, node: NodeId, qidx: usize, sim: &mut Simulator) {
        // 无论是否降速都继续周期检查
        self.dcqcn_schedule_dec_rate(node, qidx, SimTime::ZERO, sim);
        let cfg = &self.config.dcqcn;
        let min_rate = cfg.min_rate_bps;
        let clamp = cfg.clamp_target_rate;
        let qp = &mut self.tx_qps[qidx];
        if !qp.dcqcn.decrease_cnp_arrived {
            return;
        }
        if clamp || qp.dcqcn.rp_time_stage != 0 {
            qp.dcqcn.target_rate_bps = qp.rate_bps;
        }
        qp.rate_bps = min_rate.max((qp.rate_bps as f64 * (1.0 - qp.dcqcn.alpha / 2.0)) as u64);
        qp.dcqcn.rp_time_stage = 0;
        qp.dcqcn.decrease_cnp_arrived = false;
        debug!(qp = qidx, rate = qp.rate_bps, "📉 DCQCN 降速");
        // 重启增速定时器
        qp.dcqcn.increase_timer.cancel();
        let handle = sim.schedule_timer(self.config.dcqcn.inc_rate_interval, |handle| {
            DcqcnIncTimer {
                node,
                qp: qidx,
                handle,
            }
        });
        self.tx_qps[qidx].dcqcn.increase_timer = handle;
    }

    pub(crate) fn on_dcqcn_inc_timer(&mut self, node: NodeId, qidx: usize, sim: &mut Simulator) {
        // 先重新调度下一周期
        let handle = sim.schedule_timer(self.config.dcqcn.inc_rate_interval, |handle| {
            DcqcnIncTimer {
                node,
                qp: qidx,
                handle,
            }
        });
        self.tx_qps[qidx].dcqcn.increase_timer = handle;

        let rai = self.config.dcqcn.rai_bps;
        let rhai = self.config.dcqcn.rhai_bps;
        let fast_rec = self.config.dcqcn.fast_recovery_times;
        let qp = &mut self.tx_qps[qidx];
        let stage = qp.dcqcn.rp_time_stage;
        if stage < fast_rec {
            // 快速恢复：向目标速率折半逼近
        } else if stage == fast_rec {
            // 加性增
            qp.dcqcn.target_rate_bps = (qp.dcqcn.target_rate_bps + rai).min(qp.max_rate_bps);
        } else {
            // 超增
            qp.dcqcn.target_rate_bps = (qp.dcqcn.target_rate_bps + rhai).min(qp.max_rate_bps);
        }
        qp.rate_bps = qp.rate_bps / 2 + qp.dcqcn.target_rate_bps / 2;
        qp.dcqcn.rp_time_stage += 1;
        trace!(qp = qidx, rate = qp.rate_bps, stage, "📈 DCQCN 增速");
    }
}
