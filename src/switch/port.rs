//! 交换机出端口
//!
//! 每优先级一条 FIFO 加一条控制队列；出队顺序：控制包优先
//! （除非控制优先级被暂停），数据队列轮询且从不服务被暂停的优先级。

use std::collections::VecDeque;

use crate::net::{LinkId, NodeId, Packet};
use crate::sim::TimerHandle;

/// 排队的数据包及其入端口（出队时据此释放 MMU 入方向记账）。
#[derive(Debug)]
pub struct QueuedPacket {
    pub pkt: Packet,
    pub in_port: usize,
}

/// 交换机的一个出端口。
#[derive(Debug)]
pub struct SwitchPort {
    pub link: LinkId,
    pub peer: NodeId,
    n_priorities: u32,
    queues: Vec<VecDeque<QueuedPacket>>,
    pub(crate) paused: Vec<bool>,
    pub(crate) pause_timers: Vec<TimerHandle>,
    in_queue_pkts: usize,
    in_queue_bytes: u64,
    in_queue_pkts_list: Vec<usize>,
    in_queue_bytes_list: Vec<u64>,
    /// 轮询游标：上次服务的数据队列
    last_queue_idx: usize,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub ingress_drops: u64,
}

impl SwitchPort {
    pub fn new(link: LinkId, peer: NodeId, n_priorities: u32) -> Self {
        let n = (n_priorities + 1) as usize;
        Self {
            link,
            peer,
            n_priorities,
            queues: (0..n).map(|_| VecDeque::new()).collect(),
            paused: vec![false; n],
            pause_timers: vec![TimerHandle::expired(); n],
            in_queue_pkts: 0,
            in_queue_bytes: 0,
            in_queue_pkts_list: vec![0; n],
            in_queue_bytes_list: vec![0; n],
            last_queue_idx: 0,
            tx_bytes: 0,
            rx_bytes: 0,
            ingress_drops: 0,
        }
    }

    fn control_index(&self) -> usize {
        self.n_priorities as usize
    }

    pub fn is_paused(&self, priority: u32) -> bool {
        self.paused[(priority as usize).min(self.control_index())]
    }

    pub fn queued_packets(&self) -> usize {
        self.in_queue_pkts
    }

    pub fn queued_bytes(&self) -> u64 {
        self.in_queue_bytes
    }

    pub fn queued_packets_at(&self, priority: u32) -> usize {
        self.in_queue_pkts_list[priority as usize]
    }

    /// 入队：控制帧走控制队列，数据按优先级入队。
    pub fn enqueue(&mut self, qindex: usize, item: QueuedPacket) {
        let size = item.pkt.size_bytes as u64;
        self.queues[qindex].push_back(item);
        self.in_queue_pkts += 1;
        self.in_queue_bytes += size;
        self.in_queue_pkts_list[qindex] += 1;
        self.in_queue_bytes_list[qindex] += size;
    }

    fn pop(&mut self, qindex: usize) -> QueuedPacket {
        let item = self.queues[qindex].pop_front().expect("non-empty queue");
        let size = item.pkt.size_bytes as u64;
        self.in_queue_pkts -= 1;
        self.in_queue_bytes -= size;
        self.in_queue_pkts_list[qindex] -= 1;
        self.in_queue_bytes_list[qindex] -= size;
        item
    }

    /// 出队一个包，返回其队列索引。
    pub fn dequeue(&mut self) -> Option<(QueuedPacket, usize)> {
        let ctrl = self.control_index();
        if self.in_queue_pkts_list[ctrl] > 0 && !self.paused[ctrl] {
            return Some((self.pop(ctrl), ctrl));
        }
        self.dequeue_round_robin()
    }

    fn dequeue_round_robin(&mut self) -> Option<(QueuedPacket, usize)> {
        if self.in_queue_pkts == 0 {
            return None;
        }
        let n = self.n_priorities as usize;
        for i in 0..n {
            let qidx = (self.last_queue_idx + i) % n;
            if !self.paused[qidx] && self.in_queue_pkts_list[qidx] > 0 {
                self.last_queue_idx = qidx;
                return Some((self.pop(qidx), qidx));
            }
        }
        None
    }
}
