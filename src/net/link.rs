//! 链路类型
//!
//! 定义网络链路及其传输时延计算。链路不排队：排队发生在端口
//! （交换机的逐优先级队列 / 主机的发送调度器），链路只负责
//! 序列化时间与传播时延。

use super::id::NodeId;
use crate::sim::SimTime;

/// 网络链路（单向）。
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    pub busy_until: SimTime,
}

impl Link {
    /// 创建新链路
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, bandwidth_bps: u64) -> Self {
        Self {
            from,
            to,
            latency,
            bandwidth_bps,
            busy_until: SimTime::ZERO,
        }
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        SimTime::for_bytes_at(bytes as u64, self.bandwidth_bps)
    }

    /// 一个 PFC quantum（512 bit）在本链路上的时间。
    pub fn pause_quantum(&self) -> SimTime {
        SimTime::for_bytes_at(64, self.bandwidth_bps)
    }
}
