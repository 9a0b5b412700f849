//! 网络层事件
//!
//! 数据包交付事件与端口唤醒事件。

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, TimerHandle, World};
use tracing::{debug, trace};

/// 事件：把一个 packet 交给某个节点处理。
///
/// `via` 为承载该包的链路，用于交换机还原入端口。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub via: Option<LinkId>,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, to = ?self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, via, pkt } = *self;

        debug!(
            pkt_id = pkt.id,
            size_bytes = pkt.size_bytes,
            dst = ?pkt.dst,
            now = ?sim.now(),
            "📨 数据包到达节点"
        );

        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.deliver(to, via, pkt, sim);

        trace!("DeliverPacket::execute 完成");
    }
}

/// 事件：唤醒节点的某个发送端口，尝试发送下一个 packet。
///
/// 端口每开始一次序列化发送，就在 depart 时刻调度一次唤醒；
/// 速率限制器唤醒会携带可取消句柄（被更早的触发取代时取消）。
#[derive(Debug)]
pub struct PortWake {
    pub node: NodeId,
    pub port: usize,
    pub handle: Option<TimerHandle>,
}

impl Event for PortWake {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let PortWake { node, port, handle } = *self;
        if let Some(h) = &handle {
            if h.is_cancelled() {
                return;
            }
            // 标记已消耗，之后的取消调用不再有意义
            h.cancel();
        }
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.wake_port(node, port, sim);
    }
}
