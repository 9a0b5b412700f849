//! 主机端口定时器事件
//!
//! 全部遵循同一约定：携带可取消句柄，触发时先查句柄，已取消则
//! 退化为 no-op，否则标记句柄已消耗再执行。

use crate::net::{NetWorld, NodeId};
use crate::sim::{Event, Simulator, TimerHandle, World};

fn net_world(world: &mut dyn World) -> &mut NetWorld {
    world
        .as_any_mut()
        .downcast_mut::<NetWorld>()
        .expect("world must be NetWorld")
}

/// IRN 重传超时。
#[derive(Debug)]
pub struct IrnTimeout {
    pub node: NodeId,
    pub qp: usize,
    pub seq: u32,
    pub handle: TimerHandle,
}

impl Event for IrnTimeout {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        if self.handle.is_cancelled() {
            return;
        }
        self.handle.cancel();
        let IrnTimeout { node, qp, seq, .. } = *self;
        let w = net_world(world);
        w.net.with_host(node, sim, |h, sim, net| {
            h.port.on_irn_timeout(node, qp, seq, sim, net);
        });
    }
}

/// DCQCN alpha 衰减周期。
#[derive(Debug)]
pub struct DcqcnAlphaTimer {
    pub node: NodeId,
    pub qp: usize,
    pub handle: TimerHandle,
}

impl Event for DcqcnAlphaTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        if self.handle.is_cancelled() {
            return;
        }
        self.handle.cancel();
        let DcqcnAlphaTimer { node, qp, .. } = *self;
        let w = net_world(world);
        w.net.with_host(node, sim, |h, sim, _net| {
            h.port.on_dcqcn_alpha_timer(node, qp, sim);
        });
    }
}

/// DCQCN 降速检查周期。
#[derive(Debug)]
pub struct DcqcnDecTimer {
    pub node: NodeId,
    pub qp: usize,
    pub handle: TimerHandle,
}

impl Event for DcqcnDecTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        if self.handle.is_cancelled() {
            return;
        }
        self.handle.cancel();
        let DcqcnDecTimer { node, qp, .. } = *self;
        let w = net_world(world);
        w.net.with_host(node, sim, |h, sim, _net| {
            h.port.on_dcqcn_dec_timer(node, qp, sim);
        });
    }
}

/// DCQCN 增速周期。
#[derive(Debug)]
pub struct DcqcnIncTimer {
    pub node: NodeId,
    pub qp: usize,
    pub handle: TimerHandle,
}

impl Event for DcqcnIncTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        if self.handle.is_cancelled() {
            return;
        }
        self.handle.cancel();
        let DcqcnIncTimer { node, qp, .. } = *self;
        let w = net_world(world);
        w.net.with_host(node, sim, |h, sim, _net| {
            h.port.on_dcqcn_inc_timer(node, qp, sim);
        });
    }
}

/// 主机侧 Pause 到期自动恢复。
#[derive(Debug)]
pub struct PfcHostAutoResume {
    pub node: NodeId,
    pub priority: u32,
    pub handle: TimerHandle,
}

impl Event for PfcHostAutoResume {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        if self.handle.is_cancelled() {
            return;
        }
        self.handle.cancel();
        let PfcHostAutoResume { node, priority, .. } = *self;
        let w = net_world(world);
        w.net.with_host(node, sim, |h, sim, net| {
            h.port.on_pfc_auto_resume(node, priority, sim, net);
        });
    }
}
