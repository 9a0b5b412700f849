//! 交换机定时器事件

use crate::net::{NetWorld, NodeId};
use crate::sim::{Event, Simulator, TimerHandle, World};

/// 交换机端口 Pause 到期自动恢复。
#[derive(Debug)]
pub struct PfcSwitchAutoResume {
    pub node: NodeId,
    pub port: usize,
    pub priority: u32,
    pub handle: TimerHandle,
}

impl Event for PfcSwitchAutoResume {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        if self.handle.is_cancelled() {
            return;
        }
        self.handle.cancel();
        let PfcSwitchAutoResume {
            node,
            port,
            priority,
            ..
        } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.with_switch(node, sim, |s, sim, net| {
            s.on_pfc_auto_resume(port, priority, sim, net);
        });
    }
}
