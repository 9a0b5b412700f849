use crate::sim::{Event, SimTime, Simulator, TimerHandle, World};
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DummyWorld {
    ticks: usize,
}

impl World for DummyWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, _sim: &mut Simulator) {
        self.ticks = self.ticks.saturating_add(1);
    }
}

struct Push {
    id: u32,
    log: Arc<Mutex<Vec<u32>>>,
}

impl Event for Push {
    fn execute(self: Box<Self>, _sim: &mut Simulator, _world: &mut dyn World) {
        let Push { id, log } = *self;
        log.lock().expect("log lock").push(id);
    }
}

struct CancellablePush {
    id: u32,
    log: Arc<Mutex<Vec<u32>>>,
    handle: TimerHandle,
}

impl Event for CancellablePush {
    fn execute(self: Box<Self>, _sim: &mut Simulator, _world: &mut dyn World) {
        if self.handle.is_cancelled() {
            return;
        }
        self.handle.cancel();
        self.log.lock().expect("log lock").push(self.id);
    }
}

#[test]
fn scheduled_events_order_by_time_then_seq() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(10),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(5),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(10),
        Push {
            id: 3,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[2, 1, 3]);
    assert_eq!(world.ticks, 3);
    assert_eq!(sim.now(), SimTime(10));
}

#[test]
fn run_until_skips_events_after_until_and_advances_time() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime::ZERO,
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(10),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run_until(SimTime(5), &mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1]);
    assert_eq!(sim.now(), SimTime(5));

    sim.run(&mut world);
    assert_eq!(&*log.lock().expect("log lock"), &[1, 2]);
    assert_eq!(sim.now(), SimTime(10));
}

#[test]
fn schedule_in_is_relative_to_current_time() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(5),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    let mut world = DummyWorld::default();
    sim.run(&mut world);
    assert_eq!(sim.now(), SimTime(5));

    sim.schedule_in(
        SimTime(3),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );
    sim.run(&mut world);
    assert_eq!(sim.now(), SimTime(8));
    assert_eq!(&*log.lock().expect("log lock"), &[1, 2]);
}

#[test]
fn timer_fires_when_not_cancelled() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulator::default();

    let handle = sim.schedule_timer(SimTime(10), |handle| CancellablePush {
        id: 1,
        log: Arc::clone(&log),
        handle,
    });

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1]);
    // 触发时事件自行标记句柄为已消耗
    assert!(handle.is_cancelled());
}

#[test]
fn cancelled_timer_is_a_noop_when_popped() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulator::default();

    let handle = sim.schedule_timer(SimTime(10), |handle| CancellablePush {
        id: 1,
        log: Arc::clone(&log),
        handle,
    });
    handle.cancel();

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert!(log.lock().expect("log lock").is_empty());
    // 事件仍然被弹出并推进了时间
    assert_eq!(sim.now(), SimTime(10));
}

#[test]
fn expired_handle_is_born_cancelled() {
    assert!(TimerHandle::expired().is_cancelled());
    assert!(!TimerHandle::new().is_cancelled());
}

#[test]
fn rescheduling_cancels_the_stale_instance() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulator::default();

    // 模拟"状态变更先取消旧定时器再调度新的"的约定
    let old = sim.schedule_timer(SimTime(10), |handle| CancellablePush {
        id: 1,
        log: Arc::clone(&log),
        handle,
    });
    old.cancel();
    sim.schedule_timer(SimTime(20), |handle| CancellablePush {
        id: 2,
        log: Arc::clone(&log),
        handle,
    });

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[2]);
}
