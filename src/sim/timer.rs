//! 可取消定时器句柄
//!
//! 事件队列本身只支持追加；取消通过句柄上的标志实现：
//! 已取消的定时器事件触发时必须自行检查句柄并退化为 no-op。
//! 任何会使旧定时器失效的状态变更（重新计时、显式恢复、确认完成等）
//! 都必须先取消旧句柄再调度新事件，避免陈旧定时器作用在已解决的状态上。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 一次性定时器的句柄。克隆共享同一取消标志。
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 一个创建即已取消的句柄，用作"没有挂起定时器"的占位。
    pub fn expired() -> Self {
        let h = Self::new();
        h.cancel();
        h
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::expired()
    }
}
