//! 发送端队列对
//!
//! 一条流的发送侧状态：字节计数、速率限制、IRN 窗口与 DCQCN 状态。

use super::flow::FlowKey;
use super::irn::TxIrnWindow;
use crate::sim::{SimTime, TimerHandle};

/// DCQCN 速率控制状态块。
#[derive(Debug)]
pub struct DcqcnState {
    /// 降速激进程度，[0, 1]
    pub alpha: f64,
    /// 是否还未收到第一个拥塞通知
    pub first_cnp: bool,
    /// 上一个 alpha 周期内是否有拥塞通知到达
    pub alpha_cnp_arrived: bool,
    /// 上一个降速周期内是否有拥塞通知到达
    pub decrease_cnp_arrived: bool,
    /// 连续增速周期计数（决定增速阶段）
    pub rp_time_stage: u32,
    /// 目标速率（bps）
    pub target_rate_bps: u64,
    pub alpha_timer: TimerHandle,
    pub decrease_timer: TimerHandle,
    pub increase_timer: TimerHandle,
}

impl Default for DcqcnState {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            first_cnp: true,
            alpha_cnp_arrived: false,
            decrease_cnp_arrived: false,
            rp_time_stage: 0,
            target_rate_bps: 0,
            alpha_timer: TimerHandle::expired(),
            decrease_timer: TimerHandle::expired(),
            increase_timer: TimerHandle::expired(),
        }
    }
}

impl DcqcnState {
    /// 流完成后取消全部三个周期定时器，避免泄漏已调度的工作。
    pub fn cleanup_timers(&mut self) {
        self.alpha_timer.cancel();
        self.decrease_timer.cancel();
        self.increase_timer.cancel();
    }
}

/// 发送端队列对。
#[derive(Debug)]
pub struct TxQueuePair {
    pub key: FlowKey,
    pub priority: u32,
    /// 流的到达时间，早于它不发送
    pub start_time: SimTime,
    /// 流总字节数
    pub size_bytes: u64,
    /// 已发送的有效字节数（下一个待发偏移）
    pub tx_bytes: u64,
    /// 线速（bps）
    pub max_rate_bps: u64,
    /// 当前发送速率（bps）
    pub rate_bps: u64,
    /// 速率限制器允许的下一次发送时刻
    pub next_avail: SimTime,
    pub irn: TxIrnWindow,
    pub dcqcn: DcqcnState,
    /// 发送完成是否已上报过
    pub tx_finish_reported: bool,
}

impl TxQueuePair {
    pub fn new(key: FlowKey, priority: u32, start_time: SimTime, size_bytes: u64) -> Self {
        Self {
            key,
            priority,
            start_time,
            size_bytes,
            tx_bytes: 0,
            max_rate_bps: 0,
            rate_bps: 0,
            next_avail: SimTime::ZERO,
            irn: TxIrnWindow::new(),
            dcqcn: DcqcnState::default(),
            tx_finish_reported: false,
        }
    }

    /// 配置速率限制器（当前仅 DCQCN 使用）。
    pub fn setup_rate(&mut self, max_rate_bps: u64, init_rate_bps: u64) {
        self.max_rate_bps = max_rate_bps;
        self.rate_bps = init_rate_bps;
        self.dcqcn.target_rate_bps = init_rate_bps;
    }

    pub fn remain_bytes(&self) -> u64 {
        self.size_bytes.saturating_sub(self.tx_bytes)
    }

    /// 所有字节已发出（确认可能仍未齐）。
    pub fn is_tx_finished(&self) -> bool {
        self.tx_bytes >= self.size_bytes
    }

    /// 所有字节已发出且窗口内没有未决槽位。
    pub fn is_acked_finished(&self) -> bool {
        self.is_tx_finished() && self.irn.window_size() == 0
    }
}
