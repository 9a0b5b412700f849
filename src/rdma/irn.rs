//! IRN 位图窗口
//!
//! 发送端与接收端各维护一个以 base_seq 为起点的滑动状态窗口。
//! 不变量：窗口内不含已确认前缀，确认过的槽位总是从头部裁掉并
//! 推进 base_seq；序号从 1 开始单调递增。

use std::collections::VecDeque;

use crate::error::ProtocolViolation;
use crate::sim::TimerHandle;

/// 发送端槽位状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxIrnState {
    /// 已发送未确认
    Unack,
    /// 已确认
    Ack,
    /// 对端报告丢失，待重传
    Nack,
    /// 窗口之外（尚未发送）
    Undef,
}

impl TxIrnState {
    fn name(self) -> &'static str {
        match self {
            TxIrnState::Unack => "unack",
            TxIrnState::Ack => "ack",
            TxIrnState::Nack => "nack",
            TxIrnState::Undef => "undef",
        }
    }
}

/// 发送端 IRN 窗口。
#[derive(Debug, Default)]
pub struct TxIrnWindow {
    states: VecDeque<TxIrnState>,
    payloads: VecDeque<u32>,
    rtx_timers: VecDeque<TimerHandle>,
    base_seq: u32,
}

impl TxIrnWindow {
    pub fn new() -> Self {
        Self {
            states: VecDeque::new(),
            payloads: VecDeque::new(),
            rtx_timers: VecDeque::new(),
            base_seq: 1,
        }
    }

    pub fn base_seq(&self) -> u32 {
        self.base_seq
    }

    /// 下一个待分配的序列号。
    pub fn next_sequence_number(&self) -> u32 {
        self.base_seq + self.states.len() as u32
    }

    /// 窗口内的包数（在途 + 待重传）。
    pub fn window_size(&self) -> u32 {
        self.states.len() as u32
    }

    pub fn state(&self, seq: u32) -> TxIrnState {
        if seq >= self.next_sequence_number() {
            TxIrnState::Undef
        } else if seq >= self.base_seq {
            self.states[(seq - self.base_seq) as usize]
        } else {
            TxIrnState::Ack
        }
    }

    /// 发送新包后登记槽位，返回它占用的序列号。
    pub fn send_new_packet(&mut self, payload_bytes: u32) -> u32 {
        let seq = self.next_sequence_number();
        self.states.push_back(TxIrnState::Unack);
        self.payloads.push_back(payload_bytes);
        self.rtx_timers.push_back(TimerHandle::expired());
        seq
    }

    pub fn payload_bytes(&self, seq: u32) -> Result<u32, ProtocolViolation> {
        if seq < self.base_seq || seq >= self.next_sequence_number() {
            return Err(ProtocolViolation::SeqOutOfWindow {
                seq,
                base: self.base_seq,
                next: self.next_sequence_number(),
            });
        }
        Ok(self.payloads[(seq - self.base_seq) as usize])
    }

    fn move_window(&mut self) {
        while let Some(TxIrnState::Ack) = self.states.front().copied() {
            self.states.pop_front();
            self.payloads.pop_front();
            self.rtx_timers.pop_front();
            self.base_seq += 1;
        }
    }

    /// 确认 `seq`：槽位记为已确认并取消其重传定时器，随后裁剪
    /// 已确认前缀推进 base_seq。
    ///
    /// 对已确认序号幂等；对从未发送的序号是协议违例。
    pub fn ack(&mut self, seq: u32) -> Result<(), ProtocolViolation> {
        match self.state(seq) {
            TxIrnState::Undef => {
                return Err(ProtocolViolation::AckOutOfWindow {
                    seq,
                    base: self.base_seq,
                    next: self.next_sequence_number(),
                });
            }
            TxIrnState::Unack | TxIrnState::Nack => {
                let idx = (seq - self.base_seq) as usize;
                self.states[idx] = TxIrnState::Ack;
                self.rtx_timers[idx].cancel();
            }
            TxIrnState::Ack => {}
        }
        self.move_window();
        Ok(())
    }

    /// 选择确认：`ack_seq` 记为已确认，[expected, ack_seq) 记为待重传。
    ///
    /// 重传定时器此处取消，重传发出时再重新武装。
    pub fn sack(&mut self, ack_seq: u32, expected: u32) -> Result<(), ProtocolViolation> {
        match self.state(ack_seq) {
            TxIrnState::Undef => {
                return Err(ProtocolViolation::SeqOutOfWindow {
                    seq: ack_seq,
                    base: self.base_seq,
                    next: self.next_sequence_number(),
                });
            }
            TxIrnState::Unack => {
                let exp_idx = expected.saturating_sub(self.base_seq) as usize;
                let idx = (ack_seq - self.base_seq) as usize;
                self.states[idx] = TxIrnState::Ack;
                self.rtx_timers[idx].cancel();
                for i in exp_idx..idx {
                    self.states[i] = TxIrnState::Nack;
                    self.rtx_timers[i].cancel();
                }
            }
            s @ (TxIrnState::Ack | TxIrnState::Nack) => {
                return Err(ProtocolViolation::InvalidSack {
                    seq: ack_seq,
                    state: s.name(),
                });
            }
        }
        self.move_window();
        Ok(())
    }

    /// 登记某序号的重传定时器，取代（并取消）旧的。
    pub fn set_rtx_timer(&mut self, seq: u32, timer: TimerHandle) -> Result<(), ProtocolViolation> {
        if seq < self.base_seq || seq >= self.next_sequence_number() {
            return Err(ProtocolViolation::SeqOutOfWindow {
                seq,
                base: self.base_seq,
                next: self.next_sequence_number(),
            });
        }
        let idx = (seq - self.base_seq) as usize;
        self.rtx_timers[idx].cancel();
        self.rtx_timers[idx] = timer;
        Ok(())
    }
}

/// 接收端槽位状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxIrnState {
    /// 已收到
    Ack,
    /// 序号空洞
    Nack,
    /// 窗口之外
    Undef,
}

/// 接收端 IRN 窗口。
#[derive(Debug)]
pub struct RxIrnWindow {
    states: VecDeque<RxIrnState>,
    base_seq: u32,
}

impl Default for RxIrnWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl RxIrnWindow {
    pub fn new() -> Self {
        Self {
            states: VecDeque::new(),
            base_seq: 1,
        }
    }

    pub fn base_seq(&self) -> u32 {
        self.base_seq
    }

    /// 期望的下一个序列号。
    pub fn next_sequence_number(&self) -> u32 {
        self.base_seq + self.states.len() as u32
    }

    pub fn state(&self, seq: u32) -> RxIrnState {
        if seq >= self.next_sequence_number() {
            RxIrnState::Undef
        } else if seq >= self.base_seq {
            self.states[(seq - self.base_seq) as usize]
        } else {
            RxIrnState::Ack
        }
    }

    pub fn is_received(&self, seq: u32) -> bool {
        self.state(seq) == RxIrnState::Ack
    }

    fn move_window(&mut self) {
        while let Some(RxIrnState::Ack) = self.states.front().copied() {
            self.states.pop_front();
            self.base_seq += 1;
        }
    }

    /// 收到 `seq` 后更新窗口。乱序到达时把空洞补为 Nack。
    pub fn update(&mut self, seq: u32) {
        match self.state(seq) {
            RxIrnState::Undef => {
                while seq > self.next_sequence_number() {
                    self.states.push_back(RxIrnState::Nack);
                }
                self.states.push_back(RxIrnState::Ack);
            }
            RxIrnState::Nack => {
                self.states[(seq - self.base_seq) as usize] = RxIrnState::Ack;
            }
            RxIrnState::Ack => {}
        }
        self.move_window();
    }
}
