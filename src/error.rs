//! 错误类型
//!
//! 配置错误在启动阶段即为致命错误；协议不变量被破坏属于实现错误，
//! 调用方应当大声失败而不是静默破坏状态。

use thiserror::Error;

/// 配置错误：系统拒绝以未定义行为启动。
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("ECN thresholds inverted: kmin {kmin} >= kmax {kmax}")]
    EcnThresholdInverted { kmin: u64, kmax: u64 },
    #[error("ECN marking probability {0} outside [0, 1]")]
    EcnProbabilityOutOfRange(f64),
    #[error("priority index {index} out of range (supported 0..={max})")]
    PriorityOutOfRange { index: u32, max: u32 },
    #[error("unknown L2 retransmission mode: {0}")]
    UnknownRtxMode(String),
    #[error("unknown congestion control mode: {0}")]
    UnknownCcMode(String),
    #[error("IRN bitmap window size must be non-zero")]
    ZeroIrnWindow,
    #[error("DCQCN gain g {0} outside (0, 1]")]
    DcqcnGainOutOfRange(f64),
    #[error("DCQCN rate fraction on first CNP {0} outside (0, 1]")]
    DcqcnRateFracOutOfRange(f64),
}

/// 协议不变量违例：例如对从未发送过的序列号的确认。
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolViolation {
    #[error("acknowledgment for sequence {seq} outside the send window (base {base}, next {next})")]
    AckOutOfWindow { seq: u32, base: u32, next: u32 },
    #[error("SACK for sequence {seq} in state {state} (expected unacknowledged)")]
    InvalidSack { seq: u32, state: &'static str },
    #[error("sequence {seq} outside window (base {base}, next {next})")]
    SeqOutOfWindow { seq: u32, base: u32, next: u32 },
}
