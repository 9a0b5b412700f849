//! MMU 队列记账
//!
//! 每个 (端口, 优先级) 一条记录：容量配置与当前占用。

/// 单个 (端口, 优先级) 的缓冲记账。
#[derive(Debug, Clone, Default)]
pub struct MmuQueue {
    /// headroom 容量（吸收 Pause 传播期间在途流量）
    pub headroom: u64,
    /// 预留容量
    pub reserve: u64,
    /// 恢复偏移：共享占用回落到阈值减去该值以下才发 Resume
    pub resume_offset: u64,
    /// 计入预留/共享池的字节数
    pub ingress_used: u64,
    /// 计入 headroom 的字节数
    pub headroom_used: u64,
    /// 出方向排队字节数（ECN 判定依据）
    pub egress_used: u64,
    /// 上游是否已被本端 Pause
    pub paused: bool,
}

impl MmuQueue {
    /// 该队列独占的缓冲容量（预留 + headroom）。
    pub fn buffer_size(&self) -> u64 {
        self.reserve + self.headroom
    }

    /// 该队列当前占用的总字节数。
    pub fn buffer_used(&self) -> u64 {
        self.ingress_used + self.headroom_used
    }

    /// 计入共享池的部分：超出预留的 ingress 占用。
    pub fn shared_used(&self) -> u64 {
        self.ingress_used.saturating_sub(self.reserve)
    }
}
