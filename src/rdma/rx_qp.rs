//! 接收端队列对

use super::flow::FlowKey;
use super::irn::RxIrnWindow;

/// 接收端队列对：方向与发送端镜像。
#[derive(Debug)]
pub struct RxQueuePair {
    pub key: FlowKey,
    pub priority: u32,
    /// 期望接收的总字节数
    pub size_bytes: u64,
    /// 已收到的有效字节数（重复包不计入）
    pub received_bytes: u64,
    /// 重复收到的字节数，单独统计
    pub rtx_rx_bytes: u64,
    pub irn: RxIrnWindow,
}

impl RxQueuePair {
    pub fn new(key: FlowKey, priority: u32, size_bytes: u64) -> Self {
        Self {
            key,
            priority,
            size_bytes,
            received_bytes: 0,
            rtx_rx_bytes: 0,
            irn: RxIrnWindow::new(),
        }
    }

    pub fn remain_bytes(&self) -> u64 {
        self.size_bytes.saturating_sub(self.received_bytes)
    }

    pub fn is_finished(&self) -> bool {
        self.received_bytes >= self.size_bytes
    }
}
