//! RDMA 队列对模块
//!
//! 每条流的发送/接收状态：IRN 位图窗口、DCQCN 速率状态与四元组标识。

mod flow;
mod irn;
mod rx_qp;
mod tx_qp;

pub use flow::{FlowKey, fnv1a};
pub use irn::{RxIrnState, RxIrnWindow, TxIrnState, TxIrnWindow};
pub use rx_qp::RxQueuePair;
pub use tx_qp::{DcqcnState, TxQueuePair};
