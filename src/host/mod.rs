//! 主机模块
//!
//! 主机端口的发送调度、队列对管理与定时器事件。

mod config;
mod events;
mod port;

pub use config::{CcMode, DcqcnConfig, HostPortConfig, IrnConfig, RtxMode};
pub use events::{DcqcnAlphaTimer, DcqcnDecTimer, DcqcnIncTimer, IrnTimeout, PfcHostAutoResume};
pub use port::{HostNode, HostPort, HostStats};
