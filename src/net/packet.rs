//! 数据包类型
//!
//! `Packet` 只是网络层的载体：控制逻辑只读取这里建模的头字段，
//! 不序列化任何线路字节格式。

use super::id::NodeId;

/// IP ECN 码点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ecn {
    #[default]
    NotEct,
    Ect0,
    Ect1,
    /// Congestion Experienced
    Ce,
}

impl Ecn {
    pub fn is_ce(self) -> bool {
        matches!(self, Ecn::Ce)
    }
}

/// RDMA 传输头标志位。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QbbFlag {
    None,
    Ack,
    Sack,
}

/// RDMA 传输头（叠加在 IP 之上），只建模控制逻辑读取的字段。
#[derive(Debug, Clone, Copy)]
pub struct QbbHeader {
    pub src_port: u16,
    pub dst_port: u16,
    /// 自由递增序列号（非选择确认模式使用，以字节计）。
    pub seq: u32,
    /// IRN 确认号（数据包上为本包序列号，ACK 上为被确认的序列号）。
    pub irn_ack: u32,
    /// IRN 否定确认号（SACK 上为接收端期望的序列号）。
    pub irn_nack: u32,
    pub flag: QbbFlag,
    /// 拥塞通知位：接收端回显观测到的 CE 标记。
    pub cnp: bool,
}

/// PFC 帧类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PfcKind {
    Pause,
    Resume,
}

/// PFC 控制帧：目标优先级 + 暂停时长（quanta）。
///
/// 一个 quantum 为链路速率下 512 bit 的发送时间；quanta 为 0 的
/// Pause 帧等价于显式 Resume。
#[derive(Debug, Clone, Copy)]
pub struct PfcFrame {
    pub kind: PfcKind,
    pub priority: u32,
    pub quanta: u16,
}

/// Packet 载荷：数据/确认（传输头）或 PFC 控制帧。
#[derive(Debug, Clone)]
pub enum PacketBody {
    Data(QbbHeader),
    Pfc(PfcFrame),
}

/// 以太网 + IP 头开销（字节）。
pub const ETH_IP_OVERHEAD_BYTES: u32 = 34;
/// 传输头开销（字节）。
pub const QBB_HEADER_BYTES: u32 = 18;
/// 纯控制包（ACK/SACK）大小。
pub const CONTROL_PKT_BYTES: u32 = ETH_IP_OVERHEAD_BYTES + QBB_HEADER_BYTES;
/// PFC 帧在线路上的大小（最小以太网帧）。
pub const PFC_FRAME_BYTES: u32 = 64;
/// 默认 MTU。
pub const DEFAULT_MTU_BYTES: u32 = 1500;

/// 单个 MTU 数据包能携带的最大载荷。
pub fn max_payload_bytes(mtu: u32) -> u32 {
    mtu.saturating_sub(ETH_IP_OVERHEAD_BYTES + QBB_HEADER_BYTES)
}

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub src: NodeId,
    pub dst: NodeId,
    pub size_bytes: u32,
    /// 优先级（DSCP）；PFC 帧的该字段无意义。
    pub priority: u32,
    pub ecn: Ecn,
    pub body: PacketBody,
}

impl Packet {
    pub fn is_pfc(&self) -> bool {
        matches!(self.body, PacketBody::Pfc(_))
    }

    /// 数据/确认包的传输头（PFC 帧返回 None）。
    pub fn qbb(&self) -> Option<&QbbHeader> {
        match &self.body {
            PacketBody::Data(h) => Some(h),
            PacketBody::Pfc(_) => None,
        }
    }

    /// 载荷字节数（去掉头开销）。
    pub fn payload_bytes(&self) -> u32 {
        self.size_bytes.saturating_sub(CONTROL_PKT_BYTES)
    }
}
