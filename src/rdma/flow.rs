//! 流标识
//!
//! 四元组与稳定哈希。发送端收到 ACK 时以交换后的四元组查表，
//! 接收端以原始四元组查表，双方各自从自己的视角计算。

use crate::net::NodeId;

/// FNV-1a 64 位哈希。
pub fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// 一条流的四元组标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src: NodeId,
    pub dst: NodeId,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    pub fn new(src: NodeId, dst: NodeId, src_port: u16, dst_port: u16) -> Self {
        Self {
            src,
            dst,
            src_port,
            dst_port,
        }
    }

    /// 方向对调后的四元组。
    pub fn swapped(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
            src_port: self.dst_port,
            dst_port: self.src_port,
        }
    }

    /// 稳定流哈希，用作队列对表键与 ECMP 选路输入。
    pub fn hash(&self) -> u64 {
        let mut buf = [0u8; 20];
        buf[0..8].copy_from_slice(&(self.src.0 as u64).to_le_bytes());
        buf[8..16].copy_from_slice(&(self.dst.0 as u64).to_le_bytes());
        buf[16..18].copy_from_slice(&self.src_port.to_le_bytes());
        buf[18..20].copy_from_slice(&self.dst_port.to_le_bytes());
        fnv1a(&buf)
    }
}
