//! 交换机 MMU
//!
//! 缓冲准入的唯一裁决者：三级计费（预留 → 共享 → headroom）、
//! 动态 PFC 阈值、Pause/Resume 判定与 ECN 标记判定。
//! 所有接口以 (出端口序号, 优先级) 为键；控制队列位于索引
//! `n_priorities`，不参与 ECN 标记。

use super::ecn::EcnConfig;
use super::queue::MmuQueue;
use crate::error::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// MMU 全局配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MmuConfig {
    /// 总缓冲容量（字节）
    pub buffer_bytes: u64,
    /// 数据优先级数量（控制队列额外占一个索引）
    pub n_priorities: u32,
    /// 动态阈值开关
    pub dynamic_threshold: bool,
    /// 动态阈值右移位数
    pub dynamic_threshold_shift: u32,
    /// ECN 概率抽样的随机种子
    pub seed: u64,
}

impl Default for MmuConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: 12 * 1024 * 1024,
            n_priorities: 1,
            dynamic_threshold: false,
            dynamic_threshold_shift: 0,
            seed: 1,
        }
    }
}

/// 交换机 MMU。
#[derive(Debug)]
pub struct SwitchMmu {
    buffer_bytes: u64,
    n_priorities: u32,
    dynamic_threshold: bool,
    dynamic_threshold_shift: u32,
    /// queues[端口][优先级]，优先级 0..=n_priorities
    queues: Vec<Vec<MmuQueue>>,
    ecn: Vec<Vec<EcnConfig>>,
    rng: StdRng,
}

impl SwitchMmu {
    pub fn new(config: MmuConfig) -> Result<Self, ConfigError> {
        if config.n_priorities == 0 {
            return Err(ConfigError::PriorityOutOfRange { index: 0, max: 0 });
        }
        Ok(Self {
            buffer_bytes: config.buffer_bytes,
            n_priorities: config.n_priorities,
            dynamic_threshold: config.dynamic_threshold,
            dynamic_threshold_shift: config.dynamic_threshold_shift,
            queues: Vec::new(),
            ecn: Vec::new(),
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    pub fn n_priorities(&self) -> u32 {
        self.n_priorities
    }

    /// 控制队列索引。
    pub fn control_priority(&self) -> u32 {
        self.n_priorities
    }

    pub fn n_ports(&self) -> usize {
        self.queues.len()
    }

    /// 注册一个端口，为每个优先级（含控制队列）建立记账条目。
    pub fn add_port(&mut self) -> usize {
        let n = (self.n_priorities + 1) as usize;
        self.queues.push(vec![MmuQueue::default(); n]);
        self.ecn.push(vec![EcnConfig::default(); n]);
        self.queues.len() - 1
    }

    fn check_priority(&self, priority: u32) -> Result<(), ConfigError> {
        if priority > self.n_priorities {
            return Err(ConfigError::PriorityOutOfRange {
                index: priority,
                max: self.n_priorities,
            });
        }
        Ok(())
    }

    pub fn queue(&self, port: usize, priority: u32) -> &MmuQueue {
        &self.queues[port][priority as usize]
    }

    fn queue_mut(&mut self, port: usize, priority: u32) -> &mut MmuQueue {
        &mut self.queues[port][priority as usize]
    }

    /*
     * 配置
     */

    pub fn config_ecn(
        &mut self,
        port: usize,
        priority: u32,
        cfg: EcnConfig,
    ) -> Result<(), ConfigError> {
        self.check_priority(priority)?;
        cfg.validate()?;
        self.ecn[port][priority as usize] = cfg;
        Ok(())
    }

    /// 对所有端口的所有队列（含控制队列）应用同一 ECN 配置。
    pub fn config_ecn_all(&mut self, cfg: EcnConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        for port in &mut self.ecn {
            for slot in port.iter_mut() {
                *slot = cfg;
            }
        }
        Ok(())
    }

    pub fn config_headroom(
        &mut self,
        port: usize,
        priority: u32,
        bytes: u64,
    ) -> Result<(), ConfigError> {
        self.check_priority(priority)?;
        self.queue_mut(port, priority).headroom = bytes;
        Ok(())
    }

    pub fn config_reserve(
        &mut self,
        port: usize,
        priority: u32,
        bytes: u64,
    ) -> Result<(), ConfigError> {
        self.check_priority(priority)?;
        self.queue_mut(port, priority).reserve = bytes;
        Ok(())
    }

    pub fn config_resume_offset(
        &mut self,
        port: usize,
        priority: u32,
        bytes: u64,
    ) -> Result<(), ConfigError> {
        self.check_priority(priority)?;
        self.queue_mut(port, priority).resume_offset = bytes;
        Ok(())
    }

    pub fn config_headroom_all(&mut self, bytes: u64) {
        for port in &mut self.queues {
            for q in port.iter_mut() {
                q.headroom = bytes;
            }
        }
    }

    pub fn config_reserve_all(&mut self, bytes: u64) {
        for port in &mut self.queues {
            for q in port.iter_mut() {
                q.reserve = bytes;
            }
        }
    }

    pub fn config_resume_offset_all(&mut self, bytes: u64) {
        for port in &mut self.queues {
            for q in port.iter_mut() {
                q.resume_offset = bytes;
            }
        }
    }

    /*
     * 统计
     */

    pub fn buffer_size(&self) -> u64 {
        self.buffer_bytes
    }

    /// 共享池容量 = 总缓冲 − Σ(预留 + headroom)。
    pub fn shared_buffer_size(&self) -> u64 {
        let mut size = self.buffer_bytes;
        for port in &self.queues {
            for q in port.iter() {
                size = size.saturating_sub(q.buffer_size());
            }
        }
        size
    }

    pub fn shared_buffer_used(&self, port: usize, priority: u32) -> u64 {
        self.queue(port, priority).shared_used()
    }

    pub fn shared_buffer_used_total(&self) -> u64 {
        self.queues
            .iter()
            .flat_map(|p| p.iter())
            .map(|q| q.shared_used())
            .sum()
    }

    pub fn shared_buffer_remain(&self) -> u64 {
        self.shared_buffer_size()
            .saturating_sub(self.shared_buffer_used_total())
    }

    pub fn buffer_used(&self, port: usize, priority: u32) -> u64 {
        self.queue(port, priority).buffer_used()
    }

    pub fn buffer_used_total(&self) -> u64 {
        self.queues
            .iter()
            .flat_map(|p| p.iter())
            .map(|q| q.buffer_used())
            .sum()
    }

    /*
     * 准入
     */

    /// 动态 PFC 阈值：剩余共享池右移 shift 位。
    pub fn pfc_threshold(&self) -> u64 {
        self.shared_buffer_remain() >> self.dynamic_threshold_shift
    }

    /// 入方向准入判定。仅当共享池（或动态阈值）装不下且 headroom
    /// 也装不下时拒绝。
    pub fn check_ingress_admission(&self, port: usize, priority: u32, size: u32) -> bool {
        let size = size as u64;
        let q = self.queue(port, priority);
        if self.dynamic_threshold {
            !(size + q.shared_used() > self.pfc_threshold()
                && size + q.headroom_used > q.headroom)
        } else {
            !(size + self.shared_buffer_used_total() > self.shared_buffer_size()
                && size + q.headroom_used > q.headroom)
        }
    }

    /// 入方向计费：预留 → 共享 → headroom。
    ///
    /// 顺序不可调换：headroom_used > 0 正是 Pause 的触发条件。
    pub fn update_ingress_admission(&mut self, port: usize, priority: u32, size: u32) {
        let size = size as u64;
        let threshold = if self.dynamic_threshold {
            self.pfc_threshold()
        } else {
            self.shared_buffer_size()
        };
        let q = self.queue_mut(port, priority);
        let new_ingress_used = q.ingress_used + size;
        if new_ingress_used <= q.reserve {
            q.ingress_used += size;
        } else if new_ingress_used - q.reserve > threshold {
            q.headroom_used += size;
        } else {
            q.ingress_used += size;
        }
        trace!(
            port,
            priority,
            size,
            ingress_used = q.ingress_used,
            headroom_used = q.headroom_used,
            "入方向计费"
        );
    }

    /// 出队时释放：先还 headroom，剩余从 ingress 扣。
    pub fn remove_from_ingress_admission(&mut self, port: usize, priority: u32, size: u32) {
        let size = size as u64;
        let q = self.queue_mut(port, priority);
        let from_headroom = q.headroom_used.min(size);
        q.headroom_used -= from_headroom;
        q.ingress_used = q.ingress_used.saturating_sub(size - from_headroom);
    }

    pub fn check_egress_admission(&self, _port: usize, _priority: u32, _size: u32) -> bool {
        true
    }

    pub fn update_egress_admission(&mut self, port: usize, priority: u32, size: u32) {
        self.queue_mut(port, priority).egress_used += size as u64;
    }

    pub fn remove_from_egress_admission(&mut self, port: usize, priority: u32, size: u32) {
        let q = self.queue_mut(port, priority);
        q.egress_used = q.egress_used.saturating_sub(size as u64);
    }

    /*
     * PFC 判定
     */

    pub fn check_should_send_pfc_pause(&self, port: usize, priority: u32) -> bool {
        let q = self.queue(port, priority);
        if self.dynamic_threshold {
            !q.paused && (q.headroom_used > 0 || q.shared_used() >= self.pfc_threshold())
        } else {
            !q.paused && q.headroom_used > 0
        }
    }

    pub fn check_should_send_pfc_resume(&self, port: usize, priority: u32) -> bool {
        let q = self.queue(port, priority);
        if !q.paused {
            return false;
        }
        let shared_used = q.shared_used();
        if self.dynamic_threshold {
            q.headroom_used == 0
                && (shared_used == 0 || shared_used + q.resume_offset <= self.pfc_threshold())
        } else {
            q.headroom_used == 0
                && (shared_used == 0
                    || self.shared_buffer_used_total() + q.resume_offset
                        <= self.shared_buffer_size())
        }
    }

    pub fn set_pause(&mut self, port: usize, priority: u32) {
        self.queue_mut(port, priority).paused = true;
    }

    pub fn set_resume(&mut self, port: usize, priority: u32) {
        self.queue_mut(port, priority).paused = false;
    }

    pub fn is_paused(&self, port: usize, priority: u32) -> bool {
        self.queue(port, priority).paused
    }

    /*
     * ECN
     */

    /// RED 式标记判定。控制队列从不标记。
    pub fn check_should_set_ecn(&mut self, port: usize, priority: u32) -> bool {
        if priority >= self.n_priorities {
            return false;
        }
        let cfg = self.ecn[port][priority as usize];
        if !cfg.enable {
            return false;
        }
        let qlen = self.queues[port][priority as usize].egress_used;
        if qlen > cfg.kmax {
            return true;
        }
        if qlen > cfg.kmin {
            let p = cfg.pmax * (qlen - cfg.kmin) as f64 / (cfg.kmax - cfg.kmin) as f64;
            return self.rng.gen_range(0.0..1.0) < p;
        }
        false
    }
}
