//! 主机端口配置
//!
//! 静态类型配置，构造时校验；不支持的模式在启动阶段拒绝。

use crate::error::ConfigError;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

/// L2 重传模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RtxMode {
    /// 无重传
    None,
    /// 选择确认重传
    Irn,
}

impl RtxMode {
    /// 解析模式名。B20/B2N 在来源中只是桩，这里视为不支持的配置。
    pub fn from_str(mode: &str) -> Result<Self, ConfigError> {
        match mode {
            "NONE" => Ok(RtxMode::None),
            "IRN" => Ok(RtxMode::Irn),
            other => Err(ConfigError::UnknownRtxMode(other.to_string())),
        }
    }
}

/// 拥塞控制模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CcMode {
    None,
    Dcqcn,
}

impl CcMode {
    pub fn from_str(mode: &str) -> Result<Self, ConfigError> {
        match mode {
            "NONE" => Ok(CcMode::None),
            "DCQCN" => Ok(CcMode::Dcqcn),
            other => Err(ConfigError::UnknownCcMode(other.to_string())),
        }
    }
}

/// IRN 重传配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrnConfig {
    /// 位图窗口上限（包数）
    pub max_bitmap_size: u32,
    /// 窗口占用高于阈值时的重传超时
    pub rto_high: SimTime,
    /// 窗口占用不高于阈值时的重传超时
    pub rto_low: SimTime,
    /// rto_low 适用的窗口占用阈值（包数）
    pub rto_low_threshold: u32,
}

impl Default for IrnConfig {
    fn default() -> Self {
        Self {
            max_bitmap_size: 100,
            rto_high: SimTime::from_micros(320),
            rto_low: SimTime::from_micros(100),
            rto_low_threshold: 3,
        }
    }
}

impl IrnConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bitmap_size == 0 {
            return Err(ConfigError::ZeroIrnWindow);
        }
        Ok(())
    }
}

/// DCQCN 配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcqcnConfig {
    /// alpha 更新增益 g
    pub g: f64,
    /// 首个拥塞通知时把速率降到线速的该比例
    pub rate_frac_on_first_cnp: f64,
    /// 降速时是否把目标速率钳到当前速率
    pub clamp_target_rate: bool,
    /// 增速周期
    pub inc_rate_interval: SimTime,
    /// 降速检查周期
    pub dec_rate_interval: SimTime,
    /// 快速恢复阶段的周期数
    pub fast_recovery_times: u32,
    /// alpha 衰减周期
    pub alpha_resume_interval: SimTime,
    /// 加性增速步长（bps）
    pub rai_bps: u64,
    /// 超增速步长（bps）
    pub rhai_bps: u64,
    /// 最低发送速率（bps）
    pub min_rate_bps: u64,
    /// 是否启用速率限制
    pub is_rate_bound: bool,
}

impl Default for DcqcnConfig {
    fn default() -> Self {
        Self {
            g: 1.0 / 256.0,
            rate_frac_on_first_cnp: 0.5,
            clamp_target_rate: false,
            inc_rate_interval: SimTime::from_micros(55),
            dec_rate_interval: SimTime::from_micros(50),
            fast_recovery_times: 5,
            alpha_resume_interval: SimTime::from_micros(55),
            rai_bps: 40_000_000,
            rhai_bps: 400_000_000,
            min_rate_bps: 100_000_000,
            is_rate_bound: true,
        }
    }
}

impl DcqcnConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.g > 0.0 && self.g <= 1.0) {
            return Err(ConfigError::DcqcnGainOutOfRange(self.g));
        }
        if !(self.rate_frac_on_first_cnp > 0.0 && self.rate_frac_on_first_cnp <= 1.0) {
            return Err(ConfigError::DcqcnRateFracOutOfRange(
                self.rate_frac_on_first_cnp,
            ));
        }
        Ok(())
    }
}

/// 主机端口配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostPortConfig {
    /// 数据优先级数量（控制队列额外占一个索引）
    pub n_priorities: u32,
    pub pfc_enabled: bool,
    pub mtu_bytes: u32,
    pub rtx_mode: RtxMode,
    pub cc_mode: CcMode,
    pub irn: IrnConfig,
    pub dcqcn: DcqcnConfig,
}

impl Default for HostPortConfig {
    fn default() -> Self {
        Self {
            n_priorities: 1,
            pfc_enabled: true,
            mtu_bytes: crate::net::DEFAULT_MTU_BYTES,
            rtx_mode: RtxMode::Irn,
            cc_mode: CcMode::Dcqcn,
            irn: IrnConfig::default(),
            dcqcn: DcqcnConfig::default(),
        }
    }
}

impl HostPortConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_priorities == 0 {
            return Err(ConfigError::PriorityOutOfRange { index: 0, max: 0 });
        }
        self.irn.validate()?;
        self.dcqcn.validate()?;
        Ok(())
    }
}
