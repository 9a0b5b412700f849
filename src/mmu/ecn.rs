//! ECN 标记配置
//!
//! RED 风格标记参数：低于 kmin 不标记，高于 kmax 必标记，
//! 之间按线性概率标记。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// 每个 (端口, 优先级) 的 ECN 配置。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EcnConfig {
    pub kmin: u64,
    pub kmax: u64,
    pub pmax: f64,
    pub enable: bool,
}

impl Default for EcnConfig {
    fn default() -> Self {
        Self {
            kmin: 0,
            kmax: 0,
            pmax: 0.0,
            enable: false,
        }
    }
}

impl EcnConfig {
    pub fn new(kmin: u64, kmax: u64, pmax: f64) -> Result<Self, ConfigError> {
        let cfg = Self {
            kmin,
            kmax,
            pmax,
            enable: true,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enable {
            return Ok(());
        }
        if self.kmin >= self.kmax {
            return Err(ConfigError::EcnThresholdInverted {
                kmin: self.kmin,
                kmax: self.kmax,
            });
        }
        if !(0.0..=1.0).contains(&self.pmax) {
            return Err(ConfigError::EcnProbabilityOutOfRange(self.pmax));
        }
        Ok(())
    }
}
