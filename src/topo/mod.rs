//! 拓扑构建模块
//!
//! 显式构建与连线，不经过任何全局注册表。

pub mod dumbbell;
