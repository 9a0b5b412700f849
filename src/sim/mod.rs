//! 仿真核心模块
//!
//! 事件驱动仿真的核心组件：仿真时间、事件、可取消定时器、世界与仿真器。

// 子模块声明
mod event;
mod scheduled_event;
mod simulator;
mod time;
mod timer;
mod world;

// 重新导出公共接口
pub use event::Event;
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
pub use timer::TimerHandle;
pub use world::World;
