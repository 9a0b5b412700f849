mod irn_window;
mod mmu_admission;
mod sim_time;
mod simulator;
mod switch_port;
