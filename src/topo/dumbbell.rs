//! Dumbbell 拓扑构建
//!
//! 拓扑结构：hA_i <-> s0 <-> s1 <-> hB_i，瓶颈在 s0 <-> s1。

use crate::error::ConfigError;
use crate::host::{HostPort, HostPortConfig};
use crate::mmu::{EcnConfig, MmuConfig, SwitchMmu};
use crate::net::{NetWorld, NodeId};
use crate::rdma::FlowKey;
use crate::sim::{SimTime, Simulator};

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone)]
pub struct DumbbellOpts {
    /// 左右各多少台主机（即收发对数）
    pub n_pairs: usize,
    pub host_link_gbps: u64,
    pub bottleneck_gbps: u64,
    pub link_latency: SimTime,
    pub host: HostPortConfig,
    pub mmu: MmuConfig,
    /// 每个 (端口, 优先级) 的 headroom（字节）
    pub headroom_bytes: u64,
    /// 每个 (端口, 优先级) 的预留（字节）
    pub reserve_bytes: u64,
    pub resume_offset_bytes: u64,
    pub ecn: EcnConfig,
}

impl Default for DumbbellOpts {
    fn default() -> Self {
        Self {
            n_pairs: 2,
            host_link_gbps: 100,
            bottleneck_gbps: 25,
            link_latency: SimTime::from_micros(1),
            host: HostPortConfig::default(),
            mmu: MmuConfig::default(),
            headroom_bytes: 100 * 1024,
            reserve_bytes: 4 * 1024,
            resume_offset_bytes: 3 * 1024,
            ecn: EcnConfig::default(),
        }
    }
}

/// 构建结果：节点句柄，供登记流与查询统计用。
#[derive(Debug, Clone)]
pub struct Dumbbell {
    pub senders: Vec<NodeId>,
    pub receivers: Vec<NodeId>,
    pub s0: NodeId,
    pub s1: NodeId,
}

/// 构建 dumbbell 拓扑并完成路由与 MMU 配置。
pub fn build_dumbbell(world: &mut NetWorld, opts: &DumbbellOpts) -> Result<Dumbbell, ConfigError> {
    let gbps_to_bps = |g: u64| g.saturating_mul(1_000_000_000);
    let host_bps = gbps_to_bps(opts.host_link_gbps);
    let bottleneck_bps = gbps_to_bps(opts.bottleneck_gbps);

    let s0 = world
        .net
        .add_switch("s0", SwitchMmu::new(opts.mmu.clone())?);
    let s1 = world
        .net
        .add_switch("s1", SwitchMmu::new(opts.mmu.clone())?);

    let mut senders = Vec::with_capacity(opts.n_pairs);
    let mut receivers = Vec::with_capacity(opts.n_pairs);
    for i in 0..opts.n_pairs {
        let ha = world
            .net
            .add_host(format!("hA{i}"), HostPort::new(opts.host.clone())?);
        let hb = world
            .net
            .add_host(format!("hB{i}"), HostPort::new(opts.host.clone())?);
        world.net.connect(ha, s0, opts.link_latency, host_bps);
        world.net.connect(s0, ha, opts.link_latency, host_bps);
        world.net.connect(s1, hb, opts.link_latency, host_bps);
        world.net.connect(hb, s1, opts.link_latency, host_bps);
        senders.push(ha);
        receivers.push(hb);
    }

    // s0 <-> s1 (bottleneck)
    world.net.connect(s0, s1, opts.link_latency, bottleneck_bps);
    world.net.connect(s1, s0, opts.link_latency, bottleneck_bps);

    // MMU 配置必须在所有端口注册之后
    for sw in [s0, s1] {
        let mmu = &mut world.net.switch_mut(sw).expect("switch exists").mmu;
        mmu.config_headroom_all(opts.headroom_bytes);
        mmu.config_reserve_all(opts.reserve_bytes);
        mmu.config_resume_offset_all(opts.resume_offset_bytes);
        mmu.config_ecn_all(opts.ecn)?;
    }

    world.net.build_routes();
    Ok(Dumbbell {
        senders,
        receivers,
        s0,
        s1,
    })
}

/// 登记一条流：发端建发送队列对，收端预告期望大小。
#[allow(clippy::too_many_arguments)]
pub fn add_flow(
    world: &mut NetWorld,
    sim: &mut Simulator,
    src: NodeId,
    dst: NodeId,
    src_port: u16,
    dst_port: u16,
    priority: u32,
    size_bytes: u64,
    start_time: SimTime,
) -> Result<(), ConfigError> {
    let key = FlowKey::new(src, dst, src_port, dst_port);
    world
        .net
        .host_mut(src)
        .expect("sender is a host")
        .add_flow(key, priority, size_bytes, start_time, sim)?;
    world
        .net
        .host_mut(dst)
        .expect("receiver is a host")
        .expect_flow(key, size_bytes);
    Ok(())
}
