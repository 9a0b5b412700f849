//! Dumbbell 拓扑 RDMA 实验
//!
//! 左右各 n 台主机经由 s0 <-> s1 瓶颈互发单流：PFC + ECN + DCQCN + IRN。

use clap::Parser;
use rocesim::host::{CcMode, HostPortConfig, RtxMode};
use rocesim::mmu::{EcnConfig, MmuConfig};
use rocesim::net::NetWorld;
use rocesim::sim::{SimTime, Simulator};
use rocesim::topo::dumbbell::{DumbbellOpts, add_flow, build_dumbbell};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "dumbbell-rdma", about = "Dumbbell 拓扑仿真：n 对主机单流 RDMA")]
struct Args {
    /// 收发主机对数
    #[arg(long, default_value_t = 2)]
    pairs: usize,

    /// 每条流要发送的数据量（字节）
    #[arg(long, default_value_t = 1_000_000)]
    flow_bytes: u64,

    #[arg(long, default_value_t = 100)]
    host_link_gbps: u64,

    #[arg(long, default_value_t = 25)]
    bottleneck_gbps: u64,

    /// 单向链路传播时延（微秒）
    #[arg(long, default_value_t = 1)]
    link_latency_us: u64,

    #[arg(long, default_value_t = 1500)]
    mtu: u32,

    /// 重传模式：NONE | IRN
    #[arg(long, default_value = "IRN")]
    rtx_mode: String,

    /// 拥塞控制模式：NONE | DCQCN
    #[arg(long, default_value = "DCQCN")]
    cc_mode: String,

    /// ECN kmin（字节）；kmax 为 0 时不开启 ECN
    #[arg(long, default_value_t = 30_000)]
    ecn_kmin: u64,

    #[arg(long, default_value_t = 120_000)]
    ecn_kmax: u64,

    #[arg(long, default_value_t = 0.2)]
    ecn_pmax: f64,

    /// MMU 动态 PFC 阈值开关
    #[arg(long, default_value_t = false)]
    dynamic_threshold: bool,

    #[arg(long, default_value_t = 2)]
    dynamic_threshold_shift: u32,

    /// 每个 (端口, 优先级) 的 headroom（字节）
    #[arg(long, default_value_t = 100 * 1024)]
    headroom_bytes: u64,

    #[arg(long, default_value_t = 4 * 1024)]
    reserve_bytes: u64,

    /// 仿真运行到多少毫秒
    #[arg(long, default_value_t = 100)]
    until_ms: u64,

    /// 不打印日志（JSON 摘要仍输出到 stdout）
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct HostSummary {
    name: String,
    tx_bytes: u64,
    rx_bytes: u64,
    irn_rtx_bytes: u64,
    irn_rtx_rx_bytes: u64,
    tx_completed_flows: u32,
    acked_completed_flows: u32,
    rx_completed_flows: u32,
}

#[derive(Debug, Serialize)]
struct Summary {
    now_ns: u64,
    delivered_pkts: u64,
    delivered_bytes: u64,
    ingress_drops: u64,
    all_acked: bool,
    hosts: Vec<HostSummary>,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if args.quiet {
            tracing_subscriber::EnvFilter::new("off")
        } else {
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        })
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let mut host = HostPortConfig {
        mtu_bytes: args.mtu,
        ..HostPortConfig::default()
    };
    host.rtx_mode = RtxMode::from_str(&args.rtx_mode).unwrap_or_else(|e| {
        eprintln!("invalid --rtx-mode: {e}");
        std::process::exit(2);
    });
    host.cc_mode = CcMode::from_str(&args.cc_mode).unwrap_or_else(|e| {
        eprintln!("invalid --cc-mode: {e}");
        std::process::exit(2);
    });

    let ecn = if args.ecn_kmax > 0 {
        EcnConfig::new(args.ecn_kmin, args.ecn_kmax, args.ecn_pmax).unwrap_or_else(|e| {
            eprintln!("invalid ECN config: {e}");
            std::process::exit(2);
        })
    } else {
        EcnConfig::default()
    };

    let opts = DumbbellOpts {
        n_pairs: args.pairs,
        host_link_gbps: args.host_link_gbps,
        bottleneck_gbps: args.bottleneck_gbps,
        link_latency: SimTime::from_micros(args.link_latency_us),
        host,
        mmu: MmuConfig {
            dynamic_threshold: args.dynamic_threshold,
            dynamic_threshold_shift: args.dynamic_threshold_shift,
            ..MmuConfig::default()
        },
        headroom_bytes: args.headroom_bytes,
        reserve_bytes: args.reserve_bytes,
        ..DumbbellOpts::default()
    };

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();

    let topo = build_dumbbell(&mut world, &opts).unwrap_or_else(|e| {
        eprintln!("topology construction failed: {e}");
        std::process::exit(2);
    });

    for i in 0..args.pairs {
        let port = 10_000 + i as u16;
        add_flow(
            &mut world,
            &mut sim,
            topo.senders[i],
            topo.receivers[i],
            port,
            port,
            0,
            args.flow_bytes,
            SimTime::ZERO,
        )
        .unwrap_or_else(|e| {
            eprintln!("flow registration failed: {e}");
            std::process::exit(2);
        });
    }

    sim.run_until(SimTime::from_millis(args.until_ms), &mut world);

    let mut hosts = Vec::new();
    let mut all_acked = true;
    for &id in topo.senders.iter().chain(topo.receivers.iter()) {
        let h = world.net.host(id).expect("host exists");
        let s = h.port.stats;
        hosts.push(HostSummary {
            name: h.name().to_string(),
            tx_bytes: s.tx_bytes,
            rx_bytes: s.rx_bytes,
            irn_rtx_bytes: s.irn_rtx_bytes,
            irn_rtx_rx_bytes: s.irn_rtx_rx_bytes,
            tx_completed_flows: s.tx_completed_flows,
            acked_completed_flows: s.acked_completed_flows,
            rx_completed_flows: s.rx_completed_flows,
        });
    }
    for &id in &topo.senders {
        let h = world.net.host(id).expect("host exists");
        for qp in h.port.tx_queue_pairs() {
            if !qp.is_acked_finished() {
                all_acked = false;
                tracing::warn!(key = ?qp.key, remain = qp.remain_bytes(), "流未在期限内完成");
            }
        }
    }

    let summary = Summary {
        now_ns: sim.now().0,
        delivered_pkts: world.net.stats.delivered_pkts,
        delivered_bytes: world.net.stats.delivered_bytes,
        ingress_drops: world.net.stats.ingress_drops,
        all_acked,
        hosts,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).expect("serialize summary")
    );
}
