use crate::error::ConfigError;
use crate::mmu::{EcnConfig, MmuConfig, SwitchMmu};

/// 1 个端口、1 个数据优先级（+1 控制队列）的 MMU。
/// `buffer` 取 2*(reserve+headroom) 时共享池恰好为 0。
fn mmu_one_port(buffer: u64, reserve: u64, headroom: u64) -> SwitchMmu {
    let mut mmu = SwitchMmu::new(MmuConfig {
        buffer_bytes: buffer,
        n_priorities: 1,
        dynamic_threshold: false,
        dynamic_threshold_shift: 0,
        seed: 1,
    })
    .expect("valid config");
    mmu.add_port();
    mmu.config_reserve_all(reserve);
    mmu.config_headroom_all(headroom);
    mmu
}

#[test]
fn shared_pool_is_buffer_minus_reserved_and_headroom() {
    let mmu = mmu_one_port(3000, 1000, 500);
    // 两个队列（数据 + 控制）各占 reserve+headroom
    assert_eq!(mmu.shared_buffer_size(), 0);

    let mmu = mmu_one_port(10_000, 1000, 500);
    assert_eq!(mmu.shared_buffer_size(), 10_000 - 2 * 1500);
}

#[test]
fn admission_denied_when_shared_and_headroom_both_full() {
    // reserve=1000, headroom=500, 共享池 0
    let mut mmu = mmu_one_port(3000, 1000, 500);

    // 大于 headroom 的包直接拒绝
    assert!(!mmu.check_ingress_admission(0, 0, 1200));
    assert!(!mmu.check_ingress_admission(0, 0, 2000));

    // 预留内的包被接纳并计入 ingress
    assert!(mmu.check_ingress_admission(0, 0, 400));
    mmu.update_ingress_admission(0, 0, 400);
    assert!(mmu.check_ingress_admission(0, 0, 400));
    mmu.update_ingress_admission(0, 0, 400);
    assert_eq!(mmu.queue(0, 0).ingress_used, 800);
    assert_eq!(mmu.queue(0, 0).headroom_used, 0);

    // 超出预留且共享池为 0：整包计入 headroom
    mmu.update_ingress_admission(0, 0, 400);
    assert!(mmu.check_ingress_admission(0, 0, 400));
    mmu.update_ingress_admission(0, 0, 400);
    assert_eq!(mmu.queue(0, 0).headroom_used, 400);

    // headroom 也装不下了
    assert!(!mmu.check_ingress_admission(0, 0, 400));
}

#[test]
fn admitted_usage_never_exceeds_reserve_plus_headroom() {
    let mut mmu = mmu_one_port(3000, 1000, 500);
    let reserve = 1000;
    let headroom = 500;

    // 只在准入通过时计费，占用必须始终不超过 reserve+headroom
    for size in [300, 300, 300, 300, 300, 300, 300] {
        if mmu.check_ingress_admission(0, 0, size) {
            mmu.update_ingress_admission(0, 0, size);
        }
        let q = mmu.queue(0, 0);
        assert!(q.ingress_used + q.headroom_used <= reserve + headroom);
    }
}

#[test]
fn release_returns_headroom_first() {
    let mut mmu = mmu_one_port(3000, 1000, 500);
    for _ in 0..3 {
        mmu.update_ingress_admission(0, 0, 400);
    }
    assert_eq!(mmu.queue(0, 0).ingress_used, 1200);
    assert_eq!(mmu.queue(0, 0).headroom_used, 400);

    mmu.remove_from_ingress_admission(0, 0, 400);
    assert_eq!(mmu.queue(0, 0).headroom_used, 0);
    assert_eq!(mmu.queue(0, 0).ingress_used, 1200);

    mmu.remove_from_ingress_admission(0, 0, 1200);
    assert_eq!(mmu.queue(0, 0).ingress_used, 0);
}

#[test]
fn pause_fires_once_when_headroom_goes_positive() {
    let mut mmu = mmu_one_port(3000, 1000, 500);
    mmu.update_ingress_admission(0, 0, 1000);
    assert!(!mmu.check_should_send_pfc_pause(0, 0));

    // headroom_used 0 -> 40
    mmu.update_ingress_admission(0, 0, 40);
    assert_eq!(mmu.queue(0, 0).headroom_used, 40);
    assert!(mmu.check_should_send_pfc_pause(0, 0));
    mmu.set_pause(0, 0);
    assert!(mmu.is_paused(0, 0));

    // 没有中间的 resume 就绝不重复 pause
    mmu.update_ingress_admission(0, 0, 40);
    assert!(!mmu.check_should_send_pfc_pause(0, 0));
}

#[test]
fn resume_requires_headroom_drained() {
    let mut mmu = mmu_one_port(3000, 1000, 500);
    mmu.update_ingress_admission(0, 0, 1000);
    mmu.update_ingress_admission(0, 0, 40);
    mmu.set_pause(0, 0);

    // headroom_used > 0 期间绝不 resume
    assert!(!mmu.check_should_send_pfc_resume(0, 0));

    mmu.remove_from_ingress_admission(0, 0, 40);
    assert_eq!(mmu.queue(0, 0).headroom_used, 0);
    assert!(mmu.check_should_send_pfc_resume(0, 0));
    mmu.set_resume(0, 0);
    assert!(!mmu.is_paused(0, 0));
    assert!(!mmu.check_should_send_pfc_resume(0, 0));
}

#[test]
fn dynamic_threshold_shifts_shared_remain() {
    let mut mmu = SwitchMmu::new(MmuConfig {
        buffer_bytes: 10_000,
        n_priorities: 1,
        dynamic_threshold: true,
        dynamic_threshold_shift: 2,
        seed: 1,
    })
    .expect("valid config");
    mmu.add_port();
    mmu.config_reserve_all(1000);
    mmu.config_headroom_all(500);

    let shared = 10_000 - 2 * 1500;
    assert_eq!(mmu.pfc_threshold(), shared >> 2);

    // 共享占用增长后阈值随剩余量收缩
    mmu.update_ingress_admission(0, 0, 1000);
    mmu.update_ingress_admission(0, 0, 2000);
    assert_eq!(mmu.shared_buffer_used(0, 0), 2000);
    assert_eq!(mmu.pfc_threshold(), (shared - 2000) >> 2);
}

#[test]
fn dynamic_pause_on_shared_threshold_without_headroom() {
    let mut mmu = SwitchMmu::new(MmuConfig {
        buffer_bytes: 10_000,
        n_priorities: 1,
        dynamic_threshold: true,
        dynamic_threshold_shift: 2,
        seed: 1,
    })
    .expect("valid config");
    mmu.add_port();
    mmu.config_reserve_all(1000);
    mmu.config_headroom_all(500);

    // 把共享占用推过动态阈值；headroom 仍为 0 也应请求 Pause
    mmu.update_ingress_admission(0, 0, 1000);
    while mmu.shared_buffer_used(0, 0) < mmu.pfc_threshold() {
        mmu.update_ingress_admission(0, 0, 100);
    }
    assert_eq!(mmu.queue(0, 0).headroom_used, 0);
    assert!(mmu.check_should_send_pfc_pause(0, 0));
}

#[test]
fn ecn_marks_above_kmax_never_below_kmin() {
    let mut mmu = mmu_one_port(1_000_000, 1000, 500);
    mmu.config_ecn_all(EcnConfig::new(1000, 2000, 1.0).expect("valid ecn"))
        .expect("config");

    // qlen <= kmin：从不标记
    mmu.update_egress_admission(0, 0, 1000);
    assert!(!mmu.check_should_set_ecn(0, 0));

    // qlen > kmax：必标记
    mmu.update_egress_admission(0, 0, 1500);
    assert!(mmu.check_should_set_ecn(0, 0));

    mmu.remove_from_egress_admission(0, 0, 2500);
    assert_eq!(mmu.queue(0, 0).egress_used, 0);
    assert!(!mmu.check_should_set_ecn(0, 0));
}

#[test]
fn ecn_between_thresholds_marks_with_pmax_one() {
    let mut mmu = mmu_one_port(1_000_000, 1000, 500);
    mmu.config_ecn_all(EcnConfig::new(1000, 2000, 1.0).expect("valid ecn"))
        .expect("config");

    // kmin < qlen <= kmax 且 pmax=1：概率为 (qlen-kmin)/(kmax-kmin)
    mmu.update_egress_admission(0, 0, 1999);
    let mut marked = 0;
    for _ in 0..100 {
        if mmu.check_should_set_ecn(0, 0) {
            marked += 1;
        }
    }
    // p = 0.999，100 次抽样全不中的概率可忽略
    assert!(marked > 0);
}

#[test]
fn ecn_never_marks_control_priority() {
    let mut mmu = mmu_one_port(1_000_000, 1000, 500);
    mmu.config_ecn_all(EcnConfig::new(0, 1, 1.0).expect("valid ecn"))
        .expect("config");
    let ctrl = mmu.control_priority();
    mmu.update_egress_admission(0, ctrl, 1_000_000);
    assert!(!mmu.check_should_set_ecn(0, ctrl));
}

#[test]
fn ecn_config_validation_rejects_bad_parameters() {
    assert_eq!(
        EcnConfig::new(2000, 1000, 0.5).unwrap_err(),
        ConfigError::EcnThresholdInverted {
            kmin: 2000,
            kmax: 1000
        }
    );
    assert!(matches!(
        EcnConfig::new(1000, 2000, 1.5).unwrap_err(),
        ConfigError::EcnProbabilityOutOfRange(_)
    ));
}

#[test]
fn zero_priorities_is_rejected() {
    assert!(matches!(
        SwitchMmu::new(MmuConfig {
            n_priorities: 0,
            ..MmuConfig::default()
        }),
        Err(ConfigError::PriorityOutOfRange { .. })
    ));
}
