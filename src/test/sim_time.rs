use crate::sim::SimTime;

#[test]
fn unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(2), SimTime(2_000_000));
    assert_eq!(SimTime::from_secs(3), SimTime(3_000_000_000));
    assert_eq!(SimTime::ZERO, SimTime(0));
}

#[test]
fn for_bytes_at_rounds_up_to_whole_nanoseconds() {
    // 1500 字节 @ 100 Gbps = 120 ns 整
    assert_eq!(
        SimTime::for_bytes_at(1500, 100_000_000_000),
        SimTime(120)
    );
    // 64 字节 @ 100 Gbps = 5.12 ns，向上取整
    assert_eq!(SimTime::for_bytes_at(64, 100_000_000_000), SimTime(6));
    // 1 字节 @ 1 bps = 8e9 ns
    assert_eq!(SimTime::for_bytes_at(1, 1), SimTime(8_000_000_000));
}

#[test]
fn for_bytes_at_zero_rate_is_effectively_never() {
    let t = SimTime::for_bytes_at(100, 0);
    assert!(t > SimTime::from_secs(1_000_000));
}

#[test]
fn saturating_add_does_not_wrap() {
    assert_eq!(SimTime::MAX.saturating_add(SimTime(1)), SimTime::MAX);
    assert_eq!(SimTime(1).saturating_add(SimTime(2)), SimTime(3));
}
