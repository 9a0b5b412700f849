use crate::error::ProtocolViolation;
use crate::rdma::{FlowKey, RxIrnState, RxIrnWindow, TxIrnState, TxIrnWindow, fnv1a};
use crate::net::NodeId;

#[test]
fn sequence_numbers_start_at_one_and_grow() {
    let mut w = TxIrnWindow::new();
    assert_eq!(w.base_seq(), 1);
    assert_eq!(w.next_sequence_number(), 1);

    assert_eq!(w.send_new_packet(1000), 1);
    assert_eq!(w.send_new_packet(1000), 2);
    assert_eq!(w.send_new_packet(500), 3);
    assert_eq!(w.window_size(), 3);
    assert_eq!(w.state(1), TxIrnState::Unack);
    assert_eq!(w.state(4), TxIrnState::Undef);
    assert_eq!(w.payload_bytes(3).expect("in window"), 500);
}

#[test]
fn ack_trims_the_acknowledged_prefix() {
    let mut w = TxIrnWindow::new();
    w.send_new_packet(1000);
    w.send_new_packet(1000);
    w.send_new_packet(1000);

    w.ack(2).expect("ack");
    // 前缀仍未确认，base 不动
    assert_eq!(w.base_seq(), 1);
    assert_eq!(w.state(2), TxIrnState::Ack);

    w.ack(1).expect("ack");
    // 1、2 连续确认，一起裁掉
    assert_eq!(w.base_seq(), 3);
    assert_eq!(w.window_size(), 1);
    // 窗口以下的序号视为已确认
    assert_eq!(w.state(1), TxIrnState::Ack);
}

#[test]
fn base_seq_is_monotone() {
    let mut w = TxIrnWindow::new();
    let mut last_base = w.base_seq();
    for _ in 0..10 {
        w.send_new_packet(100);
    }
    for seq in [3, 1, 2, 7, 5, 4, 6, 10, 9, 8] {
        w.ack(seq).expect("ack");
        assert!(w.base_seq() >= last_base);
        last_base = w.base_seq();
    }
    assert_eq!(w.base_seq(), 11);
    assert_eq!(w.window_size(), 0);
}

#[test]
fn ack_is_idempotent_but_rejects_never_sent() {
    let mut w = TxIrnWindow::new();
    w.send_new_packet(100);
    w.ack(1).expect("ack");
    // 已确认的重复确认是幂等的
    w.ack(1).expect("idempotent ack");

    assert_eq!(
        w.ack(10).unwrap_err(),
        ProtocolViolation::AckOutOfWindow {
            seq: 10,
            base: 2,
            next: 2
        }
    );
}

#[test]
fn sack_marks_the_gap_nack_and_the_reported_slot_ack() {
    // 发 1,2,3；对端收到 1,3 → SACK(ack=3, expected=2)
    let mut w = TxIrnWindow::new();
    w.send_new_packet(100);
    w.send_new_packet(100);
    w.send_new_packet(100);
    w.ack(1).expect("ack");

    w.sack(3, 2).expect("sack");
    assert_eq!(w.state(2), TxIrnState::Nack);
    assert_eq!(w.state(3), TxIrnState::Ack);
    assert_eq!(w.base_seq(), 2);

    // 空洞补上后窗口整体推进
    w.ack(2).expect("ack");
    assert_eq!(w.base_seq(), 4);
    assert_eq!(w.window_size(), 0);
}

#[test]
fn sack_on_resolved_slot_is_a_protocol_violation() {
    let mut w = TxIrnWindow::new();
    w.send_new_packet(100);
    w.send_new_packet(100);
    w.send_new_packet(100);
    w.sack(3, 2).expect("sack");

    // slot 3 已是 Ack
    assert!(matches!(
        w.sack(3, 2).unwrap_err(),
        ProtocolViolation::InvalidSack { seq: 3, .. }
    ));
    // 窗口之外
    assert!(matches!(
        w.sack(9, 2).unwrap_err(),
        ProtocolViolation::SeqOutOfWindow { seq: 9, .. }
    ));
}

#[test]
fn rx_window_fills_holes_with_nack_on_reorder() {
    let mut w = RxIrnWindow::new();
    assert_eq!(w.next_sequence_number(), 1);

    w.update(1);
    assert_eq!(w.base_seq(), 2);

    // 2 丢失，先到 4：2、3 补为 Nack
    w.update(4);
    assert_eq!(w.state(2), RxIrnState::Nack);
    assert_eq!(w.state(3), RxIrnState::Nack);
    assert!(w.is_received(4));
    assert_eq!(w.base_seq(), 2);

    w.update(2);
    assert_eq!(w.base_seq(), 3);
    w.update(3);
    assert_eq!(w.base_seq(), 5);
    assert_eq!(w.next_sequence_number(), 5);
}

#[test]
fn rx_window_duplicate_update_is_a_noop() {
    let mut w = RxIrnWindow::new();
    w.update(1);
    w.update(3);
    let base = w.base_seq();
    w.update(3);
    w.update(1);
    assert_eq!(w.base_seq(), base);
    assert!(w.is_received(3));
    assert_eq!(w.state(2), RxIrnState::Nack);
}

#[test]
fn flow_key_hash_is_stable_and_direction_sensitive() {
    let k = FlowKey::new(NodeId(1), NodeId(2), 1000, 2000);
    assert_eq!(k.hash(), k.hash());
    assert_ne!(k.hash(), k.swapped().hash());
    assert_eq!(k.swapped().swapped(), k);
}

#[test]
fn fnv1a_matches_reference_vectors() {
    // 标准 FNV-1a 64 位测试向量
    assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
    assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
}
