use crate::net::{Ecn, LinkId, NodeId, Packet, PacketBody, QbbFlag, QbbHeader};
use crate::switch::{QueuedPacket, SwitchPort};

fn data_pkt(id: u64, priority: u32, size: u32) -> QueuedPacket {
    QueuedPacket {
        pkt: Packet {
            id,
            src: NodeId(0),
            dst: NodeId(1),
            size_bytes: size,
            priority,
            ecn: Ecn::Ect0,
            body: PacketBody::Data(QbbHeader {
                src_port: 1,
                dst_port: 1,
                seq: 0,
                irn_ack: 0,
                irn_nack: 0,
                flag: QbbFlag::None,
                cnp: false,
            }),
        },
        in_port: 0,
    }
}

fn port(n_priorities: u32) -> SwitchPort {
    SwitchPort::new(LinkId(0), NodeId(1), n_priorities)
}

#[test]
fn control_queue_is_served_first() {
    let mut p = port(2);
    p.enqueue(0, data_pkt(1, 0, 100));
    p.enqueue(2, data_pkt(2, 2, 64)); // 控制队列索引 = n_priorities
    p.enqueue(1, data_pkt(3, 1, 100));

    let (item, qindex) = p.dequeue().expect("pkt");
    assert_eq!(item.pkt.id, 2);
    assert_eq!(qindex, 2);
}

#[test]
fn paused_control_queue_lets_data_through() {
    let mut p = port(2);
    p.enqueue(2, data_pkt(1, 2, 64));
    p.enqueue(0, data_pkt(2, 0, 100));
    p.paused[2] = true;

    let (item, qindex) = p.dequeue().expect("pkt");
    assert_eq!(item.pkt.id, 2);
    assert_eq!(qindex, 0);
}

#[test]
fn round_robin_never_serves_a_paused_priority() {
    let mut p = port(2);
    p.enqueue(0, data_pkt(1, 0, 100));
    p.enqueue(0, data_pkt(2, 0, 100));
    p.enqueue(1, data_pkt(3, 1, 100));
    p.paused[0] = true;

    let (item, _) = p.dequeue().expect("pkt");
    assert_eq!(item.pkt.id, 3);
    // 只剩被暂停的优先级时不出队
    assert!(p.dequeue().is_none());
    assert_eq!(p.queued_packets(), 2);

    p.paused[0] = false;
    assert_eq!(p.dequeue().expect("pkt").0.pkt.id, 1);
}

#[test]
fn round_robin_serves_every_backlogged_priority() {
    let mut p = port(2);
    p.enqueue(0, data_pkt(1, 0, 100));
    p.enqueue(0, data_pkt(2, 0, 100));
    p.enqueue(1, data_pkt(3, 1, 100));
    p.enqueue(1, data_pkt(4, 1, 100));

    let mut served = Vec::new();
    while let Some((_, qindex)) = p.dequeue() {
        served.push(qindex);
    }
    // 游标停留在上次服务的队列：先清空 0 再轮到 1
    assert_eq!(served, vec![0, 0, 1, 1]);
    assert_eq!(p.queued_packets(), 0);
    assert_eq!(p.queued_bytes(), 0);
}

#[test]
fn byte_and_packet_accounting_follow_the_queues() {
    let mut p = port(1);
    assert_eq!(p.queued_bytes(), 0);
    p.enqueue(0, data_pkt(1, 0, 100));
    p.enqueue(0, data_pkt(2, 0, 200));
    assert_eq!(p.queued_packets(), 2);
    assert_eq!(p.queued_bytes(), 300);
    assert_eq!(p.queued_packets_at(0), 2);

    p.dequeue().expect("pkt");
    assert_eq!(p.queued_packets(), 1);
    assert_eq!(p.queued_bytes(), 200);
}
