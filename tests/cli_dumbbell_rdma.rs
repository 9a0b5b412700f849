use serde_json::Value;
use std::process::Command;

#[test]
fn dumbbell_rdma_completes_and_reports_json_summary() {
    let output = Command::new(env!("CARGO_BIN_EXE_dumbbell_rdma"))
        .args([
            "--quiet",
            "--pairs",
            "1",
            "--flow-bytes",
            "100000",
            "--until-ms",
            "50",
        ])
        .output()
        .expect("run dumbbell_rdma");
    assert!(
        output.status.success(),
        "dumbbell_rdma failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let v: Value = serde_json::from_str(&stdout).expect("parse summary json");

    assert_eq!(v.get("all_acked").and_then(|b| b.as_bool()), Some(true));
    assert_eq!(
        v.get("delivered_bytes").and_then(|n| n.as_u64()),
        Some(100_000)
    );
    assert_eq!(v.get("ingress_drops").and_then(|n| n.as_u64()), Some(0));

    let hosts = v.get("hosts").and_then(|h| h.as_array()).expect("hosts");
    assert_eq!(hosts.len(), 2);
    let acked: u64 = hosts
        .iter()
        .filter_map(|h| h.get("acked_completed_flows").and_then(|n| n.as_u64()))
        .sum();
    assert_eq!(acked, 1);
}

#[test]
fn dumbbell_rdma_scales_to_multiple_pairs() {
    let output = Command::new(env!("CARGO_BIN_EXE_dumbbell_rdma"))
        .args([
            "--quiet",
            "--pairs",
            "3",
            "--flow-bytes",
            "50000",
            "--until-ms",
            "50",
        ])
        .output()
        .expect("run dumbbell_rdma");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let v: Value = serde_json::from_str(&stdout).expect("parse summary json");
    assert_eq!(v.get("all_acked").and_then(|b| b.as_bool()), Some(true));
    assert_eq!(
        v.get("delivered_bytes").and_then(|n| n.as_u64()),
        Some(150_000)
    );
}

#[test]
fn dumbbell_rdma_rejects_unknown_retransmission_mode() {
    let output = Command::new(env!("CARGO_BIN_EXE_dumbbell_rdma"))
        .args(["--quiet", "--rtx-mode", "B20"])
        .output()
        .expect("run dumbbell_rdma");
    assert!(!output.status.success(), "expected non-zero exit");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unknown L2 retransmission mode"),
        "stderr did not contain expected message: {stderr}"
    );
}

#[test]
fn dumbbell_rdma_rejects_inverted_ecn_thresholds() {
    let output = Command::new(env!("CARGO_BIN_EXE_dumbbell_rdma"))
        .args(["--quiet", "--ecn-kmin", "5000", "--ecn-kmax", "1000"])
        .output()
        .expect("run dumbbell_rdma");
    assert!(!output.status.success(), "expected non-zero exit");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ECN thresholds inverted"));
}
