//! End-to-end tests: a full bridge over a mock serial channel and loopback UDP

use approx::assert_relative_eq;
use std::net::UdpSocket;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use torque_bridge::config::BridgeConfig;
use torque_bridge::core::LogPayload;
use torque_bridge::protocol::{WireProtocol, encode_sample_frame, encode_torque};
use torque_bridge::recorder::{LogEntry, LogReader};
use torque_bridge::streaming::xml::SampleDocument;
use torque_bridge::transport::{MockTransport, Transport};
use torque_bridge::{Bridge, Error};

fn test_config(log_dir: &Path, peer: &UdpSocket) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.serial.port = "mock".to_string();
    config.network.host = "127.0.0.1".to_string();
    config.network.tx_port = peer.local_addr().unwrap().port();
    config.network.rx_port = 0;
    config.logging.directory = log_dir.to_path_buf();
    config
}

fn telemetry_peer() -> UdpSocket {
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    peer
}

fn receive_sample(peer: &UdpSocket) -> SampleDocument {
    let mut buf = [0u8; 2048];
    let (n, _) = peer.recv_from(&mut buf).unwrap();
    let text = std::str::from_utf8(&buf[..n]).unwrap();
    quick_xml::de::from_str(text).unwrap()
}

fn wait_for_writes(mock: &MockTransport, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while mock.writes().len() < count && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(mock.writes().len(), count, "timed out waiting for writes");
}

fn read_log(path: &Path) -> Vec<LogEntry> {
    LogReader::open(path).unwrap().read_all().unwrap()
}

#[test]
fn test_full_session() {
    let dir = tempfile::tempdir().unwrap();
    let peer = telemetry_peer();
    let mock = MockTransport::new();
    let bridge = Bridge::start(&test_config(dir.path(), &peer), Arc::new(mock.clone())).unwrap();

    // Leading garbage, then one valid frame
    let mut stream = vec![0x00, 0x42, 0x99];
    stream.extend_from_slice(&encode_sample_frame(0.25, -1.0));
    mock.inject_read(&stream);

    let doc = receive_sample(&peer);
    assert_relative_eq!(doc.delta, 0.25);
    assert_relative_eq!(doc.deltad, -1.0);
    assert_eq!(doc.cadence, 0.0);
    assert!(!doc.brake);

    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    let target = bridge.command_addr();
    client
        .send_to(b"<root><torque>10.0</torque></root>", target)
        .unwrap();
    wait_for_writes(&mock, 1);

    // Malformed and NaN commands write nothing; the next command still goes through
    client.send_to(b"<root><torque>1.0</root>", target).unwrap();
    client
        .send_to(b"<root><torque>nan</torque></root>", target)
        .unwrap();
    client
        .send_to(b"<root><torque>-1.5</torque></root>", target)
        .unwrap();
    wait_for_writes(&mock, 2);

    let report = bridge.shutdown().unwrap();
    assert!(report.zero_torque_sent);
    assert_eq!(report.samples_published, 1);
    assert_eq!(report.commands_written, 2);
    assert_eq!(report.records_logged, 4);

    assert_eq!(
        mock.writes(),
        vec![
            encode_torque(3.58).to_vec(),
            encode_torque(-1.5).to_vec(),
            encode_torque(0.0).to_vec(),
        ]
    );
    assert_eq!(mock.writes_after_close(), 0);
    assert!(!mock.is_open());

    let entries = read_log(&report.log_path);
    assert!(matches!(entries.first(), Some(LogEntry::Started(_))));
    assert!(matches!(entries.last(), Some(LogEntry::Stopped(_))));

    let payloads: Vec<LogPayload> = entries
        .iter()
        .filter_map(|e| match e {
            LogEntry::Record(r) => Some(r.payload),
            _ => None,
        })
        .collect();
    assert_eq!(payloads.len(), 4);
    assert!(matches!(payloads[0], LogPayload::Sample(s) if s.delta == 0.25));
    assert_eq!(payloads[1], LogPayload::Torque(10.0));
    assert!(matches!(payloads[2], LogPayload::Torque(t) if t.is_nan()));
    assert_eq!(payloads[3], LogPayload::Torque(-1.5));
}

#[test]
fn test_idle_session_still_zeroes_torque() {
    let dir = tempfile::tempdir().unwrap();
    let peer = telemetry_peer();
    let mock = MockTransport::new();
    let bridge = Bridge::start(&test_config(dir.path(), &peer), Arc::new(mock.clone())).unwrap();
    let log_path = bridge.log_path().to_path_buf();

    let report = bridge.shutdown().unwrap();
    assert_eq!(report.log_path, log_path);
    assert_eq!(report.records_logged, 0);
    assert_eq!(mock.last_write(), Some(encode_torque(0.0).to_vec()));

    let entries = read_log(&log_path);
    assert_eq!(entries.len(), 2);
    assert!(matches!(entries[0], LogEntry::Started(_)));
    assert!(matches!(entries[1], LogEntry::Stopped(_)));

    let name = log_path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("sensor_data_"));
    assert!(name.ends_with(".log"));
}

#[test]
fn test_csv_protocol_session() {
    let dir = tempfile::tempdir().unwrap();
    let peer = telemetry_peer();
    let mut config = test_config(dir.path(), &peer);
    config.serial.protocol = WireProtocol::Csv;
    config.control.torque_scale = 0.5;

    let mock = MockTransport::new();
    let bridge = Bridge::start(&config, Arc::new(mock.clone())).unwrap();

    mock.inject_read(b"0.1,0.2,55.0,1\n");
    let doc = receive_sample(&peer);
    assert_relative_eq!(doc.delta, 0.1);
    assert_relative_eq!(doc.deltad, 0.2);
    assert_relative_eq!(doc.cadence, 55.0);
    assert!(doc.brake);

    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    client
        .send_to(b"<root><torque>2.0</torque></root>", bridge.command_addr())
        .unwrap();
    wait_for_writes(&mock, 1);

    bridge.shutdown().unwrap();
    assert_eq!(mock.writes(), vec![b"1\n".to_vec(), b"0\n".to_vec()]);
}

#[test]
fn test_failed_zero_torque_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let peer = telemetry_peer();
    let mock = MockTransport::new();
    let bridge = Bridge::start(&test_config(dir.path(), &peer), Arc::new(mock.clone())).unwrap();

    mock.fail_next_write(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        "write timeout",
    ));
    let report = bridge.shutdown().unwrap();
    assert!(!report.zero_torque_sent);
    assert!(!mock.is_open());
}

#[test]
fn test_start_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let peer = telemetry_peer();
    let mut config = test_config(dir.path(), &peer);
    config.control.torque_limit = 0.0;

    let result = Bridge::start(&config, Arc::new(MockTransport::new()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unwritable_log_dir_starts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let peer = telemetry_peer();
    let command_port = {
        let reserved = UdpSocket::bind("127.0.0.1:0").unwrap();
        reserved.local_addr().unwrap().port()
    };
    let mut config = test_config(dir.path(), &peer);
    config.network.rx_port = command_port;
    config.logging.directory = dir.path().join("missing");

    let mock = MockTransport::new();
    let result = Bridge::start(&config, Arc::new(mock.clone()));
    assert!(matches!(result, Err(Error::Io(_))));

    // Nobody is left listening for commands or driving the device
    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    let _ = client.send_to(
        b"<root><torque>2.0</torque></root>",
        ("127.0.0.1", command_port),
    );
    std::thread::sleep(Duration::from_millis(150));
    assert!(mock.writes().is_empty());
    assert!(UdpSocket::bind(("127.0.0.1", command_port)).is_ok());
}
