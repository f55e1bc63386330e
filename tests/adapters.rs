//! Adapter tests against local mock services.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::*;
use identity_rotator::config::TorConfig;
use identity_rotator::probe::{HttpIpProbe, IpLookup, ProbeError, ProbeRoute};
use identity_rotator::strategy::{TorController, TorError};

const TIMEOUT: Duration = Duration::from_secs(5);

fn controller(addr: std::net::SocketAddr, password: Option<&str>) -> TorController {
    TorController::from_config(&TorConfig {
        control_addr: addr.to_string(),
        control_password: password.map(String::from),
        connect_timeout_secs: 2,
        ..TorConfig::default()
    })
}

// =============================================================================
// IP probe
// =============================================================================

#[tokio::test]
async fn test_probe_parses_trailing_newline() {
    let (addr, hits) = start_echo_backend("198.51.100.23").await;
    let probe = HttpIpProbe::new(format!("http://{}/", addr)).unwrap();

    let ip = probe.probe(&ProbeRoute::Direct, TIMEOUT).await.unwrap();

    assert_eq!(ip.to_string(), "198.51.100.23");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_probe_accepts_ipv6() {
    let (addr, _) = start_echo_backend("2001:db8::7").await;
    let probe = HttpIpProbe::new(format!("http://{}/", addr)).unwrap();

    let ip = probe.probe(&ProbeRoute::Direct, TIMEOUT).await.unwrap();
    assert!(ip.is_ipv6());
}

#[tokio::test]
async fn test_probe_reports_error_status() {
    let (addr, _) = start_backend(503, "busy").await;
    let probe = HttpIpProbe::new(format!("http://{}/", addr)).unwrap();

    let err = probe.probe(&ProbeRoute::Direct, TIMEOUT).await.unwrap_err();
    assert_eq!(err, ProbeError::Status(503));
}

#[tokio::test]
async fn test_probe_rejects_non_ip_body() {
    let (addr, _) = start_echo_backend("<html>captive portal</html>").await;
    let probe = HttpIpProbe::new(format!("http://{}/", addr)).unwrap();

    let err = probe.probe(&ProbeRoute::Direct, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ProbeError::InvalidBody(_)));
}

#[tokio::test]
async fn test_probe_through_http_proxy() {
    let (echo, echo_hits) = start_echo_backend("198.51.100.1").await;
    let (proxy, proxy_hits) = start_echo_backend("203.0.113.44").await;
    let probe = HttpIpProbe::new(format!("http://{}/", echo)).unwrap();

    let route = ProbeRoute::Proxy(format!("http://{}", proxy));
    let ip = probe.probe(&route, TIMEOUT).await.unwrap();

    assert_eq!(ip.to_string(), "203.0.113.44");
    assert_eq!(proxy_hits.load(Ordering::SeqCst), 1);
    assert_eq!(echo_hits.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Tor control port
// =============================================================================

#[tokio::test]
async fn test_newnym_without_password() {
    let port = start_control_port(vec!["250 OK\r\n", "250 OK\r\n"]).await;

    controller(port.addr, None).new_identity().await.unwrap();

    assert_eq!(
        *port.received.lock().unwrap(),
        vec!["AUTHENTICATE".to_string(), "SIGNAL NEWNYM".to_string()]
    );
}

#[tokio::test]
async fn test_password_is_quoted() {
    let port = start_control_port(vec!["250 OK\r\n", "250 OK\r\n"]).await;

    controller(port.addr, Some(r#"pa"ss\word"#)).new_identity().await.unwrap();

    assert_eq!(
        port.received.lock().unwrap()[0],
        r#"AUTHENTICATE "pa\"ss\\word""#
    );
}

#[tokio::test]
async fn test_multi_line_reply_is_read_to_final_line() {
    let port = start_control_port(vec![
        "250-AUTH ok\r\n250+note=\r\nsome data\r\n.\r\n250 OK\r\n",
        "250 OK\r\n",
    ])
    .await;

    controller(port.addr, None).new_identity().await.unwrap();
    assert_eq!(port.received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_signal_rejected() {
    let port = start_control_port(vec!["250 OK\r\n", "552 Unrecognized signal\r\n"]).await;

    let err = controller(port.addr, None).new_identity().await.unwrap_err();
    assert!(matches!(err, TorError::SignalRejected(_)));
}

#[tokio::test]
async fn test_four_digit_status_is_malformed() {
    let port = start_control_port(vec!["2500 OK\r\n"]).await;

    let err = controller(port.addr, None).new_identity().await.unwrap_err();
    assert!(matches!(err, TorError::Protocol(_)));
}

#[tokio::test]
async fn test_closed_without_reply_is_protocol_error() {
    let port = start_control_port(vec![]).await;

    let err = controller(port.addr, None).new_identity().await.unwrap_err();
    assert!(matches!(err, TorError::Protocol(_)));
}

#[tokio::test]
async fn test_nothing_listening() {
    let err = controller(closed_addr(), None).new_identity().await.unwrap_err();
    assert!(matches!(err, TorError::ConnectionRefused(_)));
}
