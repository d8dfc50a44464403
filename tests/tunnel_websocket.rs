//! Integration tests for the WebSocket tunnel
//!
//! These tests run the tunnel against a local tokio-tungstenite server
//! standing in for the gateway and verify:
//! - Handshake path, query and subprotocol
//! - Frame delivery in both directions
//! - Idle receive timeout
//! - Clean close and connection failures

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use rac_console::error::TunnelError;
use rac_console::tunnel::{
    GatewayEndpoint, HandshakeParams, Tunnel, TunnelStatus, TUNNEL_SUBPROTOCOL,
};

struct Gateway {
    uri: String,
    protocol: Option<String>,
    ws: WebSocketStream<TcpStream>,
}

async fn listen() -> (TcpListener, Tunnel, mpsc::UnboundedReceiver<TunnelStatus>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = GatewayEndpoint::new(addr.to_string(), false)
        .tunnel_url("abc123")
        .unwrap();
    let (tunnel, status) = Tunnel::new(url);
    (listener, tunnel, status)
}

async fn accept(listener: &TcpListener) -> Gateway {
    let (stream, _) = listener.accept().await.unwrap();
    let mut seen = None;

    let callback = |req: &Request, mut resp: Response| -> Result<Response, ErrorResponse> {
        let protocol = req
            .headers()
            .get("Sec-WebSocket-Protocol")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(protocol) = &protocol {
            resp.headers_mut()
                .insert("Sec-WebSocket-Protocol", protocol.parse().unwrap());
        }
        seen = Some((req.uri().to_string(), protocol));
        Ok(resp)
    };
    let ws = tokio_tungstenite::accept_hdr_async(stream, callback)
        .await
        .unwrap();

    let (uri, protocol) = seen.unwrap();
    Gateway { uri, protocol, ws }
}

async fn next_status(status: &mut mpsc::UnboundedReceiver<TunnelStatus>) -> TunnelStatus {
    tokio::time::timeout(Duration::from_secs(5), status.recv())
        .await
        .expect("no tunnel status")
        .expect("status channel closed")
}

#[tokio::test]
async fn test_handshake_and_frames() {
    let (listener, mut tunnel, mut status) = listen().await;
    let mut inbound = tunnel.take_inbound().unwrap();

    tunnel
        .connect(&HandshakeParams::new(1280, 720).encode())
        .unwrap();
    let mut gateway = accept(&listener).await;

    assert_eq!(
        gateway.uri,
        "/ws/rac/abc123/?screen_width=1280&screen_height=720&screen_dpi=96"
    );
    assert_eq!(gateway.protocol.as_deref(), Some(TUNNEL_SUBPROTOCOL));
    assert_eq!(next_status(&mut status).await, TunnelStatus::Open);
    assert!(tunnel.is_connected());

    gateway
        .ws
        .send(Message::Text("4.sync,1.0;".to_string()))
        .await
        .unwrap();
    gateway
        .ws
        .send(Message::Binary(b"5.ready;".to_vec()))
        .await
        .unwrap();
    assert_eq!(inbound.recv().await.unwrap(), "4.sync,1.0;");
    assert_eq!(inbound.recv().await.unwrap(), "5.ready;");

    tunnel.send("3.nop;").unwrap();
    let frame = gateway.ws.next().await.unwrap().unwrap();
    assert_eq!(frame, Message::Text("3.nop;".to_string()));

    tunnel.disconnect();
    assert_eq!(next_status(&mut status).await, TunnelStatus::Closed);
}

#[tokio::test]
async fn test_gateway_close_is_not_an_error() {
    let (listener, mut tunnel, mut status) = listen().await;

    tunnel.connect("").unwrap();
    let mut gateway = accept(&listener).await;
    assert_eq!(next_status(&mut status).await, TunnelStatus::Open);

    gateway.ws.close(None).await.unwrap();
    assert_eq!(next_status(&mut status).await, TunnelStatus::Closed);
}

#[tokio::test]
async fn test_abnormal_close_is_an_error() {
    let (listener, mut tunnel, mut status) = listen().await;

    tunnel.connect("").unwrap();
    let mut gateway = accept(&listener).await;
    assert_eq!(next_status(&mut status).await, TunnelStatus::Open);

    gateway
        .ws
        .close(Some(CloseFrame {
            code: CloseCode::Error,
            reason: "upstream failure".into(),
        }))
        .await
        .unwrap();
    assert_eq!(
        next_status(&mut status).await,
        TunnelStatus::Error(TunnelError::Closed {
            code: 1011,
            reason: "upstream failure".to_string(),
        })
    );
}

#[tokio::test]
async fn test_idle_timeout_ignores_outbound_traffic() {
    let (listener, mut tunnel, mut status) = listen().await;
    tunnel.set_receive_timeout(Duration::from_millis(300));

    tunnel.connect("").unwrap();
    let mut gateway = accept(&listener).await;
    assert_eq!(next_status(&mut status).await, TunnelStatus::Open);

    // Keep sending; only received frames count as activity
    let sender = tokio::spawn(async move {
        for _ in 0..20 {
            if tunnel.send("3.nop;").is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tunnel
    });
    let drain = tokio::spawn(async move { while gateway.ws.next().await.is_some() {} });

    assert_eq!(
        next_status(&mut status).await,
        TunnelStatus::Error(TunnelError::Timeout(Duration::from_millis(300)))
    );

    let _tunnel = sender.await.unwrap();
    drain.abort();
}

#[tokio::test]
async fn test_refused_connection_reports_error() {
    let (listener, mut tunnel, mut status) = listen().await;
    drop(listener);

    tunnel.connect("").unwrap();
    assert!(matches!(
        next_status(&mut status).await,
        TunnelStatus::Error(TunnelError::ConnectFailed(_))
    ));
}
