//! Bus façade tests over real loopback sockets.

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;

use buspro_bus::{handler_fn, Bus, BusError};
use buspro_core::codec::{decode, encode, MAX_PAYLOAD_LEN};
use buspro_core::{Address, BusConfig, OperateCode, Telegram};

const WAIT: Duration = Duration::from_secs(2);

async fn fake_gateway() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

fn config_for(gateway: &UdpSocket) -> BusConfig {
    let port = gateway.local_addr().unwrap().port();
    BusConfig::default()
        .with_gateway("127.0.0.1", port)
        .with_listen("127.0.0.1", 0)
        .with_settle_delay_ms(10)
}

async fn recv_telegram(socket: &UdpSocket) -> Telegram {
    let mut buf = [0u8; 512];
    let (n, _) = timeout(WAIT, socket.recv_from(&mut buf))
        .await
        .expect("gateway did not receive a datagram")
        .unwrap();
    decode(&buf[..n], None).unwrap()
}

#[tokio::test]
async fn test_send_reaches_gateway() {
    let gateway = fake_gateway().await;
    let bus = Bus::new(config_for(&gateway).with_source_address(Address::new(1, 200))).unwrap();
    bus.start().await.unwrap();

    let telegram = Telegram::new(
        Address::new(1, 10),
        OperateCode::SINGLE_CHANNEL_CONTROL,
        vec![1, 100, 0, 0],
    );
    assert!(bus.send(&telegram).await.unwrap());

    let received = recv_telegram(&gateway).await;
    assert_eq!(received.source_address, Address::new(1, 200));
    assert_eq!(received.target_address, Address::new(1, 10));
    assert_eq!(received.operate_code, OperateCode::SINGLE_CHANNEL_CONTROL);
    assert_eq!(received.payload, vec![1, 100, 0, 0]);
    assert_eq!(bus.stats().sent, 1);

    bus.stop().await;
}

#[tokio::test]
async fn test_inbound_telegram_is_dispatched() {
    let gateway = fake_gateway().await;
    let bus = Bus::new(config_for(&gateway)).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register(
        Address::new(1, 10),
        handler_fn(move |t| {
            let _ = tx.send(t.clone());
            Ok(())
        }),
    );
    bus.start().await.unwrap();
    let bus_addr = bus.local_addr().await.unwrap();

    let response = Telegram::new(
        Address::CONTROLLER,
        OperateCode::SINGLE_CHANNEL_CONTROL_RESPONSE,
        vec![1, 0xF8, 100, 1, 0],
    )
    .with_source(Address::new(1, 10));
    gateway
        .send_to(&encode(&response).unwrap(), bus_addr)
        .await
        .unwrap();

    let delivered = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(delivered, response);
    assert_eq!(delivered.sender, Some(gateway.local_addr().unwrap()));

    bus.stop().await;
}

#[tokio::test]
async fn test_bad_datagrams_are_dropped_and_counted() {
    let gateway = fake_gateway().await;
    let bus = Bus::new(config_for(&gateway)).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register(
        Address::new(1, 10),
        handler_fn(move |t| {
            let _ = tx.send(t.payload.clone());
            Ok(())
        }),
    );
    bus.start().await.unwrap();
    let bus_addr = bus.local_addr().await.unwrap();

    let good = Telegram::new(Address::CONTROLLER, OperateCode::new(0x0034), vec![1, 2, 3])
        .with_source(Address::new(1, 10));
    let raw = encode(&good).unwrap();
    let mut corrupted = raw.clone();
    corrupted[26] ^= 0x40;

    gateway.send_to(&raw[..10], bus_addr).await.unwrap();
    gateway.send_to(&corrupted, bus_addr).await.unwrap();
    gateway.send_to(&raw, bus_addr).await.unwrap();

    let payload = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(payload, vec![1, 2, 3]);

    // Stopping joins the receive loop, so all counters are final.
    bus.stop().await;
    let stats = bus.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.framing_errors, 1);
    assert_eq!(stats.checksum_errors, 1);
    assert_eq!(stats.decoded, 1);
    assert_eq!(stats.dispatched, 1);
}

#[tokio::test]
async fn test_lifecycle() {
    let gateway = fake_gateway().await;
    let bus = Bus::new(config_for(&gateway)).unwrap();
    let telegram = Telegram::new(Address::new(1, 10), OperateCode::READ_STATUS_OF_CHANNELS, vec![]);

    assert!(!bus.is_running().await);
    assert!(!bus.send(&telegram).await.unwrap());

    bus.start().await.unwrap();
    assert!(bus.is_running().await);
    assert!(matches!(bus.start().await, Err(BusError::AlreadyRunning)));

    bus.stop().await;
    assert!(!bus.is_running().await);
    assert!(!bus.send(&telegram).await.unwrap());
    assert_eq!(bus.stats().send_failures, 2);

    // Restart after stop.
    bus.start().await.unwrap();
    assert!(bus.send(&telegram).await.unwrap());
    recv_telegram(&gateway).await;
    bus.stop().await;
}

#[tokio::test]
async fn test_oversized_payload_is_an_error() {
    let gateway = fake_gateway().await;
    let bus = Bus::new(config_for(&gateway)).unwrap();
    bus.start().await.unwrap();

    let telegram = Telegram::new(
        Address::new(1, 10),
        OperateCode::new(0x0001),
        vec![0; MAX_PAYLOAD_LEN + 1],
    );
    assert!(matches!(bus.send(&telegram).await, Err(BusError::Encode(_))));
    bus.stop().await;
}

#[tokio::test]
async fn test_reconfigure_switches_gateway() {
    let old_gateway = fake_gateway().await;
    let new_gateway = fake_gateway().await;
    let bus = Bus::new(config_for(&old_gateway)).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register(
        Address::new(2, 5),
        handler_fn(move |_| {
            let _ = tx.send(());
            Ok(())
        }),
    );
    bus.start().await.unwrap();

    bus.reconfigure(config_for(&new_gateway)).await.unwrap();
    assert!(bus.is_running().await);
    assert_eq!(
        bus.config().await.gateway_port,
        new_gateway.local_addr().unwrap().port()
    );

    let telegram = Telegram::new(Address::new(2, 5), OperateCode::READ_STATUS_OF_CHANNELS, vec![]);
    assert!(bus.send(&telegram).await.unwrap());
    let received = recv_telegram(&new_gateway).await;
    assert_eq!(received.target_address, Address::new(2, 5));

    // Registrations survive the restart.
    let bus_addr = bus.local_addr().await.unwrap();
    let reply = Telegram::new(Address::CONTROLLER, OperateCode::new(0x0034), vec![1])
        .with_source(Address::new(2, 5));
    new_gateway
        .send_to(&encode(&reply).unwrap(), bus_addr)
        .await
        .unwrap();
    timeout(WAIT, rx.recv()).await.unwrap().unwrap();

    bus.stop().await;
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = BusConfig::default().with_gateway("127.0.0.1", 0);
    assert!(matches!(Bus::new(config), Err(BusError::Config(_))));
}
