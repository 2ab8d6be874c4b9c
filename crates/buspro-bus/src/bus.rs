//! The bus façade.
//!
//! [`Bus`] composes the UDP transport, the telegram codec and the dispatcher
//! into one start/stop-able unit. It is meant to be shared behind an `Arc`;
//! every method takes `&self`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use buspro_core::codec::{self, TelegramCodec};
use buspro_core::config::BusConfig;
use buspro_core::{Address, Telegram};

use crate::dispatcher::{Dispatcher, SharedHandler};
use crate::error::{BusError, BusResult};
use crate::stats::{BusStats, BusStatsSnapshot};
use crate::transport::{ReceiveCallback, UdpTransport};

struct BusState {
    config: BusConfig,
    transport: Option<UdpTransport>,
}

/// Start/stop-able composition of transport, codec and dispatcher.
pub struct Bus {
    state: Mutex<BusState>,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<BusStats>,
}

impl Bus {
    /// Create a stopped bus. The configuration is validated here; sockets are
    /// only opened by [`Bus::start`].
    pub fn new(config: BusConfig) -> BusResult<Self> {
        config.validate()?;
        let dispatcher = Dispatcher::new().with_match_target(config.match_target);
        Ok(Self {
            state: Mutex::new(BusState {
                config,
                transport: None,
            }),
            dispatcher: Arc::new(dispatcher),
            stats: Arc::new(BusStats::new()),
        })
    }

    /// Bind the socket and begin delivering telegrams.
    pub async fn start(&self) -> BusResult<()> {
        let mut state = self.state.lock().await;
        if state.transport.as_ref().is_some_and(UdpTransport::is_running) {
            return Err(BusError::AlreadyRunning);
        }

        let mut transport = UdpTransport::from_config(&state.config)?;
        transport.start(self.receive_callback()).await?;

        info!(
            category = "transport",
            gateway = %transport.gateway_addr(),
            source = %state.config.source_address,
            "Bus started"
        );
        state.transport = Some(transport);
        Ok(())
    }

    /// Stop receiving and close the socket. Registrations are kept.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut transport) = state.transport.take() {
            transport.stop().await;
            info!(category = "transport", "Bus stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        let state = self.state.lock().await;
        state.transport.as_ref().is_some_and(UdpTransport::is_running)
    }

    /// Address the socket is bound to, once started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let state = self.state.lock().await;
        state.transport.as_ref().and_then(UdpTransport::local_addr)
    }

    pub async fn config(&self) -> BusConfig {
        self.state.lock().await.config.clone()
    }

    /// Apply new settings: stop, wait the settle delay, start again.
    ///
    /// Handlers stay registered. If the bus was stopped it is left stopped
    /// with the new configuration in place.
    pub async fn reconfigure(&self, config: BusConfig) -> BusResult<()> {
        config.validate()?;

        let was_running = self.is_running().await;
        if was_running {
            self.stop().await;
            tokio::time::sleep(Duration::from_millis(config.settle_delay_ms)).await;
        }

        info!(
            category = "transport",
            gateway_host = %config.gateway_host,
            gateway_port = config.gateway_port,
            "Bus reconfigured"
        );
        self.dispatcher.set_match_target(config.match_target);
        self.state.lock().await.config = config;

        if was_running {
            self.start().await?;
        }
        Ok(())
    }

    /// Encode and send one telegram to the gateway.
    ///
    /// The configured source address is stamped on the outgoing frame.
    /// Returns `Ok(false)` when the bus is stopped or the socket rejected the
    /// datagram; encode failures are errors.
    pub async fn send(&self, telegram: &Telegram) -> BusResult<bool> {
        let state = self.state.lock().await;

        let mut outgoing = telegram.clone();
        outgoing.source_address = state.config.source_address;
        let bytes = TelegramCodec::new(state.config.origin_ip).encode(&outgoing)?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            echo_outgoing(&bytes);
        }

        let sent = match state.transport.as_ref() {
            Some(transport) => transport.send(&bytes).await,
            None => {
                warn!(
                    category = "transport",
                    to = %outgoing.target_address,
                    "Send while bus is stopped, dropping telegram"
                );
                false
            }
        };
        self.stats.record_send(sent);
        Ok(sent)
    }

    /// Convenience for building a telegram from the configured source.
    pub async fn telegram(
        &self,
        target: Address,
        operate_code: buspro_core::OperateCode,
        payload: Vec<u8>,
    ) -> Telegram {
        let source = self.state.lock().await.config.source_address;
        Telegram::new(target, operate_code, payload).with_source(source)
    }

    pub fn register(&self, address: Address, handler: SharedHandler) -> bool {
        self.dispatcher.register(address, handler)
    }

    pub fn unregister(&self, address: Address, handler: &SharedHandler) -> bool {
        self.dispatcher.unregister(address, handler)
    }

    pub fn register_all_messages(&self, handler: SharedHandler) {
        self.dispatcher.register_all_messages(handler);
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.snapshot()
    }

    fn receive_callback(&self) -> ReceiveCallback {
        let dispatcher = self.dispatcher.clone();
        let stats = self.stats.clone();

        Arc::new(move |raw: &[u8], peer: SocketAddr| {
            stats.record_received();
            match codec::decode(raw, Some(peer)) {
                Ok(telegram) => {
                    stats.record_decoded();
                    debug!(category = "codec", peer = %peer, telegram = %telegram, "Telegram received");
                    let report = dispatcher.on_telegram(&telegram);
                    stats.record_dispatch(&report);
                }
                Err(e) if e.is_framing() => {
                    stats.record_framing_error();
                    warn!(
                        category = "codec",
                        peer = %peer,
                        len = raw.len(),
                        error = %e,
                        "Dropping malformed datagram"
                    );
                }
                Err(e) => {
                    stats.record_checksum_error();
                    error!(
                        category = "codec",
                        peer = %peer,
                        error = %e,
                        "Dropping corrupted datagram"
                    );
                }
            }
        })
    }
}

fn echo_outgoing(bytes: &[u8]) {
    match codec::decode(bytes, None) {
        Ok(echo) => debug!(category = "codec", telegram = %echo, "Telegram sent"),
        Err(e) => error!(category = "codec", error = %e, "Outgoing telegram does not decode"),
    }
}
