//! Generic channel-status polling.
//!
//! Each polled device gets two halves sharing one consumer id: a
//! [`ChannelStatusPoller`] the scheduler refreshes, which sends a channel
//! status read, and a [`ChannelStatusListener`] on the bus, which reports
//! what comes back and tells the scheduler about it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use buspro_bus::{Bus, HandlerError, TelegramHandler};
use buspro_core::{Address, OperateCode, Telegram};
use buspro_scheduler::{RefreshConsumer, SchedulerHandle};

pub fn consumer_id(address: Address) -> String {
    format!("channels-{}-{}", address.subnet_id, address.device_id)
}

pub struct ChannelStatusPoller {
    bus: Arc<Bus>,
    address: Address,
}

impl ChannelStatusPoller {
    pub fn new(bus: Arc<Bus>, address: Address) -> Self {
        Self { bus, address }
    }
}

#[async_trait]
impl RefreshConsumer for ChannelStatusPoller {
    async fn refresh(&self) -> anyhow::Result<()> {
        let request = self
            .bus
            .telegram(self.address, OperateCode::READ_STATUS_OF_CHANNELS, Vec::new())
            .await;
        if !self.bus.send(&request).await? {
            anyhow::bail!("status read for {} was not sent", self.address);
        }
        Ok(())
    }
}

pub struct ChannelStatusListener {
    consumer_id: String,
    scheduler: SchedulerHandle,
}

impl ChannelStatusListener {
    pub fn new(address: Address, scheduler: SchedulerHandle) -> Self {
        Self {
            consumer_id: consumer_id(address),
            scheduler,
        }
    }
}

impl TelegramHandler for ChannelStatusListener {
    fn on_telegram(&self, telegram: &Telegram) -> Result<(), HandlerError> {
        let code = telegram.operate_code;

        if code == OperateCode::READ_STATUS_OF_CHANNELS_RESPONSE {
            // payload: channel count, then one level per channel
            let Some((&count, levels)) = telegram.payload.split_first() else {
                return Err(HandlerError::failed("empty channel status payload"));
            };
            let levels = &levels[..levels.len().min(usize::from(count))];
            println!(
                "{} {} channels={} levels={:?}",
                chrono::Local::now().format("%H:%M:%S"),
                telegram.source_address,
                count,
                levels
            );
            info!(category = "poll", device = %telegram.source_address, channels = count, "Channel status");
            self.scheduler.notify(self.consumer_id.as_str(), true);
        } else if code == OperateCode::SINGLE_CHANNEL_CONTROL_RESPONSE {
            // Unsolicited; keep the planned read.
            self.scheduler.notify(self.consumer_id.as_str(), false);
        }
        Ok(())
    }
}
