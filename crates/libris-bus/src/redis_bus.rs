//! Redis pub/sub-backed event bus.
//!
//! Redis pub/sub is not durable: a subscriber that is offline when an event is
//! published never sees it. Projections rebuilt from the log are the recovery
//! path.

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

use libris_core::bus::{BusMessage, EventBus, EventBusError, MessageStream};
use libris_core::event_store::StoredEvent;

fn transport(e: &redis::RedisError) -> EventBusError {
    EventBusError::Transport(e.to_string())
}

/// Redis pub/sub bus publishing each event on the channel named by its kind.
#[derive(Clone)]
pub struct RedisEventBus {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl RedisEventBus {
    /// Opens a publishing connection to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `EventBusError::Transport` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, EventBusError> {
        let client = redis::Client::open(redis_url).map_err(|e| transport(&e))?;
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| transport(&e))?;
        Ok(Self { client, publisher })
    }
}

impl std::fmt::Debug for RedisEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEventBus")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    #[instrument(skip(self, event), fields(event_type = %event.event_type), err)]
    async fn publish(&self, event: &StoredEvent) -> Result<(), EventBusError> {
        let message = BusMessage::encode(event)?;
        let mut conn = self.publisher.clone();
        let receivers: i64 = conn
            .publish(&message.channel, &message.payload)
            .await
            .map_err(|e| transport(&e))?;
        debug!(receivers, "event published");
        Ok(())
    }

    async fn subscribe(&self, channels: &[String]) -> Result<MessageStream, EventBusError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| transport(&e))?;
        for channel in channels {
            pubsub.subscribe(channel).await.map_err(|e| transport(&e))?;
        }

        let stream = pubsub.into_on_message().map(|msg| {
            let channel = msg.get_channel_name().to_owned();
            msg.get_payload::<String>()
                .map(|payload| BusMessage { channel, payload })
                .map_err(|e| transport(&e))
        });
        Ok(Box::pin(stream))
    }
}
