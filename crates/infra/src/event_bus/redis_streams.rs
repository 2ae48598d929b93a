//! Redis Streams-backed event bus (durable, at-least-once delivery).
//!
//! This implementation uses Redis Streams (XADD/XREADGROUP) to provide:
//! - **Durable delivery**: messages persist in the stream until acknowledged
//! - **Consumer groups**: all instances of the inventory service share one group,
//!   so each message lands on one instance instead of fanning out
//! - **Redelivery**: entries left pending by a dead consumer are reclaimed with XCLAIM
//!
//! ## Architecture
//!
//! - **Stream Key**: one stream per topic, `{stream_prefix}{topic}` (e.g. `stockledger:order.created`)
//! - **Consumers**: named consumers within the group (one per process)
//! - **Acknowledgement**: an entry is XACK'd once it is handed to the subscription
//! - **No dead-letter queue**: entries delivered more than `max_retries` times are
//!   logged and acknowledged (dropped)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, instrument, warn};

use stockledger_core::TenantId;
use stockledger_events::{inventory, order, EventBus, EventEnvelope, Subscription, TopicFilter};

use crate::config::BusConfig;

/// Entries pending longer than this are reclaimed from their consumer.
const DEFAULT_PENDING_TIMEOUT_MS: u64 = 60_000;

const READ_COUNT: usize = 10;
const BLOCK_MS: u64 = 1_000;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

type JsonEnvelope = EventEnvelope<JsonValue>;

#[derive(Debug, Clone)]
pub struct RedisStreamsEventBus {
    client: Arc<redis::Client>,
    stream_prefix: String,
    group: String,
    consumer: String,
    max_retries: u32,
    pending_timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RedisStreamsError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Consumer group error: {0}")]
    ConsumerGroup(String),
}

impl RedisStreamsEventBus {
    pub fn new(
        redis_url: impl AsRef<str>,
        stream_prefix: impl Into<String>,
        group: impl Into<String>,
        max_retries: u32,
    ) -> Result<Self, RedisStreamsError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            stream_prefix: stream_prefix.into(),
            group: group.into(),
            consumer: format!("consumer-{}", uuid::Uuid::now_v7()),
            max_retries,
            pending_timeout_ms: DEFAULT_PENDING_TIMEOUT_MS,
        })
    }

    pub fn from_config(config: &BusConfig) -> Result<Self, RedisStreamsError> {
        Self::new(
            &config.redis_url,
            config.stream_prefix.clone(),
            config.consumer_group.clone(),
            config.max_retries,
        )
    }

    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn stream_key(&self, topic: &str) -> String {
        format!("{}{}", self.stream_prefix, topic)
    }

    fn connection(&self) -> Result<redis::Connection, RedisStreamsError> {
        self.client
            .get_connection()
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))
    }

    /// Ensure the consumer group exists on `stream_key` (idempotent).
    pub fn ensure_consumer_group(
        &self,
        conn: &mut redis::Connection,
        stream_key: &str,
        group_name: &str,
    ) -> Result<(), RedisStreamsError> {
        // "$" starts the group at the stream tail; MKSTREAM creates the stream.
        let created: redis::RedisResult<String> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(stream_key)
            .arg(group_name)
            .arg("$")
            .arg("MKSTREAM")
            .query(conn);

        match created {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(RedisStreamsError::ConsumerGroup(format!(
                "XGROUP CREATE {stream_key} {group_name} failed: {e}"
            ))),
        }
    }

    #[instrument(
        skip(self, message),
        fields(topic = %message.topic(), tenant_id = %message.tenant_id(), key = %message.key()),
        err
    )]
    fn publish_sync(&self, message: JsonEnvelope) -> Result<(), RedisStreamsError> {
        let payload = serde_json::to_string(message.payload())
            .map_err(|e| RedisStreamsError::Serialization(e.to_string()))?;

        let mut conn = self.connection()?;

        let _: String = redis::cmd("XADD")
            .arg(self.stream_key(message.topic()))
            .arg("*")
            .arg("topic")
            .arg(message.topic())
            .arg("tenant_id")
            .arg(message.tenant_id().as_str())
            .arg("key")
            .arg(message.key())
            .arg("event_id")
            .arg(message.event_id().to_string())
            .arg("occurred_at")
            .arg(message.occurred_at().to_rfc3339())
            .arg("payload")
            .arg(&payload)
            .query(&mut conn)
            .map_err(|e| RedisStreamsError::Command(format!("XADD failed: {}", e)))?;

        Ok(())
    }

    fn acknowledge_sync(
        &self,
        conn: &mut redis::Connection,
        stream_key: &str,
        message_ids: &[String],
    ) -> Result<(), RedisStreamsError> {
        if message_ids.is_empty() {
            return Ok(());
        }

        let _: u64 = redis::cmd("XACK")
            .arg(stream_key)
            .arg(&self.group)
            .arg(message_ids)
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("XACK failed: {}", e)))?;

        Ok(())
    }

    /// Reclaim entries another consumer left pending for too long.
    ///
    /// Entries already delivered more than `max_retries` times are dropped.
    fn claim_idle_sync(
        &self,
        conn: &mut redis::Connection,
        stream_key: &str,
    ) -> Result<Vec<StreamMessage>, RedisStreamsError> {
        // Extended form: [[id, consumer, idle_ms, delivery_count], ...]
        let pending: Vec<(String, String, u64, u64)> = redis::cmd("XPENDING")
            .arg(stream_key)
            .arg(&self.group)
            .arg("IDLE")
            .arg(self.pending_timeout_ms)
            .arg("-")
            .arg("+")
            .arg(READ_COUNT)
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("XPENDING failed: {}", e)))?;

        if pending.is_empty() {
            return Ok(vec![]);
        }

        let mut exhausted = Vec::new();
        let mut retry = Vec::new();
        for (id, consumer, _, deliveries) in pending {
            if deliveries > u64::from(self.max_retries) {
                warn!(
                    stream_key,
                    message_id = %id,
                    consumer = %consumer,
                    deliveries,
                    "dropping message after max retries"
                );
                exhausted.push(id);
            } else {
                retry.push(id);
            }
        }
        self.acknowledge_sync(conn, stream_key, &exhausted)?;

        if retry.is_empty() {
            return Ok(vec![]);
        }

        let claimed: redis::Value = redis::cmd("XCLAIM")
            .arg(stream_key)
            .arg(&self.group)
            .arg(&self.consumer)
            .arg(self.pending_timeout_ms)
            .arg(&retry[..])
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("XCLAIM failed: {}", e)))?;

        Ok(parse_entries(stream_key, claimed))
    }

    /// Read new entries from all `stream_keys` (blocking up to `block_ms`).
    fn read_new_sync(
        &self,
        conn: &mut redis::Connection,
        stream_keys: &[String],
    ) -> Result<Vec<StreamMessage>, RedisStreamsError> {
        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(READ_COUNT)
            .arg("BLOCK")
            .arg(BLOCK_MS)
            .arg("STREAMS")
            .arg(stream_keys);
        for _ in stream_keys {
            cmd.arg(">");
        }

        let reply: redis::Value = cmd
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("XREADGROUP failed: {}", e)))?;

        // Reply: nil on timeout, else [[stream_key, [entry, ...]], ...]
        let mut messages = Vec::new();
        if let redis::Value::Bulk(streams) = reply {
            for stream in streams {
                let redis::Value::Bulk(mut parts) = stream else {
                    continue;
                };
                if parts.len() != 2 {
                    continue;
                }
                let entries = parts.pop().unwrap_or(redis::Value::Nil);
                let Some(stream_key) = value_string(&parts[0]) else {
                    continue;
                };
                messages.extend(parse_entries(&stream_key, entries));
            }
        }
        Ok(messages)
    }

    /// Subscribe through a named consumer group.
    ///
    /// A background thread polls the streams of `topics` and forwards decoded envelopes.
    /// `TopicFilter::All` subscribes to every order and inventory topic.
    pub fn subscribe_with_group(
        &self,
        group_name: &str,
        consumer_name: &str,
        topics: TopicFilter,
    ) -> Subscription<JsonEnvelope> {
        let mut bus = self.clone();
        bus.group = group_name.to_string();
        bus.consumer = consumer_name.to_string();

        let stream_keys: Vec<String> = match &topics {
            TopicFilter::All => order::TOPICS
                .iter()
                .chain(inventory::TOPICS.iter())
                .map(|t| bus.stream_key(t))
                .collect(),
            TopicFilter::Only(list) => list.iter().map(|t| bus.stream_key(t)).collect(),
        };

        let (tx, subscription) = Subscription::channel();
        std::thread::spawn(move || bus.poll_loop(stream_keys, tx));
        subscription
    }

    fn poll_loop(self, stream_keys: Vec<String>, tx: UnboundedSender<JsonEnvelope>) {
        let mut conn: Option<redis::Connection> = None;

        while !tx.is_closed() {
            if conn.is_none() {
                match self.prepare(&stream_keys) {
                    Ok(c) => conn = Some(c),
                    Err(e) => {
                        error!(group = %self.group, error = %e, "redis streams subscription unavailable");
                        std::thread::sleep(RECONNECT_DELAY);
                        continue;
                    }
                }
            }
            let Some(c) = conn.as_mut() else {
                continue;
            };

            match self.poll_once(c, &stream_keys, &tx) {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    error!(group = %self.group, error = %e, "failed to read from streams");
                    conn = None;
                    std::thread::sleep(RECONNECT_DELAY);
                }
            }
        }
        debug!(group = %self.group, consumer = %self.consumer, "redis streams subscription closed");
    }

    fn prepare(&self, stream_keys: &[String]) -> Result<redis::Connection, RedisStreamsError> {
        let mut conn = self.connection()?;
        for key in stream_keys {
            self.ensure_consumer_group(&mut conn, key, &self.group)?;
        }
        Ok(conn)
    }

    /// One claim + read round. Returns `Ok(false)` once the subscriber is gone.
    fn poll_once(
        &self,
        conn: &mut redis::Connection,
        stream_keys: &[String],
        tx: &UnboundedSender<JsonEnvelope>,
    ) -> Result<bool, RedisStreamsError> {
        let mut messages = Vec::new();
        for key in stream_keys {
            messages.extend(self.claim_idle_sync(conn, key)?);
        }
        messages.extend(self.read_new_sync(conn, stream_keys)?);

        for msg in messages {
            match msg.envelope {
                Ok(envelope) => {
                    if tx.send(envelope).is_err() {
                        // Left pending; another consumer reclaims it.
                        return Ok(false);
                    }
                }
                Err(reason) => {
                    warn!(stream_key = %msg.stream_key, message_id = %msg.message_id, %reason, "dropping undecodable stream entry");
                }
            }
            self.acknowledge_sync(conn, &msg.stream_key, std::slice::from_ref(&msg.message_id))?;
        }
        Ok(true)
    }
}

impl EventBus<JsonEnvelope> for RedisStreamsEventBus {
    type Error = RedisStreamsError;

    fn publish(&self, message: JsonEnvelope) -> Result<(), Self::Error> {
        self.publish_sync(message)
    }

    fn subscribe(&self, topics: TopicFilter) -> Subscription<JsonEnvelope> {
        self.subscribe_with_group(&self.group, &self.consumer, topics)
    }
}

/// Entry received from a stream; `envelope` is `Err` when the fields could not be decoded.
#[derive(Debug)]
struct StreamMessage {
    stream_key: String,
    message_id: String,
    envelope: Result<JsonEnvelope, String>,
}

fn value_string(value: &redis::Value) -> Option<String> {
    match value {
        redis::Value::Data(data) => Some(String::from_utf8_lossy(data).into_owned()),
        redis::Value::Status(s) => Some(s.clone()),
        _ => None,
    }
}

/// Parse `[[id, [field, value, ...]], ...]`; nil entries (deleted) are skipped.
fn parse_entries(stream_key: &str, entries: redis::Value) -> Vec<StreamMessage> {
    let redis::Value::Bulk(entries) = entries else {
        return vec![];
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let redis::Value::Bulk(parts) = entry else {
                return None;
            };
            let message_id = value_string(parts.first()?)?;
            let fields = match parts.get(1) {
                Some(redis::Value::Bulk(fields)) => fields
                    .chunks(2)
                    .filter_map(|pair| match pair {
                        [k, v] => Some((value_string(k)?, value_string(v)?)),
                        _ => None,
                    })
                    .collect::<HashMap<_, _>>(),
                _ => HashMap::new(),
            };
            Some(StreamMessage {
                stream_key: stream_key.to_string(),
                message_id,
                envelope: decode_fields(&fields),
            })
        })
        .collect()
}

fn decode_fields(fields: &HashMap<String, String>) -> Result<JsonEnvelope, String> {
    let field = |name: &str| {
        fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| format!("missing {name} field"))
    };

    let tenant_id = TenantId::parse(field("tenant_id")?).map_err(|e| e.to_string())?;
    let event_id = field("event_id")?
        .parse::<uuid::Uuid>()
        .map_err(|e| format!("invalid event_id: {e}"))?;
    let occurred_at = DateTime::parse_from_rfc3339(field("occurred_at")?)
        .map_err(|e| format!("invalid occurred_at: {e}"))?
        .with_timezone(&Utc);
    let payload: JsonValue =
        serde_json::from_str(field("payload")?).map_err(|e| format!("invalid payload: {e}"))?;

    Ok(EventEnvelope::new(
        event_id,
        tenant_id,
        field("topic")?,
        field("key")?,
        occurred_at,
        payload,
    ))
}
