//! Kafka backend.

use std::time::Duration;

use log::info;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};

use crate::{Delivery, Publisher, StartFrom, Subscriber, TransportError, TransportResult};

fn unavailable(e: impl std::fmt::Display) -> TransportError {
    TransportError::Unavailable(e.to_string())
}

/// Producer over `rdkafka`'s `FutureProducer`.
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn connect(brokers: &str) -> TransportResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("retries", "5")
            .set("retry.backoff.ms", "300")
            .create()
            .map_err(unavailable)?;
        info!("kafka producer connected to {brokers}");
        Ok(Self { producer })
    }
}

impl Publisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> TransportResult<()> {
        self.producer
            .send(
                FutureRecord::to(topic).key(key).payload(&payload),
                Timeout::After(Duration::from_secs(0)),
            )
            .await
            .map(|_| ())
            .map_err(|(e, _)| unavailable(e))
    }
}

/// Consumer-group member with manual offset commits.
pub struct KafkaSubscriber {
    consumer: StreamConsumer,
}

/// `auto.offset.reset` for a group with no committed offsets.
pub(crate) fn offset_reset(start: StartFrom) -> &'static str {
    match start {
        StartFrom::Earliest => "earliest",
        StartFrom::Latest => "latest",
    }
}

impl KafkaSubscriber {
    /// Join `group` on `topic`.  `start` only matters the first time the
    /// group is seen; afterwards its committed offsets win.
    pub fn connect(brokers: &str, group: &str, topic: &str, start: StartFrom) -> TransportResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", offset_reset(start))
            .create()
            .map_err(unavailable)?;
        consumer.subscribe(&[topic]).map_err(unavailable)?;
        info!("kafka consumer group {group:?} subscribed to {topic:?} (new groups start {start:?})");
        Ok(Self { consumer })
    }
}

impl Subscriber for KafkaSubscriber {
    async fn next(&mut self) -> TransportResult<Delivery> {
        let msg = self.consumer.recv().await.map_err(unavailable)?;
        Ok(Delivery {
            topic:     msg.topic().to_string(),
            partition: msg.partition().max(0) as u32,
            offset:    msg.offset().max(0) as u64,
            key:       msg.key().map(|k| String::from_utf8_lossy(k).into_owned()),
            payload:   msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    fn ack(&mut self, delivery: &Delivery) -> TransportResult<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &delivery.topic,
            delivery.partition as i32,
            Offset::Offset(delivery.offset as i64 + 1),
        )
        .map_err(unavailable)?;
        self.consumer.commit(&tpl, CommitMode::Async).map_err(unavailable)
    }
}
