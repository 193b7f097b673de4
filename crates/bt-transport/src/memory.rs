//! In-process partitioned log broker.
//!
//! Each topic is a fixed number of append-only partition logs.  A record's
//! partition is the FxHash of its key modulo the partition count, so one
//! vehicle's events stay in order.  Consumer groups keep one committed
//! offset per partition; a new subscriber starts from its group's committed
//! offsets, or from [`StartFrom`] if the group has never been seen on the
//! topic.
//!
//! Retention: once every group on a topic has committed past a record it is
//! released.  Each partition also holds at most `retention` records; when
//! that cap is hit the oldest are dropped and a consumer still behind them
//! skips ahead.  Offsets never change when records are released.
//!
//! Waiting subscribers are woken through a `watch` channel whose value is
//! bumped on every append.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use rustc_hash::FxHasher;
use tokio::sync::watch;

use crate::{Delivery, Publisher, Subscriber, TransportError, TransportResult};

pub const DEFAULT_PARTITIONS: u32 = 8;

/// Records kept per partition when nobody has consumed them.
pub const DEFAULT_RETENTION: usize = 100_000;

/// Where a consumer group that has no committed offsets begins reading.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum StartFrom {
    /// The first record still in each partition.
    #[default]
    Earliest,
    /// Only records appended after the group is created.
    Latest,
}

/// Partitions `0..count` owned by `worker` out of `workers`.
pub fn assign_partitions(count: u32, workers: u32, worker: u32) -> Vec<u32> {
    let workers = workers.max(1);
    (0..count).filter(|p| p % workers == worker).collect()
}

// ── Broker state ──────────────────────────────────────────────────────────────

struct Record {
    key:     String,
    payload: Vec<u8>,
}

#[derive(Default)]
struct PartitionLog {
    /// Offset of `records[0]`.
    base:    u64,
    records: VecDeque<Record>,
}

impl PartitionLog {
    /// Offset the next appended record gets.
    fn end(&self) -> u64 {
        self.base + self.records.len() as u64
    }

    fn get(&self, offset: u64) -> Option<&Record> {
        let index = offset.checked_sub(self.base)?;
        self.records.get(usize::try_from(index).ok()?)
    }

    fn push(&mut self, record: Record, retention: usize) -> u64 {
        let offset = self.end();
        self.records.push_back(record);
        while self.records.len() > retention.max(1) {
            self.records.pop_front();
            self.base += 1;
        }
        offset
    }

    /// Drop every record below `offset`; returns how many went.
    fn release_below(&mut self, offset: u64) -> usize {
        let mut released = 0;
        while self.base < offset && self.records.pop_front().is_some() {
            self.base += 1;
            released += 1;
        }
        released
    }
}

struct Topic {
    logs:   Vec<PartitionLog>,
    /// Next offset to read, per group, per partition.
    groups: HashMap<String, Vec<u64>>,
}

impl Topic {
    fn new(partitions: u32) -> Self {
        Self {
            logs:   (0..partitions).map(|_| PartitionLog::default()).collect(),
            groups: HashMap::new(),
        }
    }

    fn join(&mut self, group: &str, start: StartFrom) -> Vec<u64> {
        let logs = &self.logs;
        self.groups
            .entry(group.to_string())
            .or_insert_with(|| match start {
                StartFrom::Earliest => logs.iter().map(|l| l.base).collect(),
                StartFrom::Latest => logs.iter().map(PartitionLog::end).collect(),
            })
            .clone()
    }

    /// Release what every group has committed on `partition`.
    fn release(&mut self, partition: usize) -> usize {
        let floor = self.groups.values().filter_map(|offsets| offsets.get(partition)).min().copied();
        match (floor, self.logs.get_mut(partition)) {
            (Some(floor), Some(log)) => log.release_below(floor),
            _ => 0,
        }
    }
}

struct Inner {
    partitions: u32,
    retention:  usize,
    topics:     Mutex<HashMap<String, Topic>>,
    available:  AtomicBool,
    appended:   watch::Sender<u64>,
}

// ── MemoryBroker ──────────────────────────────────────────────────────────────

/// Shared handle to an in-process broker.  Cloning is cheap.
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITIONS)
    }
}

impl MemoryBroker {
    /// A broker whose topics each have `partitions` partitions (at least 1).
    pub fn new(partitions: u32) -> Self {
        Self::with_retention(partitions, DEFAULT_RETENTION)
    }

    /// Like [`new`](Self::new), keeping at most `retention` records per
    /// partition (at least 1).
    pub fn with_retention(partitions: u32, retention: usize) -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                partitions: partitions.max(1),
                retention:  retention.max(1),
                topics:     Mutex::new(HashMap::new()),
                available:  AtomicBool::new(true),
                appended,
            }),
        }
    }

    #[inline]
    pub fn partitions(&self) -> u32 {
        self.inner.partitions
    }

    /// A publishing handle.
    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer { broker: self.clone() }
    }

    /// Simulate an outage: while unavailable, publish and `next` fail with
    /// [`TransportError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
        self.notify();
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    /// Subscribe `group` to every partition of `topic`.
    pub fn subscribe(&self, topic: &str, group: &str, start: StartFrom) -> TransportResult<MemorySubscriber> {
        self.subscribe_partitions(topic, group, start, (0..self.partitions()).collect())
    }

    /// Subscribe `group` to a subset of `topic`'s partitions.
    pub fn subscribe_partitions(
        &self,
        topic:      &str,
        group:      &str,
        start:      StartFrom,
        partitions: Vec<u32>,
    ) -> TransportResult<MemorySubscriber> {
        if !self.is_available() {
            return Err(TransportError::Unavailable("broker offline".to_string()));
        }
        if let Some(&p) = partitions.iter().find(|&&p| p >= self.partitions()) {
            return Err(TransportError::NoSuchPartition {
                topic:     topic.to_string(),
                partition: p,
                count:     self.partitions(),
            });
        }

        let committed = {
            let mut topics = self.lock();
            topics
                .entry(topic.to_string())
                .or_insert_with(|| Topic::new(self.partitions()))
                .join(group, start)
        };
        let positions = partitions.iter().map(|&p| committed[p as usize]).collect();
        debug!("group {group:?} subscribed to {topic:?} partitions {partitions:?}");

        Ok(MemorySubscriber {
            broker: self.clone(),
            topic: topic.to_string(),
            group: group.to_string(),
            partitions,
            positions,
            cursor: 0,
            appended: self.inner.appended.subscribe(),
        })
    }

    /// Partition a record with this key is written to.
    pub fn partition_for(&self, key: &str) -> u32 {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions() as u64) as u32
    }

    /// Total records ever appended to `topic`.
    pub fn topic_len(&self, topic: &str) -> u64 {
        self.lock()
            .get(topic)
            .map_or(0, |t| t.logs.iter().map(PartitionLog::end).sum())
    }

    /// Records of `topic` still held in memory.
    pub fn retained_len(&self, topic: &str) -> usize {
        self.lock()
            .get(topic)
            .map_or(0, |t| t.logs.iter().map(|l| l.records.len()).sum())
    }

    /// Committed offset of `group` on one partition, if the group exists.
    pub fn committed(&self, topic: &str, group: &str, partition: u32) -> Option<u64> {
        self.lock()
            .get(topic)?
            .groups
            .get(group)?
            .get(partition as usize)
            .copied()
    }

    fn append(&self, topic: &str, key: &str, payload: Vec<u8>) -> TransportResult<(u32, u64)> {
        if !self.is_available() {
            return Err(TransportError::Unavailable("broker offline".to_string()));
        }
        let partition = self.partition_for(key);
        let offset = {
            let mut topics = self.lock();
            let log = &mut topics
                .entry(topic.to_string())
                .or_insert_with(|| Topic::new(self.partitions()))
                .logs[partition as usize];
            log.push(Record { key: key.to_string(), payload }, self.inner.retention)
        };
        self.notify();
        Ok((partition, offset))
    }

    fn notify(&self) {
        self.inner.appended.send_modify(|v| *v = v.wrapping_add(1));
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Topic>> {
        self.inner.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Producer ──────────────────────────────────────────────────────────────────

/// Publishing handle onto a [`MemoryBroker`].
#[derive(Clone)]
pub struct MemoryProducer {
    broker: MemoryBroker,
}

impl Publisher for MemoryProducer {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> TransportResult<()> {
        self.broker.append(topic, key, payload).map(|_| ())
    }
}

// ── Subscriber ────────────────────────────────────────────────────────────────

/// One consumer of a topic on behalf of a group.
pub struct MemorySubscriber {
    broker:     MemoryBroker,
    topic:      String,
    group:      String,
    partitions: Vec<u32>,
    /// Next offset to read, parallel to `partitions`.
    positions:  Vec<u64>,
    /// Round-robin start so one busy partition cannot starve the rest.
    cursor:     usize,
    appended:   watch::Receiver<u64>,
}

impl MemorySubscriber {
    pub fn partitions(&self) -> &[u32] {
        &self.partitions
    }

    fn poll(&mut self) -> Option<Delivery> {
        let n = self.partitions.len();
        if n == 0 {
            return None;
        }
        let topics = self.broker.lock();
        let topic = topics.get(&self.topic)?;
        for i in 0..n {
            let slot = (self.cursor + i) % n;
            let partition = self.partitions[slot];
            let log = &topic.logs[partition as usize];
            if self.positions[slot] < log.base {
                warn!(
                    "group {:?} lost {} records on {}/{partition} to retention",
                    self.group,
                    log.base - self.positions[slot],
                    self.topic
                );
                self.positions[slot] = log.base;
            }
            let offset = self.positions[slot];
            if let Some(record) = log.get(offset) {
                self.positions[slot] += 1;
                self.cursor = (slot + 1) % n;
                return Some(Delivery {
                    topic: self.topic.clone(),
                    partition,
                    offset,
                    key: Some(record.key.clone()),
                    payload: record.payload.clone(),
                });
            }
        }
        None
    }
}

impl Subscriber for MemorySubscriber {
    async fn next(&mut self) -> TransportResult<Delivery> {
        loop {
            // Mark the current version seen before looking, so an append that
            // races with the scan still wakes the wait below.
            self.appended.borrow_and_update();
            if !self.broker.is_available() {
                return Err(TransportError::Unavailable("broker offline".to_string()));
            }
            if let Some(delivery) = self.poll() {
                return Ok(delivery);
            }
            self.appended.changed().await.map_err(|_| TransportError::Closed)?;
        }
    }

    fn ack(&mut self, delivery: &Delivery) -> TransportResult<()> {
        let count = self.broker.partitions();
        let mut topics = self.broker.lock();
        let topic = topics.get_mut(&self.topic).ok_or(TransportError::Closed)?;
        let offsets = topic.groups.get_mut(&self.group).ok_or(TransportError::Closed)?;
        let committed = offsets
            .get_mut(delivery.partition as usize)
            .ok_or_else(|| TransportError::NoSuchPartition {
                topic:     delivery.topic.clone(),
                partition: delivery.partition,
                count,
            })?;
        *committed = (*committed).max(delivery.offset + 1);
        topic.release(delivery.partition as usize);
        Ok(())
    }
}
