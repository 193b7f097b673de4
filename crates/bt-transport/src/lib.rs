//! `bt-transport` — at-least-once event transport between pipeline stages.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`client`]   | `Publisher`, `Subscriber` traits and the `Delivery` record      |
//! | [`memory`]   | `MemoryBroker` — in-process partitioned log with group offsets  |
//! | [`retry`]    | `RetryPolicy`, `RetryingPublisher`                              |
//! | `kafka`      | `KafkaPublisher`, `KafkaSubscriber` (feature `kafka`)           |
//! | [`error`]    | `TransportError`, `TransportResult<T>`                          |
//!
//! # Delivery contract
//!
//! A subscriber sees every record of its assigned partitions at least once.
//! Records are acknowledged individually; a consumer group's committed offset
//! for a partition only moves forward, and a consumer that joins the group
//! later resumes from the committed offset, so anything delivered but never
//! acknowledged is delivered again.  Records with the same key land in the
//! same partition and keep their publish order; nothing is promised across
//! partitions.

pub mod client;
pub mod error;
pub mod memory;
pub mod retry;

#[cfg(feature = "kafka")]
pub mod kafka;


pub use client::{Delivery, Publisher, Subscriber};
pub use error::{TransportError, TransportResult};
pub use memory::{assign_partitions, MemoryBroker, MemoryProducer, MemorySubscriber, StartFrom};
pub use retry::{RetryPolicy, RetryingPublisher};

#[cfg(feature = "kafka")]
pub use kafka::{KafkaPublisher, KafkaSubscriber};
