//! # overdub-bus
//!
//! The real-time event delivery subsystem: a per-session, at-least-once,
//! replayable publish/subscribe bus layered on a durable key/value +
//! pub/sub broker, plus the live-connection registry for socket-style
//! transports.
//!
//! Producers call [`EventBus::post`] or [`EventBus::broadcast`]; the broker
//! persists and publishes; each client connection consumes one
//! [`EventBus::listen`] stream that replays the stored backlog and then
//! tails live messages until the connection ends or the exit sentinel
//! arrives.

pub mod broker;
pub mod bus;
pub mod error;
pub mod memory;
pub mod notify;
pub mod redis_broker;
pub mod registry;

pub use broker::{Broker, BrokerMessage, Subscription};
pub use bus::EventBus;
pub use error::{BrokerError, RegistryError};
pub use memory::MemoryBroker;
pub use redis_broker::RedisBroker;
pub use registry::{LiveRegistry, LiveTransport};
