//! # bodega-sync: Change Notification for the bodega POS Engine
//!
//! Cross-device consistency in this system is refetch-based: a device that
//! mutates a table broadcasts `DATA_CHANGED {table}` and every other device
//! re-reads that table. This crate owns the message contract and the
//! in-process bus; the transport relaying messages between devices is
//! external and plugs in through [`ChangeBus::subscribe`] /
//! [`ChangeBus::inject`].
//!
//! There is no version vector or merge strategy here — two devices that
//! concurrently sell the last unit both "succeed" locally. The engine's
//! per-record version stamps reject the late write at persistence time;
//! this bus only spreads the news.

pub mod bus;
pub mod protocol;

pub use bus::ChangeBus;
pub use protocol::{SyncMessage, Table};
