//! Kernel routing-table synchronization for multi-gateway Linux routers.
//!
//! This crate keeps per-interface routing tables, source policy rules,
//! and an optional load-balanced default route in step with the kernel.
//! It listens to rtnetlink notifications, mirrors main-table routes into
//! each managed interface's private table, and installs `from <address>
//! lookup <table>` rules so replies leave through the interface they
//! arrived on.
//!
//! # Example
//!
//! ```ignore
//! use rtsync::{KernelSync, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> rtsync::Result<()> {
//!     // `registry` owns the interface configuration and implements
//!     // `InterfaceRegistry`.
//!     let mut sync = KernelSync::initialize(registry, SyncOptions::default()).await?;
//!     sync.run().await
//! }
//! ```

pub mod attr;
pub mod builder;
pub mod engine;
pub mod error;
pub mod events;
pub mod handlers;
pub mod iface;
pub mod message;
pub mod messages;
pub mod route;
pub mod rule;
pub mod socket;
pub mod types;

pub use builder::MessageBuilder;
pub use engine::{KernelSync, SyncOptions};
pub use error::{Error, Result};
pub use events::RtnlEvent;
pub use handlers::KernelOp;
pub use iface::{Interface, InterfaceRegistry};
pub use messages::{AddressMessage, LinkMessage, RouteMessage};
pub use route::{RouteAction, RouteDescriptor};
pub use socket::NetlinkSocket;
