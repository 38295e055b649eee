//! # Switchyard Console Adapter
//!
//! A [`Connector`](switchyard_core::Connector) that reads typed lines as
//! inbound messages and prints everything the bot sends. Useful for trying
//! out module manifests without a phone.
//!
//! ```rust,ignore
//! use switchyard_adapter_console::{ConsoleConfig, ConsoleConnector};
//!
//! let connector = ConsoleConnector::stdio(ConsoleConfig::default().with_group("1@g.us"));
//! runtime.run(connector).await?;
//! ```
//!
//! See [`parse`] for the slash commands understood on input.

pub mod config;
mod connector;
pub mod parse;
mod transport;

pub use config::ConsoleConfig;
pub use connector::ConsoleConnector;
pub use transport::{ConsoleTransport, GroupState, SharedGroup, SharedWriter};
