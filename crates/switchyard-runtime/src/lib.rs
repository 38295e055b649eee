//! # Switchyard Runtime
//!
//! Orchestration for the Switchyard message router:
//!
//! - [`config`]: layered figment configuration and validation
//! - [`logging`]: tracing subscriber setup
//! - [`bridge`]: the session event loop, per-batch dispatch tasks and reconnect backoff
//! - [`greetings`]: welcome and exit messages for group membership changes
//! - [`runtime`]: [`Runtime`], which ties the above to a [`Connector`](switchyard_core::Connector)
//!
//! ```ignore
//! use switchyard_runtime::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Runtime::builder().build()?;
//!     runtime.run(MyConnector::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod greetings;
pub mod logging;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::SessionBridge;
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, RetryConfig, SessionConfig,
    SwitchyardConfig,
};
pub use error::{RuntimeError, RuntimeResult, SessionError, SessionResult};
pub use greetings::Greeter;
pub use logging::init_from_config;
pub use runtime::{Runtime, RuntimeBuilder};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handler and host code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
