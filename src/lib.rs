//! Makai MCP Protocol Engine Library
//!
//! This library contains the core components of the Makai MCP protocol
//! engine: the JSON-RPC 2.0 envelope codec and dispatcher, the connection
//! lifecycle state machine, cooperative cancellation, out-of-band
//! notification delivery, message framing, and the stdio/TCP transport
//! adapters. The library is designed to be used by the binary crate, but
//! can also be embedded by other projects that bring their own providers.
//!
//! # Architecture
//!
//! The engine is designed with the following principles in mind:
//! - Strict component boundaries: framing, envelope, dispatch, and
//!   transport never reach into each other
//! - Dependency injection for testability: providers and hooks are explicit
//!   instances, never globals
//! - One shared read-only dispatcher, one lifecycle session per connection
//! - Comprehensive error handling and propagation: a connection failure is
//!   never a process failure

pub mod config;
pub mod error;
pub mod framing;
pub mod notify;
pub mod protocol;
pub mod providers;
pub mod transport;

/// Version information for the Makai MCP protocol engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization: loads the default configuration.
pub fn init() -> error::MakaiResult<()> {
    config::init_default_config()?;
    Ok(())
}
