// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Transport adapters binding the protocol engine to byte streams.

pub mod connection;
pub mod stdio;
pub mod tcp;

pub use connection::Connection;
pub use stdio::run_stdio;
pub use tcp::run_tcp;
