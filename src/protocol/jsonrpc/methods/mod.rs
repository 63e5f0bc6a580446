// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Standard method handlers grouped by protocol area.

pub mod initialize;
pub mod prompts;
pub mod resources;
pub mod tools;

pub use initialize::register_initialize_method;
pub use prompts::register_prompts_methods;
pub use resources::register_resources_methods;
pub use tools::register_tools_methods;
