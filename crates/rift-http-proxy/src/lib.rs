// Library exports for benchmarking and testing
// Allow dead_code for library targets - functions are used by the binary but not by tests
#![allow(dead_code)]

// ===== Core Mountebank-compatible modules =====
#[path = "admin_api/mod.rs"]
pub mod admin_api;
#[path = "behaviors/mod.rs"]
pub mod behaviors;
pub mod config;
#[path = "imposter/mod.rs"]
pub mod imposter;
pub mod predicate;
#[path = "proxy/mod.rs"]
pub mod proxy;
pub mod recording;

// ===== Rift Extensions (features beyond Mountebank) =====
pub mod extensions;
pub mod response;

// Re-export extension modules at top level for backward compatibility
pub use extensions::fault;
pub use extensions::flow_state;
pub use extensions::matcher;
pub use extensions::routing;
pub use extensions::rule_index;
pub use extensions::stub_analysis;
pub use extensions::template;

// Don't export internal modules
mod backends;
mod scripting;
