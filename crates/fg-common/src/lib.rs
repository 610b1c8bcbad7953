//! FedGate Common
//!
//! Infrastructure shared by the FedGate binaries.

pub mod logging;

pub use logging::{init_default_logging, init_logging};
