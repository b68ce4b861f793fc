pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackendConfig, Config};
pub use error::TribunaError;
pub use types::*;
