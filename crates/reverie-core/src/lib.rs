pub mod config;
pub mod error;
pub mod types;

pub use config::ReverieConfig;
pub use error::{ReverieError, Result};
pub use types::*;
