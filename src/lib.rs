pub mod catalogue;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod records;
pub mod recovery;
pub mod registration;
pub mod service;
pub mod session;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{Result, StandingError};
pub use service::StandingService;
