pub mod cci;
pub mod clock;
pub mod config;
pub mod error;
pub mod insights;
pub mod source;
pub mod state;
pub mod telemetry;
pub mod tenant;
pub mod trends;
pub mod workforce;

pub use config::AppConfig;
pub use error::AppError;
