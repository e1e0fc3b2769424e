pub mod error;
pub mod executor;
pub mod interrupt;
pub mod model;
pub mod report;
pub mod runner;
pub mod worker;

pub use error::{ConfigError, RequestError};
pub use interrupt::InterruptFlag;
pub use model::{Stats, WorkerConfig};
pub use runner::{RunSummary, Runner};
pub use worker::Worker;
