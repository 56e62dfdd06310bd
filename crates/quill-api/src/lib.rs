pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod storage;

pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use gateway::Gateway;
pub use http::HttpGateway;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
