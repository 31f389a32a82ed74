pub mod data_client;
pub mod types;

pub use data_client::DataClient;
pub use types::{ApiActivity, WsSubscribe};
