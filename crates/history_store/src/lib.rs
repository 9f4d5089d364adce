//! Durable key/value storage for conversation history, strategy text and
//! counters.

mod error;
mod paths;
mod store;

pub use error::StoreError;
pub use paths::{counter_key, key_file_name, store_root, HISTORY_KEY, STRATEGY_KEY, STORE_DIR};
pub use store::{FileStore, KeyValueStore, MemoryStore};
