pub mod error;
pub mod home;
pub mod kv;
pub mod lock;
pub mod pattern;
pub mod schema;
pub mod settings;
pub mod store;

pub use error::{Result, StoreError};
pub use home::{KnockHome, default_base_dir};
pub use kv::{KeyValueStore, MemoryStore};
pub use lock::Lock;
pub use pattern::PatternStore;
pub use settings::Settings;
pub use store::Store;
