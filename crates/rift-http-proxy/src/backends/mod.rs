pub mod inmemory;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use inmemory::InMemoryFlowStore;
#[cfg(feature = "redis-backend")]
pub use redis::RedisFlowStore;
