//! Remote module sources.
//!
//! Remote modules (locked dependencies) are fetched through a
//! [`ModuleDataProvider`]; local modules never go through a provider.

pub mod cache_dir;
pub mod mem;
pub mod provider;

pub use cache_dir::{default_cache_dir, CacheDirProvider};
pub use mem::MemProvider;
pub use provider::{ModuleData, ModuleDataProvider};
