//! Read-view cache side channel.
//!
//! # Modules
//!
//! - `keys` - Cache scopes and the scopes each mutation invalidates
//! - `view_cache` - Moka-backed view store

pub mod keys;
pub mod view_cache;

pub use keys::{
    CacheKey, ViewKey, bank_scopes, cashbook_scopes, director_scopes, fee_scopes, switch_scopes,
};
pub use view_cache::ViewCache;
