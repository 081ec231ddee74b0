//! Request middleware and extractors.

pub mod actor;

pub use actor::{ACTOR_HEADER, ACTOR_NAME_HEADER, Actor, LOCATION_HEADER};
