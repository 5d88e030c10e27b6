#[macro_use]
extern crate serde;

pub mod bsign;
mod error;
mod keys;
mod polls;
mod schema;
mod service;
mod store;
mod tokens;
mod votes;

pub use error::*;
pub use keys::*;
pub use polls::*;
pub use schema::*;
pub use service::*;
pub use store::*;
pub use tokens::*;
pub use votes::*;
