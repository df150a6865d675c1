//! # Domain Module
//!
//! Core types for blob submission: namespaces, blobs, the assembled
//! submission, the PayForBlobs transaction, events and ledger responses.

pub mod blob;
pub mod entities;
pub mod errors;
pub mod events;
pub mod namespace;
pub mod transaction;
pub mod value_objects;

pub use blob::*;
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use namespace::*;
pub use transaction::*;
pub use value_objects::*;

pub use shared_types::{Address, Fee, Hash, TxHash};
