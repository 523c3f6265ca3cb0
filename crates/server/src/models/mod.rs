//! Domain types for the sync service.

pub mod records;
pub mod tenant;

pub use records::{CustomerRecord, OrderRecord, ProductRecord};
pub use tenant::Tenant;
