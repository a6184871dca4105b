//! Catalog database access

pub mod init;
pub mod topics;

pub use init::*;
pub use topics::CatalogSnapshot;
