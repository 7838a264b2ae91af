//! Repository traits for catalog operations.

pub mod catalog;
pub mod chunks;
pub mod contents;
pub mod tx;

pub use catalog::CatalogRepo;
pub use chunks::ChunkRepo;
pub use contents::FileContentRepo;
pub use tx::CatalogTx;
