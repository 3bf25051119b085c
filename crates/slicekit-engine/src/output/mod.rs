//! Engine output handling: artifact selection, metadata and packaging

pub mod collector;
pub mod metadata;
pub mod packager;

pub use collector::collect;
pub use metadata::{extract, extract_all, parse_toolpath, MetadataError};
pub use packager::{PackagedResult, ResultPackager, ResultStream};
