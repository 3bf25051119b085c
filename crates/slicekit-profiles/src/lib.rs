pub mod error;
pub mod model;
pub mod store;

pub use error::{ProfileError, ProfileResult};
pub use model::{ProfileCategory, ResolvedProfiles};
pub use store::ProfileStore;
