//! Studiomap Core Library
//!
//! Core functionality for the Studiomap business directory: the company
//! data model, search domain construction, list and map payload shaping,
//! profile form cleaning and the persistence boundary.

pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod payload;
pub mod profile;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{CacheSettings, StudiomapConfig};
pub use domain::{SearchDomain, SearchDomainBuilder, SearchFilter, SortOrder};
pub use error::{Result, StudiomapError};
pub use models::{CountryCount, LocateMeStat, MapRow, NamedRef, Partner};
pub use payload::{ListRow, PayloadRenderer};
pub use profile::{ImageChange, PartnerForm};
pub use store::{InMemoryPartnerStore, PartnerStore, PgPartnerStore, SharedPartnerStore};
pub use types::{CompanyStatus, ListingKind, PartnerId, UserId, LIST_URL, MAP_URL};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version info as a formatted string
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
