//! Listing pages module
//!
//! Map and list views of the directory. The module is organized into:
//! - `service`: search resolution and cached payload building
//! - `types`: query, form and response structures
//! - `handlers`: HTTP handlers
//!
//! # Usage
//!
//! ```rust,no_run
//! use studiomap_serve::handlers::AppState;
//! use studiomap_serve::listing::listing_routes;
//!
//! # fn example(state: AppState) {
//! let app: axum::Router = listing_routes().with_state(state);
//! # }
//! ```

pub mod handlers;
pub mod service;
pub mod types;

pub use handlers::{handle_get_partners, handle_list, handle_map, listing_routes};
pub use service::{ListingService, MapPayload};
pub use types::{GetPartnersForm, ListPageResponse, ListingQuery, MapPageResponse};
