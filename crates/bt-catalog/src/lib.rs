//! `bt-catalog` — where the simulator's routes come from.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`fallback`]  | `fallback_routes` — three built-in Bangalore routes        |
//! | [`loader`]    | `load_routes`, CSV and JSON loaders (file or any `Read`)   |
//! | [`error`]     | `CatalogError`, `CatalogResult<T>`                         |
//!
//! Every loader returns routes validated by [`bt_core::Route::new`], in the
//! order their ids first appear in the source.

pub mod error;
pub mod fallback;
pub mod loader;

#[cfg(test)]
mod tests;

pub use error::{CatalogError, CatalogResult};
pub use fallback::fallback_routes;
pub use loader::{
    load_routes, load_routes_csv, load_routes_json, load_routes_json_reader, load_routes_reader,
};
