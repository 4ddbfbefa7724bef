//! On-disk slice cache: deterministic slice addressing plus an
//! atomic-publish file store.

pub mod address;
pub mod store;

pub use address::{slice_minutes, SliceAddress};
pub use store::SliceCache;
