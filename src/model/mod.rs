//! Data model for crawled policies
//!
//! # Components
//!
//! - `Policy`: the canonical crawled record, persisted one per line
//! - `Attachment`: a file referenced from a policy document
//! - `ListItem`: a transient reference discovered on a list page
//! - `RegionLevel`: the administrative level inferred from a policy title

mod policy;
mod region;

// Re-export main types
pub use policy::{Attachment, ListItem, Policy};
pub use region::RegionLevel;
