#![forbid(unsafe_code)]

//! Loads an OpenAPI 3.x description and derives a catalog of manageable
//! resources from it.
//!
//! The pipeline runs once per (re)initialization:
//! [`parse_spec_str`] → [`map_resources`] → [`Catalog`]. The resulting catalog
//! is immutable; [`CatalogHandle`] swaps whole catalogs atomically on reload.

pub mod catalog;
pub mod error;
pub mod extensions;
pub mod loader;
pub mod mapper;
pub mod template;
pub mod types;

pub use crate::catalog::{Catalog, CatalogHandle};
pub use crate::error::{LoadError, UnsupportedSchema};
pub use crate::loader::{parse_spec_str, read_spec_file, SpecDocument, SpecFormat};
pub use crate::mapper::{map_resources, MapOptions, MappedResources};
pub use crate::types::{
    AsyncPolicy, CatalogEntry, EndpointTemplate, FieldKind, FieldSchema, OperationKind,
    ResourceBinding, ResourceSchema, SecurityScheme, VariantSet,
};
