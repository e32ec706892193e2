//! Source adapters
//!
//! Each adapter queries one external provider and yields raw records.
//! Adapters share the [`SourceAdapter`] contract and are selected at startup
//! from configuration by [`SourceLoader`].

mod http;
mod loader;
mod registry;
mod traits;

pub mod companies_house;
pub mod crunchbase;
pub mod dnb;
pub mod google;
pub mod linkedin;

pub use http::{selector, HttpMethod, RequestBody, SourceHttp, SourceRequest, SourceResponse};
pub use loader::SourceLoader;
pub use registry::{RegisteredSource, SourceRegistry};
pub use traits::*;
