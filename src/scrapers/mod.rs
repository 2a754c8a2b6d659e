//! Publisher page scraping.
//!
//! Unlike a crawler with one module per outlet, every supported publisher is
//! described by data: a domain substring and the tag/class of the element
//! holding the article body. Adding a publisher means adding a `sources`
//! entry to the configuration.
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Domain → [`registry::ExtractionRule`] lookup |
//! | [`fetcher`] | Page download and paragraph extraction |

pub mod fetcher;
pub mod registry;

pub use fetcher::{ArticleFetcher, HttpPageSource, PageSource, build_client};
pub use registry::{ExtractionRule, SourceRegistry};
