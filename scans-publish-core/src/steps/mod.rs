//! Concrete publish steps.
//!
//! A typical release pipeline runs them in this order:
//! [`SelectCoverStep`] → [`CompressStep`] → one [`UploadStep`] per storage
//! target → [`CatalogStep`] → [`BlogPostStep`]. The blog step renders the
//! announcement from every link gathered before it, so it always comes last.

mod blog;
mod catalog;
mod compress;
mod select_cover;
mod upload;

pub use blog::{BlogPostStep, BloggerSettings, ValidBloggerSettings};
pub use catalog::CatalogStep;
pub use compress::CompressStep;
pub use select_cover::SelectCoverStep;
pub use upload::{Artifact, UploadStep};
