//! Asset-side collaborators of the graphics core.
//!
//! Textures are named by logical paths. A [`PathResolver`] turns them into
//! native file paths and an [`ImageDecoder`] turns files into RGBA8 pixels.
//! Both are traits so tools and tests can substitute their own.

mod decode;
mod path;

pub use decode::{DecodedImage, ImageCrateDecoder, ImageDecoder};
pub use path::{normalize, PathError, PathResolver, VirtualPaths};
