//! Media host adapters.

mod memory;

#[cfg(feature = "cloudinary")]
mod cloudinary;

pub use memory::MemoryMediaHost;

#[cfg(feature = "cloudinary")]
pub use cloudinary::{CloudinaryConfig, CloudinaryConfigError, CloudinaryMediaHost};
