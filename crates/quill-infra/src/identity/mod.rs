//! Identity provider adapters.

mod memory;

#[cfg(feature = "firebase")]
mod firebase;

pub use memory::MemoryIdentityProvider;

#[cfg(feature = "firebase")]
pub use firebase::FirebaseIdentityProvider;
