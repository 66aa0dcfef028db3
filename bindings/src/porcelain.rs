//! Ergonomic front ends over the core [`Binding`](crate::Binding) trait.

mod operators;
#[cfg(feature = "tokio")]
mod publisher;
#[cfg(feature = "tokio")]
mod wait;

pub use operators::*;
#[cfg(feature = "tokio")]
pub use publisher::*;
#[cfg(feature = "tokio")]
pub use wait::*;
