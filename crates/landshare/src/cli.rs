mod commands;
mod context;
pub mod metadata;
pub mod parcels;
pub mod sync;
pub mod trade;

pub use commands::*;
pub use context::Context;
