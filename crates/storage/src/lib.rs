pub mod constants;
pub mod local;
pub mod pinata;

pub use local::LocalStore;
pub use pinata::{PinMetadata, PinResult, PinRow, PinataClient, PinataConfig};
