pub mod client;
pub mod source;
pub mod types;

pub use client::NetboxClient;
pub use source::InventorySource;
pub use types::{Device, InventoryItem, Tenant};
