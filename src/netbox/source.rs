//! The read side of the inventory API the fetch scheduler depends on.

use crate::error::Result;
use crate::netbox::types::{Device, InventoryItem, Tenant};
use std::future::Future;

/// The three list operations a fetch cycle needs.
///
/// [`NetboxClient`](crate::netbox::NetboxClient) is the production
/// implementation; tests substitute in-memory sources.
pub trait InventorySource: Send + Sync + 'static {
    fn list_tenants(&self) -> impl Future<Output = Result<Vec<Tenant>>> + Send;

    fn list_devices_for_tenant(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Vec<Device>>> + Send;

    fn list_inventory_items(
        &self,
        device_id: u64,
    ) -> impl Future<Output = Result<Vec<InventoryItem>>> + Send;
}
