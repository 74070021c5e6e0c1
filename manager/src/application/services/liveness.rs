//! Application service: host inventory and its liveness fan-out.

use futures::stream::{self, StreamExt};

use crate::application::ports::{HealthProbe, HostInventory};
use crate::domain::{HostRecord, StoreError};

/// Probe `hosts` with at most `concurrency` checks in flight and return the
/// live ones in their original order.
pub async fn filter_live(
    hosts: Vec<HostRecord>,
    probe: &impl HealthProbe,
    concurrency: usize,
) -> Vec<HostRecord> {
    let mut results: Vec<(usize, bool)> = stream::iter(hosts.iter().enumerate())
        .map(|(idx, host)| async move { (idx, probe.is_live(host).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_unstable_by_key(|(idx, _)| *idx);

    let live: Vec<bool> = results.into_iter().map(|(_, live)| live).collect();
    let total = hosts.len();
    let hosts: Vec<HostRecord> = hosts
        .into_iter()
        .zip(live)
        .filter_map(|(host, live)| live.then_some(host))
        .collect();
    tracing::debug!(total, live = hosts.len(), "liveness sweep done");
    hosts
}

/// Every inventory host that currently answers its health check.
///
/// # Errors
///
/// Returns an error only if the inventory cannot be read; unreachable hosts
/// are simply left out.
pub async fn get_live_hosts(
    inventory: &impl HostInventory,
    probe: &impl HealthProbe,
    concurrency: usize,
) -> Result<Vec<HostRecord>, StoreError> {
    let hosts = inventory.list_hosts().await?;
    Ok(filter_live(hosts, probe, concurrency).await)
}

/// # Errors
///
/// Returns `Conflict` when the ip is already in the inventory.
pub async fn add_host(inventory: &impl HostInventory, host: &HostRecord) -> Result<(), StoreError> {
    inventory.add_host(host).await?;
    tracing::info!(ip = %host.ip_address, hostname = %host.hostname, "host added");
    Ok(())
}

/// # Errors
///
/// Returns an error if the inventory cannot be read.
pub async fn list_hosts(inventory: &impl HostInventory) -> Result<Vec<HostRecord>, StoreError> {
    inventory.list_hosts().await
}
