//! Dependency and version compatibility resolution for a catalog of mods, addons and platform
//! versions.
//!
//! The [`Engine`](Engine) binds a [`Config`](config::Config), a [`Store`](store::Store) and the
//! point in time the catalog is looked at, and runs every operation against them.

#![warn(clippy::if_not_else)]
#![warn(clippy::needless_pass_by_value)]

pub mod config;
pub mod constraint;
pub mod error;
pub mod log;
pub mod opts;
pub mod pinning;
pub mod resolver;
pub mod snapshot;
pub mod store;
pub mod sweep;
pub mod tree;
pub mod util;
pub mod version;

use ::log::*;
use chrono::{DateTime, Utc};
use common::Identifier;
use config::Config;
use pinning::{PinPropagator, PinReport};
use resolver::{ResolveReport, Resolver};
use snapshot::{CatalogSnapshot, ImportReport};
use std::{io::Read, sync::Arc};
use store::{
    models::{PackageVersion, VersionId},
    Store,
};
use sweep::{CancellationFlag, SweepReport, SweepTarget, Sweeper};
use tree::{DependencyTree, TreeBuilder};

/// The prefix used with every environment value related to the program configuration.
pub const APP_PREFIX: &str = "MODCOMPAT_";

/// Runs resolution, sweeps, tree building and pin propagation against a catalog store.
#[derive(Clone)]
pub struct Engine {
    /// The program config.
    config: Arc<Config>,
    /// The catalog store.
    store: Arc<Store>,
    /// The point in time the catalog is looked at.
    as_of: DateTime<Utc>,
}

impl Engine {
    /// Returns a new `Engine` looking at the catalog as it is now.
    pub fn new(config: Config, store: Store) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            as_of: Utc::now(),
        }
    }

    /// Returns the same `Engine` looking at the catalog as it is at a given point in time.
    pub fn as_of(self, as_of: DateTime<Utc>) -> Self {
        Self { as_of, ..self }
    }

    /// Returns the engine's config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves a single package version in one transaction.
    pub async fn resolve(&self, version_id: VersionId) -> anyhow::Result<ResolveReport> {
        let as_of = self.as_of;
        let report = self
            .store
            .write(move |catalog| Resolver::new(catalog, as_of).resolve(version_id))
            .await?;

        info!("Resolved version {}", version_id);
        Ok(report)
    }

    /// Builds the dependency tree of a package version.
    pub async fn build_tree(&self, root_version_id: VersionId) -> anyhow::Result<DependencyTree> {
        let as_of = self.as_of;
        self.store
            .read(move |catalog| TreeBuilder::new(catalog, as_of).build(root_version_id))
            .await
    }

    /// Returns the visible host mod versions an addon version is compatible with.
    pub async fn compatible_host_versions(
        &self,
        addon_version_id: VersionId,
    ) -> anyhow::Result<Vec<PackageVersion>> {
        let as_of = self.as_of;
        let hosts = self
            .store
            .read(move |catalog| {
                resolver::compatible_host_versions(catalog, addon_version_id, as_of)
            })
            .await?;

        Ok(hosts.into_iter().map(|(_, version)| version).collect())
    }

    /// Resolves every version matching a given target in chunks. The sweep stops after the
    /// current chunk once the cancellation flag is set.
    pub async fn sweep(
        &self,
        target: SweepTarget,
        cancel: &CancellationFlag,
    ) -> anyhow::Result<SweepReport> {
        self.sweeper().sweep(target, cancel).await
    }

    /// Resolves every version of a package identified by its ID or slug.
    pub async fn sweep_package(
        &self,
        identifier: &Identifier,
        cancel: &CancellationFlag,
    ) -> anyhow::Result<SweepReport> {
        self.sweeper().sweep_package(identifier, cancel).await
    }

    /// Propagates the publish dates of every published platform version to the mod versions
    /// pinned to it. Each platform version is processed in its own transaction.
    pub async fn propagate_pins(&self) -> anyhow::Result<PinReport> {
        let as_of = self.as_of;
        let due = self
            .store
            .read(move |catalog| PinPropagator::new(catalog, as_of).due_platform_versions())
            .await?;
        debug!("{} platform versions have pins to propagate", due.len());

        let mut report = PinReport::default();
        for platform_version in due {
            report += self
                .store
                .write(move |catalog| PinPropagator::new(catalog, as_of).propagate(platform_version))
                .await?;
        }

        info!(
            "Propagated pins of {} platform versions, published {} mod versions",
            report.platform_versions, report.versions_published
        );
        Ok(report)
    }

    /// Imports a JSON catalog snapshot from a given reader in one transaction.
    pub async fn import<R>(&self, reader: R) -> anyhow::Result<ImportReport>
    where
        R: Read,
    {
        let snapshot = CatalogSnapshot::from_reader(reader)?;
        let report = self.store.write(move |catalog| snapshot.import(catalog)).await?;

        info!("Imported catalog snapshot");
        Ok(report)
    }

    fn sweeper(&self) -> Sweeper<'_> {
        Sweeper::new(&self.store, self.config.chunk_size(), self.as_of)
    }
}
