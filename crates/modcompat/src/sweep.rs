//! Batch resolution of many package versions, processed in chunks with a keyset cursor so a sweep
//! over the whole catalog keeps bounded memory and can be stopped between chunks.

use crate::{
    error::ResolveError,
    resolver::{ResolveReport, Resolver},
    store::{
        models::{PackageKind, VersionId},
        Store,
    },
};
use chrono::{DateTime, Utc};
use common::Identifier;
use log::*;
use serde::Serialize;
use std::{
    convert::TryFrom,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use strum_macros::{Display, EnumString, EnumVariantNames};

/// Which package versions a sweep goes through.
#[derive(Debug, PartialEq, Eq, Copy, Clone, EnumString, Display, EnumVariantNames)]
pub enum SweepTarget {
    /// Versions of mods.
    #[strum(serialize = "mods")]
    Mods,
    /// Versions of addons.
    #[strum(serialize = "addons")]
    Addons,
    /// Every version in the catalog.
    #[strum(serialize = "all")]
    All,
}

/// A shared flag used to stop a running sweep. The sweep checks it after every chunk.
#[derive(Debug, Default, Clone)]
pub struct CancellationFlag(Arc<AtomicBool>);

/// Counts of what a sweep did.
#[derive(Debug, Default, PartialEq, Clone, Serialize)]
pub struct SweepReport {
    /// Chunks processed.
    pub chunks: usize,
    /// Whether the sweep was stopped before going through every version.
    pub cancelled: bool,
    /// The aggregated report of every resolved version.
    #[serde(flatten)]
    pub resolve: ResolveReport,
}

/// Runs sweeps against a store. Every version is resolved in its own write transaction.
pub struct Sweeper<'s> {
    store: &'s Store,
    chunk_size: u64,
    as_of: DateTime<Utc>,
}

impl SweepTarget {
    /// Returns the package kind this target is limited to, or `None` for every kind.
    pub fn kind(self) -> Option<PackageKind> {
        match self {
            SweepTarget::Mods => Some(PackageKind::Mod),
            SweepTarget::Addons => Some(PackageKind::Addon),
            SweepTarget::All => None,
        }
    }
}

impl CancellationFlag {
    /// Returns a new flag that isn't cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every sweep holding this flag to stop after its current chunk.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether the flag has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl<'s> Sweeper<'s> {
    /// Returns a new `Sweeper` that resolves at most `chunk_size` versions per chunk, treating the
    /// catalog as it's visible at `as_of`.
    pub fn new(store: &'s Store, chunk_size: u64, as_of: DateTime<Utc>) -> Self {
        Self {
            store,
            chunk_size,
            as_of,
        }
    }

    /// Resolves every version matching a given target, in ID order.
    pub async fn sweep(
        &self,
        target: SweepTarget,
        cancel: &CancellationFlag,
    ) -> anyhow::Result<SweepReport> {
        let kind = target.kind();
        let limit = self.chunk_size;
        let mut cursor = VersionId::MIN;
        let mut report = SweepReport::default();

        info!("Sweeping {} in chunks of {}", target, limit);
        loop {
            let ids = self
                .store
                .read(move |catalog| catalog.version_ids_after(kind, cursor, limit))
                .await?;
            let last = match ids.last() {
                Some(last) => *last,
                None => break,
            };

            self.resolve_chunk(&ids, &mut report).await?;
            cursor = last;

            if cancel.is_cancelled() {
                info!("Sweep cancelled after version {}", cursor);
                report.cancelled = true;
                break;
            }
        }

        info!(
            "Swept {} versions of {} in {} chunks",
            report.resolve.versions, target, report.chunks
        );
        Ok(report)
    }

    /// Resolves every version of a package identified by its ID or slug, in ID order.
    ///
    /// # Errors
    /// Returns [`ResolveError::NoSuchPackage`] if there's no such package.
    pub async fn sweep_package(
        &self,
        identifier: &Identifier,
        cancel: &CancellationFlag,
    ) -> anyhow::Result<SweepReport> {
        let identifier = identifier.clone();
        let ids = self
            .store
            .read(move |catalog| {
                let package = catalog
                    .find_package(&identifier)?
                    .ok_or_else(|| ResolveError::NoSuchPackage(identifier.clone()))?;

                Ok(catalog
                    .versions_of_package(package.id)?
                    .into_iter()
                    .map(|v| v.id)
                    .collect::<Vec<_>>())
            })
            .await?;

        let mut report = SweepReport::default();
        let chunk_size = usize::try_from(self.chunk_size).unwrap_or(usize::MAX);

        for chunk in ids.chunks(chunk_size) {
            self.resolve_chunk(chunk, &mut report).await?;

            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
        }

        debug!("Swept package: {:?}", report);
        Ok(report)
    }

    async fn resolve_chunk(&self, ids: &[VersionId], report: &mut SweepReport) -> anyhow::Result<()> {
        trace!("Resolving chunk of {} versions from {:?}", ids.len(), ids.first());

        for &id in ids {
            let as_of = self.as_of;
            report.resolve += self
                .store
                .write(move |catalog| Resolver::new(catalog, as_of).resolve(id))
                .await?;
        }

        report.chunks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    async fn catalog_store() -> anyhow::Result<Store> {
        let store = memory_store().await?;
        store
            .write(|catalog| {
                catalog.set_package(&mod_package(1, "rails"))?;
                catalog.set_version(&mod_version(10, 1, "1.0.0"))?;
                catalog.set_version(&mod_version(11, 1, "1.1.0"))?;

                catalog.set_package(&mod_package(2, "trains"))?;
                catalog.set_version(&mod_version(20, 2, "0.1.0"))?;
                catalog.set_dependency(&dependency(1, 20, 1, "^1.0"))?;

                catalog.set_package(&addon_package(3, "rails-extra", Some(1)))?;
                catalog.set_version(&addon_version(30, 3, "1.0.0", Some(">=1.0")))?;

                Ok(())
            })
            .await?;

        Ok(store)
    }

    #[tokio::test]
    async fn sweeps_every_version_in_chunks() -> anyhow::Result<()> {
        let store = catalog_store().await?;

        let report = Sweeper::new(&store, 2, now())
            .sweep(SweepTarget::All, &CancellationFlag::new())
            .await?;

        assert_eq!(report.chunks, 2);
        assert_eq!(report.resolve.versions, 4);
        assert!(!report.cancelled);

        let resolved = store.read(|catalog| catalog.resolved_dependency(1)).await?;
        assert_eq!(resolved.map(|r| r.target_version), Some(11));
        let compatible = store.read(|catalog| catalog.compatible_versions_of(30)).await?;
        assert_eq!(compatible, vec![10, 11]);

        Ok(())
    }

    #[tokio::test]
    async fn sweeps_by_kind() -> anyhow::Result<()> {
        let store = catalog_store().await?;
        let sweeper = Sweeper::new(&store, 500, now());
        let cancel = CancellationFlag::new();

        let mods = sweeper.sweep(SweepTarget::Mods, &cancel).await?;
        assert_eq!(mods.resolve.versions, 3);
        assert_eq!(mods.chunks, 1);

        let addons = sweeper.sweep(SweepTarget::Addons, &cancel).await?;
        assert_eq!(addons.resolve.versions, 1);
        assert_eq!(addons.resolve.compatible, 2);

        Ok(())
    }

    #[tokio::test]
    async fn cancelled_sweep_stops_after_chunk() -> anyhow::Result<()> {
        let store = catalog_store().await?;
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let report = Sweeper::new(&store, 2, now())
            .sweep(SweepTarget::All, &cancel)
            .await?;

        assert!(report.cancelled);
        assert_eq!(report.chunks, 1);
        assert_eq!(report.resolve.versions, 2);

        Ok(())
    }

    #[tokio::test]
    async fn sweeps_package_by_slug() -> anyhow::Result<()> {
        let store = catalog_store().await?;
        let sweeper = Sweeper::new(&store, 1, now());

        let report = sweeper
            .sweep_package(&Identifier::BySlug(String::from("rails")), &CancellationFlag::new())
            .await?;
        assert_eq!(report.resolve.versions, 2);
        assert_eq!(report.chunks, 2);

        let missing = sweeper
            .sweep_package(&Identifier::BySlug(String::from("boats")), &CancellationFlag::new())
            .await;
        assert!(missing.is_err());

        Ok(())
    }

    #[test]
    fn parse_target() -> anyhow::Result<()> {
        assert_eq!("addons".parse::<SweepTarget>()?, SweepTarget::Addons);
        assert_eq!(SweepTarget::All.kind(), None);
        assert_eq!(SweepTarget::Mods.kind(), Some(PackageKind::Mod));
        assert!("everything".parse::<SweepTarget>().is_err());

        Ok(())
    }
}
