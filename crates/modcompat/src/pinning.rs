//! Publishes mod versions that were held back until the platform versions they're pinned to have
//! been published.

use crate::store::{
    models::{PlatformVersion, PlatformVersionId},
    Catalog,
};
use chrono::{DateTime, Utc};
use log::*;
use serde::Serialize;
use std::ops::AddAssign;

/// Counts of what propagating pins did.
#[derive(Debug, Default, PartialEq, Clone, Serialize)]
pub struct PinReport {
    /// Published platform versions processed.
    pub platform_versions: usize,
    /// Pin links deleted.
    pub links_cleared: usize,
    /// Mod versions that got published.
    pub versions_published: usize,
}

/// Propagates platform version publish dates to pinned mod versions at a given point in time.
pub struct PinPropagator<'a, 'c> {
    catalog: &'a Catalog<'c>,
    as_of: DateTime<Utc>,
}

impl<'a, 'c> PinPropagator<'a, 'c> {
    /// Returns a new `PinPropagator` that publishes mod versions at `as_of`.
    pub fn new(catalog: &'a Catalog<'c>, as_of: DateTime<Utc>) -> Self {
        Self { catalog, as_of }
    }

    /// Returns the IDs of the published platform versions that still have mod versions pinned to
    /// them, in ID order.
    pub fn due_platform_versions(&self) -> anyhow::Result<Vec<PlatformVersionId>> {
        Ok(self
            .catalog
            .pinned_platform_versions()?
            .into_iter()
            .filter(|pv| pv.is_visible(self.as_of))
            .map(|pv| pv.id)
            .collect())
    }

    /// Clears every pin to a given platform version. Each pinned mod version without a publish
    /// date is published if it's not pinned to any other platform version that is yet to be
    /// published. A pin to a platform version without any publish date keeps holding the mod
    /// version back.
    ///
    /// Does nothing if the platform version hasn't been published yet.
    pub fn propagate(&self, platform_version_id: PlatformVersionId) -> anyhow::Result<PinReport> {
        let mut report = PinReport::default();
        let platform_version = match self.catalog.platform_version(platform_version_id)? {
            Some(pv) if pv.is_visible(self.as_of) => pv,
            _ => {
                debug!(
                    "Platform version {} isn't published, not propagating",
                    platform_version_id
                );
                return Ok(report);
            }
        };
        report.platform_versions = 1;

        for mod_version in self.catalog.pins_of_platform_version(platform_version.id)? {
            match self.blocking_pin(mod_version, &platform_version)? {
                Some(blocking) => debug!(
                    "Mod version {} still waits for platform version {}",
                    mod_version, blocking
                ),
                None => {
                    if self.catalog.publish_version(mod_version, self.as_of)? {
                        info!(
                            "Published mod version {} pinned to platform version {}",
                            mod_version, platform_version.version
                        );
                        report.versions_published += 1;
                    }
                }
            }

            if self.catalog.delete_pin(mod_version, platform_version.id)? {
                report.links_cleared += 1;
            }
        }

        Ok(report)
    }

    /// Returns the first other platform version a mod version is pinned to that hasn't been
    /// published by now.
    fn blocking_pin(
        &self,
        mod_version: i64,
        processed: &PlatformVersion,
    ) -> anyhow::Result<Option<PlatformVersionId>> {
        Ok(self
            .catalog
            .pinned_platform_versions_of(mod_version)?
            .into_iter()
            .filter(|(id, _)| *id != processed.id)
            .find(|(_, published_at)| published_at.map_or(true, |at| at > self.as_of))
            .map(|(id, _)| id))
    }
}

impl AddAssign for PinReport {
    fn add_assign(&mut self, other: Self) {
        self.platform_versions += other.platform_versions;
        self.links_cleared += other.links_cleared;
        self.versions_published += other.versions_published;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use chrono::Duration;

    fn run(catalog: &Catalog, as_of: DateTime<Utc>) -> anyhow::Result<PinReport> {
        let propagator = PinPropagator::new(catalog, as_of);
        let mut report = PinReport::default();

        for platform_version in propagator.due_platform_versions()? {
            report += propagator.propagate(platform_version)?;
        }

        Ok(report)
    }

    fn setup(catalog: &Catalog) -> anyhow::Result<()> {
        catalog.set_package(&mod_package(1, "rails"))?;
        let mut pinned = mod_version(10, 1, "1.0.0");
        pinned.published_at = None;
        catalog.set_version(&pinned)?;

        catalog.set_platform_version(&platform_version(100, "1.0", Some(days_ago(1))))?;
        catalog.set_platform_version(&platform_version(101, "2.0", Some(days_ago(-1))))?;
        catalog.set_pin(&pin(10, 100))?;
        catalog.set_pin(&pin(10, 101))?;

        Ok(())
    }

    #[test]
    fn waits_for_every_pinned_platform_version() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;

        let today = run(&catalog, now())?;
        assert_eq!(today.platform_versions, 1);
        assert_eq!(today.links_cleared, 1);
        assert_eq!(today.versions_published, 0);
        assert_eq!(catalog.version(10)?.and_then(|v| v.published_at), None);
        assert_eq!(catalog.pinned_platform_versions_of(10)?.len(), 1);

        let later = now() + Duration::days(2);
        let after = run(&catalog, later)?;
        assert_eq!(after.versions_published, 1);
        assert_eq!(catalog.version(10)?.and_then(|v| v.published_at), Some(later));
        assert!(catalog.pinned_platform_versions_of(10)?.is_empty());

        Ok(())
    }

    #[test]
    fn publishes_once_all_pins_have_passed() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;

        // both platform versions published by now
        let later = now() + Duration::days(2);
        let report = run(&catalog, later)?;

        assert_eq!(report.platform_versions, 2);
        assert_eq!(report.links_cleared, 2);
        assert_eq!(report.versions_published, 1);
        assert_eq!(catalog.version(10)?.and_then(|v| v.published_at), Some(later));

        Ok(())
    }

    #[test]
    fn second_run_does_nothing() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;

        let later = now() + Duration::days(2);
        run(&catalog, later)?;

        assert_eq!(run(&catalog, later)?, PinReport::default());

        Ok(())
    }

    #[test]
    fn undated_pin_blocks() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        catalog.set_platform_version(&platform_version(101, "2.0", None))?;

        let report = run(&catalog, now() + Duration::days(30))?;

        assert_eq!(report.links_cleared, 1);
        assert_eq!(report.versions_published, 0);
        assert_eq!(catalog.version(10)?.and_then(|v| v.published_at), None);

        Ok(())
    }

    #[test]
    fn keeps_existing_publish_date() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        let scheduled = days_ago(-10);
        let mut version = mod_version(10, 1, "1.0.0");
        version.published_at = Some(scheduled);
        catalog.set_version(&version)?;

        let report = run(&catalog, now() + Duration::days(2))?;

        assert_eq!(report.links_cleared, 2);
        assert_eq!(report.versions_published, 0);
        assert_eq!(
            catalog.version(10)?.and_then(|v| v.published_at),
            Some(scheduled)
        );

        Ok(())
    }

    #[test]
    fn unpublished_platform_version_is_skipped() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;

        let report = PinPropagator::new(&catalog, now()).propagate(101)?;

        assert_eq!(report, PinReport::default());
        assert_eq!(catalog.pinned_platform_versions_of(10)?.len(), 2);

        Ok(())
    }
}
