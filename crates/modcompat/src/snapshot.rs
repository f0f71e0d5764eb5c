//! Imports a catalog snapshot, the catalog's read model serialised as JSON, into a store.

use crate::store::{
    models::{Dependency, Package, PackageVersion, PinPlatformLink, PlatformVersion},
    Catalog,
};
use log::*;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// The catalog rows of a snapshot. Every section may be left out.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSnapshot {
    pub packages: Vec<Package>,
    pub versions: Vec<PackageVersion>,
    pub dependencies: Vec<Dependency>,
    pub platform_versions: Vec<PlatformVersion>,
    pub pins: Vec<PinPlatformLink>,
}

/// The number of rows imported per section.
#[derive(Debug, Default, PartialEq, Clone, Serialize)]
pub struct ImportReport {
    pub packages: usize,
    pub versions: usize,
    pub dependencies: usize,
    pub platform_versions: usize,
    pub pins: usize,
}

impl CatalogSnapshot {
    /// Returns a new `CatalogSnapshot` read from a given JSON reader.
    pub fn from_reader<R>(reader: R) -> anyhow::Result<Self>
    where
        R: Read,
    {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Stores every row in the snapshot, replacing existing rows with the same IDs. The resolution
    /// state of existing versions is left as it is.
    pub fn import(&self, catalog: &Catalog) -> anyhow::Result<ImportReport> {
        for package in &self.packages {
            catalog.set_package(package)?;
        }
        for version in &self.versions {
            catalog.set_version(version)?;
        }
        for dependency in &self.dependencies {
            catalog.set_dependency(dependency)?;
        }
        for platform_version in &self.platform_versions {
            catalog.set_platform_version(platform_version)?;
        }
        for pin in &self.pins {
            catalog.set_pin(pin)?;
        }

        let report = ImportReport {
            packages: self.packages.len(),
            versions: self.versions.len(),
            dependencies: self.dependencies.len(),
            platform_versions: self.platform_versions.len(),
            pins: self.pins.len(),
        };
        debug!("Imported catalog snapshot: {:?}", report);

        Ok(report)
    }
}
