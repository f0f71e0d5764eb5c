//! The catalog read model and the resolution state written back into it.
//!
//! [`Catalog`](Catalog) borrows a connection, so it works the same over a plain connection and
//! over a transaction. Every method is blocking and is meant to run inside
//! [`Store::read`](super::Store::read) or [`Store::write`](super::Store::write).

use super::models::*;
use chrono::{DateTime, Utc};
use common::Identifier;
use rusqlite::{named_params, Connection, OptionalExtension, Params, Row};
use std::{collections::BTreeSet, convert::TryFrom};

/// A [`Dependency`](Dependency) joined with the version it resolved to.
#[derive(Debug, PartialEq, Clone)]
pub struct ResolvedEdge {
    /// The dependency's ID.
    pub dependency: DependencyId,
    /// The package depended on.
    pub target_package: PackageId,
    /// The dependency's version constraint.
    pub version_constraint: String,
    /// The version the dependency resolved to.
    pub target_version: VersionId,
}

/// Access to the catalog tables through a borrowed connection.
pub struct Catalog<'c> {
    conn: &'c Connection,
}

impl<'c> Catalog<'c> {
    /// Returns a new `Catalog` over a given connection or transaction.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Runs a query and converts every returned row into a model.
    fn query_all<T, P>(&self, sql: &str, params: P) -> anyhow::Result<Vec<T>>
    where
        T: for<'a, 'b> TryFrom<&'a Row<'b>, Error = rusqlite::Error>,
        P: Params,
    {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = Vec::new();

        for row in stmt.query_map(params, |row| T::try_from(row))? {
            rows.push(row?);
        }

        Ok(rows)
    }

    /// Runs a query that returns at most one row and converts it into a model.
    fn query_optional<T, P>(&self, sql: &str, params: P) -> anyhow::Result<Option<T>>
    where
        T: for<'a, 'b> TryFrom<&'a Row<'b>, Error = rusqlite::Error>,
        P: Params,
    {
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.query_row(params, |row| T::try_from(row)).optional()?)
    }

    /// Runs a query that returns a single ID column.
    fn query_ids<P>(&self, sql: &str, params: P) -> anyhow::Result<Vec<i64>>
    where
        P: Params,
    {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut ids = Vec::new();

        for id in stmt.query_map(params, |row| row.get(0))? {
            ids.push(id?);
        }

        Ok(ids)
    }

    /// Runs a statement with a given set of named parameters and returns the number of changed
    /// rows.
    fn execute<P>(&self, sql: &str, params: P) -> anyhow::Result<usize>
    where
        P: Params,
    {
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(params)?)
    }

    /// Retrieves a package by its ID.
    pub fn package(&self, id: PackageId) -> anyhow::Result<Option<Package>> {
        self.query_optional(Package::select(), Package::select_params(&id).as_slice())
    }

    /// Retrieves a package by its slug.
    pub fn package_by_slug(&self, slug: &str) -> anyhow::Result<Option<Package>> {
        self.query_optional(
            "SELECT * FROM package WHERE slug = :slug",
            named_params! { ":slug": slug },
        )
    }

    /// Retrieves a package by either its ID or its slug.
    pub fn find_package(&self, identifier: &Identifier) -> anyhow::Result<Option<Package>> {
        match identifier {
            Identifier::ById(id) => self.package(*id),
            Identifier::BySlug(slug) => self.package_by_slug(slug),
        }
    }

    /// Stores a package, replacing an existing one with the same ID.
    pub fn set_package(&self, package: &Package) -> anyhow::Result<()> {
        self.execute(Package::replace_into(), package.all_params().as_slice())?;
        Ok(())
    }

    /// Retrieves a package version by its ID.
    pub fn version(&self, id: VersionId) -> anyhow::Result<Option<PackageVersion>> {
        self.query_optional(
            PackageVersion::select(),
            PackageVersion::select_params(&id).as_slice(),
        )
    }

    /// Retrieves a package version along with its package if both are visible at a given time.
    pub fn visible_version(
        &self,
        id: VersionId,
        as_of: DateTime<Utc>,
    ) -> anyhow::Result<Option<(Package, PackageVersion)>> {
        let version = match self.version(id)? {
            Some(version) => version,
            None => return Ok(None),
        };

        Ok(self
            .package(version.package)?
            .filter(|package| version.is_visible(package, as_of))
            .map(|package| (package, version)))
    }

    /// Retrieves every version of a package, in ID order.
    pub fn versions_of_package(&self, package: PackageId) -> anyhow::Result<Vec<PackageVersion>> {
        self.query_all(
            "SELECT * FROM package_version WHERE package = :package ORDER BY id",
            named_params! { ":package": package },
        )
    }

    /// Retrieves up to `limit` version IDs greater than `after`, in ID order. If a package kind is
    /// given, only versions of packages of that kind are returned.
    pub fn version_ids_after(
        &self,
        kind: Option<PackageKind>,
        after: VersionId,
        limit: u64,
    ) -> anyhow::Result<Vec<VersionId>> {
        self.query_ids(
            "SELECT v.id FROM package_version v LEFT JOIN package p ON p.id = v.package \
             WHERE v.id > :after AND (:kind IS NULL OR p.kind = :kind) ORDER BY v.id LIMIT :limit",
            named_params! {
                ":after": after,
                ":kind": kind,
                ":limit": i64::try_from(limit).unwrap_or(i64::MAX),
            },
        )
    }

    /// Stores a package version's catalog fields. An existing version keeps its resolved platform
    /// version.
    pub fn set_version(&self, version: &PackageVersion) -> anyhow::Result<()> {
        self.execute(
            "INSERT INTO package_version (id, package, version, disabled, published_at, \
             platform_constraint, mod_constraint, resolved_platform_version) VALUES (:id, :package, \
             :version, :disabled, :published_at, :platform_constraint, :mod_constraint, \
             :resolved_platform_version) ON CONFLICT(id) DO UPDATE SET package = excluded.package, \
             version = excluded.version, disabled = excluded.disabled, published_at = \
             excluded.published_at, platform_constraint = excluded.platform_constraint, \
             mod_constraint = excluded.mod_constraint",
            version.all_params().as_slice(),
        )?;
        Ok(())
    }

    /// Sets a version's resolved platform version. Returns whether the stored value changed.
    pub fn set_resolved_platform_version(
        &self,
        version: VersionId,
        platform_version: Option<PlatformVersionId>,
    ) -> anyhow::Result<bool> {
        let changed = self.execute(
            "UPDATE package_version SET resolved_platform_version = :resolved WHERE id = :id AND \
             resolved_platform_version IS NOT :resolved",
            named_params! { ":id": version, ":resolved": platform_version },
        )?;
        Ok(changed > 0)
    }

    /// Sets a version's publish date if it doesn't have one yet. Returns whether it was set.
    pub fn publish_version(&self, version: VersionId, at: DateTime<Utc>) -> anyhow::Result<bool> {
        let changed = self.execute(
            "UPDATE package_version SET published_at = :published_at WHERE id = :id AND \
             published_at IS NULL",
            named_params! { ":id": version, ":published_at": at },
        )?;
        Ok(changed > 0)
    }

    /// Retrieves every dependency a version declares, in ID order.
    pub fn dependencies_of(&self, source_version: VersionId) -> anyhow::Result<Vec<Dependency>> {
        self.query_all(
            "SELECT * FROM dependency WHERE source_version = :source_version ORDER BY id",
            named_params! { ":source_version": source_version },
        )
    }

    /// Stores a dependency, replacing an existing one with the same ID.
    pub fn set_dependency(&self, dependency: &Dependency) -> anyhow::Result<()> {
        self.execute(Dependency::replace_into(), dependency.all_params().as_slice())?;
        Ok(())
    }

    /// Retrieves the version a dependency resolved to, if any.
    pub fn resolved_dependency(
        &self,
        dependency: DependencyId,
    ) -> anyhow::Result<Option<ResolvedDependency>> {
        self.query_optional(
            ResolvedDependency::select(),
            ResolvedDependency::select_params(&dependency).as_slice(),
        )
    }

    /// Replaces the version a dependency resolved to. `None` clears the resolution. Returns whether
    /// the stored resolution changed.
    pub fn replace_resolved_dependency(
        &self,
        dependency: DependencyId,
        target_version: Option<VersionId>,
    ) -> anyhow::Result<bool> {
        let existing = self.resolved_dependency(dependency)?.map(|r| r.target_version);
        if existing == target_version {
            return Ok(false);
        }

        match target_version {
            Some(target_version) => {
                let resolved = ResolvedDependency {
                    dependency,
                    target_version,
                };
                self.execute(ResolvedDependency::replace_into(), resolved.all_params().as_slice())?;
            }
            None => {
                self.execute(
                    ResolvedDependency::delete(),
                    ResolvedDependency::select_params(&dependency).as_slice(),
                )?;
            }
        }

        Ok(true)
    }

    /// Retrieves every resolved dependency of a version along with the dependency's target and
    /// constraint, in dependency ID order.
    pub fn resolved_edges_of(&self, source_version: VersionId) -> anyhow::Result<Vec<ResolvedEdge>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT d.id, d.target_package, d.version_constraint, r.target_version FROM dependency d \
             JOIN resolved_dependency r ON r.dependency = d.id WHERE d.source_version = \
             :source_version ORDER BY d.id",
        )?;
        let mut edges = Vec::new();

        for edge in stmt.query_map(named_params! { ":source_version": source_version }, |row| {
            Ok(ResolvedEdge {
                dependency: row.get(0)?,
                target_package: row.get(1)?,
                version_constraint: row.get(2)?,
                target_version: row.get(3)?,
            })
        })? {
            edges.push(edge?);
        }

        Ok(edges)
    }

    /// Retrieves the IDs of every host mod version an addon version is compatible with, in
    /// ascending order.
    pub fn compatible_versions_of(&self, addon_version: VersionId) -> anyhow::Result<Vec<VersionId>> {
        self.query_ids(
            "SELECT mod_version FROM addon_compatibility WHERE addon_version = :addon_version \
             ORDER BY mod_version",
            named_params! { ":addon_version": addon_version },
        )
    }

    /// Replaces an addon version's compatibility set with a given set of host mod versions. Only
    /// the difference is written. Returns the number of added and removed rows.
    pub fn replace_compatible_versions(
        &self,
        addon_version: VersionId,
        mod_versions: &[VersionId],
    ) -> anyhow::Result<usize> {
        let existing: BTreeSet<VersionId> =
            self.compatible_versions_of(addon_version)?.into_iter().collect();
        let wanted: BTreeSet<VersionId> = mod_versions.iter().copied().collect();
        let mut changed = 0;

        for &mod_version in existing.difference(&wanted) {
            changed += self.execute(
                "DELETE FROM addon_compatibility WHERE addon_version = :addon_version AND \
                 mod_version = :mod_version",
                named_params! { ":addon_version": addon_version, ":mod_version": mod_version },
            )?;
        }

        for &mod_version in wanted.difference(&existing) {
            let compatibility = AddonCompatibility {
                addon_version,
                mod_version,
            };
            changed += self.execute(
                AddonCompatibility::insert_into(),
                compatibility.all_params().as_slice(),
            )?;
        }

        Ok(changed)
    }

    /// Retrieves every platform version, in ID order.
    pub fn platform_versions(&self) -> anyhow::Result<Vec<PlatformVersion>> {
        self.query_all(
            "SELECT * FROM platform_version ORDER BY id",
            named_params! {},
        )
    }

    /// Retrieves a platform version by its ID.
    pub fn platform_version(
        &self,
        id: PlatformVersionId,
    ) -> anyhow::Result<Option<PlatformVersion>> {
        self.query_optional(
            PlatformVersion::select(),
            PlatformVersion::select_params(&id).as_slice(),
        )
    }

    /// Stores a platform version, replacing an existing one with the same ID.
    pub fn set_platform_version(&self, platform_version: &PlatformVersion) -> anyhow::Result<()> {
        self.execute(
            PlatformVersion::replace_into(),
            platform_version.all_params().as_slice(),
        )?;
        Ok(())
    }

    /// Retrieves every platform version at least one mod version is pinned to, in ID order.
    pub fn pinned_platform_versions(&self) -> anyhow::Result<Vec<PlatformVersion>> {
        self.query_all(
            "SELECT DISTINCT pv.* FROM platform_version pv JOIN pin_platform_link l ON \
             l.platform_version = pv.id ORDER BY pv.id",
            named_params! {},
        )
    }

    /// Retrieves the IDs of every mod version pinned to a platform version, in ascending order.
    pub fn pins_of_platform_version(
        &self,
        platform_version: PlatformVersionId,
    ) -> anyhow::Result<Vec<VersionId>> {
        self.query_ids(
            "SELECT mod_version FROM pin_platform_link WHERE platform_version = :platform_version \
             ORDER BY mod_version",
            named_params! { ":platform_version": platform_version },
        )
    }

    /// Retrieves every platform version a mod version is pinned to along with its publish date.
    /// A pin to a platform version missing from the catalog has no publish date.
    pub fn pinned_platform_versions_of(
        &self,
        mod_version: VersionId,
    ) -> anyhow::Result<Vec<(PlatformVersionId, Option<DateTime<Utc>>)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT l.platform_version, pv.published_at FROM pin_platform_link l LEFT JOIN \
             platform_version pv ON pv.id = l.platform_version WHERE l.mod_version = :mod_version \
             ORDER BY l.platform_version",
        )?;
        let mut pins = Vec::new();

        for pin in stmt.query_map(named_params! { ":mod_version": mod_version }, |row| {
            Ok((row.get(0)?, row.get(1)?))
        })? {
            pins.push(pin?);
        }

        Ok(pins)
    }

    /// Stores a pin link. Storing an existing link has no effect.
    pub fn set_pin(&self, pin: &PinPlatformLink) -> anyhow::Result<()> {
        self.execute(PinPlatformLink::replace_into(), pin.all_params().as_slice())?;
        Ok(())
    }

    /// Deletes a pin link. Returns whether it existed.
    pub fn delete_pin(
        &self,
        mod_version: VersionId,
        platform_version: PlatformVersionId,
    ) -> anyhow::Result<bool> {
        let deleted = self.execute(
            PinPlatformLink::delete(),
            PinPlatformLink::select_params(&mod_version, &platform_version).as_slice(),
        )?;
        Ok(deleted > 0)
    }
}
