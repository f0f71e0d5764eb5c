//! Builds transitive dependency trees out of the resolutions the
//! [`Resolver`](crate::resolver::Resolver) has cached. Constraints are never evaluated here.
//!
//! Cycles are broken per path: a version already on the path from the root to the current node is
//! shown again as a leaf. Shared subtrees are not deduplicated, so a version reachable through
//! several paths is expanded once per path.

use crate::{
    error::ResolveError,
    resolver,
    store::{
        models::{Package, PackageId, PackageKind, PackageVersion, RawVersion, VersionId},
        Catalog,
    },
    version::Version,
};
use chrono::{DateTime, Utc};
use common::Identifier;
use log::*;
use serde::Serialize;
use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};

/// Every distinct constraint seen for each package anywhere in a tree.
pub type ConstraintMap = BTreeMap<PackageId, BTreeSet<String>>;

/// A single package version in a dependency tree.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct TreeNode {
    /// The node's package.
    pub package: PackageId,
    /// The node's package's slug.
    pub slug: String,
    /// The node's package version.
    pub version_id: VersionId,
    /// The node's version string.
    pub version: String,
    /// The constraint of the edge that led to this node. `None` for the root.
    pub constraint: Option<String>,
    /// The node's dependencies.
    pub children: Vec<TreeNode>,
}

/// A dependency tree built from a root package version.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct DependencyTree {
    /// The root node, its children being the root version's dependencies.
    pub root: TreeNode,
    /// Every distinct constraint seen for each package anywhere in the tree.
    pub constraints: ConstraintMap,
}

/// Builds [`DependencyTree`s](DependencyTree) against a catalog at a given point in time.
pub struct TreeBuilder<'a, 'c> {
    catalog: &'a Catalog<'c>,
    as_of: DateTime<Utc>,
}

/// A resolved edge kept for expansion: the highest visible resolved version of one package.
struct KeptEdge {
    package: Package,
    version: PackageVersion,
    parsed: Version,
    constraint: String,
}

impl TreeNode {
    fn new(package: &Package, version: &PackageVersion, constraint: Option<String>) -> Self {
        Self {
            package: package.id,
            slug: package.slug.clone(),
            version_id: version.id,
            version: version.version.clone(),
            constraint,
            children: Vec::new(),
        }
    }
}

impl<'a, 'c> TreeBuilder<'a, 'c> {
    /// Returns a new `TreeBuilder` that treats the catalog as it's visible at `as_of`.
    pub fn new(catalog: &'a Catalog<'c>, as_of: DateTime<Utc>) -> Self {
        Self { catalog, as_of }
    }

    /// Builds the dependency tree of a given root version. A mod version's children are its
    /// resolved dependencies, while an addon version's children are its compatible host mod
    /// versions, each expanded as a mod tree.
    ///
    /// # Errors
    /// Returns [`ResolveError::NoSuchVersion`] if the root version doesn't exist and
    /// [`ResolveError::NoSuchPackage`] if its package doesn't.
    pub fn build(&self, root_version_id: VersionId) -> anyhow::Result<DependencyTree> {
        let version = self
            .catalog
            .version(root_version_id)?
            .ok_or(ResolveError::NoSuchVersion(root_version_id))?;
        let package = self
            .catalog
            .package(version.package)?
            .ok_or(ResolveError::NoSuchPackage(Identifier::ById(version.package)))?;

        let mut path = vec![version.id];
        let mut constraints = ConstraintMap::new();
        let children = match package.kind {
            PackageKind::Mod => self.children_of(version.id, &mut path, &mut constraints)?,
            PackageKind::Addon => self.host_children(&version, &mut path, &mut constraints)?,
        };

        let mut root = TreeNode::new(&package, &version, None);
        root.children = children;
        debug!(
            "Built tree of version {} with {} constrained packages",
            root_version_id,
            constraints.len()
        );

        Ok(DependencyTree { root, constraints })
    }

    /// Expands a version reached through the tree, unless it's already on the current path.
    fn expand(
        &self,
        version_id: VersionId,
        path: &mut Vec<VersionId>,
        constraints: &mut ConstraintMap,
    ) -> anyhow::Result<Vec<TreeNode>> {
        if path.contains(&version_id) {
            trace!("Version {} is already on the path, not expanding", version_id);
            return Ok(Vec::new());
        }

        path.push(version_id);
        let children = self.children_of(version_id, path, constraints);
        path.pop();

        children
    }

    /// Returns the child nodes of a version that's on top of the current path.
    fn children_of(
        &self,
        version_id: VersionId,
        path: &mut Vec<VersionId>,
        constraints: &mut ConstraintMap,
    ) -> anyhow::Result<Vec<TreeNode>> {
        let mut kept: BTreeMap<PackageId, KeptEdge> = BTreeMap::new();

        for edge in self.catalog.resolved_edges_of(version_id)? {
            let target = self
                .catalog
                .visible_version(edge.target_version, self.as_of)?;
            let (package, version) = match target {
                Some(target) => target,
                None => {
                    trace!(
                        "Dependency {} resolved to invisible version {}",
                        edge.dependency,
                        edge.target_version
                    );
                    continue;
                }
            };

            if package.kind == PackageKind::Addon {
                trace!(
                    "Dependency {} resolved to addon version {}, not expanding",
                    edge.dependency,
                    version.id
                );
                continue;
            }

            let parsed = match version.parse_version() {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(
                        "Dependency {} resolved to version {} with invalid version '{}': {}",
                        edge.dependency, version.id, version.version, e
                    );
                    continue;
                }
            };

            constraints
                .entry(edge.target_package)
                .or_default()
                .insert(edge.version_constraint.clone());

            let candidate = KeptEdge {
                package,
                version,
                parsed,
                constraint: edge.version_constraint,
            };
            match kept.entry(edge.target_package) {
                Entry::Vacant(entry) => {
                    entry.insert(candidate);
                }
                Entry::Occupied(mut entry) => {
                    if candidate.parsed > entry.get().parsed {
                        entry.insert(candidate);
                    }
                }
            }
        }

        let mut children = Vec::with_capacity(kept.len());
        for edge in kept.into_values() {
            let mut node = TreeNode::new(&edge.package, &edge.version, Some(edge.constraint));
            node.children = self.expand(edge.version.id, path, constraints)?;
            children.push(node);
        }

        Ok(children)
    }

    /// Returns the child nodes of an addon root: its visible compatible host mod versions.
    fn host_children(
        &self,
        addon_version: &PackageVersion,
        path: &mut Vec<VersionId>,
        constraints: &mut ConstraintMap,
    ) -> anyhow::Result<Vec<TreeNode>> {
        let constraint = addon_version
            .mod_constraint
            .clone()
            .filter(|raw| !raw.trim().is_empty());
        let hosts = resolver::compatible_host_versions(self.catalog, addon_version.id, self.as_of)?;
        let mut children = Vec::with_capacity(hosts.len());

        for (package, version) in hosts {
            if let Some(constraint) = &constraint {
                constraints
                    .entry(package.id)
                    .or_default()
                    .insert(constraint.clone());
            }

            let mut node = TreeNode::new(&package, &version, constraint.clone());
            node.children = self.expand(version.id, path, constraints)?;
            children.push(node);
        }

        Ok(children)
    }
}
