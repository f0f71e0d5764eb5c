//! Resolves an addon version's host mod constraint into the full set of compatible host mod
//! versions.

use super::{candidates, parse_constraint, present, ResolveReport, Resolver};
use crate::store::models::{Package, PackageId, PackageVersion, VersionId};
use log::*;

pub(super) fn resolve_addon_compatibility(
    resolver: &Resolver,
    version: &PackageVersion,
    addon: &Package,
    report: &mut ResolveReport,
) -> anyhow::Result<()> {
    let catalog = resolver.catalog;
    let compatible = match addon.host_package {
        Some(host) => match catalog.package(host)? {
            Some(_) => compatible_host_versions(resolver, version, host, report)?,
            None => {
                debug!(
                    "Addon {}'s host package {} is missing, clearing compatibility of version {}",
                    addon.id, host, version.id
                );
                Vec::new()
            }
        },
        None => {
            debug!(
                "Addon {} has no host package, clearing compatibility of version {}",
                addon.id, version.id
            );
            Vec::new()
        }
    };

    trace!(
        "Addon version {} is compatible with {} host versions",
        version.id,
        compatible.len()
    );
    report.compatible += compatible.len();
    report.changed += catalog.replace_compatible_versions(version.id, &compatible)?;

    Ok(())
}

fn compatible_host_versions(
    resolver: &Resolver,
    version: &PackageVersion,
    host: PackageId,
    report: &mut ResolveReport,
) -> anyhow::Result<Vec<VersionId>> {
    let raw = match present(&version.mod_constraint) {
        Some(raw) => raw,
        None => {
            trace!("Addon version {} has no mod constraint", version.id);
            return Ok(Vec::new());
        }
    };

    let constraint = match parse_constraint(
        raw,
        format_args!("mod constraint of addon version {}", version.id),
        report,
    ) {
        Some(constraint) => constraint,
        None => return Ok(Vec::new()),
    };

    let candidates = candidates::package_candidates(resolver.catalog, host, resolver.as_of, report)?;
    Ok(constraint
        .satisfying(&candidates)
        .into_iter()
        .map(|(id, _)| *id)
        .collect())
}
