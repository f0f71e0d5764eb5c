//! Gathers the visible, parseable candidate versions a constraint is applied to.

use super::ResolveReport;
use crate::{
    store::{
        models::{PackageId, PackageKind, RawVersion},
        Catalog,
    },
    version::Version,
};
use chrono::{DateTime, Utc};
use log::*;

/// A candidate's catalog ID along with its parsed version.
pub(super) type Candidate = (i64, Version);

/// Returns the visible versions of a given mod package. A missing or invisible package has no
/// candidates, and neither has an addon package since only mods can be depended on.
pub(super) fn package_candidates(
    catalog: &Catalog,
    package_id: PackageId,
    as_of: DateTime<Utc>,
    report: &mut ResolveReport,
) -> anyhow::Result<Vec<Candidate>> {
    let package = match catalog.package(package_id)? {
        Some(package) if package.kind == PackageKind::Addon => {
            debug!("Package {} is an addon, no candidates", package_id);
            return Ok(Vec::new());
        }
        Some(package) if package.is_visible(as_of) => package,
        Some(_) => {
            trace!("Package {} isn't visible, no candidates", package_id);
            return Ok(Vec::new());
        }
        None => {
            debug!("Package {} doesn't exist, no candidates", package_id);
            return Ok(Vec::new());
        }
    };

    let versions = catalog.versions_of_package(package_id)?;
    Ok(parse_all(
        versions.iter().filter(|v| v.is_visible(&package, as_of)),
        report,
    ))
}

/// Returns the visible platform versions.
pub(super) fn platform_candidates(
    catalog: &Catalog,
    as_of: DateTime<Utc>,
    report: &mut ResolveReport,
) -> anyhow::Result<Vec<Candidate>> {
    let platform_versions = catalog.platform_versions()?;
    Ok(parse_all(
        platform_versions.iter().filter(|pv| pv.is_visible(as_of)),
        report,
    ))
}

/// Parses the version of every given row, dropping and logging the invalid ones.
fn parse_all<'r, I, R>(rows: I, report: &mut ResolveReport) -> Vec<Candidate>
where
    I: Iterator<Item = &'r R>,
    R: RawVersion + 'r,
{
    rows.filter_map(|row| match row.parse_version() {
        Ok(version) => Some((row.id(), version)),
        Err(e) => {
            warn!(
                "Ignoring candidate {} with invalid version '{}': {}",
                row.id(),
                row.raw_version(),
                e
            );
            report.invalid_versions += 1;
            None
        }
    })
    .collect()
}
