//! Resolves a mod version's platform constraint to the single best visible platform version,
//! cached on the mod version itself.

use super::{candidates, parse_constraint, present, ResolveReport, Resolver};
use crate::store::models::PackageVersion;
use log::*;

pub(super) fn resolve_platform(
    resolver: &Resolver,
    version: &PackageVersion,
    report: &mut ResolveReport,
) -> anyhow::Result<()> {
    let catalog = resolver.catalog;
    let resolved = match present(&version.platform_constraint) {
        Some(raw) => {
            let best = match parse_constraint(
                raw,
                format_args!("platform constraint of version {}", version.id),
                report,
            ) {
                Some(constraint) => {
                    let candidates =
                        candidates::platform_candidates(catalog, resolver.as_of, report)?;
                    constraint.best(&candidates).map(|(id, _)| *id)
                }
                None => None,
            };

            match best {
                Some(platform_version) => {
                    trace!(
                        "Version {} resolved to platform version {}",
                        version.id,
                        platform_version
                    );
                    report.resolved += 1;
                }
                None => report.cleared += 1,
            }

            best
        }
        None => {
            trace!("Version {} has no platform constraint", version.id);
            None
        }
    };

    if catalog.set_resolved_platform_version(version.id, resolved)? {
        report.changed += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::Catalog, testing::*};

    fn setup(catalog: &Catalog, constraint: Option<&str>) -> anyhow::Result<()> {
        catalog.set_package(&mod_package(1, "rails"))?;
        let mut version = mod_version(10, 1, "1.0.0");
        version.platform_constraint = constraint.map(String::from);
        catalog.set_version(&version)?;

        catalog.set_platform_version(&platform_version(100, "1.0.0", Some(days_ago(100))))?;
        catalog.set_platform_version(&platform_version(101, "1.1.0", Some(days_ago(50))))?;
        catalog.set_platform_version(&platform_version(102, "2.0.0", Some(days_ago(1))))?;
        catalog.set_platform_version(&platform_version(103, "2.1.0", None))?;

        Ok(())
    }

    #[test]
    fn resolves_best_published_platform_version() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog, Some(">=1.0"))?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(
            catalog.version(10)?.and_then(|v| v.resolved_platform_version),
            Some(102)
        );
        assert_eq!(report.resolved, 1);
        assert_eq!(report.changed, 1);

        Ok(())
    }

    #[test]
    fn caret_stays_within_major() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog, Some("^1.0"))?;

        Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(
            catalog.version(10)?.and_then(|v| v.resolved_platform_version),
            Some(101)
        );

        Ok(())
    }

    #[test]
    fn missing_constraint_clears() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog, Some("*"))?;
        let resolver = Resolver::new(&catalog, now());
        resolver.resolve(10)?;

        let mut version = mod_version(10, 1, "1.0.0");
        version.platform_constraint = None;
        catalog.set_version(&version)?;
        let report = resolver.resolve(10)?;

        assert_eq!(
            catalog.version(10)?.and_then(|v| v.resolved_platform_version),
            None
        );
        assert_eq!(report.cleared, 0);
        assert_eq!(report.changed, 1);

        Ok(())
    }

    #[test]
    fn invalid_constraint_clears() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog, Some("1.0 -"))?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(
            catalog.version(10)?.and_then(|v| v.resolved_platform_version),
            None
        );
        assert_eq!(report.invalid_constraints, 1);
        assert_eq!(report.cleared, 1);

        Ok(())
    }

    #[test]
    fn unconstrained_version_is_not_counted() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog, None)?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(report.dependencies, 0);
        assert_eq!(report.resolved, 0);
        assert_eq!(report.cleared, 0);
        assert_eq!(report.changed, 0);

        Ok(())
    }

    #[test]
    fn unmatched_constraint_is_cleared() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog, Some(">=3"))?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(
            catalog.version(10)?.and_then(|v| v.resolved_platform_version),
            None
        );
        assert_eq!(report.resolved, 0);
        assert_eq!(report.cleared, 1);

        Ok(())
    }
}
