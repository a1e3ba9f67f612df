use tracing::{info, warn};

use crate::db::Catalog;
use crate::error::{StoreError, StoreResult};
use crate::models::{Company, JobCandidate, NewJob};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub companies_created: usize,
    pub jobs_created: usize,
    pub jobs_skipped: usize,
    pub errors: usize,
}

enum Outcome {
    Created,
    Skipped,
}

// Folds candidates into the catalog, strictly in input order.
// Companies are found or created by exact name; jobs are inserted only if
// no job with the same link exists. Existing jobs are never updated. A
// failure on one candidate is logged and the rest are still merged.
pub fn merge(catalog: &dyn Catalog, candidates: &[JobCandidate]) -> MergeStats {
    let mut stats = MergeStats::default();

    for candidate in candidates {
        match merge_one(catalog, candidate, &mut stats) {
            Ok(Outcome::Created) => stats.jobs_created += 1,
            Ok(Outcome::Skipped) => stats.jobs_skipped += 1,
            Err(e) => {
                stats.errors += 1;
                warn!(
                    title = %candidate.title,
                    link = %candidate.link,
                    error = %e,
                    "failed to save listing"
                );
            }
        }
    }

    stats
}

fn merge_one(
    catalog: &dyn Catalog,
    candidate: &JobCandidate,
    stats: &mut MergeStats,
) -> StoreResult<Outcome> {
    let company = resolve_company(catalog, &candidate.company_name, stats)?;

    if catalog.find_job_by_link(&candidate.link)?.is_some() {
        info!(title = %candidate.title, "skipping existing listing");
        return Ok(Outcome::Skipped);
    }

    match catalog.create_job(&NewJob::from_candidate(&company, candidate)) {
        Ok(job) => {
            info!(id = job.id, title = %job.title, company = %company.name, "saved new listing");
            Ok(Outcome::Created)
        }
        // Someone else inserted the same link between our lookup and insert
        Err(e) if e.is_conflict() => {
            info!(title = %candidate.title, "skipping existing listing");
            Ok(Outcome::Skipped)
        }
        Err(e) => Err(e),
    }
}

fn resolve_company(
    catalog: &dyn Catalog,
    name: &str,
    stats: &mut MergeStats,
) -> StoreResult<Company> {
    if let Some(company) = catalog.find_company_by_name(name)? {
        return Ok(company);
    }

    match catalog.create_company(name) {
        Ok(company) => {
            stats.companies_created += 1;
            info!(id = company.id, name = %company.name, "saved new company");
            Ok(company)
        }
        Err(e) if e.is_conflict() => {
            catalog
                .find_company_by_name(name)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "company",
                    key: name.to_string(),
                })
        }
        Err(e) => Err(e),
    }
}
