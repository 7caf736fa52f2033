//! Roster annotation: fill in dblp ids, names and affiliations

use crate::clients::AuthorRecordLoader;
use crate::error::RosterError;
use crate::model::{CanonicalId, Candidate};
use crate::resolver::{IdentityResolver, Resolution, ResolveRequest};
use crate::roster::{
    RosterTable, AFFILIATION, COUNTRY, DBLP_AFFILIATIONS, DBLP_ID, DBLP_NAME, FIRST_NAME,
    LAST_NAME,
};
use tracing::{error, info};

/// Written when dblp lists no affiliation for a person
pub const NO_AFFILIATIONS: &str = "[None Listed]";

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotateStats {
    pub rows: usize,
    pub already_resolved: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub enriched: usize,
}

fn join_affiliations(affiliations: &[String]) -> String {
    if affiliations.is_empty() {
        NO_AFFILIATIONS.to_string()
    } else {
        affiliations.join("; ")
    }
}

struct Columns {
    first: usize,
    last: usize,
    affiliation: Option<usize>,
    country: Option<usize>,
    id: usize,
    name: usize,
    affiliations: usize,
}

/// Resolves every roster row lacking a `dblp_id`
pub struct Annotator<'a> {
    resolver: &'a IdentityResolver<'a>,
    records: &'a dyn AuthorRecordLoader,
}

impl<'a> Annotator<'a> {
    pub fn new(resolver: &'a IdentityResolver<'a>, records: &'a dyn AuthorRecordLoader) -> Self {
        Self { resolver, records }
    }

    /// Annotate `table` in place
    ///
    /// Adds the `dblp_id`, `dblp_name` and `dblp_affiliations` columns when
    /// absent. Rows that already carry an id are not re-resolved. Service
    /// failures only leave the affected row blank.
    pub async fn annotate(&self, table: &mut RosterTable) -> Result<AnnotateStats, RosterError> {
        let required = table.require(&[FIRST_NAME, LAST_NAME])?;
        let columns = Columns {
            first: required[0],
            last: required[1],
            affiliation: table.column(AFFILIATION),
            country: table.column(COUNTRY),
            id: table.ensure_column(DBLP_ID),
            name: table.ensure_column(DBLP_NAME),
            affiliations: table.ensure_column(DBLP_AFFILIATIONS),
        };

        let mut stats = AnnotateStats::default();
        for row in table.rows_mut() {
            stats.rows += 1;
            self.annotate_row(row, &columns, &mut stats).await;
        }

        info!(
            rows = stats.rows,
            already_resolved = stats.already_resolved,
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            "Roster annotation complete"
        );
        Ok(stats)
    }

    async fn annotate_row(&self, row: &mut [String], columns: &Columns, stats: &mut AnnotateStats) {
        let name = format!("{} {}", row[columns.first].trim(), row[columns.last].trim())
            .trim()
            .to_string();

        if row[columns.id].trim().is_empty() {
            let mut request = ResolveRequest::new(&name);
            if let Some(i) = columns.affiliation {
                request = request.with_affiliation(&row[i]);
            }
            if let Some(i) = columns.country {
                request = request.with_country(&row[i]);
            }

            let resolution = self.resolver.resolve(request).await;
            match &resolution {
                Resolution::Unresolved => stats.unresolved += 1,
                Resolution::Exact(id) => {
                    stats.resolved += 1;
                    row[columns.id] = id.to_string();
                    row[columns.name] = name.clone();
                    row[columns.affiliations] = String::new();
                }
                Resolution::Manual {
                    id,
                    candidate: None,
                } => {
                    stats.resolved += 1;
                    row[columns.id] = id.to_string();
                    row[columns.name] = String::new();
                    row[columns.affiliations] = String::new();
                }
                _ => {
                    if let Some(candidate) = resolution.candidate() {
                        stats.resolved += 1;
                        write_candidate(row, columns, candidate);
                    }
                }
            }
        } else {
            stats.already_resolved += 1;
        }

        let id = row[columns.id].trim().to_string();
        if id.is_empty()
            || (!row[columns.name].is_empty() && !row[columns.affiliations].is_empty())
        {
            return;
        }

        info!(name = %name, id = %id, "Loading author record");
        match self.records.load_author(&CanonicalId::new(id.as_str())).await {
            Ok(record) => {
                stats.enriched += 1;
                if row[columns.name].is_empty() {
                    row[columns.name] = record.name;
                }
                if row[columns.affiliations].is_empty() {
                    row[columns.affiliations] = join_affiliations(&record.affiliations);
                }
            }
            Err(e) => error!(id = %id, "Error loading author record: {}", e),
        }
    }
}

fn write_candidate(row: &mut [String], columns: &Columns, candidate: &Candidate) {
    row[columns.id] = candidate.id.to_string();
    row[columns.name] = candidate.display_name.clone();
    row[columns.affiliations] = join_affiliations(&candidate.affiliations);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_affiliations_marked() {
        assert_eq!(join_affiliations(&[]), NO_AFFILIATIONS);
        assert_eq!(
            join_affiliations(&["A".to_string(), "B".to_string()]),
            "A; B"
        );
    }
}
