//! Tabular rosters and the conflict report
//!
//! Column names follow the EasyChair CSV exports. Required columns are
//! checked against the header row before any data row is read.

use crate::error::RosterError;
use crate::model::{
    CanonicalId, CommitteeEntry, ConflictRecord, RosterNumber, SubmissionAuthorEntry,
};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

pub const PERSON_NUMBER: &str = "person #";
pub const SUBMISSION_NUMBER: &str = "submission #";
pub const FIRST_NAME: &str = "first name";
pub const LAST_NAME: &str = "last name";
pub const AFFILIATION: &str = "affiliation";
pub const COUNTRY: &str = "country";
pub const DBLP_ID: &str = "dblp_id";
pub const DBLP_NAME: &str = "dblp_name";
pub const DBLP_AFFILIATIONS: &str = "dblp_affiliations";

/// Conflict report header
pub const REPORT_COLUMNS: [&str; 4] = [
    "Member #",
    "Member Name",
    "submission #",
    "conflict_details",
];

/// A CSV file held in memory with its header row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterTable {
    source: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RosterTable {
    pub fn read(path: &Path) -> Result<Self, RosterError> {
        let file = std::fs::File::open(path).map_err(|source| RosterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Parse CSV from any reader; `source` names it in error messages
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, RosterError> {
        let csv_error = |e: csv::Error| RosterError::Csv {
            path: source.to_string(),
            source: e,
        };

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect::<Vec<_>>();

        let width = headers.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width.max(row.len()), String::new());
            rows.push(row);
        }

        Ok(Self {
            source: source.to_string(),
            headers,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<String>] {
        &mut self.rows
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Indices of `names`, or an error listing every missing one
    pub fn require(&self, names: &[&str]) -> Result<Vec<usize>, RosterError> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| self.column(name).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(RosterError::MissingColumns {
                path: self.source.clone(),
                columns: missing.join(", "),
            });
        }

        Ok(names.iter().filter_map(|name| self.column(name)).collect())
    }

    /// Index of `name`, appending an empty column if absent
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column(name) {
            return index;
        }
        self.headers.push(name.to_string());
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width.max(row.len()), String::new());
        }
        width - 1
    }

    pub fn write(&self, path: &Path) -> Result<(), RosterError> {
        let file = std::fs::File::create(path).map_err(|source| RosterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.to_writer(file, &path.display().to_string())
    }

    pub fn to_writer<W: Write>(&self, writer: W, target: &str) -> Result<(), RosterError> {
        let csv_error = |e: csv::Error| RosterError::Csv {
            path: target.to_string(),
            source: e,
        };

        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        writer.write_record(&self.headers).map_err(csv_error)?;
        for row in &self.rows {
            writer.write_record(row).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| RosterError::Io {
            path: target.to_string(),
            source,
        })
    }
}

fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

fn optional_id(value: &str) -> Option<CanonicalId> {
    let value = value.trim();
    (!value.is_empty()).then(|| CanonicalId::new(value))
}

/// Committee roster rows
pub fn committee_from_table(table: &RosterTable) -> Result<Vec<CommitteeEntry>, RosterError> {
    let columns = table.require(&[PERSON_NUMBER, FIRST_NAME, LAST_NAME, AFFILIATION, COUNTRY])?;
    let (person, first, last, affiliation, country) =
        (columns[0], columns[1], columns[2], columns[3], columns[4]);
    let dblp_id = table.column(DBLP_ID);

    Ok(table
        .rows()
        .iter()
        .map(|row| CommitteeEntry {
            person: RosterNumber::new(row[person].as_str()),
            name: full_name(&row[first], &row[last]),
            dblp_id: dblp_id.and_then(|i| optional_id(&row[i])),
            affiliation: row[affiliation].trim().to_string(),
            country: row[country].trim().to_string(),
        })
        .collect())
}

/// Submission author rows
pub fn submissions_from_table(
    table: &RosterTable,
) -> Result<Vec<SubmissionAuthorEntry>, RosterError> {
    let columns =
        table.require(&[SUBMISSION_NUMBER, FIRST_NAME, LAST_NAME, AFFILIATION, COUNTRY])?;
    let (submission, first, last, affiliation, country) =
        (columns[0], columns[1], columns[2], columns[3], columns[4]);
    let dblp_id = table.column(DBLP_ID);

    Ok(table
        .rows()
        .iter()
        .map(|row| SubmissionAuthorEntry {
            submission: RosterNumber::new(row[submission].as_str()),
            name: full_name(&row[first], &row[last]),
            dblp_id: dblp_id.and_then(|i| optional_id(&row[i])),
            affiliation: row[affiliation].trim().to_string(),
            country: row[country].trim().to_string(),
        })
        .collect())
}

pub fn read_committee(path: &Path) -> Result<Vec<CommitteeEntry>, RosterError> {
    committee_from_table(&RosterTable::read(path)?)
}

pub fn read_submissions(path: &Path) -> Result<Vec<SubmissionAuthorEntry>, RosterError> {
    submissions_from_table(&RosterTable::read(path)?)
}

/// Build the conflict report table
///
/// Member names come from the committee roster, looked up by person number.
pub fn conflict_report(records: &[ConflictRecord], committee: &[CommitteeEntry]) -> RosterTable {
    let names: HashMap<&RosterNumber, &str> = committee
        .iter()
        .map(|entry| (&entry.person, entry.name.as_str()))
        .collect();

    RosterTable {
        source: "conflict report".to_string(),
        headers: REPORT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: records
            .iter()
            .map(|record| {
                vec![
                    record.member.to_string(),
                    names.get(&record.member).copied().unwrap_or("").to_string(),
                    record.submission.to_string(),
                    record.details(),
                ]
            })
            .collect(),
    }
}
