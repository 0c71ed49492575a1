//! One-time CSV import of the bulk tables
//!
//! `species`, `sightings` and `checklist` are filled from `species.csv`,
//! `sightings.csv` and `checklist.csv` the first time they are found empty.
//! Tables that already hold rows are left alone, so running the loader again
//! is a no-op.
//!
//! Files are read line by line; fields follow RFC 4180 quoting but a quoted
//! field cannot span lines.

use birdwatch_common::db::{ChecklistEvent, Sighting, Species};
use birdwatch_common::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub const SPECIES_CSV: &str = "species.csv";
pub const SIGHTINGS_CSV: &str = "sightings.csv";
pub const CHECKLIST_CSV: &str = "checklist.csv";

/// What the loader did with one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Table was empty and rows were imported
    Loaded,
    /// Table already had rows
    Skipped,
    /// Table was empty but its CSV file does not exist
    Missing,
}

/// Per-table outcome, including the first stored row as a sample
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub status: LoadStatus,
    pub inserted: u64,
    pub skipped_rows: u64,
    pub total: i64,
    pub sample: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub species: TableReport,
    pub sightings: TableReport,
    pub checklist: TableReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkTable {
    Species,
    Sightings,
    Checklist,
}

impl BulkTable {
    fn table(self) -> &'static str {
        match self {
            BulkTable::Species => "species",
            BulkTable::Sightings => "sightings",
            BulkTable::Checklist => "checklist",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            BulkTable::Species => SPECIES_CSV,
            BulkTable::Sightings => SIGHTINGS_CSV,
            BulkTable::Checklist => CHECKLIST_CSV,
        }
    }

    /// Name of the first column, used to recognise a header row
    fn first_column(self) -> &'static str {
        match self {
            BulkTable::Species => "name",
            BulkTable::Sightings | BulkTable::Checklist => "SAMPLING_EVENT_IDENTIFIER",
        }
    }

    /// Insert one CSV record, returning rows written; `None` means the record was malformed
    async fn insert_row(
        self,
        tx: &mut Transaction<'_, Sqlite>,
        fields: &[String],
    ) -> Result<Option<u64>> {
        let result = match self {
            BulkTable::Species => {
                let Some(name) = fields.first().map(|f| f.trim()).filter(|f| !f.is_empty()) else {
                    return Ok(None);
                };
                sqlx::query("INSERT OR IGNORE INTO species (name) VALUES (?)")
                    .bind(name)
                    .execute(&mut **tx)
                    .await?
            }
            BulkTable::Sightings => {
                let [event_id, name, count, ..] = fields else {
                    return Ok(None);
                };
                if event_id.trim().is_empty() || name.trim().is_empty() {
                    return Ok(None);
                }
                sqlx::query(
                    "INSERT INTO sightings (SAMPLING_EVENT_IDENTIFIER, COMMON_NAME, OBSERVATION_COUNT)
                     VALUES (?, ?, ?)",
                )
                .bind(event_id.trim())
                .bind(name.trim())
                .bind(count.trim())
                .execute(&mut **tx)
                .await?
            }
            BulkTable::Checklist => {
                let [event_id, lat, lon, date, rest @ ..] = fields else {
                    return Ok(None);
                };
                let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) else {
                    return Ok(None);
                };
                if event_id.trim().is_empty() || !lat.is_finite() || !lon.is_finite() {
                    return Ok(None);
                }

                let optional = |i: usize| {
                    rest.get(i)
                        .map(|f| f.trim())
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                };
                let duration = optional(2).and_then(|d| d.parse::<f64>().ok());

                sqlx::query(
                    "INSERT OR IGNORE INTO checklist
                     (SAMPLING_EVENT_IDENTIFIER, LATITUDE, LONGITUDE, OBSERVATION_DATE,
                      TIME_OBSERVATIONS_STARTED, OBSERVER_ID, DURATION_MINUTES)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(event_id.trim())
                .bind(lat)
                .bind(lon)
                .bind(date.trim())
                .bind(optional(0))
                .bind(optional(1))
                .bind(duration)
                .execute(&mut **tx)
                .await?
            }
        };
        Ok(Some(result.rows_affected()))
    }

    async fn sample(self, pool: &SqlitePool) -> Result<Option<Value>> {
        let value = match self {
            BulkTable::Species => {
                sqlx::query_as::<_, Species>("SELECT id, name FROM species ORDER BY id LIMIT 1")
                    .fetch_optional(pool)
                    .await?
                    .map(serde_json::to_value)
            }
            BulkTable::Sightings => sqlx::query_as::<_, Sighting>(
                "SELECT id, SAMPLING_EVENT_IDENTIFIER, COMMON_NAME, OBSERVATION_COUNT
                 FROM sightings ORDER BY id LIMIT 1",
            )
            .fetch_optional(pool)
            .await?
            .map(serde_json::to_value),
            BulkTable::Checklist => sqlx::query_as::<_, ChecklistEvent>(
                "SELECT id, SAMPLING_EVENT_IDENTIFIER, LATITUDE, LONGITUDE, OBSERVATION_DATE,
                        TIME_OBSERVATIONS_STARTED, OBSERVER_ID, DURATION_MINUTES
                 FROM checklist ORDER BY id LIMIT 1",
            )
            .fetch_optional(pool)
            .await?
            .map(serde_json::to_value),
        };

        value
            .transpose()
            .map_err(|e| Error::Internal(format!("serializing {} sample: {}", self.table(), e)))
    }

    async fn count(self, pool: &SqlitePool) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table());
        Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await?)
    }
}

/// Populate every empty bulk table from its CSV file in `dir`
///
/// Records are read one line at a time, so a quoted field containing a line
/// break is split into two malformed rows, each skipped with a warning.
///
/// Callers must not run two loaders against the same database at once;
/// the service serializes calls through `AppState::bootstrap_lock`.
pub async fn run(pool: &SqlitePool, dir: &Path) -> Result<BootstrapReport> {
    Ok(BootstrapReport {
        species: load_table(pool, dir, BulkTable::Species).await?,
        sightings: load_table(pool, dir, BulkTable::Sightings).await?,
        checklist: load_table(pool, dir, BulkTable::Checklist).await?,
    })
}

async fn load_table(pool: &SqlitePool, dir: &Path, table: BulkTable) -> Result<TableReport> {
    let mut report = TableReport {
        status: LoadStatus::Skipped,
        inserted: 0,
        skipped_rows: 0,
        total: 0,
        sample: None,
    };

    if table.count(pool).await? == 0 {
        let path = dir.join(table.file_name());
        match File::open(&path).await {
            Ok(file) => {
                let (inserted, skipped) = import_file(pool, file, table).await?;
                info!(
                    "Loaded {} rows into {} from {} ({} skipped)",
                    inserted,
                    table.table(),
                    path.display(),
                    skipped
                );
                report.status = LoadStatus::Loaded;
                report.inserted = inserted;
                report.skipped_rows = skipped;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} is empty and {} does not exist", table.table(), path.display());
                report.status = LoadStatus::Missing;
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }

    report.total = table.count(pool).await?;
    report.sample = table.sample(pool).await?;
    Ok(report)
}

async fn import_file(pool: &SqlitePool, file: File, table: BulkTable) -> Result<(u64, u64)> {
    let mut lines = BufReader::new(file).lines();
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;
    let mut skipped = 0u64;
    let mut line_no = 0usize;
    let mut first_record = true;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim_start_matches('\u{feff}').trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_csv_line(line);
        if std::mem::take(&mut first_record)
            && fields
                .first()
                .is_some_and(|f| f.trim().eq_ignore_ascii_case(table.first_column()))
        {
            continue;
        }

        match table.insert_row(&mut tx, &fields).await? {
            Some(rows) => inserted += rows,
            None => {
                warn!("{}:{}: malformed row skipped", table.file_name(), line_no);
                skipped += 1;
            }
        }
    }

    tx.commit().await?;
    Ok((inserted, skipped))
}

/// Split one CSV line into fields
///
/// Double quotes wrap a field; `""` inside a quoted field is a literal quote.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain() {
        assert_eq!(split_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_csv_line("a,,c"), vec!["a", "", "c"]);
        assert_eq!(split_csv_line("solo"), vec!["solo"]);
    }

    #[test]
    fn test_split_quoted() {
        assert_eq!(
            split_csv_line(r#"S1,"Robin, American",3"#),
            vec!["S1", "Robin, American", "3"]
        );
        assert_eq!(split_csv_line(r#""say ""hi""",x"#), vec![r#"say "hi""#, "x"]);
    }

    #[test]
    fn test_split_trailing_comma() {
        assert_eq!(split_csv_line("a,b,"), vec!["a", "b", ""]);
    }
}
