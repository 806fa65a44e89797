//! Flat-file loading.
//!
//! Each source extract is read into a [`SourceTable`]: the header row plus
//! every data row as optional text cells. Empty cells are absent values.
//! Typing happens later, at projection time, through [`Record`] accessors.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::constants::{
    APPEARANCE_TYPE_COLUMNS, APPEARANCE_TYPE_FILE, APPEARANCE_TYPE_SOURCE, GAME_LOG_FILE,
    GAME_LOG_SOURCE, PARK_CODES_FILE, PARK_CODES_SOURCE, PARK_COLUMNS, PERSON_CODES_FILE,
    PERSON_CODES_SOURCE, PERSON_COLUMNS, TEAM_CODES_FILE, TEAM_CODES_SOURCE, TEAM_COLUMNS,
};
use crate::error::{BuildError, Result};
use crate::metrics::BuildMetrics;
use crate::pipeline::transform::game_log_columns;

/// Locations of the five source extracts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub game_log: PathBuf,
    pub parks: PathBuf,
    pub persons: PathBuf,
    pub teams: PathBuf,
    pub appearance_types: PathBuf,
}

impl SourcePaths {
    /// Standard file names under one directory
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            game_log: dir.join(GAME_LOG_FILE),
            parks: dir.join(PARK_CODES_FILE),
            persons: dir.join(PERSON_CODES_FILE),
            teams: dir.join(TEAM_CODES_FILE),
            appearance_types: dir.join(APPEARANCE_TYPE_FILE),
        }
    }
}

/// An in-memory copy of one source extract
#[derive(Debug, Clone)]
pub struct SourceTable {
    name: &'static str,
    headers: Vec<String>,
    columns: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl SourceTable {
    /// Read a CSV extract and check that every `required` column is present
    pub fn from_path<P: AsRef<Path>>(
        name: &'static str,
        path: P,
        required: &[&str],
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| BuildError::SourceRead {
            source_name: name.to_string(),
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_reader(name, file, required)
    }

    pub fn from_reader<R: Read>(name: &'static str, reader: R, required: &[&str]) -> Result<Self> {
        let csv_error = |error: csv::Error| BuildError::Csv {
            source_name: name.to_string(),
            error,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        if let Some(missing) = required.iter().find(|c| !columns.contains_key(**c)) {
            return Err(BuildError::MissingColumn {
                source_name: name.to_string(),
                column: missing.to_string(),
            });
        }

        // One buffer per row rather than one allocation per cell
        let rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        debug!(source = name, rows = rows.len(), columns = headers.len(), "Read source table");
        Ok(Self {
            name,
            headers,
            columns,
            rows,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a named column
    pub fn resolve(&self, column: &str) -> Result<usize> {
        self.columns
            .get(column)
            .copied()
            .ok_or_else(|| BuildError::MissingColumn {
                source_name: self.name.to_string(),
                column: column.to_string(),
            })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().enumerate().map(move |(index, cells)| Record {
            table: self,
            index,
            cells,
        })
    }
}

/// One row of a [`SourceTable`]
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a SourceTable,
    index: usize,
    cells: &'a csv::StringRecord,
}

impl<'a> Record<'a> {
    /// 1-based line number in the extract, counting the header row
    pub fn line(&self) -> usize {
        self.index + 2
    }

    /// Text cell at a resolved column position. Empty cells are absent.
    pub fn text_at(&self, column: usize) -> Option<&'a str> {
        self.cells.get(column).filter(|cell| !cell.is_empty())
    }

    pub fn text(&self, column: &str) -> Result<Option<&'a str>> {
        Ok(self.text_at(self.table.resolve(column)?))
    }

    pub fn owned(&self, column: &str) -> Result<Option<String>> {
        Ok(self.text(column)?.map(str::to_string))
    }

    /// Integer cell at a resolved column position. A value that is not a
    /// whole number is an error; use this for key columns.
    pub fn int_at(&self, column: usize) -> Result<Option<i64>> {
        match self.text_at(column) {
            None => Ok(None),
            Some(raw) => parse_int(raw).map(Some).ok_or_else(|| BuildError::InvalidField {
                source_name: self.table.name.to_string(),
                row: self.line(),
                column: self.table.headers[column].clone(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn int(&self, column: &str) -> Result<Option<i64>> {
        self.int_at(self.table.resolve(column)?)
    }

    /// Integer cell for a descriptive column. A value that is not a whole
    /// number is logged, counted and read as absent.
    pub fn lenient_int_at(&self, column: usize) -> Option<i64> {
        let raw = self.text_at(column)?;
        let value = parse_int(raw);
        if value.is_none() {
            let name = &self.table.headers[column];
            warn!(
                source = self.table.name,
                row = self.line(),
                column = %name,
                value = raw,
                "Unparseable integer stored as NULL"
            );
            BuildMetrics::record_invalid_cell(self.table.name, name);
        }
        value
    }

    pub fn lenient_int(&self, column: &str) -> Result<Option<i64>> {
        Ok(self.lenient_int_at(self.table.resolve(column)?))
    }

    /// A cell that must be present, such as a primary key
    pub fn required(&self, column: &str) -> Result<&'a str> {
        self.text(column)?.ok_or_else(|| self.missing(column))
    }

    pub fn required_int(&self, column: &str) -> Result<i64> {
        self.int(column)?.ok_or_else(|| self.missing(column))
    }

    fn missing(&self, column: &str) -> BuildError {
        BuildError::MissingValue {
            source_name: self.table.name.to_string(),
            row: self.line(),
            column: column.to_string(),
        }
    }
}

/// Parse an integer cell. Extracts written through a float-typed column
/// carry whole numbers as `7.0`; those are accepted too.
pub fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = raw.parse().ok()?;
    let whole = value.is_finite() && value.fract() == 0.0;
    (whole && value.abs() < i64::MAX as f64).then_some(value as i64)
}

/// All five extracts, held in memory until cleanup
#[derive(Debug, Clone)]
pub struct Staging {
    pub game_log: SourceTable,
    pub parks: SourceTable,
    pub persons: SourceTable,
    pub teams: SourceTable,
    pub appearance_types: SourceTable,
}

impl Staging {
    pub fn tables(&self) -> [&SourceTable; 5] {
        [
            &self.game_log,
            &self.parks,
            &self.persons,
            &self.teams,
            &self.appearance_types,
        ]
    }
}

/// Read every source extract. Any failure aborts the whole load.
#[instrument(skip(paths))]
pub fn load(paths: &SourcePaths) -> Result<Staging> {
    let start = Instant::now();
    let game_log_required = game_log_columns();
    let game_log_required: Vec<&str> = game_log_required.iter().map(String::as_str).collect();

    let staging = Staging {
        game_log: SourceTable::from_path(GAME_LOG_SOURCE, &paths.game_log, &game_log_required)?,
        parks: SourceTable::from_path(PARK_CODES_SOURCE, &paths.parks, &PARK_COLUMNS)?,
        persons: SourceTable::from_path(PERSON_CODES_SOURCE, &paths.persons, &PERSON_COLUMNS)?,
        teams: SourceTable::from_path(TEAM_CODES_SOURCE, &paths.teams, &TEAM_COLUMNS)?,
        appearance_types: SourceTable::from_path(
            APPEARANCE_TYPE_SOURCE,
            &paths.appearance_types,
            &APPEARANCE_TYPE_COLUMNS,
        )?,
    };

    for table in staging.tables() {
        BuildMetrics::record_source_rows(table.name(), table.len());
        info!(source = table.name(), rows = table.len(), "Loaded source");
    }
    BuildMetrics::record_stage_duration("load", start.elapsed().as_secs_f64());
    Ok(staging)
}
