//! The operator's PowerTag roster: a CSV of expected devices keyed by radio ID.
//!
//! Loaded once before a run, mutated in place as devices are configured, and
//! written back in full afterwards.

pub mod record;

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use log::{info, warn};
use thiserror::Error;

use crate::models::ReadingResult;

pub use record::{DeviceRecord, MOUNTED_ATTENTION, MOUNTED_OK, MOUNTED_REVERSAL_FAILED};

pub const DEFAULT_OUTPUT: &str = "PowerTags_checked.csv";

pub const COLUMN_NAME: &str = "Name";
pub const COLUMN_RADIO_ID: &str = "RF ID";
pub const COLUMN_LABEL: &str = "Fuse";
pub const COLUMN_MOUNTED: &str = "Mounted";
pub const COLUMN_ISSUES: &str = "Issues";

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read roster {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("roster {0} is empty")]
    Empty(PathBuf),
    #[error("roster is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("unable to parse roster: {0}")]
    Parse(#[from] csv::Error),
    #[error("device name '{0}' appears more than once")]
    DuplicateName(String),
    #[error("radio ID '{0}' appears more than once")]
    DuplicateRadioId(String),
}

#[derive(Debug, Clone)]
pub struct Roster {
    delimiter: u8,
    records: Vec<DeviceRecord>,
}

struct ColumnIndex {
    name: usize,
    radio_id: usize,
    label: usize,
    mounted: Option<usize>,
    issues: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, RosterError> {
        let position = |wanted: &str| headers.iter().position(|header| header == wanted);

        let missing: Vec<String> = [COLUMN_NAME, COLUMN_RADIO_ID, COLUMN_LABEL]
            .into_iter()
            .filter(|column| position(*column).is_none())
            .map(str::to_string)
            .collect();

        match (position(COLUMN_NAME), position(COLUMN_RADIO_ID), position(COLUMN_LABEL)) {
            (Some(name), Some(radio_id), Some(label)) => Ok(Self {
                name,
                radio_id,
                label,
                mounted: position(COLUMN_MOUNTED),
                issues: position(COLUMN_ISSUES),
            }),
            _ => Err(RosterError::MissingColumns(missing)),
        }
    }
}

/// `;` when the header line uses it exclusively, `,` otherwise.
fn detect_delimiter(contents: &str) -> u8 {
    let header = contents.lines().next().unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

fn parse_issue(raw: &str) -> Option<ReadingResult> {
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => ReadingResult::from_code(value as i8),
        _ => {
            warn!("Ignoring unrecognised issue code '{raw}'");
            None
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.filter(|value| !value.is_empty()).map(str::to_string)
}

impl Roster {
    /// Reads the roster at `path`. Any failure here means the run must not start.
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let contents = fs::read_to_string(path).map_err(|source| RosterError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if contents.trim().is_empty() {
            return Err(RosterError::Empty(path.to_path_buf()));
        }

        let roster = Self::parse(&contents)?;
        if roster.records.is_empty() {
            return Err(RosterError::Empty(path.to_path_buf()));
        }

        info!(
            "Loaded {} PowerTag records from {}",
            roster.records.len(),
            path.display()
        );
        Ok(roster)
    }

    pub fn parse(contents: &str) -> Result<Self, RosterError> {
        let delimiter = detect_delimiter(contents);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(contents.as_bytes());

        let columns = ColumnIndex::resolve(reader.headers()?)?;

        let mut names = HashSet::new();
        let mut radio_ids = HashSet::new();
        let mut records = Vec::new();

        for row in reader.records() {
            let row = row?;
            let field = |index: usize| row.get(index).unwrap_or_default().to_string();

            // Spreadsheet exports pad the end of the sheet with rows like `,,`.
            if field(columns.name).is_empty() && field(columns.radio_id).is_empty() {
                continue;
            }

            let record = DeviceRecord {
                name: field(columns.name),
                radio_id: field(columns.radio_id),
                label: field(columns.label),
                mounted_status: columns.mounted.and_then(|index| non_empty(row.get(index))),
                issue_code: columns
                    .issues
                    .and_then(|index| row.get(index))
                    .and_then(parse_issue),
            };

            if !names.insert(record.name.clone()) {
                return Err(RosterError::DuplicateName(record.name));
            }
            if !radio_ids.insert(record.radio_id.clone()) {
                return Err(RosterError::DuplicateRadioId(record.radio_id));
            }

            records.push(record);
        }

        Ok(Self { delimiter, records })
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Exact match on radio ID. `None` is the normal answer for a device nobody registered.
    pub fn lookup(&self, radio_id: &str) -> Option<&DeviceRecord> {
        let found = self.records.iter().find(|record| record.radio_id == radio_id);
        match found {
            Some(_) => info!("Data for PowerTag with radio ID {radio_id} found"),
            None => warn!("PowerTag with radio ID {radio_id} not found in roster"),
        }
        found
    }

    fn record_mut(&mut self, name: &str) -> Option<&mut DeviceRecord> {
        self.records.iter_mut().find(|record| record.name == name)
    }

    /// Returns `false` (and logs) when no record carries `name`.
    pub fn set_mounted_status(&mut self, name: &str, value: &str) -> bool {
        match self.record_mut(name) {
            Some(record) => {
                record.mounted_status = Some(value.to_string());
                info!("PowerTag '{name}' marked as {value}");
                true
            }
            None => {
                warn!("Cannot mark unknown PowerTag '{name}' as {value}");
                false
            }
        }
    }

    pub fn set_issue_code(&mut self, name: &str, value: ReadingResult) -> bool {
        match self.record_mut(name) {
            Some(record) => {
                record.issue_code = Some(value);
                info!("PowerTag '{name}' readings marked as {}", value.code());
                true
            }
            None => {
                warn!("Cannot record readings for unknown PowerTag '{name}'");
                false
            }
        }
    }

    /// Serialises every record, matched or not, in load order.
    pub fn to_csv(&self) -> Result<Vec<u8>, RosterError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        writer.write_record([
            COLUMN_NAME,
            COLUMN_RADIO_ID,
            COLUMN_LABEL,
            COLUMN_MOUNTED,
            COLUMN_ISSUES,
        ])?;

        for record in &self.records {
            let issue = record
                .issue_code
                .map(|code| code.code().to_string())
                .unwrap_or_default();
            writer.write_record([
                record.name.as_str(),
                record.radio_id.as_str(),
                record.label.as_str(),
                record.mounted_status.as_deref().unwrap_or_default(),
                issue.as_str(),
            ])?;
        }

        writer
            .into_inner()
            .map_err(|err| RosterError::Parse(csv::Error::from(err.into_error())))
    }

    /// Writes the full roster to `destination`, or to [`DEFAULT_OUTPUT`] when `None`.
    pub fn persist(&self, destination: Option<&Path>) -> Result<PathBuf, RosterError> {
        let path = destination
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let bytes = self.to_csv()?;

        let io_err = |source| RosterError::Io {
            path: path.clone(),
            source,
        };

        let tmp = path.with_extension("csv.tmp");
        fs::write(&tmp, &bytes).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;

        info!("Data successfully saved to {}", path.display());
        Ok(path)
    }
}
