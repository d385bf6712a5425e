//! Player list snapshots parsed from the `ShowPlayers` response.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

/// Column holding the numeric player identity.
pub const IDENTITY_FIELD: &str = "playeruid";

/// Identity the server reports for rows that are not real players.
pub const NO_PLAYER_UID: u64 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("response is empty, expected a header row")]
    Empty,

    #[error("header has no 'playeruid' column")]
    MissingIdentity,

    #[error("line {line}: expected {expected} columns, got {actual}")]
    ColumnCount {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}: '{value}' is not a numeric playeruid")]
    InvalidIdentity { line: usize, value: String },
}

/// One connected player with every field the server reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    uid: u64,
    fields: Vec<(String, String)>,
}

impl PlayerRecord {
    /// Build a record from raw `(column, value)` pairs. The identity column
    /// must be present and numeric.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Result<Self, ParseError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields: Vec<(String, String)> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let value = fields
            .iter()
            .find(|(k, _)| k == IDENTITY_FIELD)
            .map(|(_, v)| v.as_str())
            .ok_or(ParseError::MissingIdentity)?;
        let uid = parse_uid(value, 1)?;
        Ok(Self { uid, fields })
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Display name, when the server reports one.
    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    /// Raw value of a column, exactly as the server sent it (trimmed).
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }
}

/// The players online at one poll instant, in server order.
///
/// Never contains a record with identity [`NO_PLAYER_UID`], and identities are
/// unique within one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    columns: Vec<String>,
    records: Vec<PlayerRecord>,
}

impl Snapshot {
    /// Parse the comma-separated table returned by `ShowPlayers`.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mut lines = raw
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines.next().ok_or(ParseError::Empty)?;
        let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
        let uid_column = columns
            .iter()
            .position(|c| c == IDENTITY_FIELD)
            .ok_or(ParseError::MissingIdentity)?;

        let mut records = Vec::new();
        for (line, row) in lines {
            let values: Vec<&str> = row.split(',').map(str::trim).collect();
            if values.len() != columns.len() {
                return Err(ParseError::ColumnCount {
                    line,
                    expected: columns.len(),
                    actual: values.len(),
                });
            }

            let uid = parse_uid(values[uid_column], line)?;
            let fields = columns
                .iter()
                .cloned()
                .zip(values.iter().map(|v| v.to_string()))
                .collect();
            records.push(PlayerRecord { uid, fields });
        }

        Ok(Self::from_records(columns, records))
    }

    /// Assemble a snapshot, dropping sentinel rows and repeated identities
    /// (first occurrence wins).
    pub fn from_records(columns: Vec<String>, records: Vec<PlayerRecord>) -> Self {
        let mut seen = HashSet::with_capacity(records.len());
        let records = records
            .into_iter()
            .filter(|r| r.uid != NO_PLAYER_UID)
            .filter(|r| {
                let fresh = seen.insert(r.uid);
                if !fresh {
                    debug!(uid = r.uid, "dropping duplicate player row");
                }
                fresh
            })
            .collect();
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.records.iter()
    }

    pub fn get(&self, uid: u64) -> Option<&PlayerRecord> {
        self.records.iter().find(|r| r.uid == uid)
    }

    /// Aligned text table for the audit log.
    pub fn to_table(&self) -> String {
        if self.records.is_empty() {
            return "(no players)".to_string();
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for record in &self.records {
            for (width, (_, value)) in widths.iter_mut().zip(record.fields.iter()) {
                *width = (*width).max(value.chars().count());
            }
        }

        let mut out = String::new();
        let header = self.columns.iter().map(String::as_str);
        write_row(&mut out, &widths, header);
        for record in &self.records {
            out.push('\n');
            write_row(&mut out, &widths, record.fields.iter().map(|(_, v)| v.as_str()));
        }
        out
    }
}

fn write_row<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    let row: Vec<String> = widths
        .iter()
        .zip(cells)
        .map(|(&width, cell)| format!("{cell:<width$}"))
        .collect();
    out.push_str(row.join("  ").trim_end());
}

fn parse_uid(value: &str, line: usize) -> Result<u64, ParseError> {
    // u64::from_str accepts a leading '+', which the server never sends.
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidIdentity {
            line,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| ParseError::InvalidIdentity {
        line,
        value: value.to_string(),
    })
}
