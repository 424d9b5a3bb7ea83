use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Clone, Debug, Deserialize)]
pub struct ContributorRow {
    #[serde(rename = "author_name", alias = "author_name_top")]
    pub name: String,
    #[serde(default)]
    pub orca_received: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RepositoryRow {
    #[serde(rename = "repo", alias = "base_repo_original")]
    pub full_name: String,
    #[serde(rename = "repo_stars", default)]
    pub stars: u64,
    #[serde(rename = "repo_forks", default)]
    pub forks: u64,
    #[serde(rename = "repo_createdAt")]
    pub created_at: String,
    #[serde(rename = "repo_updatedAt")]
    pub updated_at: String,
    #[serde(rename = "repo_languages", default)]
    pub languages: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LinkRow {
    #[serde(rename = "author_name", alias = "author_name_top")]
    pub contributor: String,
    #[serde(rename = "repo", alias = "base_repo_original")]
    pub repository: String,
    pub commit_count: u32,
    pub commit_sec_min: f64,
    pub commit_sec_max: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemainingContributorRow {
    #[serde(rename = "author_name", alias = "author_name_top", default)]
    pub name: Option<String>,
    pub commit_count: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommitRow {
    #[serde(default)]
    pub author: String,
    pub author_time: String,
    pub commit_time: String,
    #[serde(default)]
    pub files_changed: u32,
    #[serde(default)]
    pub line_insertions: u32,
    #[serde(default)]
    pub line_deletions: u32,
    #[serde(default)]
    pub decorations: String,
}

pub fn read_rows<T: DeserializeOwned>(reader: impl Read, label: &str) -> Result<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            // header is line 1
            row.with_context(|| format!("invalid {label} row at line {}", index + 2))
        })
        .collect()
}

pub fn read_file<T: DeserializeOwned>(path: &Path, label: &str) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open {label} file {}", path.display()))?;
    read_rows(file, label).with_context(|| format!("failed to read {}", path.display()))
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Repository timestamps: RFC 3339 (`2013-03-08T11:11:41Z`) or
/// `2013-03-08 11:11:41+00:00` as written by some exporters.
pub fn parse_repo_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }
    if let Ok(time) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("unrecognized repository timestamp {raw:?}"))
}

pub fn parse_unix_seconds(seconds: f64) -> Result<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(anyhow!("unix timestamp is not a finite number"));
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
        .ok_or_else(|| anyhow!("unix timestamp {seconds} is out of range"))
}

/// Commit timestamps as printed by `git log --date=iso`: `2021-04-01 09:12:44 +0200`.
pub fn parse_commit_time(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .with_context(|| format!("unrecognized commit timestamp {raw:?}"))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn link_rows_accept_both_header_generations() {
        let current = "author_name,repo,commit_count,commit_sec_min,commit_sec_max\n\
                       Ada,acme/core,12,1600000000,1650000000.5\n";
        let legacy = "author_name_top,base_repo_original,commit_count,commit_sec_min,commit_sec_max\n\
                      Ada,acme/core,12,1600000000,1650000000\n";

        let current_rows: Vec<LinkRow> = read_rows(current.as_bytes(), "link").unwrap();
        let legacy_rows: Vec<LinkRow> = read_rows(legacy.as_bytes(), "link").unwrap();
        assert_eq!(current_rows[0].repository, "acme/core");
        assert_eq!(legacy_rows[0].contributor, "Ada");
        assert_eq!(legacy_rows[0].commit_count, 12);
    }

    #[test]
    fn optional_columns_default() {
        let csv = "author_name\nAda\nGrace\n";
        let rows: Vec<ContributorRow> = read_rows(csv.as_bytes(), "contributor").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.orca_received.is_none()));
    }

    #[test]
    fn malformed_row_reports_line() {
        let csv = "author_name,repo,commit_count,commit_sec_min,commit_sec_max\n\
                   Ada,acme/core,lots,1,2\n";
        let error = read_rows::<LinkRow>(csv.as_bytes(), "link").unwrap_err();
        assert!(format!("{error:#}").contains("line 2"));
    }

    #[test]
    fn timestamps_parse_in_all_supported_shapes() {
        let rfc = parse_repo_time("2013-03-08T11:11:41Z").unwrap();
        assert_eq!((rfc.year(), rfc.month(), rfc.hour()), (2013, 3, 11));
        let spaced = parse_repo_time("2013-03-08 11:11:41+00:00").unwrap();
        assert_eq!(rfc, spaced);
        assert!(parse_repo_time("yesterday").is_err());

        let commit = parse_commit_time("2021-04-01 09:12:44 +0200").unwrap();
        assert_eq!(commit.offset().local_minus_utc(), 7200);
        assert_eq!(commit.month(), 4);

        let unix = parse_unix_seconds(1_600_000_000.0).unwrap();
        assert_eq!(unix.timestamp(), 1_600_000_000);
        assert!(parse_unix_seconds(f64::NAN).is_err());
    }

    #[test]
    fn flags_are_lenient() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
