use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, FixedOffset};
use eframe::egui::Vec2;
use log::{debug, info};

use super::rows::{CommitRow, parse_commit_time, read_file};
use super::scale::{Scale, quantile};

pub const MARKER_RADIUS: f32 = 2.5;
pub const RELEASE_PREFIX: &str = "tag: v";
const RELEASE_MARKER_GROWTH: f32 = 20.0;
const RELEASE_GROWTH: f32 = 16.0;

#[derive(Clone, Debug)]
pub struct Commit {
    pub author: String,
    pub author_time: DateTime<FixedOffset>,
    pub commit_time: DateTime<FixedOffset>,
    pub files_changed: u32,
    pub line_insertions: u32,
    pub line_deletions: u32,
    pub lines_changed: u32,
    pub release: Option<String>,
    pub radius_insertions: f32,
    pub radius_deletions: f32,
    /// Footprint used for packing; releases are inflated to leave room for a ring.
    pub radius: f32,
    pub draw_radius: f32,
    /// Offset from the centre of the month circle.
    pub offset: Vec2,
}

impl Commit {
    pub fn is_release(&self) -> bool {
        self.release.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonthStats {
    pub commits: usize,
    pub files_changed: u64,
    pub line_insertions: u64,
    pub line_deletions: u64,
    pub lines_changed: u64,
    pub authors: usize,
}

#[derive(Clone, Debug)]
pub struct MonthGroup {
    pub year: i32,
    pub month: u32,
    pub commits: Vec<Commit>,
    pub stats: MonthStats,
    /// Enclosing radius of the packed commits plus padding.
    pub radius: f32,
    pub center: Vec2,
    pub row: usize,
    pub opacity: f32,
}

impl MonthGroup {
    pub fn first_time(&self) -> Option<&DateTime<FixedOffset>> {
        self.commits.first().map(|commit| &commit.commit_time)
    }
}

#[derive(Clone, Debug)]
pub struct CommitTimeline {
    pub months: Vec<MonthGroup>,
}

impl CommitTimeline {
    pub fn commit_count(&self) -> usize {
        self.months.iter().map(|month| month.commits.len()).sum()
    }
}

pub fn load_commit_rows(path: &Path) -> Result<Vec<CommitRow>> {
    read_file(path, "commit")
}

fn release_tag(decorations: &str) -> Option<String> {
    let rest = decorations.trim().strip_prefix(RELEASE_PREFIX)?;
    let version = rest
        .split([',', ')'])
        .next()
        .unwrap_or_default()
        .trim();
    Some(format!("v{version}"))
}

fn month_stats(commits: &[Commit]) -> MonthStats {
    let authors = commits
        .iter()
        .map(|commit| commit.author.as_str())
        .collect::<HashSet<_>>();

    MonthStats {
        commits: commits.len(),
        files_changed: commits.iter().map(|c| u64::from(c.files_changed)).sum(),
        line_insertions: commits.iter().map(|c| u64::from(c.line_insertions)).sum(),
        line_deletions: commits.iter().map(|c| u64::from(c.line_deletions)).sum(),
        lines_changed: commits.iter().map(|c| u64::from(c.lines_changed)).sum(),
        authors: authors.len(),
    }
}

pub fn prepare_commit_timeline(rows: &[CommitRow]) -> Result<CommitTimeline> {
    if rows.is_empty() {
        bail!("commit set is empty");
    }

    let mut commits = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let line = index + 2;
        let commit_time = parse_commit_time(&row.commit_time)
            .with_context(|| format!("commit at line {line}"))?;
        let author_time = parse_commit_time(&row.author_time)
            .with_context(|| format!("commit at line {line}"))?;

        commits.push(Commit {
            author: row.author.clone(),
            author_time,
            commit_time,
            files_changed: row.files_changed,
            line_insertions: row.line_insertions,
            line_deletions: row.line_deletions,
            lines_changed: row.line_insertions.saturating_add(row.line_deletions),
            release: release_tag(&row.decorations),
            radius_insertions: MARKER_RADIUS,
            radius_deletions: MARKER_RADIUS,
            radius: MARKER_RADIUS,
            draw_radius: MARKER_RADIUS,
            offset: Vec2::ZERO,
        });
    }
    commits.sort_by(|a, b| a.commit_time.cmp(&b.commit_time));

    let changed = commits
        .iter()
        .filter(|commit| commit.lines_changed > 0)
        .map(|commit| f64::from(commit.lines_changed))
        .collect::<Vec<_>>();
    let q90 = quantile(&changed, 0.9).unwrap_or(1.0);
    let q99 = quantile(&changed, 0.99).unwrap_or(q90);
    let radius = Scale::sqrt(&[0.0, q90, q99], &[f64::from(MARKER_RADIUS), 12.0, 16.0]).clamped();
    debug!("commit radius domain {:?}", radius.domain());

    for commit in &mut commits {
        if commit.files_changed > 0 {
            commit.radius_insertions = radius.map(f64::from(commit.line_insertions));
            commit.radius_deletions = radius.map(f64::from(commit.line_deletions));
        }
        commit.radius = commit.radius_insertions.max(commit.radius_deletions);
        commit.draw_radius = commit.radius;
        if commit.is_release() {
            commit.draw_radius = MARKER_RADIUS + 3.0;
            commit.radius += if commit.files_changed == 0 {
                RELEASE_MARKER_GROWTH
            } else {
                RELEASE_GROWTH
            };
        }
    }

    let mut grouped: BTreeMap<(i32, u32), Vec<Commit>> = BTreeMap::new();
    for commit in commits {
        let key = (commit.commit_time.year(), commit.commit_time.month());
        grouped.entry(key).or_default().push(commit);
    }
    let months = grouped
        .into_iter()
        .map(|((year, month), commits)| MonthGroup {
            year,
            month,
            stats: month_stats(&commits),
            commits,
            radius: 0.0,
            center: Vec2::ZERO,
            row: 0,
            opacity: 0.0,
        })
        .collect::<Vec<_>>();

    info!(
        "timeline: {} commits in {} months, {} releases",
        rows.len(),
        months.len(),
        months
            .iter()
            .flat_map(|month| &month.commits)
            .filter(|commit| commit.is_release())
            .count()
    );

    Ok(CommitTimeline { months })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fmt::Write;

    use crate::data::rows::{CommitRow, read_rows};

    pub const HEADER: &str =
        "author,author_time,commit_time,files_changed,line_insertions,line_deletions,decorations\n";

    pub fn rows(body: &str) -> Vec<CommitRow> {
        read_rows(format!("{HEADER}{body}").as_bytes(), "commit").unwrap()
    }

    /// `count` commits spread over the given month, with varied sizes.
    pub fn month_body(year: i32, month: u32, count: usize) -> String {
        let mut body = String::new();
        for index in 0..count {
            let day = 1 + index % 28;
            let minute = index % 60;
            let time = format!("{year}-{month:02}-{day:02} 10:{minute:02}:00 +0000");
            let files = 1 + index % 5;
            let insertions = (index * 37) % 400;
            let deletions = (index * 11) % 90;
            writeln!(
                body,
                "dev{},{time},{time},{files},{insertions},{deletions},",
                index % 7
            )
            .unwrap();
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn commits_are_sorted_and_grouped_by_month() {
        let timeline = prepare_commit_timeline(&rows(
            "bob,2021-03-02 10:00:00 +0000,2021-03-02 10:00:00 +0000,2,10,3,\n\
             amy,2021-01-15 09:00:00 +0100,2021-01-15 09:00:00 +0100,1,4,0,\n\
             amy,2021-01-20 09:00:00 +0100,2021-01-20 09:00:00 +0100,3,0,40,\n",
        ))
        .unwrap();

        let keys = timeline
            .months
            .iter()
            .map(|month| (month.year, month.month, month.commits.len()))
            .collect::<Vec<_>>();
        assert_eq!(keys, [(2021, 1, 2), (2021, 3, 1)]);
        assert_eq!(timeline.commit_count(), 3);

        let january = &timeline.months[0].stats;
        assert_eq!(january.authors, 1);
        assert_eq!(january.files_changed, 4);
        assert_eq!(january.lines_changed, 44);
    }

    #[test]
    fn mixed_offsets_across_a_month_boundary_keep_one_group_per_month() {
        let timeline = prepare_commit_timeline(&rows(
            "amy,2021-02-01 00:30:00 +0100,2021-02-01 00:30:00 +0100,1,3,0,\n\
             bob,2021-01-31 23:45:00 +0000,2021-01-31 23:45:00 +0000,1,5,1,\n\
             cid,2021-02-02 10:00:00 +0000,2021-02-02 10:00:00 +0000,2,7,2,\n",
        ))
        .unwrap();

        let keys = timeline
            .months
            .iter()
            .map(|month| (month.year, month.month, month.commits.len()))
            .collect::<Vec<_>>();
        assert_eq!(keys, [(2021, 1, 1), (2021, 2, 2)]);

        let february = &timeline.months[1].commits;
        assert_eq!(february[0].author, "amy");
        assert_eq!(february[1].author, "cid");
        assert_eq!(timeline.months[1].stats.authors, 2);
    }

    #[test]
    fn huge_line_counts_saturate() {
        let timeline = prepare_commit_timeline(&rows(
            "amy,2021-01-15 09:00:00 +0000,2021-01-15 09:00:00 +0000,3,4294967295,10,\n",
        ))
        .unwrap();
        let commit = &timeline.months[0].commits[0];
        assert_eq!(commit.lines_changed, u32::MAX);
        assert!(commit.radius.is_finite());
    }

    #[test]
    fn zero_file_commits_get_marker_radius_and_releases_grow() {
        let timeline = prepare_commit_timeline(&rows(
            "amy,2021-01-15 09:00:00 +0000,2021-01-15 09:00:00 +0000,0,0,0,\n\
             amy,2021-02-15 09:00:00 +0000,2021-02-15 09:00:00 +0000,0,0,0,\"tag: v1.2.0, origin/main\"\n\
             amy,2021-03-15 09:00:00 +0000,2021-03-15 09:00:00 +0000,4,120,8,tag: v1.3.0\n",
        ))
        .unwrap();

        let merge = &timeline.months[0].commits[0];
        assert_eq!(merge.radius, MARKER_RADIUS);
        assert!(!merge.is_release());

        let tag = &timeline.months[1].commits[0];
        assert_eq!(tag.release.as_deref(), Some("v1.2.0"));
        assert_eq!(tag.radius, MARKER_RADIUS + 20.0);

        let release = &timeline.months[2].commits[0];
        assert!(release.is_release());
        assert!(release.radius > 16.0 + MARKER_RADIUS);
    }

    #[test]
    fn radius_is_clamped_by_quantiles() {
        let mut body = month_body(2020, 5, 60);
        body.push_str(
            "huge,2020-05-28 10:00:00 +0000,2020-05-28 10:00:00 +0000,900,250000,1,\n",
        );
        let timeline = prepare_commit_timeline(&rows(&body)).unwrap();

        for commit in timeline.months.iter().flat_map(|month| &month.commits) {
            assert!(commit.radius.is_finite());
            assert!(commit.radius >= MARKER_RADIUS && commit.radius <= 16.0);
        }
        let huge = timeline.months[0]
            .commits
            .iter()
            .find(|commit| commit.author == "huge")
            .unwrap();
        assert_eq!(huge.radius, 16.0);
    }

    #[test]
    fn all_zero_changes_still_produce_finite_radii() {
        let timeline = prepare_commit_timeline(&rows(
            "amy,2021-01-15 09:00:00 +0000,2021-01-15 09:00:00 +0000,2,0,0,\n",
        ))
        .unwrap();
        assert!(timeline.months[0].commits[0].radius.is_finite());
    }

    #[test]
    fn bad_timestamp_and_empty_input_fail() {
        assert!(prepare_commit_timeline(&[]).is_err());
        let error = prepare_commit_timeline(&rows("amy,soon,soon,1,1,1,\n")).unwrap_err();
        assert!(format!("{error:#}").contains("line 2"));
    }
}
