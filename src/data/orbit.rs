use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use eframe::egui::Vec2;
use log::{debug, info, warn};
use rand::Rng;

use crate::util::{split_repo_name, wrap_label};

use super::rows::{
    ContributorRow, LinkRow, RemainingContributorRow, RepositoryRow, parse_flag, parse_repo_time,
    parse_unix_seconds, read_file,
};
use super::scale::Scale;

pub const CENTRAL_RADIUS: f32 = 50.0;
pub const LABEL_WRAP_CHARS: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Contributor,
    Repository,
    CentralRepository,
}

impl NodeKind {
    pub fn is_repository(self) -> bool {
        matches!(self, Self::Repository | Self::CentralRepository)
    }
}

#[derive(Clone, Debug)]
pub struct ContributorDetail {
    pub label_lines: Vec<String>,
    pub orca_supported: bool,
    pub central_commits: u32,
    pub first_central_commit: Option<DateTime<Utc>>,
    pub last_central_commit: Option<DateTime<Utc>>,
    /// Start and end angle (radians) of the tenure arc drawn around the node.
    pub tenure: Option<(f32, f32)>,
}

#[derive(Clone, Debug)]
pub struct RepositoryDetail {
    pub owner: String,
    pub name: String,
    pub stars: u64,
    pub forks: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub languages: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum NodeDetail {
    Contributor(ContributorDetail),
    Repository(RepositoryDetail),
}

#[derive(Clone, Debug)]
pub struct OrbitNode {
    pub id: String,
    pub kind: NodeKind,
    pub radius: f32,
    pub degree: usize,
    pub position: Vec2,
    pub pinned: bool,
    /// Radius covering the node and its exclusively owned repositories.
    /// Set by the layout; equals `radius` until then.
    pub footprint_radius: f32,
    pub ring_angle: Option<f32>,
    pub detail: NodeDetail,
}

impl OrbitNode {
    pub fn contributor(&self) -> Option<&ContributorDetail> {
        match &self.detail {
            NodeDetail::Contributor(detail) => Some(detail),
            NodeDetail::Repository(_) => None,
        }
    }

    pub fn repository(&self) -> Option<&RepositoryDetail> {
        match &self.detail {
            NodeDetail::Repository(detail) => Some(detail),
            NodeDetail::Contributor(_) => None,
        }
    }

    pub fn is_orca_supported(&self) -> bool {
        self.contributor()
            .is_some_and(|detail| detail.orca_supported)
    }

    /// Collision padding used by the shared-repository pass.
    pub fn collision_padding(&self) -> f32 {
        match self.kind {
            NodeKind::CentralRepository => CENTRAL_RADIUS,
            NodeKind::Contributor | NodeKind::Repository => 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrbitLink {
    pub source: usize,
    pub target: usize,
    pub commit_count: u32,
    pub first_commit: DateTime<Utc>,
    pub last_commit: DateTime<Utc>,
    pub width: f32,
}

#[derive(Clone, Debug)]
pub struct FillerNode {
    pub label: Option<String>,
    pub commit_count: u32,
    pub radius: f32,
    pub opacity: f32,
    pub position: Vec2,
}

#[derive(Clone, Debug)]
pub struct OrbitGraph {
    /// Contributors first, then repositories, each group sorted by id.
    pub nodes: Vec<OrbitNode>,
    pub links: Vec<OrbitLink>,
    pub fillers: Vec<FillerNode>,
    pub central: usize,
    pub contributor_count: usize,
}

impl OrbitGraph {
    pub fn central_node(&self) -> &OrbitNode {
        &self.nodes[self.central]
    }

    pub fn contributors(&self) -> std::ops::Range<usize> {
        0..self.contributor_count
    }

    pub fn repositories(&self) -> std::ops::Range<usize> {
        self.contributor_count..self.nodes.len()
    }

    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.links.iter().filter_map(move |link| {
            if link.source == index {
                Some(link.target)
            } else if link.target == index {
                Some(link.source)
            } else {
                None
            }
        })
    }

    #[cfg(test)]
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }
}

#[derive(Clone, Debug)]
pub struct OrbitInput {
    pub contributors: Vec<ContributorRow>,
    pub repositories: Vec<RepositoryRow>,
    pub links: Vec<LinkRow>,
    pub remaining: Vec<RemainingContributorRow>,
}

#[derive(Clone, Debug)]
pub struct OrbitSources {
    pub contributors: PathBuf,
    pub repositories: PathBuf,
    pub links: PathBuf,
    pub remaining: PathBuf,
}

impl OrbitSources {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            contributors: data_dir.join("top_contributors.csv"),
            repositories: data_dir.join("repositories.csv"),
            links: data_dir.join("links.csv"),
            remaining: data_dir.join("remaining_contributors.csv"),
        }
    }
}

impl OrbitInput {
    pub fn load(sources: &OrbitSources) -> Result<Self> {
        let remaining = if sources.remaining.exists() {
            read_file(&sources.remaining, "remaining contributor")?
        } else {
            info!(
                "no remaining contributors file at {}, skipping filler nodes",
                sources.remaining.display()
            );
            Vec::new()
        };

        Ok(Self {
            contributors: read_file(&sources.contributors, "contributor")?,
            repositories: read_file(&sources.repositories, "repository")?,
            links: read_file(&sources.links, "link")?,
            remaining,
        })
    }
}

fn id_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn prepare_orbit_graph(
    input: &OrbitInput,
    central_repo: Option<&str>,
    rng: &mut impl Rng,
) -> Result<OrbitGraph> {
    if input.contributors.is_empty() {
        bail!("contributor set is empty");
    }
    if input.repositories.is_empty() {
        bail!("repository set is empty");
    }

    let mut contributors = input.contributors.iter().collect::<Vec<_>>();
    contributors.sort_by(|a, b| id_order(&a.name, &b.name));
    let linked = input
        .links
        .iter()
        .map(|row| row.repository.as_str())
        .collect::<HashSet<_>>();
    let mut repositories = input
        .repositories
        .iter()
        .filter(|row| {
            linked.contains(row.full_name.as_str()) || central_repo == Some(row.full_name.as_str())
        })
        .collect::<Vec<_>>();
    let unlinked = input.repositories.len() - repositories.len();
    if unlinked > 0 {
        warn!("dropping {unlinked} repositories that no link references");
    }
    if repositories.is_empty() {
        bail!("no repository is referenced by a link");
    }
    repositories.sort_by(|a, b| id_order(&a.full_name, &b.full_name));

    let contributor_count = contributors.len();
    let mut index_by_id = HashMap::new();
    for (index, id) in contributors
        .iter()
        .map(|row| row.name.as_str())
        .chain(repositories.iter().map(|row| row.full_name.as_str()))
        .enumerate()
    {
        if index_by_id.insert(id, index).is_some() {
            bail!("duplicate node id {id:?}");
        }
    }

    let mut degree = vec![0_usize; index_by_id.len()];
    let mut resolved = Vec::with_capacity(input.links.len());
    for (row_index, row) in input.links.iter().enumerate() {
        let line = row_index + 2;
        let source = match index_by_id.get(row.contributor.as_str()) {
            Some(&index) if index < contributor_count => index,
            _ => bail!(
                "link at line {line} references unknown contributor {:?}",
                row.contributor
            ),
        };
        let target = match index_by_id.get(row.repository.as_str()) {
            Some(&index) if index >= contributor_count => index,
            _ => bail!(
                "link at line {line} references unknown repository {:?}",
                row.repository
            ),
        };
        let first_commit = parse_unix_seconds(row.commit_sec_min)
            .with_context(|| format!("link at line {line} has an invalid first commit time"))?;
        let last_commit = parse_unix_seconds(row.commit_sec_max)
            .with_context(|| format!("link at line {line} has an invalid last commit time"))?;

        degree[source] += 1;
        degree[target] += 1;
        resolved.push((source, target, row.commit_count, first_commit, last_commit));
    }

    let central = match central_repo {
        Some(name) => match index_by_id.get(name) {
            Some(&index) if index >= contributor_count => index,
            _ => bail!("central repository {name:?} is not in the repository set"),
        },
        None => {
            let mut best = contributor_count;
            for index in contributor_count..degree.len() {
                if degree[index] > degree[best] {
                    best = index;
                }
            }
            best
        }
    };
    let central_row = repositories[central - contributor_count];
    let central_created = parse_repo_time(&central_row.created_at)
        .with_context(|| format!("repository {:?} creation time", central_row.full_name))?;
    let central_updated = parse_repo_time(&central_row.updated_at)
        .with_context(|| format!("repository {:?} update time", central_row.full_name))?;
    info!(
        "central repository is {} with {} contributors",
        central_row.full_name, degree[central]
    );

    let repo_radius = Scale::over_extent(
        0.5,
        repositories.iter().map(|row| row.stars as f64),
        &[4.0, 20.0],
    );
    let contributor_radius = Scale::over_extent(
        0.5,
        resolved
            .iter()
            .filter(|link| link.1 == central)
            .map(|link| link.2 as f64),
        &[8.0, 30.0],
    );
    let link_width = Scale::linear(&[1.0, 10.0, 200.0], &[1.0, 2.0, 5.0]);
    let tenure = Scale::linear(
        &[
            central_created.timestamp() as f64,
            central_updated.timestamp() as f64,
        ],
        &[0.0, TAU],
    );

    let orca_level = rng.random::<f64>();
    let mut synthesized_orca = 0;
    let mut nodes = Vec::with_capacity(degree.len());

    for (index, row) in contributors.iter().enumerate() {
        let central_link = resolved
            .iter()
            .find(|link| link.0 == index && link.1 == central);
        let radius = match central_link {
            Some(link) => contributor_radius.map(link.2 as f64),
            None => {
                warn!(
                    "contributor {:?} has no commits to the central repository",
                    row.name
                );
                8.0
            }
        };
        let orca_supported = match row.orca_received.as_deref().and_then(parse_flag) {
            Some(flag) => flag,
            None => {
                synthesized_orca += 1;
                rng.random::<f64>() < orca_level
            }
        };

        nodes.push(OrbitNode {
            id: row.name.clone(),
            kind: NodeKind::Contributor,
            radius,
            degree: degree[index],
            position: Vec2::ZERO,
            pinned: false,
            footprint_radius: radius,
            ring_angle: None,
            detail: NodeDetail::Contributor(ContributorDetail {
                label_lines: wrap_label(&row.name, LABEL_WRAP_CHARS),
                orca_supported,
                central_commits: central_link.map_or(0, |link| link.2),
                first_central_commit: central_link.map(|link| link.3),
                last_central_commit: central_link.map(|link| link.4),
                tenure: central_link.map(|link| {
                    (
                        tenure.map(link.3.timestamp() as f64),
                        tenure.map(link.4.timestamp() as f64),
                    )
                }),
            }),
        });
    }

    if synthesized_orca > 0 {
        warn!(
            "{synthesized_orca} contributors lack an orca_received value, assigned randomly at level {orca_level:.2}"
        );
    }

    for (offset, row) in repositories.iter().enumerate() {
        let index = contributor_count + offset;
        let (owner, name) = split_repo_name(&row.full_name);
        let created_at = parse_repo_time(&row.created_at)
            .with_context(|| format!("repository {:?} creation time", row.full_name))?;
        let updated_at = parse_repo_time(&row.updated_at)
            .with_context(|| format!("repository {:?} update time", row.full_name))?;
        let (kind, radius) = if index == central {
            (NodeKind::CentralRepository, CENTRAL_RADIUS)
        } else {
            (NodeKind::Repository, repo_radius.map(row.stars as f64))
        };

        nodes.push(OrbitNode {
            id: row.full_name.clone(),
            kind,
            radius,
            degree: degree[index],
            position: Vec2::ZERO,
            pinned: false,
            footprint_radius: radius,
            ring_angle: None,
            detail: NodeDetail::Repository(RepositoryDetail {
                owner: owner.to_owned(),
                name: name.to_owned(),
                stars: row.stars,
                forks: row.forks,
                created_at,
                updated_at,
                languages: row
                    .languages
                    .split(',')
                    .map(str::trim)
                    .filter(|language| !language.is_empty())
                    .map(str::to_owned)
                    .collect(),
            }),
        });
    }

    let links = resolved
        .into_iter()
        .map(
            |(source, target, commit_count, first_commit, last_commit)| OrbitLink {
                source,
                target,
                commit_count,
                first_commit,
                last_commit,
                width: link_width.map(commit_count as f64),
            },
        )
        .collect::<Vec<_>>();

    let fillers = input
        .remaining
        .iter()
        .map(|row| FillerNode {
            label: row.name.clone(),
            commit_count: row.commit_count,
            radius: (contributor_radius.map(row.commit_count as f64) / 2.0).max(1.0),
            opacity: 0.2 + rng.random::<f32>() * 0.4,
            position: Vec2::ZERO,
        })
        .collect::<Vec<_>>();

    debug!(
        "orbit graph: {} contributors, {} repositories, {} links, {} fillers",
        contributor_count,
        nodes.len() - contributor_count,
        links.len(),
        fillers.len()
    );

    Ok(OrbitGraph {
        nodes,
        links,
        fillers,
        central,
        contributor_count,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::data::rows::read_rows;

    pub const REPOSITORIES: &str = "\
repo,repo_stars,repo_forks,repo_createdAt,repo_updatedAt,repo_languages
acme/central,4200,310,2015-01-10T08:00:00Z,2024-06-01T12:00:00Z,\"JavaScript, TypeScript, CSS, HTML\"
acme/x,15,2,2019-03-01T00:00:00Z,2023-02-01T00:00:00Z,Rust
acme/y,900,40,2017-05-05T00:00:00Z,2024-01-01T00:00:00Z,\"Python,\"
";

    /// Contributor A owns repo X; B and C share repo Y. Everyone commits to the central repo.
    pub const LINKS: &str = "\
author_name,repo,commit_count,commit_sec_min,commit_sec_max
A,acme/central,120,1500000000,1650000000
B,acme/central,40,1520000000,1600000000
C,acme/central,8,1580000000,1590000000
A,acme/x,30,1560000000,1670000000
B,acme/y,12,1540000000,1620000000
C,acme/y,5,1600000000,1610000000
";

    pub fn input(contributors: &str, links: &str) -> OrbitInput {
        OrbitInput {
            contributors: read_rows(contributors.as_bytes(), "contributor").unwrap(),
            repositories: read_rows(REPOSITORIES.as_bytes(), "repository").unwrap(),
            links: read_rows(links.as_bytes(), "link").unwrap(),
            remaining: read_rows(
                "author_name,commit_count,author_sec_min,author_sec_max\n\
                 ,3,1500000000,1500000100\n\
                 Dana,9,1500000000,1600000000\n\
                 ,1,1600000000,1600000000\n"
                    .as_bytes(),
                "remaining contributor",
            )
            .unwrap(),
        }
    }

    pub fn three_contributors() -> OrbitInput {
        input(
            "author_name,orca_received\nC,false\nA,true\nB,yes\n",
            LINKS,
        )
    }
}
