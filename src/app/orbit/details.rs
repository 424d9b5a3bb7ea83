use chrono::{DateTime, Utc};

use crate::data::OrbitGraph;
use crate::data::orbit::{ContributorDetail, RepositoryDetail};
use crate::util::{format_month_year, format_si, same_month};

const SHOWN_LANGUAGES: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum TooltipLine {
    Title(String),
    Text(String),
    Badge(String),
}

fn period(first: &DateTime<Utc>, last: &DateTime<Utc>) -> String {
    if same_month(first, last) {
        format!("In {}", format_month_year(first))
    } else {
        format!("Between {} & {}", format_month_year(first), format_month_year(last))
    }
}

fn contributor_lines(
    name: &str,
    detail: &ContributorDetail,
    central_name: &str,
    lines: &mut Vec<TooltipLine>,
) {
    lines.push(TooltipLine::Title(name.to_owned()));
    lines.push(TooltipLine::Text(format!(
        "{} commits to {central_name}",
        format_si(f64::from(detail.central_commits))
    )));

    if let (Some(first), Some(last)) = (&detail.first_central_commit, &detail.last_central_commit)
    {
        lines.push(TooltipLine::Text(period(first, last)));
    }

    if detail.orca_supported {
        lines.push(TooltipLine::Badge("Supported through ORCA".to_owned()));
    }
}

/// Commits and active period of the top contributors linked to `index`.
fn activity_lines(graph: &OrbitGraph, index: usize, lines: &mut Vec<TooltipLine>) {
    let incoming = graph.links.iter().filter(|link| link.target == index);
    let mut commits = 0_u64;
    let mut contributors = 0_usize;
    let mut span: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    for link in incoming {
        commits += u64::from(link.commit_count);
        contributors += 1;
        span = Some(match span {
            Some((first, last)) => (first.min(link.first_commit), last.max(link.last_commit)),
            None => (link.first_commit, link.last_commit),
        });
    }
    let Some((first, last)) = span else {
        return;
    };

    let noun = if contributors == 1 { "contributor" } else { "contributors" };
    lines.push(TooltipLine::Text(format!(
        "{} commits by {contributors} top {noun}",
        format_si(commits as f64)
    )));
    lines.push(TooltipLine::Text(period(&first, &last)));
}

fn repository_lines(
    graph: &OrbitGraph,
    index: usize,
    detail: &RepositoryDetail,
    lines: &mut Vec<TooltipLine>,
) {
    let title = if detail.owner.is_empty() {
        detail.name.clone()
    } else {
        format!("{}/{}", detail.owner, detail.name)
    };
    lines.push(TooltipLine::Title(title));
    lines.push(TooltipLine::Text(format!(
        "Created {}, last updated {}",
        format_month_year(&detail.created_at),
        format_month_year(&detail.updated_at)
    )));
    lines.push(TooltipLine::Text(format!(
        "{} stars | {} forks",
        format_si(detail.stars as f64),
        format_si(detail.forks as f64)
    )));
    if index != graph.central {
        activity_lines(graph, index, lines);
    }

    if !detail.languages.is_empty() {
        let mut languages = detail
            .languages
            .iter()
            .take(SHOWN_LANGUAGES)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let hidden = detail.languages.len().saturating_sub(SHOWN_LANGUAGES);
        if hidden > 0 {
            languages.push_str(&format!(" & {hidden} more"));
        }
        lines.push(TooltipLine::Text(languages));
    }
}

pub(super) fn tooltip_lines(graph: &OrbitGraph, index: usize) -> Vec<TooltipLine> {
    let mut lines = Vec::new();
    let Some(node) = graph.nodes.get(index) else {
        return lines;
    };

    if let Some(detail) = node.contributor() {
        contributor_lines(&node.id, detail, &graph.central_node().id, &mut lines);
    } else if let Some(detail) = node.repository() {
        repository_lines(graph, index, detail, &mut lines);
        if index == graph.central {
            lines.push(TooltipLine::Badge(format!(
                "{} top contributors",
                graph.contributor_count
            )));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::data::orbit::fixtures::{LINKS, input, three_contributors};
    use crate::data::prepare_orbit_graph;

    #[test]
    fn contributor_tooltip_names_commits_period_and_badge() {
        let mut rng = StdRng::seed_from_u64(1);
        let graph = prepare_orbit_graph(&three_contributors(), None, &mut rng).unwrap();

        let a = tooltip_lines(&graph, graph.node_index("A").unwrap());
        assert_eq!(a[0], TooltipLine::Title("A".to_owned()));
        assert_eq!(a[1], TooltipLine::Text("120 commits to acme/central".to_owned()));
        assert_eq!(a[2], TooltipLine::Text("Between Jul 2017 & Apr 2022".to_owned()));
        assert_eq!(a[3], TooltipLine::Badge("Supported through ORCA".to_owned()));

        let c = tooltip_lines(&graph, graph.node_index("C").unwrap());
        assert_eq!(c.len(), 3);
        assert!(matches!(&c[2], TooltipLine::Text(text) if text.starts_with("Between")));
    }

    #[test]
    fn single_month_tenure_reads_as_in() {
        let links = LINKS.replace(
            "C,acme/central,8,1580000000,1590000000",
            "C,acme/central,8,1580000000,1580000100",
        );
        let mut rng = StdRng::seed_from_u64(1);
        let graph = prepare_orbit_graph(
            &input("author_name,orca_received\nA,true\nB,true\nC,false\n", &links),
            None,
            &mut rng,
        )
        .unwrap();

        let c = tooltip_lines(&graph, graph.node_index("C").unwrap());
        assert_eq!(c[2], TooltipLine::Text("In Jan 2020".to_owned()));
    }

    #[test]
    fn repository_tooltip_limits_languages() {
        let mut rng = StdRng::seed_from_u64(1);
        let graph = prepare_orbit_graph(&three_contributors(), None, &mut rng).unwrap();

        let central = tooltip_lines(&graph, graph.central);
        assert_eq!(central[0], TooltipLine::Title("acme/central".to_owned()));
        assert_eq!(central[1], TooltipLine::Text("Created Jan 2015, last updated Jun 2024".to_owned()));
        assert_eq!(central[2], TooltipLine::Text("4.2k stars | 310 forks".to_owned()));
        assert_eq!(
            central[3],
            TooltipLine::Text("JavaScript, TypeScript, CSS & 1 more".to_owned())
        );
        assert_eq!(central[4], TooltipLine::Badge("3 top contributors".to_owned()));

        let y = tooltip_lines(&graph, graph.node_index("acme/y").unwrap());
        assert_eq!(y[3], TooltipLine::Text("17 commits by 2 top contributors".to_owned()));
        assert_eq!(y[4], TooltipLine::Text("Between Oct 2018 & May 2021".to_owned()));
        assert_eq!(y.last(), Some(&TooltipLine::Text("Python".to_owned())));
    }
}
