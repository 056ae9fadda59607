//! Deviation report and its human-readable formatting.

use std::collections::BTreeSet;

use edgeplan_core::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentDeviation {
    pub deployment_id: String,
    /// Observed fan-out just before the terminal node, at least 1.
    pub load_balance_factor: usize,
    pub extra_nodes: BTreeSet<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationReport {
    pub root: NodeId,
    pub deployments: Vec<DeploymentDeviation>,
    pub avg_load_balance_factor: f64,
    pub avg_extra_nodes: f64,
}

impl DeviationReport {
    /// Averages are 0 when there are no deployments.
    pub fn new(root: &str, deployments: Vec<DeploymentDeviation>) -> Self {
        let count = deployments.len();
        let (avg_load_balance_factor, avg_extra_nodes) = if count == 0 {
            (0.0, 0.0)
        } else {
            let lb: usize = deployments.iter().map(|d| d.load_balance_factor).sum();
            let extra: usize = deployments.iter().map(|d| d.extra_nodes.len()).sum();
            (lb as f64 / count as f64, extra as f64 / count as f64)
        };
        Self {
            root: root.to_string(),
            deployments,
            avg_load_balance_factor,
            avg_extra_nodes,
        }
    }
}

pub fn format_report(report: &DeviationReport) -> String {
    let mut out = String::new();

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  edgeplan Deviation Analysis             ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Root:        {:<27}║\n", report.root));
    out.push_str(&format!("║  Deployments: {:<27}║\n", report.deployments.len()));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    for d in &report.deployments {
        out.push_str(&format!("── {} ──\n", d.deployment_id));
        out.push_str(&format!("  load_balance_factor: {}\n", d.load_balance_factor));
        if d.extra_nodes.is_empty() {
            out.push_str("  extra_nodes: 0\n\n");
        } else {
            let nodes: Vec<&str> = d.extra_nodes.iter().map(String::as_str).collect();
            out.push_str(&format!(
                "  extra_nodes: {} ({})\n\n",
                d.extra_nodes.len(),
                nodes.join(", ")
            ));
        }
    }

    out.push_str("TOTAL:\n");
    out.push_str(&format!("  avg_load_balance_factor: {:.3}\n", report.avg_load_balance_factor));
    out.push_str(&format!("  avg_extra_nodes:         {:.3}\n", report.avg_extra_nodes));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deviation(id: &str, lb: usize, extra: &[&str]) -> DeploymentDeviation {
        DeploymentDeviation {
            deployment_id: id.to_string(),
            load_balance_factor: lb,
            extra_nodes: extra.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[test]
    fn averages_over_deployments() {
        let report = DeviationReport::new(
            "dummy1",
            vec![deviation("A", 1, &[]), deviation("B", 3, &["x", "y", "z"])],
        );
        assert_eq!(report.avg_load_balance_factor, 2.0);
        assert_eq!(report.avg_extra_nodes, 1.5);
    }

    #[test]
    fn empty_report_has_zero_averages() {
        let report = DeviationReport::new("dummy1", Vec::new());
        assert_eq!(report.avg_load_balance_factor, 0.0);
        assert_eq!(report.avg_extra_nodes, 0.0);
    }

    #[test]
    fn text_report_lists_extra_nodes_in_order() {
        let report = DeviationReport::new("dummy1", vec![deviation("B", 2, &["n9", "n10"])]);
        let text = format_report(&report);
        assert!(text.contains("── B ──"));
        assert!(text.contains("extra_nodes: 2 (n10, n9)"));
        assert!(text.contains("avg_load_balance_factor: 2.000"));
    }

    #[test]
    fn json_report_round_trips() {
        let report = DeviationReport::new("dummy1", vec![deviation("A", 1, &["q"])]);
        let json = serde_json::to_string(&report).unwrap();
        let back: DeviationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
