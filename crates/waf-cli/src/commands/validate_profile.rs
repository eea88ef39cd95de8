//! Validate a defense profile graph offline (spec §4.3, §4.4 invariants).

use anyhow::{Context, Result};
use clap::Args;
use waf_core::graph::{validated, Graph};

#[derive(Args)]
pub struct ValidateProfileArgs {
    /// Path to a JSON file containing a single defense profile's graph
    /// (the `graph` field of a Defense Profile entity)
    path: std::path::PathBuf,
}

pub fn run(args: ValidateProfileArgs) -> Result<()> {
    let body = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    let graph: Graph = serde_json::from_str(&body).context("parsing graph JSON")?;

    match validated(&graph) {
        Ok(_) => {
            println!("valid: graph has {} node(s), start = \"{}\"", graph.nodes.len(), graph.start);
            Ok(())
        }
        Err(issues) => {
            println!("invalid: {} issue(s)", issues.len());
            for issue in &issues {
                println!("  - {issue}");
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_a_single_action_node_graph_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"start": "start", "nodes": {{"start": {{"id": "start", "spec": {{"kind": "action", "action": "allow", "reason": null, "delay_seconds": null, "provider": null}}, "outputs": {{}}}}}}}}"#
        )
        .unwrap();

        let args = ValidateProfileArgs {
            path: file.path().to_path_buf(),
        };
        assert!(run(args).is_ok());
    }
}
