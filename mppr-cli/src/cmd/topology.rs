use mppr_core::{validate_config, AutoScalerConfig, RecoveryConfig, RecoveryKind, Topology};
use mppr_exec::topology::{AutoScalerTopologyFetcher, TopologyFetcher};
use serde::Serialize;

use crate::cmd::validate::render_violations;
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{AutoScalerArgs, OutputArgs};

#[derive(Serialize)]
struct TopologyResult {
    cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recovery: Option<RecoveryKind>,
    node_count: usize,
    nodes: Vec<String>,
}

pub fn topology_cmd(
    args: AutoScalerArgs,
    recover_nodes: Option<usize>,
    output: OutputArgs,
) -> i32 {
    let cfg = AutoScalerConfig {
        timeout_ms: args.timeout_ms,
        ..AutoScalerConfig::new(args.address, args.cluster_id)
    };

    let check = RecoveryConfig {
        auto_scaler: Some(cfg.clone()),
        ..Default::default()
    };
    if let Err(err) = validate_config(&check) {
        print_error(
            output.format,
            output.quiet,
            &format!("{err}: {}", render_violations(&err.violations).join("; ")),
        );
        return exit_codes::VALIDATION_FAILED;
    }

    let fetcher = match AutoScalerTopologyFetcher::new(&cfg) {
        Ok(f) => f,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let (recovery, fetched) = match recover_nodes {
        Some(n) => (
            Some(RecoveryKind::MemoryLimit),
            fetcher.recover_and_fetch(RecoveryKind::MemoryLimit, n),
        ),
        None => (None, fetcher.fetch_topology()),
    };

    let topology: Topology = match fetched {
        Ok(t) => t,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("auto-scaler request failed: {e}"));
            return exit_codes::RUN_FAILED;
        }
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!("cluster {}: {} node(s)", fetcher.cluster_id(), topology.len());
        for node in &topology.nodes {
            println!("  {node}");
        }
    } else {
        let result = TopologyResult {
            cluster_id: fetcher.cluster_id().to_string(),
            recovery,
            node_count: topology.len(),
            nodes: topology.nodes,
        };
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
