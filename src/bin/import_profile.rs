//! Import profile: throughput and RSS of a synthetic node import.
//!
//! A generator thread hands out chunks of sparse original ids over a
//! bounded channel; one producer per lane drains the channel into a
//! shared `NodesBuilder`. Prints a table per graph size and the final
//! import metrics as JSON.
//!
//! Run: cargo run --release --bin import_profile
//! Logs: RUST_LOG=rfdb_import=debug cargo run --release --bin import_profile

use std::time::Instant;

use crossbeam_channel::bounded;
use rfdb_import::{
    NodeInput, NodeLabelToken, NodesBuilder, NodesBuilderConfig, PropertyValues, ProviderMode,
    ResourceManager,
};
use sysinfo::{ProcessRefreshKind, RefreshKind, System};
use tracing_subscriber::EnvFilter;

const CHUNK: usize = 4_096;

/// Original ids are spread over a space 16x larger than the node count.
const ID_STRIDE: u64 = 16;

// ── RSS measurement ────────────────────────────────────────────────────

fn get_process_rss() -> u64 {
    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
    );
    sys.refresh_all();
    sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid).map(|p| p.memory()))
        .unwrap_or(0)
}

// ── Node generator ─────────────────────────────────────────────────────

fn node_input(original_id: u64) -> NodeInput {
    let label = if original_id % 3 == 0 { "Function" } else { "Module" };
    if original_id % 4 == 0 {
        NodeInput::with_properties(
            NodeLabelToken::single(label),
            PropertyValues::new()
                .with("size", (original_id % 1_000) as i64)
                .with("rank", original_id as f64 / 7.0),
        )
    } else {
        NodeInput::labeled(label)
    }
}

// ── Run ────────────────────────────────────────────────────────────────

struct RunReport {
    nodes: u64,
    properties: usize,
    import_secs: f64,
    build_secs: f64,
    rss_delta: u64,
}

fn run(config: &NodesBuilderConfig, node_count: usize) -> anyhow::Result<(RunReport, String)> {
    std::thread::sleep(std::time::Duration::from_millis(100));
    let baseline = get_process_rss();

    let builder = NodesBuilder::new(config.clone())?;
    let lanes = config.concurrency.value();
    let (tx, rx) = bounded::<Vec<u64>>(lanes * 2);

    let started = Instant::now();
    std::thread::scope(|s| -> anyhow::Result<()> {
        s.spawn(move || {
            let ids: Vec<u64> = (0..node_count as u64).map(|i| i * ID_STRIDE).collect();
            for chunk in ids.chunks(CHUNK) {
                if tx.send(chunk.to_vec()).is_err() {
                    break;
                }
            }
        });

        let producers: Vec<_> = (0..lanes)
            .map(|_| {
                let rx = rx.clone();
                let builder = &builder;
                s.spawn(move || -> rfdb_import::Result<()> {
                    for chunk in rx.iter() {
                        for id in chunk {
                            builder.add_node(id, node_input(id))?;
                        }
                    }
                    Ok(())
                })
            })
            .collect();
        drop(rx);

        for producer in producers {
            producer
                .join()
                .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
        }
        Ok(())
    })?;
    let import_secs = started.elapsed().as_secs_f64();

    let metrics = serde_json::to_string_pretty(&builder.metrics())?;
    let started = Instant::now();
    let nodes = builder.build()?;
    let build_secs = started.elapsed().as_secs_f64();
    let rss_delta = get_process_rss().saturating_sub(baseline);

    Ok((
        RunReport {
            nodes: nodes.node_count(),
            properties: nodes.properties().len(),
            import_secs,
            build_secs,
            rss_delta,
        },
        metrics,
    ))
}

// ── Main ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let profile = ResourceManager::auto_tune();
    let mut config = NodesBuilderConfig::from_profile(&profile);
    config.deduplicate_ids = true;

    println!("RFDB Import Profile");
    println!("===================");
    println!(
        "lanes: {}, batch capacity: {}, memory pressure: {:.2}",
        config.concurrency, config.batch_capacity, profile.memory_pressure
    );
    println!();
    println!(
        "{:<10} {:<12} {:>12} {:>12} {:>14} {:>12}",
        "Provider", "Nodes", "Import (s)", "Build (s)", "Nodes/s", "RSS (MB)"
    );
    println!("{:-<76}", "");

    let mut last_metrics = String::new();
    for provider in [ProviderMode::ThreadLocal, ProviderMode::Pooled] {
        config.provider = provider;
        for size in [100_000, 1_000_000] {
            eprint!("Measuring {:?} {}... ", provider, size);
            let (report, metrics) = run(&config, size)?;
            let throughput = report.nodes as f64 / report.import_secs.max(f64::EPSILON);
            println!(
                "{:<10} {:<12} {:>12.3} {:>12.3} {:>14.0} {:>12.1}",
                format!("{:?}", provider),
                report.nodes,
                report.import_secs,
                report.build_secs,
                throughput,
                report.rss_delta as f64 / (1024.0 * 1024.0)
            );
            eprintln!("done ({} property keys)", report.properties);
            last_metrics = metrics;
        }
    }

    println!();
    println!("Metrics of the last run:");
    println!("{last_metrics}");
    Ok(())
}
