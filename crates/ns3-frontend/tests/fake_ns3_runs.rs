#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use manet_core::{
    engine::{FlowId, RawFlowStats},
    run::Stream,
    scenario::ScenarioConfig,
    simulate,
    units::{Bytes, Joules, Nanosecs},
    EngineError, RunId, RunIdentity, RunOutput, RunSeed,
};
use ns3_frontend::{Launcher, Ns3Engine};

const FIND_ROOT: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    *--root=*) root="${arg##*--root=}" ;;
  esac
done
"#;

const WRITE_FLOWS: &str = r#"
echo "1 100 90 10 900000000 1000000000 11000000000 48600" > "$root/flows.txt"
"#;

const WRITE_ENERGY: &str = r#"
n=$(sed -n 's/^nodes //p' "$root/scenario.txt")
i=0
while [ "$i" -lt "$n" ]; do
  echo "$i 99.5" >> "$root/energy.txt"
  i=$((i + 1))
done
"#;

/// Writes an executable `launcher` script into `ns3_dir` that stands in for ns-3.
fn fake_ns3(ns3_dir: &Path, launcher: &str, body: &[&str]) -> anyhow::Result<()> {
    let path = ns3_dir.join(launcher);
    std::fs::write(&path, [FIND_ROOT].iter().chain(body).copied().collect::<String>())?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

fn run(engine: &Ns3Engine, nr_nodes: usize) -> Result<RunOutput, EngineError> {
    let id = RunIdentity::new("OLSR".into(), RunId::new(0), nr_nodes);
    let seed = RunSeed::derive(12345, id.run);
    let config = ScenarioConfig::random(id.nr_nodes, &mut seed.rng(Stream::Scenario));
    simulate(engine, &id, seed, &config)
}

#[test]
fn results_round_trip() -> anyhow::Result<()> {
    for (launcher, name) in [(Launcher::Ns3, "ns3"), (Launcher::Waf, "waf")] {
        let ns3_dir = tempfile::tempdir()?;
        let data_dir = tempfile::tempdir()?;
        fake_ns3(ns3_dir.path(), name, &[WRITE_FLOWS, WRITE_ENERGY])?;
        let engine = Ns3Engine::builder()
            .ns3_dir(ns3_dir.path())
            .data_dir(data_dir.path())
            .launcher(launcher)
            .build();

        let out = run(&engine, 4)?;
        assert_eq!(
            out.flows,
            [RawFlowStats {
                id: FlowId::new(1),
                tx_packets: 100,
                rx_packets: 90,
                lost_packets: 10,
                delay_sum: Nanosecs::new(900_000_000),
                first_tx: Nanosecs::new(1_000_000_000),
                last_rx: Nanosecs::new(11_000_000_000),
                rx_bytes: Bytes::new(48_600),
            }]
        );
        assert_eq!(out.remaining_energy, vec![Joules::new(99.5); 4]);

        let script = std::fs::read_to_string(data_dir.path().join("run-0/scenario.txt"))?;
        assert!(script.starts_with("seed 12345 0\nnodes 4\n"));
        assert!(script.ends_with(&format!("stop {}\n", Nanosecs::from(out.config.sim_time))));
        assert!(data_dir.path().join("run-0/output.txt").exists());
    }
    Ok(())
}

#[test]
fn failed_program_is_engine_error() -> anyhow::Result<()> {
    let ns3_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;
    fake_ns3(ns3_dir.path(), "ns3", &["echo 'assert failed' >&2\nexit 1\n"])?;
    let engine = Ns3Engine::builder()
        .ns3_dir(ns3_dir.path())
        .data_dir(data_dir.path())
        .build();
    assert!(matches!(run(&engine, 3), Err(EngineError::Engine(_))));
    let output = std::fs::read_to_string(data_dir.path().join("run-0/output.txt"))?;
    assert!(output.contains("assert failed"));
    Ok(())
}

#[test]
fn missing_energy_is_io_error() -> anyhow::Result<()> {
    let ns3_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;
    fake_ns3(ns3_dir.path(), "ns3", &[WRITE_FLOWS])?;
    let engine = Ns3Engine::builder()
        .ns3_dir(ns3_dir.path())
        .data_dir(data_dir.path())
        .build();
    assert!(matches!(run(&engine, 3), Err(EngineError::Io(_))));
    Ok(())
}

#[test]
fn short_energy_report_is_engine_error() -> anyhow::Result<()> {
    let ns3_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;
    fake_ns3(
        ns3_dir.path(),
        "ns3",
        &[WRITE_FLOWS, "echo '0 99.5' > \"$root/energy.txt\"\n"],
    )?;
    let engine = Ns3Engine::builder()
        .ns3_dir(ns3_dir.path())
        .data_dir(data_dir.path())
        .build();
    assert!(matches!(run(&engine, 3), Err(EngineError::Engine(_))));
    Ok(())
}
