//! An ns-3 backend for the MANET dataset generator.
//!
//! This crate is tightly coupled to the interface of the ns-3 scenario program. A session records
//! every setup call as one line of a scenario script; running the session writes the script to
//! `<data_dir>/run-<k>/scenario.txt`, runs the scenario program on that directory, and reads back
//! `flows.txt` and `energy.txt`. The scenario program itself ships with this crate as
//! [`SCENARIO_PROGRAM`].

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::fmt::Write;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use derivative::Derivative;
use manet_core::{
    engine::{
        CbrApp, EngineError, EngineSession, PacketSink, Position, RateManager, RawFlowStats,
        RoutingKind, SimEngine, WifiSetup, WifiStandard,
    },
    units::{Joules, Nanosecs},
    RunSeed,
};

/// An ns-3 installation that runs MANET scenarios.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct Ns3Engine {
    /// The root of the ns-3 source tree.
    #[builder(setter(into))]
    pub ns3_dir: PathBuf,
    /// The directory in which to write scenario scripts and results.
    #[builder(setter(into))]
    pub data_dir: PathBuf,
    /// The name of the scenario program.
    #[builder(default = String::from("manet-scenario"), setter(into))]
    pub program: String,
    /// How to launch the scenario program.
    #[builder(default)]
    pub launcher: Launcher,
}

/// Source of the scenario program that reads the scripts written by [`Ns3Session`].
pub const SCENARIO_PROGRAM: &str = include_str!("../scratch/manet-scenario.cc");

impl Ns3Engine {
    /// Copy the scenario program into the ns-3 `scratch` directory, where `./ns3 run` builds it.
    /// Returns the installed path. An identical existing copy is left untouched.
    pub fn install_scenario_program(&self) -> std::io::Result<PathBuf> {
        let scratch = self.ns3_dir.join("scratch");
        let path = scratch.join(format!("{}.cc", self.program));
        if fs::read_to_string(&path).is_ok_and(|s| s == SCENARIO_PROGRAM) {
            return Ok(path);
        }
        fs::create_dir_all(&scratch)?;
        fs::write(&path, SCENARIO_PROGRAM)?;
        log::info!("Installed scenario program at {}", path.display());
        Ok(path)
    }
}

impl SimEngine for Ns3Engine {
    type Session = Ns3Session;

    fn open(&self, seed: RunSeed) -> Result<Self::Session, EngineError> {
        // ns-3's seed manager rejects a zero seed.
        if seed.base() == 0 {
            return Err(EngineError::Setup("ns-3 requires a non-zero seed".into()));
        }
        let dir = self.data_dir.join(format!("run-{}", seed.run()));
        let mut script = String::new();
        writeln!(script, "seed {} {}", seed.base(), seed.run()).unwrap();
        Ok(Ns3Session {
            ns3_dir: self.ns3_dir.clone(),
            program: self.program.clone(),
            launcher: self.launcher,
            dir,
            script,
            stage: Stage::Open,
            nr_nodes: 0,
            results: None,
        })
    }
}

/// How the scenario program is launched from the ns-3 source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative, serde::Serialize, serde::Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "lowercase")]
pub enum Launcher {
    /// `./ns3 run` (ns-3.36 and later).
    #[derivative(Default)]
    Ns3,
    /// `./waf --run` (before ns-3.36).
    Waf,
}

/// Setup stages, in the order the session accepts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Open,
    Nodes,
    Placed,
    Wifi,
    Internet,
    Addressed,
    Energy,
    Apps,
    Monitored,
    Ran,
}

/// One ns-3 simulation.
#[derive(Debug)]
pub struct Ns3Session {
    ns3_dir: PathBuf,
    program: String,
    launcher: Launcher,
    dir: PathBuf,
    script: String,
    stage: Stage,
    nr_nodes: usize,
    results: Option<(Vec<RawFlowStats>, Vec<Joules>)>,
}

impl Ns3Session {
    /// The directory this session's script and results live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The scenario script recorded so far.
    pub fn script(&self) -> &str {
        &self.script
    }

    fn advance(&mut self, to: Stage) -> Result<(), EngineError> {
        // Several applications may be installed, so `Apps` can repeat.
        let ok = self.stage < to || (self.stage == to && to == Stage::Apps);
        if !ok {
            return Err(EngineError::Setup(format!(
                "cannot enter stage {to:?} from {:?}",
                self.stage
            )));
        }
        self.stage = to;
        Ok(())
    }

    fn check_node(&self, node: usize) -> Result<(), EngineError> {
        if node < self.nr_nodes {
            Ok(())
        } else {
            Err(EngineError::Setup(format!(
                "node {node} does not exist ({} nodes)",
                self.nr_nodes
            )))
        }
    }

    fn invoke_ns3(&self) -> std::io::Result<()> {
        // We need to canonicalize the directories because we run `cd` below.
        let dir = fs::canonicalize(&self.dir)?;
        let ns3_dir = fs::canonicalize(&self.ns3_dir)?;
        let run = format!("{} --root={}", self.program, dir.display());
        log::debug!("invoking ns-3 in {}: {run}", ns3_dir.display());
        match self.launcher {
            Launcher::Ns3 => cmd_lib::run_cmd! {
                cd ${ns3_dir};
                ./ns3 run ${run} > ${dir}/output.txt 2>&1
            },
            Launcher::Waf => cmd_lib::run_cmd! {
                cd ${ns3_dir};
                ./waf --run ${run} > ${dir}/output.txt 2>&1
            },
        }
    }
}

impl EngineSession for Ns3Session {
    fn create_nodes(&mut self, n: usize) -> Result<(), EngineError> {
        self.advance(Stage::Nodes)?;
        self.nr_nodes = n;
        writeln!(self.script, "nodes {n}").unwrap();
        Ok(())
    }

    fn place_static(&mut self, positions: &[Position]) -> Result<(), EngineError> {
        self.advance(Stage::Placed)?;
        if positions.len() != self.nr_nodes {
            return Err(EngineError::Setup(format!(
                "{} positions for {} nodes",
                positions.len(),
                self.nr_nodes
            )));
        }
        self.script.push_str(&translate_positions(positions));
        Ok(())
    }

    fn install_wifi(&mut self, wifi: &WifiSetup) -> Result<(), EngineError> {
        self.advance(Stage::Wifi)?;
        let standard = match wifi.standard {
            WifiStandard::Ieee80211b => "80211b",
        };
        let manager = match wifi.rate_manager {
            RateManager::Aarf => "ns3::AarfWifiManager",
        };
        writeln!(self.script, "wifi {standard} {manager} adhoc").unwrap();
        Ok(())
    }

    fn install_internet(&mut self, routing: Option<RoutingKind>) -> Result<(), EngineError> {
        self.advance(Stage::Internet)?;
        let routing = match routing {
            Some(RoutingKind::Olsr) => "olsr",
            None => "none",
        };
        writeln!(self.script, "internet {routing}").unwrap();
        Ok(())
    }

    fn assign_addresses(&mut self, base: Ipv4Addr, mask: Ipv4Addr) -> Result<(), EngineError> {
        self.advance(Stage::Addressed)?;
        writeln!(self.script, "address {base} {mask}").unwrap();
        Ok(())
    }

    fn install_energy(&mut self, initial: Joules) -> Result<(), EngineError> {
        self.advance(Stage::Energy)?;
        writeln!(self.script, "energy {}", initial.into_f64()).unwrap();
        Ok(())
    }

    fn install_cbr(&mut self, app: &CbrApp) -> Result<(), EngineError> {
        self.advance(Stage::Apps)?;
        self.check_node(app.src.inner())?;
        self.check_node(app.dst.inner())?;
        // onoff src dst port rate packet_size start stop
        writeln!(
            self.script,
            "onoff {} {} {} {} {} {} {}",
            app.src,
            app.dst,
            app.port,
            app.rate,
            app.packet_size.into_u64(),
            app.start,
            app.stop
        )
        .unwrap();
        Ok(())
    }

    fn install_sink(&mut self, sink: &PacketSink) -> Result<(), EngineError> {
        self.advance(Stage::Apps)?;
        self.check_node(sink.node.inner())?;
        writeln!(self.script, "sink {} {} {}", sink.node, sink.port, sink.start).unwrap();
        Ok(())
    }

    fn install_flow_monitor(&mut self) -> Result<(), EngineError> {
        self.advance(Stage::Monitored)?;
        writeln!(self.script, "flowmon all").unwrap();
        Ok(())
    }

    fn run_until(&mut self, stop: Nanosecs) -> Result<(), EngineError> {
        self.advance(Stage::Ran)?;
        writeln!(self.script, "stop {stop}").unwrap();

        // Set up directory
        let mk_path = |dir: &Path, file: &str| dir.join(file);
        fs::create_dir_all(&self.dir)?;
        fs::write(mk_path(&self.dir, "scenario.txt"), &self.script)?;

        // Run ns-3
        self.invoke_ns3()
            .map_err(|e| EngineError::Engine(anyhow::Error::new(e).context("ns-3 run failed")))?;

        // Parse results
        let flows = parse_flow_records(&fs::read_to_string(mk_path(&self.dir, "flows.txt"))?)?;
        let energy = parse_energy_records(
            &fs::read_to_string(mk_path(&self.dir, "energy.txt"))?,
            self.nr_nodes,
        )?;
        self.results = Some((flows, energy));
        Ok(())
    }

    fn flow_stats(&self) -> Result<Vec<RawFlowStats>, EngineError> {
        self.results
            .as_ref()
            .map(|(flows, _)| flows.clone())
            .ok_or(EngineError::NotRun)
    }

    fn remaining_energy(&self) -> Result<Vec<Joules>, EngineError> {
        self.results
            .as_ref()
            .map(|(_, energy)| energy.clone())
            .ok_or(EngineError::NotRun)
    }
}

fn translate_positions(positions: &[Position]) -> String {
    let mut s = String::new();
    // position id x y
    for (i, p) in positions.iter().enumerate() {
        writeln!(s, "position {i} {:.3} {:.3}", p.x, p.y).unwrap();
    }
    s
}

fn parse_flow_records(s: &str) -> Result<Vec<RawFlowStats>, ParseNs3Error> {
    s.lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_flow_record)
        .collect()
}

fn parse_flow_record(s: &str) -> Result<RawFlowStats, ParseNs3Error> {
    // flow_id, tx_packets, rx_packets, lost_packets, delay_sum (ns), first_tx (ns), last_rx (ns),
    // rx_bytes
    const NR_FLOW_FIELDS: usize = 8;
    let fields = s.split_whitespace().collect::<Vec<_>>();
    let nr_fields = fields.len();
    if nr_fields != NR_FLOW_FIELDS {
        return Err(ParseNs3Error::WrongNrFields {
            expected: NR_FLOW_FIELDS,
            got: nr_fields,
        });
    }
    Ok(RawFlowStats {
        id: fields[0].parse()?,
        tx_packets: fields[1].parse()?,
        rx_packets: fields[2].parse()?,
        lost_packets: fields[3].parse()?,
        delay_sum: fields[4].parse()?,
        first_tx: fields[5].parse()?,
        last_rx: fields[6].parse()?,
        rx_bytes: fields[7].parse()?,
    })
}

fn parse_energy_records(s: &str, nr_nodes: usize) -> Result<Vec<Joules>, ParseNs3Error> {
    // node_id remaining (J)
    const NR_ENERGY_FIELDS: usize = 2;
    let mut energy = vec![None; nr_nodes];
    for line in s.lines().filter(|l| !l.trim().is_empty()) {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.len() != NR_ENERGY_FIELDS {
            return Err(ParseNs3Error::WrongNrFields {
                expected: NR_ENERGY_FIELDS,
                got: fields.len(),
            });
        }
        let node: usize = fields[0].parse()?;
        let remaining: f64 = fields[1].parse()?;
        let slot = energy
            .get_mut(node)
            .ok_or(ParseNs3Error::UnknownNode(node))?;
        *slot = Some(Joules::new(remaining));
    }
    energy
        .into_iter()
        .enumerate()
        .map(|(node, e)| e.ok_or(ParseNs3Error::MissingNode(node)))
        .collect()
}

/// Error parsing ns-3 formats.
#[derive(Debug, thiserror::Error)]
pub enum ParseNs3Error {
    /// Incorrect number of fields.
    #[error("Wrong number of fields (expected {expected}, got {got})")]
    WrongNrFields {
        /// Expected number of fields.
        expected: usize,
        /// Actual number of fields.
        got: usize,
    },

    /// An energy record names a node that does not exist.
    #[error("energy reported for unknown node {0}")]
    UnknownNode(usize),

    /// A node has no energy record.
    #[error("no energy reported for node {0}")]
    MissingNode(usize),

    /// Error parsing an integer field.
    #[error("Failed to parse field")]
    ParseInt(#[from] std::num::ParseIntError),

    /// Error parsing a decimal field.
    #[error("Failed to parse field")]
    ParseFloat(#[from] std::num::ParseFloatError),
}

impl From<ParseNs3Error> for EngineError {
    fn from(e: ParseNs3Error) -> Self {
        EngineError::Engine(anyhow::Error::new(e).context("failed to parse ns-3 output"))
    }
}
