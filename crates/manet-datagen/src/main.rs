use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use manet_core::BatchOpts;
use manet_datagen::Overrides;
use ns3_frontend::{Launcher, Ns3Engine};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON batch configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Root of the ns-3 source tree
    #[arg(long, default_value = "ns-3")]
    ns3_dir: PathBuf,

    /// Directory for per-run scenario scripts and results
    #[arg(long, default_value = "data/runs")]
    data_dir: PathBuf,

    /// Name of the ns-3 scenario program
    #[arg(long, default_value = "manet-scenario")]
    program: String,

    /// Launch the scenario program with `./waf --run` instead of `./ns3 run`
    #[arg(long)]
    waf: bool,

    /// Use the scenario program already in the ns-3 `scratch` directory as is
    #[arg(long)]
    no_install: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let opts = match &args.config {
        Some(path) => manet_datagen::read_opts(path)?,
        None => BatchOpts::default(),
    };
    let opts = args.overrides.apply(opts);

    let engine = Ns3Engine::builder()
        .ns3_dir(args.ns3_dir)
        .data_dir(args.data_dir)
        .program(args.program)
        .launcher(if args.waf { Launcher::Waf } else { Launcher::Ns3 })
        .build();
    if !args.no_install {
        engine
            .install_scenario_program()
            .context("failed to install the scenario program")?;
    }

    let summary = manet_datagen::generate(&engine, &opts)?;
    log::info!("Dataset complete: {summary}");
    Ok(())
}
