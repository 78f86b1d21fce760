/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use clap::Parser;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use storage_probe::{load_config, MachineProbeService, ProbeConfig, ProcedureKind};

#[derive(Debug, Parser)]
#[command(name = "storage_probe")]
#[command(about = "Report host information and exercise disk or LVM lifecycles", long_about = None)]
struct Args {
    /// Use LVM procedure instead of the plain disk procedure
    #[arg(long)]
    lvm: bool,

    /// Seconds to wait between iterations
    #[arg(long)]
    interval: Option<u64>,

    /// Stop after this many iterations (default: run forever)
    #[arg(long)]
    iterations: Option<u64>,

    /// Per-command timeout in seconds
    #[arg(long)]
    command_timeout: Option<u64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Layer command line flags over the loaded configuration
    fn apply(&self, mut config: ProbeConfig) -> ProbeConfig {
        if self.lvm {
            config.procedure = ProcedureKind::Lvm;
        }
        if let Some(secs) = self.interval {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(count) = self.iterations {
            config.iterations = Some(count);
        }
        if let Some(secs) = self.command_timeout {
            config.command_timeout = Duration::from_secs(secs);
        }
        config
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

async fn check_environment(service: &dyn MachineProbeService, procedure: ProcedureKind) {
    let missing = service.validate_dependencies(procedure).await;
    if !missing.is_empty() {
        log::warn!("Missing system dependencies: {}", missing.join(", "));
    }

    if !service.check_privileges().await {
        log::warn!("Not running as root; procedure commands rely on sudo");
    }
}

/// Print the machine report, run one procedure and print its outcome
async fn run_iteration<W: Write>(
    out: &mut W,
    service: &dyn MachineProbeService,
    procedure: ProcedureKind,
) -> io::Result<()> {
    let machine_info = service.collect_machine_info().await;
    writeln!(out, "{machine_info}")?;

    writeln!(out, "=== Running {procedure} Procedure ===")?;
    match service.run_procedure(procedure).await {
        Ok(()) => {
            writeln!(out, "=== {procedure} Procedure Completed Successfully ===")?;
            writeln!(out)?;
        }
        Err(e) => writeln!(out, "{e}")?,
    }
    out.flush()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.apply(load_config(args.config.as_deref()).await?);
    let service = storage_probe::create_service(config.clone())?;
    log::debug!("Running with {config:?}");

    check_environment(service.as_ref(), config.procedure).await;

    let mut stdout = io::stdout();
    let mut completed: u64 = 0;
    loop {
        run_iteration(&mut stdout, service.as_ref(), config.procedure).await?;
        completed += 1;

        if config.iterations.is_some_and(|limit| completed >= limit) {
            break;
        }
        tokio::time::sleep(config.interval).await;
    }

    Ok(())
}
