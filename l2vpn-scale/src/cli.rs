//! Command-line interface.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::aggregate::{Aggregator, Mode};
use crate::circuit::{CircuitParams, CircuitPlan, CircuitRange, Endpoint, Side};
use crate::config::Credentials;
use crate::error::Result;
use crate::pipeline::{RunPlan, Target};
use crate::sink::{OutputPath, Sink, SshConnector};
use crate::template::Template;
use crate::transport::HostKeyVerification;

/// Bulk-provision templated L2VPN pseudowires on a pair of IOS-XE routers
#[derive(Parser, Debug)]
#[command(name = "l2vpn-scale")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG applies when unset
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render N circuits and apply them to the devices
    Provision {
        #[command(flatten)]
        run: RunArgs,

        /// Fail if a planned service instance or IP SLA id is already configured
        #[arg(long)]
        preflight: bool,
    },

    /// Remove the N circuits a provision run with the same arguments created
    Deprovision {
        #[command(flatten)]
        run: RunArgs,
    },
}

impl Command {
    pub fn mode(&self) -> Mode {
        match self {
            Command::Provision { .. } => Mode::Provision,
            Command::Deprovision { .. } => Mode::Deprovision,
        }
    }

    pub fn run_args(&self) -> &RunArgs {
        match self {
            Command::Provision { run, .. } | Command::Deprovision { run } => run,
        }
    }

    fn preflight(&self) -> bool {
        matches!(self, Command::Provision { preflight: true, .. })
    }

    /// Load the template the run renders and fix everything else it needs.
    ///
    /// A deprovision run with `--undo-template` never reads `--template`.
    pub fn run_plan(&self) -> Result<RunPlan> {
        let args = self.run_args();

        let (template, undo) = match (self.mode(), &args.undo_template) {
            (Mode::Deprovision, Some(path)) => (Template::load(path)?, true),
            _ => (Template::load(&args.template)?, false),
        };

        Ok(RunPlan {
            mode: self.mode(),
            plan: args.circuit_plan()?,
            template,
            undo,
            aggregator: Aggregator::default(),
            targets: args.targets(),
            preflight: self.preflight(),
        })
    }
}

/// Arguments shared by both subcommands.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// A-end device address
    pub a_host: String,

    /// Z-end device address; only the A end is targeted when omitted
    pub z_host: Option<String>,

    /// Number of circuits
    #[arg(short = 'n', long)]
    pub count: u32,

    /// First circuit identifier (also the first VLAN / service instance id)
    #[arg(long, default_value_t = 1)]
    pub start: u32,

    /// A-end physical interface
    #[arg(long)]
    pub a_interface: String,

    /// Z-end physical interface (default: the A-end interface)
    #[arg(long)]
    pub z_interface: Option<String>,

    /// A-end loopback, the Z end's pseudowire peer
    #[arg(long)]
    pub a_loopback: Ipv4Addr,

    /// Z-end loopback, the A end's pseudowire peer
    #[arg(long)]
    pub z_loopback: Ipv4Addr,

    /// Circuit template
    #[arg(long, default_value = "l2vpn.j2")]
    pub template: PathBuf,

    /// Template rendered for deprovision instead of negating the circuit template;
    /// ignored by provision
    #[arg(long)]
    pub undo_template: Option<PathBuf>,

    /// CFM continuity check interval in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub ccm_interval: u32,

    /// Enable CFM hardware offload
    #[arg(long)]
    pub hw_offload: bool,

    /// CFM maintenance domain
    #[arg(long, default_value = "OPERATOR")]
    pub cfm_domain: String,

    /// CFM maintenance level
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=7))]
    pub cfm_level: u8,

    /// First IP SLA operation id; each circuit uses two
    #[arg(long, default_value_t = 1)]
    pub sla_base: u32,

    /// Write the configuration to files instead of contacting the devices
    #[arg(long)]
    pub dry_run: bool,

    /// Dry-run output path; {host}, {side} and {mode} are replaced per device
    #[arg(short, long, default_value = OutputPath::DEFAULT)]
    pub output: String,

    /// SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Connect and per-command timeout in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Host key checking
    #[arg(long, value_enum, default_value_t = HostKeyVerification::AcceptNew)]
    pub host_key_checking: HostKeyVerification,

    /// known_hosts file (default: ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,
}

impl RunArgs {
    pub fn circuit_plan(&self) -> Result<CircuitPlan> {
        let range = CircuitRange::new(self.start, self.count)?;
        let params = CircuitParams {
            ccm_interval_secs: self.ccm_interval,
            hw_offload: self.hw_offload,
            cfm_domain: self.cfm_domain.clone(),
            cfm_level: self.cfm_level,
            sla_base: self.sla_base,
        };
        Ok(CircuitPlan::new(range, params)?)
    }

    /// The A and Z endpoints.
    pub fn endpoints(&self) -> (Endpoint, Endpoint) {
        let a = Endpoint {
            side: Side::A,
            interface: self.a_interface.clone(),
            loopback: self.a_loopback,
        };
        let z = Endpoint {
            side: Side::Z,
            interface: self
                .z_interface
                .clone()
                .unwrap_or_else(|| self.a_interface.clone()),
            loopback: self.z_loopback,
        };
        (a, z)
    }

    /// Devices in delivery order.
    pub fn targets(&self) -> Vec<Target> {
        let (a, z) = self.endpoints();
        let mut targets = vec![Target {
            host: self.a_host.clone(),
            local: a.clone(),
            remote: z.clone(),
        }];
        if let Some(ref z_host) = self.z_host {
            targets.push(Target {
                host: z_host.clone(),
                local: z,
                remote: a,
            });
        }
        targets
    }

    /// SSH connector for live runs.
    pub fn connector(&self, credentials: Credentials) -> SshConnector {
        SshConnector::new(credentials)
            .port(self.port)
            .timeout(Duration::from_secs(self.timeout))
            .host_key_verification(self.host_key_checking)
            .known_hosts_path(self.known_hosts.clone())
    }

    /// The run's sink. Credentials are only read for live runs.
    pub fn sink(&self) -> Result<Sink<SshConnector>> {
        if self.dry_run {
            return Ok(Sink::dry_run(OutputPath::new(&self.output)));
        }
        Sink::live(|| Ok(self.connector(Credentials::from_env()?)))
    }
}
