//! Byzantine generals process.
//!
//! Runs one participant of an oral-messages agreement: the commander when
//! `--id 0`, a lieutenant otherwise. Every process must be started with the
//! same participant table and fault bound.
//!
//! # Usage
//!
//! ```bash
//! # Commander proposing attack to three lieutenants
//! generals --id 0 --order attack \
//!     --peer 10.0.0.1:9000 --peer 10.0.0.2:9000 \
//!     --peer 10.0.0.3:9000 --peer 10.0.0.4:9000
//!
//! # A lieutenant, table shared through a config file
//! generals --id 2 --config generals.toml
//! ```
//!
//! # Configuration
//!
//! ```toml
//! faults = 1
//! order = "attack"   # read by the commander only
//!
//! [[peer]]           # entry 0 is the commander
//! host = "10.0.0.1"
//! port = 9000
//!
//! [[peer]]
//! host = "10.0.0.2"
//! port = 9000
//! ```
//!
//! Lieutenants bind the port of their own roster entry on all interfaces.
//! The decided order is printed on stdout when the run finishes.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use config::FileConfig;
use generals_network::{UdpClient, UdpConfig, UdpServer};
use generals_protocol::{Commander, Lieutenant, ProtocolConfig};
use generals_types::{Address, Order, ProcessId, Roster};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One participant in an oral-messages Byzantine agreement run.
#[derive(Parser, Debug)]
#[command(name = "generals", version, about, long_about = None)]
struct Cli {
    /// This process's id; id 0 commands, everyone else listens
    #[arg(long)]
    id: u32,

    /// Participant address in id order (repeatable; overrides the config file)
    #[arg(long = "peer", value_name = "HOST:PORT")]
    peers: Vec<Address>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The order to propose (commander only)
    #[arg(long, value_enum)]
    order: Option<OrderArg>,

    /// Tolerated Byzantine faults m; the run lasts m + 1 rounds
    #[arg(long)]
    faults: Option<u32>,

    /// Per-attempt acknowledgement timeout, in milliseconds
    #[arg(long, value_name = "MS")]
    ack_timeout_ms: Option<u64>,

    /// Listen-loop idle timeout, in milliseconds
    #[arg(long, value_name = "MS")]
    idle_timeout_ms: Option<u64>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    Attack,
    Retreat,
}

impl From<OrderArg> for Order {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Attack => Order::Attack,
            OrderArg::Retreat => Order::Retreat,
        }
    }
}

fn init_telemetry(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("building log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// One connected client per process `own` may need to send to: every
/// lieutenant except itself. Nobody sends to the commander; it is on every
/// relay path already.
fn connect_clients(
    roster: &Roster,
    own: ProcessId,
    udp: &UdpConfig,
) -> Result<BTreeMap<ProcessId, Arc<UdpClient>>> {
    let mut clients = BTreeMap::new();
    for (id, addr) in roster.iter() {
        if id == own || id.is_commander() {
            continue;
        }
        let client = UdpClient::connect(addr.clone(), udp)
            .with_context(|| format!("connecting to {id} at {addr}"))?;
        clients.insert(id, Arc::new(client));
    }
    Ok(clients)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli.log_level)?;

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let peers = if cli.peers.is_empty() {
        file.peers
    } else {
        cli.peers
    };
    if peers.is_empty() {
        bail!("no participants: pass --peer in id order or a --config file");
    }
    let faults = cli.faults.or(file.faults).unwrap_or(1);
    let order = cli.order.map(Order::from).or(file.order);

    let roster = Roster::new(peers)
        .resolved()
        .context("resolving participant table")?;
    if !roster.supports_faults(faults) {
        bail!(
            "{} participants cannot tolerate {} faults; oral messages needs at least {}",
            roster.len(),
            faults,
            3 * faults + 1
        );
    }
    let id = ProcessId(cli.id);
    let Some(local) = roster.get(id).cloned() else {
        bail!("id {} is out of range for {} participants", cli.id, roster.len());
    };

    let mut udp = UdpConfig::default();
    if let Some(ms) = cli.ack_timeout_ms {
        udp.ack_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.idle_timeout_ms {
        udp.idle_timeout = Duration::from_millis(ms);
    }
    let protocol = ProtocolConfig::default();

    info!(%id, participants = roster.len(), faults, "starting");

    let decision = if id.is_commander() {
        let order = order.context("the commander needs --order (or `order` in the config file)")?;
        let clients = connect_clients(&roster, id, &udp)?;
        Commander::new(order, &roster, clients, protocol)?.decide()
    } else {
        let listen = Address::new("0.0.0.0", local.port);
        let mut server = UdpServer::bind(&listen, &udp)
            .with_context(|| format!("binding udp server on {listen}"))?;
        let clients = connect_clients(&roster, id, &udp)?;
        Lieutenant::new(id, roster, faults, clients, protocol)?.decide(&mut server)
    };

    println!("{decision}");
    Ok(())
}
