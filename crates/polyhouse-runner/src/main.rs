//! `polyhouse` command-line tool.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use polyhouse_node::NodeConfig;
use polyhouse_packet::{encode_message, DataKind, Message, NodeId, OpCode};
use polyhouse_runner::{run_simulation, RunnerError, SimulationOptions};
use serde::Serialize;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyhouse", version, about = "PolyHouse LoRa node tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a node from a YAML config against a scripted gateway.
    Simulate {
        /// Node configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Number of control-loop ticks.
        #[arg(long, default_value_t = 100)]
        ticks: u64,
        /// Seed for simulated sensor readings.
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Ticks between gateway requests.
        #[arg(long, default_value_t = 5)]
        gateway_interval: u32,
        /// Pace each tick to this many milliseconds of wall-clock time.
        #[arg(long)]
        realtime_ms: Option<u64>,
    },
    /// Encode a frame and print it.
    Encode {
        /// Four-digit sender id.
        #[arg(long)]
        id: NodeId,
        /// Op code name, e.g. SENSOR_DATA.
        #[arg(long)]
        op: OpCode,
        /// Data kind name, e.g. TEMP_S.
        #[arg(long, default_value = "NO_HEADER")]
        kind: DataKind,
        /// Payload text.
        #[arg(long, default_value = "")]
        payload: String,
    },
    /// Decode a frame and print it as JSON.
    Decode {
        /// Frame text as received.
        frame: String,
    },
}

#[derive(Serialize)]
struct DecodedFrame {
    node_id: NodeId,
    op_code: OpCode,
    data_kind: DataKind,
    payload_length: u16,
    payload: String,
}

impl From<Message> for DecodedFrame {
    fn from(message: Message) -> Self {
        DecodedFrame {
            node_id: message.header.node_id,
            op_code: message.header.op_code,
            data_kind: message.header.data_kind,
            payload_length: message.header.payload_length,
            payload: message.payload_text(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), RunnerError> {
    match command {
        Commands::Simulate {
            config,
            ticks,
            seed,
            gateway_interval,
            realtime_ms,
        } => {
            let config = NodeConfig::load(&config)?;
            polyhouse_metrics::describe_metrics();

            let stop = Arc::new(AtomicBool::new(false));
            if realtime_ms.is_some() {
                let flag = stop.clone();
                if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
                    warn!("could not install Ctrl-C handler: {err}");
                }
            }

            let options = SimulationOptions {
                ticks,
                seed,
                request_interval_ticks: gateway_interval,
                tick_duration: realtime_ms.map(Duration::from_millis),
                stop: Some(stop),
            };
            let stats = run_simulation(config, &options)?;

            println!("ticks run:          {}", stats.ticks_run);
            println!("final mode:         {}", stats.final_mode);
            println!("frames sent:        {}", stats.node.frames_sent);
            println!("frames received:    {}", stats.node.frames_received);
            println!("decode errors:      {}", stats.node.decode_errors);
            println!("rejected:           {}", stats.node.rejected);
            println!("announcements:      {}", stats.node.announcements);
            for (kind, value) in &stats.readings {
                println!("reading {:<10} {value}", kind.as_str());
            }
            for result in &stats.command_results {
                println!("command            {result}");
            }
        }
        Commands::Encode {
            id,
            op,
            kind,
            payload,
        } => {
            let frame = encode_message(&id, op, kind, payload.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&frame));
        }
        Commands::Decode { frame } => {
            let message = Message::decode(frame.as_bytes())?;
            println!("{}", serde_json::to_string_pretty(&DecodedFrame::from(message))?);
        }
    }
    Ok(())
}
