use airsift::config::Config;
use airsift::control;
use airsift::crypto::Gateway;
use airsift::export::{self, PcapWriter};
use airsift::proto::LinkLayer;
use airsift::source::{CaptureFile, DroneSource};
use airsift::Monitor;
use anyhow::{bail, Context};
use clap::Parser;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause before dialing the drone again after a lost connection.
const RECONNECT_PAUSE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "airsift", version, about = "A passive 802.11 monitor")]
struct Args {
    /// The path to the configuration file
    #[arg(short, long, default_value = "airsift.toml")]
    config: PathBuf,

    /// The capture file to parse
    #[arg(short, long, conflicts_with_all = ["drone_address", "drone_port"])]
    file: Option<PathBuf>,

    /// The address of the kismet drone
    #[arg(short = 'k', long, requires = "drone_port")]
    drone_address: Option<String>,

    /// The port of the kismet drone
    #[arg(short = 'p', long, requires = "drone_address")]
    drone_port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::load(&args.config).context("failed config parsing")?;
    if !config.wep_keys.is_empty() || !config.wpa_keys.is_empty() {
        info!(
            "loaded {} wep and {} wpa decryption keys",
            config.wep_keys.len(),
            config.wpa_keys.len()
        );
    }

    let mon = Arc::new(Monitor::new(config));
    {
        let mon = Arc::clone(&mon);
        ctrlc::set_handler(move || mon.request_shutdown())
            .context("failed to install the signal handler")?;
    }

    let ingest = match (args.file, args.drone_address, args.drone_port) {
        (Some(file), None, None) => {
            let mon = Arc::clone(&mon);
            thread::spawn(move || run_file(&mon, &file))
        }
        (None, Some(address), Some(port)) => {
            let mon = Arc::clone(&mon);
            thread::spawn(move || run_drone(&mon, &address, port))
        }
        _ => bail!("specify either --file or --drone-address with --drone-port"),
    };

    // the control surface lives on the main thread until shutdown
    if let Err(e) = control::run(&mon) {
        warn!("control socket failed: {}", e);
        mon.request_shutdown();
    }

    if ingest.join().is_err() {
        error!("the ingest thread panicked");
    }

    // one final flush so an interrupted run still leaves its exports behind
    export::flush_all(&mon);
    Ok(())
}

fn build_link(mon: &Monitor) -> LinkLayer {
    let gateway = Gateway::new(&mon.config);
    let pcap = mon.config.outputs.pcap.then(|| {
        PcapWriter::new(
            mon.config
                .output_path
                .join(format!("airsift_{}.pcap", mon.started())),
        )
    });
    LinkLayer::new(gateway, pcap)
}

fn run_file(mon: &Monitor, path: &Path) {
    info!("reading {}", path.display());
    let mut cap = match CaptureFile::open(path, Arc::clone(&mon.stats)) {
        Ok(cap) => cap,
        Err(e) => {
            error!("failed to open {}: {}", path.display(), e);
            return;
        }
    };
    let mut link = build_link(mon);
    while !mon.shutdown_requested() {
        match cap.next_frame() {
            Ok(Some(frame)) => link.handle_frame(mon, &frame),
            Ok(None) => {
                info!("finished reading {}", path.display());
                break;
            }
            Err(e) => {
                warn!("reading {} failed: {}", path.display(), e);
                break;
            }
        }
    }
}

fn run_drone(mon: &Monitor, address: &str, port: u16) {
    let mut link = build_link(mon);
    while !mon.shutdown_requested() {
        match DroneSource::connect(address, port, Arc::clone(&mon.stats)) {
            Ok(mut source) => {
                info!("connected to the drone at {}:{}", address, port);
                while !mon.shutdown_requested() {
                    match source.next_frame() {
                        Ok(frame) => link.handle_frame(mon, &frame),
                        Err(e) => {
                            debug!("drone read failed: {}", e);
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!("drone connection failed: {}", e),
        }
        if !mon.shutdown_requested() {
            // the drone sometimes just stops talking; give it a moment
            thread::sleep(RECONNECT_PAUSE);
        }
    }
}
