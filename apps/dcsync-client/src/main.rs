//! `dcsync-client`: recovers the ST 430-10 sync signal from a captured PCM
//! stream, correlates it against prefetched ST 430-14 aux-data, and drives
//! the DCS control-channel conversation from the processor side (§1, §6).

mod cli;
mod config;
mod logging;

use clap::Parser;
use dcsync_aux::{Prefetcher, Validator};
use dcsync_core::ids::Ul;
use dcsync_core::ring::build_rings;
use dcsync_core::state::{ClientState, ObservableState};
use dcsync_dcs::{run_client_session, ClientCallbacks};
use dcsync_engine::{Processor, ProcessorConfig};
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const CHUNK_LEN: usize = 256;
const QUEUE_DEPTH: usize = 8;
/// Capacity of the aux-data block queue between the prefetcher and the
/// validator; a handful of edit units' worth is enough slack for jitter.
const AUX_DATA_QUEUE_CAPACITY: usize = 64;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = cli::Cli::parse();

    if cli.print_default_config {
        match config::generate_default() {
            Ok(toml_string) => println!("{toml_string}"),
            Err(err) => {
                eprintln!("failed to generate default config: {err}");
                std::process::exit(1);
            },
        }
        return;
    }

    let load_result = match config::load(&cli.config) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        },
    };
    let mut app_config = load_result.config;
    if cli.verbose > 0 {
        app_config.log.level = config::LogLevel::Debug;
    }
    logging::init(&app_config.log);

    if let Some(missing) = &load_result.file_missing {
        warn!(config_path = %missing, "config file not found, using defaults");
    }

    let (_worker_ring, audio_ring) = build_rings(QUEUE_DEPTH, CHUNK_LEN);
    // `_worker_ring`'s producer side belongs to the host's real-time audio
    // capture callback (out of scope per §1); nothing in this process
    // feeds it, so frame recovery never actually sees captured samples here.

    let (aux_producer, aux_consumer) = rtrb::RingBuffer::new(AUX_DATA_QUEUE_CAPACITY);
    let validator = Arc::new(Mutex::new(Validator::new(aux_consumer)));

    let processor_config =
        ProcessorConfig { sample_rate: app_config.audio.sample_rate, chunk_len: CHUNK_LEN, queue_depth: QUEUE_DEPTH };

    let prefetcher_config: dcsync_aux::PrefetcherConfig = (&app_config.prefetcher).into();
    let coding_ul = match Ul::parse(&app_config.prefetcher.coding_ul) {
        Ok(ul) => ul,
        Err(err) => {
            error!(%err, coding_ul = %app_config.prefetcher.coding_ul, "invalid coding_ul in configuration");
            std::process::exit(1);
        },
    };

    // `Processor` and `Prefetcher` each need the other's handle (the
    // processor reports validated packets that drive the prefetcher's
    // edit rate; the prefetcher needs the processor's current frame), so
    // build the processor first and hand the prefetcher a closure over it.
    let processor_slot: Arc<Mutex<Option<Arc<Processor>>>> = Arc::new(Mutex::new(None));
    let prefetcher = {
        let processor_slot = processor_slot.clone();
        Arc::new(Prefetcher::new(
            prefetcher_config,
            Arc::new(move || {
                processor_slot.lock().expect("processor slot poisoned").as_ref().map_or(0, |p| p.current_frame())
            }),
            aux_producer,
        ))
    };

    let on_validated_packet = {
        let validator = validator.clone();
        let prefetcher = prefetcher.clone();
        Arc::new(move |packet: &dcsync_core::sync_packet::SyncPacket| {
            prefetcher.set_edit_rate(packet.sample_duration_den, packet.sample_duration_num);
            let mut validator = validator.lock().expect("validator poisoned");
            match validator.validate(packet.timeline_edit_unit_index) {
                Some(_block) => {
                    info!(frame = packet.timeline_edit_unit_index, "aux-data validated against sync packet");
                },
                None => {
                    warn!(frame = packet.timeline_edit_unit_index, "no aux-data block available for this frame yet");
                },
            }
        })
    };
    let processor = Arc::new(Processor::new(processor_config, audio_ring, on_validated_packet));
    *processor_slot.lock().expect("processor slot poisoned") = Some(processor.clone());

    prefetcher.set_coding_ul(coding_ul);
    prefetcher.set_accept_mode(app_config.prefetcher.accept.into());

    processor.observe_state(|state| info!(?state, "processor state changed"));

    {
        let processor = processor.clone();
        std::thread::spawn(move || processor.run());
    }

    let shutdown = CancellationToken::new();
    {
        let prefetcher = prefetcher.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    keep_going = prefetcher.tick() => {
                        if !keep_going {
                            break;
                        }
                    }
                }
            }
        });
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        });
    }

    let processor_for_rpl = processor.clone();
    let callbacks = ClientCallbacks {
        set_rpl_location: {
            let prefetcher = prefetcher.clone();
            Arc::new(move |playout_id, resource_url: &str| {
                info!(playout_id, resource_url, "received aux-data resource location from DCS");
                let start_edit_unit = processor_for_rpl.current_frame();
                prefetcher.set_resource_location(resource_url.to_string(), start_edit_unit);
            })
        },
    };

    let client_state = ObservableState::new(ClientState::Wait);
    client_state.observe(|state| info!(?state, "DCS client state changed"));

    loop {
        if shutdown.is_cancelled() {
            break;
        }
        match TcpStream::connect(&app_config.dcs_server_address).await {
            Ok(stream) => {
                info!(address = %app_config.dcs_server_address, "connected to DCS server");
                if let Err(err) = run_client_session(stream, &callbacks, &client_state).await {
                    warn!(%err, "DCS session ended with an error");
                }
            },
            Err(err) => {
                warn!(%err, address = %app_config.dcs_server_address, "failed to connect to DCS server, retrying");
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(std::time::Duration::from_secs(2)) => {},
                }
            },
        }
    }

    processor.shutdown();
    prefetcher.shutdown();
}
