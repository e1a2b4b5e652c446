//! `dcsync-server`: emits the ST 430-10 PCM sync signal for a show's
//! timeline and serves the ST 430-14 aux-data HTTP endpoint, announcing
//! itself to a single connected processor over DCS (§1, §6).

mod cli;
mod config;
mod essence;
mod logging;
mod show_loader;

use clap::Parser;
use dcsync_aux::{router, ResponderState};
use dcsync_core::ring::build_rings;
use dcsync_core::state::{DcsState, EmitterState, ObservableState};
use dcsync_dcs::{run_server_session, ServerCallbacks};
use dcsync_engine::{Emitter, EmitterConfig};
use essence::RawFileEssenceReader;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Audio-callback-sized chunk, matching the processor side's expectations;
/// not config-exposed since the real-time ring is an internal seam (§4.4).
const CHUNK_LEN: usize = 256;
const QUEUE_DEPTH: usize = 8;
/// Fixed record size this demo's `RawFileEssenceReader` assumes per edit
/// unit; a real deployment injects an MXF-aware `EssenceReader` instead.
const ESSENCE_RECORD_LEN: u64 = 4096;

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

    let show = match show_loader::build_show(app_config.sample_rate, &app_config.show.cpl_descriptors) {
        Ok(show) => show,
        Err(err) => {
            error!(%err, "failed to load show");
            std::process::exit(1);
        },
    };
    let show_length_frames = show.length_in_frames();
    info!(show_length_frames, "show loaded");

    let responder_state = Arc::new(ResponderState {
        show: RwLock::new(show),
        reader: Arc::new(RawFileEssenceReader::new(ESSENCE_RECORD_LEN)),
    });

    let (worker_ring, audio_ring) = build_rings(QUEUE_DEPTH, CHUNK_LEN);
    let emitter_config = EmitterConfig {
        sample_rate: app_config.sample_rate,
        chunk_len: CHUNK_LEN,
        queue_depth: QUEUE_DEPTH,
        show_length_frames,
    };
    let get_frame_data = {
        let responder_state = responder_state.clone();
        Arc::new(move |frame: i32| {
            responder_state.show.read().expect("show lock poisoned").asset_frame_info(frame)
        })
    };
    let emitter = Arc::new(Emitter::new(emitter_config, get_frame_data, worker_ring));
    emitter.initialize();

    emitter.observe_state(|state| info!(?state, "emitter state changed"));

    {
        let emitter = emitter.clone();
        std::thread::spawn(move || emitter.run());
    }
    // `audio_ring`'s consumer side belongs to the host's real-time audio
    // output callback (out of scope per §1); nothing in this process
    // drains it, so playback never actually reaches speakers here.
    drop(audio_ring);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        });
    }

    let aux_server = {
        let shutdown = shutdown.clone();
        let aux_data_address = app_config.aux_data_address.clone();
        let router = router(responder_state.clone());
        tokio::spawn(async move {
            let listener = match TcpListener::bind(&aux_data_address).await {
                Ok(listener) => listener,
                Err(err) => {
                    error!(%err, address = %aux_data_address, "failed to bind aux-data HTTP listener");
                    return;
                },
            };
            info!(address = %aux_data_address, "aux-data HTTP responder listening");
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                shutdown.cancelled().await;
            });
            if let Err(err) = serve.await {
                error!(%err, "aux-data HTTP responder failed");
            }
        })
    };

    let playout_id = Arc::new(AtomicU32::new(0));
    let callbacks = ServerCallbacks {
        set_playout_id: {
            let emitter = emitter.clone();
            let playout_id = playout_id.clone();
            Arc::new(move |id| {
                playout_id.store(id, Ordering::SeqCst);
                emitter.set_playout_id(id);
            })
        },
        is_processor_ready: {
            let emitter = emitter.clone();
            Arc::new(move || emitter.state() != EmitterState::NoData)
        },
    };

    let resource_url = format!("http://{}/", app_config.aux_data_address);
    let listener = match TcpListener::bind(&app_config.dcs_address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, address = %app_config.dcs_address, "failed to bind DCS listener");
            std::process::exit(1);
        },
    };
    info!(address = %app_config.dcs_address, "DCS control channel listening");

    emitter.play();

    // A single DCS client session at a time (§1 non-goal: no multi-tenant
    // dispatch); the next `accept` simply waits for the previous peer to
    // disconnect.
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let Ok((stream, peer)) = accepted else { continue };
                info!(%peer, "DCS peer connected");
                let dcs_state = ObservableState::new(DcsState::Disconnected);
                if let Err(err) = run_server_session(stream, resource_url.clone(), &callbacks, &dcs_state).await {
                    warn!(%err, %peer, "DCS session ended with an error");
                }
            }
        }
    }

    emitter.shutdown();
    shutdown.cancel();
    let _ = aux_server.await;
}
