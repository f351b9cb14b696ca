//! Silt indexer daemon.
//!
//! Opens the primary ledger archive and the derived store, catches up on
//! finalized blocks the consensus engine has written, keeps tailing for new
//! ones, and serves the HTTP query API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use silt_api::{router, ApiConfig, AppState, HttpChannel, PeerChannel};
use silt_core::crypto::PrivateKey;
use silt_core::error::SiltError;
use silt_digest::{ArchiveStore, DigestConfig, DigestStore, Digester, RetryPolicy};

/// Blocks enqueued per digest call while catching up.
const CATCH_UP_CHUNK: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "silt-indexd", about = "Silt ledger indexer and query API")]
struct Args {
    /// Root directory for persistent data.
    #[arg(long, default_value = "./silt")]
    data_dir: PathBuf,

    /// Socket address for the HTTP API.
    #[arg(long, default_value = "127.0.0.1:54320")]
    bind: String,

    /// Network id mixed into envelope signatures.
    #[arg(long, default_value = "silt-main")]
    network_id: String,

    /// Hex-encoded node private key; an ephemeral key is generated when
    /// omitted.
    #[arg(long)]
    node_key: Option<String>,

    /// Peer channel endpoint for envelope distribution; repeatable.
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Serve queries only; never digest new blocks.
    #[arg(long)]
    readonly: bool,

    /// Seconds between catch-up polls of the primary store.
    #[arg(long, default_value_t = 3)]
    poll_interval: u64,

    /// Log level filter (e.g. "info", "silt_digest=debug").
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .init();

    let digest_config = DigestConfig {
        data_dir: args.data_dir.clone(),
        readonly: args.readonly,
        retry: RetryPolicy::default(),
    };

    let archive = Arc::new(ArchiveStore::open(digest_config.archive_path())?);
    let store = if args.readonly {
        DigestStore::open_readonly(digest_config.digest_path(), archive)?
    } else {
        DigestStore::open(digest_config.digest_path(), archive)?
    };
    let store = Arc::new(store);
    store.initialize()?;
    info!(last_block = %store.last_block(), readonly = args.readonly, "digest store initialized");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Report consumer: every digestion attempt outcome gets logged here so
    // a stuck block is visible without stopping the daemon.
    let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            if let Some(e) = report.error {
                warn!(height = %report.height, error = %e, "digestion attempt failed");
            }
        }
    });

    let catchup_handle = if args.readonly {
        None
    } else {
        let digester = Digester::start(
            Arc::clone(&store),
            digest_config.retry.clone(),
            Some(report_tx),
        );
        let store = Arc::clone(&store);
        let mut shutdown_rx = shutdown_rx.clone();
        let poll = Duration::from_secs(args.poll_interval.max(1));
        Some(tokio::spawn(async move {
            loop {
                if let Err(e) = catch_up(&store, &digester).await {
                    warn!(error = %e, "catch-up pass failed");
                }
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        digester.shutdown().await;
                        break;
                    }
                    _ = tokio::time::sleep(poll) => {}
                }
            }
        }))
    };

    let node_key = match &args.node_key {
        Some(hex) => PrivateKey::from_hex(hex)?,
        None => {
            info!("no node key given; generating an ephemeral one");
            PrivateKey::generate()
        }
    };
    let channels: Vec<Arc<dyn PeerChannel>> = args
        .peers
        .iter()
        .map(|p| Arc::new(HttpChannel::new(p.clone())) as Arc<dyn PeerChannel>)
        .collect();
    let api_config = ApiConfig {
        bind: args.bind.clone(),
        network_id: args.network_id.clone(),
        ..ApiConfig::default()
    };
    let state = AppState::new(Arc::clone(&store), api_config, node_key, channels);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!(bind = %args.bind, "API listening");

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    tokio::select! {
        result = server => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            let _ = shutdown_tx.send(true);
            if let Some(handle) = catchup_handle {
                let _ = handle.await;
            }
        }
    }

    Ok(())
}

/// Enqueue every finalized block past the marker, in chunks so the bounded
/// queue's back-pressure is felt early.
async fn catch_up(store: &Arc<DigestStore>, digester: &Digester) -> Result<(), SiltError> {
    let primary = store.primary();
    let tip = primary.tip_height()?;
    let mut next = store.last_block().next();
    let mut blocks = Vec::new();

    while next <= tip {
        match primary.block_by_height(next)? {
            Some(block) => blocks.push(block),
            // A gap means the engine has not written this height yet.
            None => break,
        }
        next = next.next();
        if blocks.len() >= CATCH_UP_CHUNK {
            digester.digest(std::mem::take(&mut blocks)).await?;
        }
    }
    if !blocks.is_empty() {
        digester.digest(blocks).await?;
    }
    Ok(())
}
