//! Session orchestration: one peer running both roles.
//!
//! ```text
//! new():  hash directory -> load TLS material
//! run():  bind server --ready--> [start delay] --> spawn client
//!                                                    |
//!            client failed: cancel server, join, return error
//!            client done:   serve until the session limit, linger or
//!                           Ctrl-C, then cancel server and join
//! ```

use std::future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use commonhash_core::Manifest;
use commonhash_sync::{ClientReport, ManifestClient, ManifestServer, ServeReport, ServerError};
use commonhash_tls::{ChannelAcceptor, ChannelConnector};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PeerConfig;
use crate::error::Result;

/// Outcome of a completed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Files in the local manifest.
    pub local_files: usize,
    pub listen_addr: SocketAddr,
    pub client: ClientReport,
    pub server: ServeReport,
}

/// A peer with its manifest built and TLS material loaded.
pub struct PeerSession {
    config: PeerConfig,
    manifest: Arc<Manifest>,
    acceptor: ChannelAcceptor,
    connector: ChannelConnector,
    ready: Option<oneshot::Sender<SocketAddr>>,
}

impl PeerSession {
    /// Hash the configured directory and load TLS material. Nothing touches
    /// the network until [`run`](Self::run).
    pub fn new(config: PeerConfig) -> Result<Self> {
        let manifest = config.manifest_builder().build(&config.directory)?;
        info!(
            directory = %config.directory.display(),
            files = manifest.len(),
            algorithm = %manifest.algorithm(),
            "manifest built"
        );

        let acceptor =
            ChannelAcceptor::new(&config.tls, config.client_auth, config.handshake_timeout)?;
        let connector =
            ChannelConnector::new(&config.tls, config.client_auth, config.handshake_timeout)?;

        Ok(Self {
            config,
            manifest: Arc::new(manifest),
            acceptor,
            connector,
            ready: None,
        })
    }

    /// Send the bound listen address on `ready` once peers can connect.
    pub fn notify_ready(mut self, ready: oneshot::Sender<SocketAddr>) -> Self {
        self.ready = Some(ready);
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Run both roles to completion.
    pub async fn run(self) -> Result<SessionReport> {
        let PeerSession {
            config,
            manifest,
            acceptor,
            connector,
            ready,
        } = self;

        let server =
            ManifestServer::bind(config.server_config(), manifest.clone(), acceptor).await?;
        let listen_addr = server
            .local_addr()
            .map_err(|source| ServerError::Bind {
                addr: config.listen_addr(),
                source,
            })?;

        let shutdown = CancellationToken::new();
        let mut server_task = tokio::spawn(server.serve(shutdown.clone()));
        if let Some(ready) = ready {
            // The receiver may have stopped caring.
            let _ = ready.send(listen_addr);
        }
        info!(%listen_addr, "ready for peers");

        if !config.start_delay.is_zero() {
            tokio::time::sleep(config.start_delay).await;
        }

        let client = ManifestClient::new(config.client_config(), manifest.clone(), connector);
        let client_task = tokio::spawn(async move { client.run().await });

        let client = match client_task.await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                warn!(error = %e, phase = %e.phase(), "client failed, stopping server");
                stop_server(server_task, &shutdown).await?;
                return Err(e.into());
            }
            Err(e) => {
                stop_server(server_task, &shutdown).await?;
                return Err(e.into());
            }
        };

        let finished = tokio::select! {
            joined = &mut server_task => Some(joined?),
            _ = linger(config.linger) => {
                info!("linger elapsed, stopping server");
                None
            }
            _ = interrupted() => {
                info!("interrupted, stopping server");
                None
            }
        };
        let server = match finished {
            Some(report) => report,
            None => stop_server(server_task, &shutdown).await?,
        };

        Ok(SessionReport {
            local_files: manifest.len(),
            listen_addr,
            client,
            server,
        })
    }
}

async fn stop_server(
    task: JoinHandle<ServeReport>,
    shutdown: &CancellationToken,
) -> Result<ServeReport> {
    shutdown.cancel();
    Ok(task.await?)
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        future::pending::<()>().await;
    }
}

async fn linger(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => future::pending().await,
    }
}
