//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::{broadcast, Mutex};

use cryptvault_core::dispatcher;
use cryptvault_core::storage::{self, UserStorage};

#[derive(Parser, Debug)]
#[command(name = "cryptvault-server", version, about = "CryptVault storage server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Storage root directory (overridden by CLOUD_STORAGE).
    #[arg(long, env = "CLOUD_STORAGE", default_value = "server/storage")]
    storage: PathBuf,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Per-username login lock shared across all connections (spec.md §5, §4.8).
type ActiveUsers = Arc<Mutex<HashSet<String>>>;

/// RAII-ish guard releasing the per-username lock; storage mutation is
/// synchronous so the release itself does not need to be async.
struct UserLockGuard {
    active: ActiveUsers,
    username: String,
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        let active = self.active.clone();
        let username = self.username.clone();
        tokio::spawn(async move {
            active.lock().await.remove(&username);
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::fs::create_dir_all(&args.storage)
        .with_context(|| format!("failed to create storage root {:?}", args.storage))?;

    let swept = storage::sweep_temp_files(&args.storage)
        .await
        .context("failed to sweep leftover upload temp files")?;
    if swept > 0 {
        println!("[SRV] swept {swept} leftover upload temp file(s)");
    }

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind to {}", args.listen))?;
    println!("[SRV] cryptvault server listening on {}", args.listen);

    let storage_root = args.storage.clone();
    let active_users: ActiveUsers = Arc::new(Mutex::new(HashSet::new()));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let shutdown_listener = shutdown_tx.clone();
    tokio::spawn(async move {
        signal::ctrl_c().await.expect("failed to listen for ctrl-c");
        println!("\n[SRV] shutdown signal received, draining connections...");
        let _ = shutdown_listener.send(());
    });

    let mut connection_id: u64 = 0;
    let mut active_connections = Vec::new();
    let mut shutdown_rx = shutdown_tx.subscribe();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection_id += 1;
                        println!("[CONN] connection #{connection_id} from {peer_addr}");

                        let storage_root = storage_root.clone();
                        let active_users = active_users.clone();
                        let verbose = args.verbose;

                        let handle = tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, storage_root, active_users, verbose).await
                            {
                                eprintln!("[ERR] connection #{connection_id} error: {e:#}");
                            } else {
                                println!("[OK] connection #{connection_id} completed");
                            }
                        });
                        active_connections.push(handle);
                    }
                    Err(e) => {
                        eprintln!("[ERR] failed to accept connection: {e}");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                println!("[SRV] graceful shutdown initiated");
                break;
            }
        }
    }

    println!(
        "[SRV] waiting for {} active connection(s) to complete",
        active_connections.len()
    );
    for handle in active_connections {
        let _ = handle.await;
    }
    println!("[SRV] server shutdown complete");
    Ok(())
}

async fn handle_connection(
    mut stream: TcpStream,
    storage_root: PathBuf,
    active_users: ActiveUsers,
    verbose: bool,
) -> Result<()> {
    use cryptvault_core::handshake;

    let auth_start = handshake::read_auth_start(&mut stream).await?;
    let username = auth_start.username.clone();

    // The per-username lock is acquired before AuthAck (spec.md §3: a
    // collision causes `accepted = false` and the handshake stops short of
    // AuthEnd), not after the handshake completes.
    let already_locked = {
        let mut active = active_users.lock().await;
        !active.insert(username.clone())
    };
    let _lock_guard = if already_locked {
        None
    } else {
        Some(UserLockGuard {
            active: active_users.clone(),
            username: username.clone(),
        })
    };

    let psk = if already_locked {
        None
    } else {
        storage::load_psk(&storage_root, &username).await
    };

    let handshake_result = handshake::complete_server_handshake(&mut stream, auth_start, psk).await;

    let handshake::ServerHandshake { mut session, .. } = match handshake_result {
        Ok(h) => h,
        Err(e) => {
            if already_locked {
                eprintln!("[AUTH] rejected concurrent login for {username}");
            } else {
                eprintln!("[AUTH] handshake failed for {username}: {e}");
            }
            return Ok(());
        }
    };

    if verbose {
        println!("[AUTH] {username} authenticated");
    }

    let user_storage = UserStorage::open(&storage_root, &username).await?;
    let result = dispatcher::run(&mut session, &mut stream, &user_storage).await;

    match &result {
        Ok(()) => {
            if verbose {
                println!("[SRV] {username} logged out cleanly");
            }
        }
        Err(e) => {
            eprintln!("[ERR] session with {username} ended: {e}");
        }
    }

    Ok(result?)
}
