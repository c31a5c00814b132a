//
// Copyright (c) 2026 CryptVault Contributors
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptvault — authenticated, encrypted personal file storage over TCP.
//

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::net::TcpStream;
use tokio::signal;

use cryptvault_core::commands::{self, Outcome};
use cryptvault_core::constants::SEQ_WRAP_GUARD;
use cryptvault_core::handshake;

#[derive(Parser, Debug)]
#[command(name = "cryptvault-client", version, about = "CryptVault storage client")]
struct Args {
    /// Server address, `host:port`. Falls back to CLOUD_HOST/CLOUD_PORT,
    /// then to 127.0.0.1:8080.
    #[arg(long)]
    server: Option<String>,

    /// Username to authenticate as.
    #[arg(long)]
    username: String,

    /// 64-hex-char pre-shared secret. Falls back to CRYPTVAULT_PSK.
    #[arg(long, env = "CRYPTVAULT_PSK", hide_env_values = true)]
    psk_hex: String,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn resolve_server_addr(args: &Args) -> Result<String> {
    if let Some(server) = &args.server {
        return Ok(server.clone());
    }
    let host = std::env::var("CLOUD_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("CLOUD_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);
    Ok(format!("{host}:{port}"))
}

fn parse_psk(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim()).context("--psk-hex is not valid hex")?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("--psk-hex must decode to exactly 32 bytes"))
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_menu() {
    println!("Actions:");
    println!("    list     - List your files");
    println!("    upload   - Upload a new file");
    println!("    download - Download a file");
    println!("    rename   - Rename a file");
    println!("    delete   - Delete a file");
    println!("    exit     - Terminate current session");
    print!("> ");
    std::io::stdout().flush().ok();
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("[ERR] {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let psk = parse_psk(&args.psk_hex)?;
    let addr = resolve_server_addr(&args)?;

    let mut stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    println!("[CLI] connected to {addr}");

    let mut session = handshake::client_handshake(&mut stream, &args.username, &psk)
        .await
        .context("authentication failed")?;
    println!("[CLI] authenticated as {}", args.username);
    if args.verbose {
        println!("[CLI] session seq initialized to {}", session.seq());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            signal::ctrl_c().await.expect("failed to listen for ctrl-c");
            shutdown.store(true, Ordering::Relaxed);
        });
    }

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        // spec.md §3: the client must initiate Logout before issuing another
        // command once seq reaches the wrap guard, rather than relying on
        // the session layer's reactive SeqWrap error.
        if session.seq() >= SEQ_WRAP_GUARD {
            println!("[CLI] sequence counter reached its limit, logging out");
            break;
        }

        print_menu();

        let mut action = String::new();
        if std::io::stdin().read_line(&mut action).is_err() {
            println!("error reading input");
            continue;
        }
        let action = action.trim();

        let outcome = match action {
            "list" => match commands::list::client(&mut session, &mut stream).await {
                Ok(listing) => {
                    println!("{listing}");
                    continue;
                }
                Err(e) => Err(e),
            },
            "upload" => run_upload(&mut session, &mut stream, &shutdown).await,
            "download" => run_download(&mut session, &mut stream, &shutdown).await,
            "rename" => run_rename(&mut session, &mut stream).await,
            "delete" => run_delete(&mut session, &mut stream).await,
            "exit" => break,
            "" => continue,
            _ => {
                println!("invalid action");
                continue;
            }
        };

        match outcome {
            Ok(Outcome::Status(s)) | Ok(Outcome::PeerError(s)) => println!("{s}"),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => println!("error: {e}"),
        }
    }

    // spec.md §4.6: a send failure during logout is swallowed after the
    // session's key material is zeroized (on drop), not surfaced as fatal.
    match commands::logout::client(&mut session, &mut stream).await {
        Ok(()) => println!("[CLI] logged out"),
        Err(e) => println!("[CLI] logout send failed, closing anyway: {e}"),
    }
    Ok(())
}

async fn run_upload(
    session: &mut cryptvault_core::Session,
    stream: &mut TcpStream,
    shutdown: &AtomicBool,
) -> cryptvault_core::Result<Outcome> {
    let path = match prompt("local file to upload: ") {
        Ok(p) => PathBuf::from(p),
        Err(_) => return Ok(Outcome::PeerError("could not read path".into())),
    };
    let remote_name = match prompt("remote name: ") {
        Ok(n) => n,
        Err(_) => return Ok(Outcome::PeerError("could not read name".into())),
    };
    let mut file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) => return Ok(Outcome::PeerError(format!("cannot open {path:?}: {e}"))),
    };
    commands::upload::client(session, stream, &remote_name, &mut file, shutdown).await
}

async fn run_download(
    session: &mut cryptvault_core::Session,
    stream: &mut TcpStream,
    shutdown: &AtomicBool,
) -> cryptvault_core::Result<Outcome> {
    let remote_name = match prompt("remote name: ") {
        Ok(n) => n,
        Err(_) => return Ok(Outcome::PeerError("could not read name".into())),
    };
    let dest = match prompt("save as: ") {
        Ok(p) => PathBuf::from(p),
        Err(_) => return Ok(Outcome::PeerError("could not read destination".into())),
    };
    commands::download::client(session, stream, &remote_name, &dest, shutdown).await
}

async fn run_rename(
    session: &mut cryptvault_core::Session,
    stream: &mut TcpStream,
) -> cryptvault_core::Result<Outcome> {
    let old_name = match prompt("current name: ") {
        Ok(n) => n,
        Err(_) => return Ok(Outcome::PeerError("could not read name".into())),
    };
    let new_name = match prompt("new name: ") {
        Ok(n) => n,
        Err(_) => return Ok(Outcome::PeerError("could not read name".into())),
    };
    commands::rename::client(session, stream, &old_name, &new_name).await
}

async fn run_delete(
    session: &mut cryptvault_core::Session,
    stream: &mut TcpStream,
) -> cryptvault_core::Result<Outcome> {
    let name = match prompt("file to delete: ") {
        Ok(n) => n,
        Err(_) => return Ok(Outcome::PeerError("could not read name".into())),
    };
    let prompt_outcome = commands::delete::client_request(session, stream, &name).await?;
    if let Outcome::PeerError(_) = prompt_outcome {
        return Ok(prompt_outcome);
    }
    println!("{}", prompt_outcome.message());
    let answer = prompt("confirm (y/n): ").unwrap_or_else(|_| "n".to_string());
    commands::delete::client_confirm(session, stream, &answer).await
}
