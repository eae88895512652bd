mod config;
mod error;
mod handshake;
mod input;
mod screen;
mod session;
mod shared_state;
mod shutdown;
mod sync;
#[cfg(test)]
mod test_support;
mod tick;
mod transport;

use std::{
    fs::OpenOptions,
    io::{stdin, stdout},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::{Env, Target};
use log::{error, info};
use rand::{rngs::StdRng, SeedableRng};
use shared::{difficulty::Difficulty, DEFAULT_PORT};

use config::{prompt_settings, SessionConfig};
use error::{AtSite, SessionError, Site};
use input::Keyboard;
use screen::{TerminalGuard, TerminalScreen};
use session::{Outcome, Peer};

#[derive(Parser)]
#[command(name = "netpong")]
#[command(about = "Two player pong straight between two terminals")]
struct Cli {
    /// Where to write the log [default: netpong-host.log or netpong-guest.log]
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Start,
}

#[derive(Subcommand)]
enum Start {
    /// Wait for a challenger and pick the settings
    Host {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// easy, medium or hard. asked for when left out
        #[arg(short, long)]
        difficulty: Option<Difficulty>,
        /// Rounds to play. asked for when left out
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        rounds: Option<u32>,
    },
    /// Challenge a waiting host
    Join {
        host: String,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_file = cli.log_file.clone().unwrap_or_else(|| {
        PathBuf::from(match cli.command {
            Start::Host { .. } => "netpong-host.log",
            Start::Join { .. } => "netpong-guest.log",
        })
    });
    if let Err(err) = init_logging(&log_file) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }
    match play(cli.command) {
        Ok(outcome) => {
            info!("finished as {:?}: {outcome}", outcome.role);
            println!("{outcome}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            eprintln!("{err:#}");
            let code = err
                .downcast_ref::<SessionError>()
                .map_or(1, SessionError::exit_code);
            ExitCode::from(code)
        }
    }
}

/// the terminal belongs to the game, so logs go to a file.
fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn play(command: Start) -> anyhow::Result<Outcome> {
    let mut config = SessionConfig::default();
    let established = match command {
        Start::Host {
            port,
            difficulty,
            rounds,
        } => {
            let (difficulty, round_limit) =
                prompt_settings(&mut stdin().lock(), &mut stdout(), difficulty, rounds)
                    .at(Site::ReadInput)?;
            let socket = handshake::bind_host(port)?;
            println!("waiting for a challenger on port {port}");
            handshake::accept(socket, difficulty, round_limit)?
        }
        Start::Join { host, port } => {
            println!("challenging {host}:{port}");
            handshake::join(&host, port, config.peer_timeout)?
        }
    };
    info!(
        "playing {} as {:?}",
        established.peer_addr, established.role
    );
    config.difficulty = established.difficulty;
    config.round_limit = established.round_limit;
    established
        .socket
        .set_read_timeout(Some(config.recv_timeout))
        .at(Site::CreateSocket)?;
    let peer = Arc::new(Peer::new(established.role, established.socket, config));

    let guard = TerminalGuard::enter().context("failed to prepare the terminal")?;
    let screen = TerminalScreen::new().context("failed to measure the terminal")?;
    let outcome = session::run(peer, screen, Keyboard, StdRng::from_entropy());
    drop(guard);
    Ok(outcome?)
}
