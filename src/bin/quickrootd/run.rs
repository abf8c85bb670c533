// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the `run` command (i.e., running the server).

use std::fmt::Write;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use quickroot::index::SharedIndex;
use quickroot::io::BlockingIoProvider;
use quickroot::loader::Loader;
use quickroot::server::{Server, Transport};
use quickroot::thread::ThreadGroup;

use crate::args::RunArgs;
use crate::config;

/// Runs the server.
pub fn run(args: RunArgs) {
    env_logger::init_from_env(Env::new().default_filter_or("info"));

    if let Err(e) = try_running(args) {
        error!("{}", format_error_chain("Failed to run:", &e));
        process::exit(1);
    }
    info!("Exiting with success.");
}

fn try_running(run_args: RunArgs) -> Result<()> {
    info!(
        "Quickroot daemon v{}.{}.{} starting.",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    );

    let config = if let Some(ref config_path) = run_args.config {
        info!("Loading the configuration from {}.", config_path.display());
        config::load_from_path(config_path).context("failed to load the configuration")?
    } else {
        info!("Loading the configuration from the command line.");
        config::load_from_args(run_args).context("failed to load the configuration")?
    };

    // Bind before loading the zone: building the answers for a large
    // zone takes a while, and a taken port should fail fast.
    let io_provider = BlockingIoProvider::bind((&config.io).into(), [config.bind], [config.bind])
        .context("failed to bind sockets")?;
    for (transport, addr) in io_provider
        .local_addrs()
        .context("failed to read the bound addresses")?
    {
        let transport = match transport {
            Transport::Tcp => "TCP",
            Transport::Udp => "UDP",
        };
        info!("Bound {} on {}.", transport, addr);
    }

    let index = Arc::new(SharedIndex::new());
    let loader = Arc::new(Loader::new(config.loader_config(), index.clone()));
    loader.load().with_context(|| {
        format!(
            "failed to load the zone from {}",
            config.zone.path.display()
        )
    })?;
    let server = Arc::new(Server::new(index));

    let mut signals = set_up_signal_handling().context("failed to set up signal handling")?;

    info!("Set-up is complete; starting the server.");
    let thread_group = ThreadGroup::new();
    io_provider
        .start(&server, &thread_group)
        .context("failed to start the I/O provider")?;
    {
        let loader = loader.clone();
        let group = thread_group.clone();
        thread_group
            .start_respawnable("zone loader".to_owned(), move || loader.run(&group))
            .context("failed to start the zone loader")?;
    }

    for signal in signals.forever() {
        match signal {
            SIGINT => {
                info!("Received SIGINT; shutting down.");
                break;
            }
            SIGTERM => {
                info!("Received SIGTERM; shutting down.");
                break;
            }
            SIGHUP => {
                info!("Received SIGHUP; reloading the zone.");
                loader.request_reload();
            }
            _ => unreachable!(),
        }
    }

    // Without graceful shutdown support, listeners may sit in accept
    // forever, so just exit.
    if BlockingIoProvider::SUPPORTS_GRACEFUL_SHUTDOWN {
        thread_group.shut_down();
        thread_group.await_shutdown();
        info!("Shutdown complete.");
    }
    Ok(())
}

fn set_up_signal_handling() -> Result<Signals> {
    let all_signals = &[SIGHUP, SIGINT, SIGTERM];
    let term_signals = &[SIGINT, SIGTERM];
    let already_terminating = Arc::new(AtomicBool::new(false));

    // A second termination signal exits immediately, even if graceful
    // shutdown is still in progress.
    for sig in term_signals {
        signal_hook::flag::register_conditional_shutdown(*sig, 1, already_terminating.clone())?;
        signal_hook::flag::register(*sig, already_terminating.clone())?;
    }

    Signals::new(all_signals).map_err(Into::into)
}

/// Formats an error and its causes as a numbered list under `heading`.
fn format_error_chain(heading: &str, e: &anyhow::Error) -> String {
    let mut message = String::from(heading);
    for (i, cause) in e.chain().enumerate() {
        let _ = write!(message, "\n[{}] {}", i + 1, cause);
    }
    message.push_str("\nExiting with failure.");
    message
}
