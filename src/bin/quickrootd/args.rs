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

//! Implements command-line argument parsing.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

use quickroot::name::Name;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// The Quickroot authoritative DNS server for the root zone
#[derive(Debug, Parser)]
#[command(author, version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the server
    Run(RunArgs),
}

#[derive(Debug, Parser)]
#[command(group(ArgGroup::new("source").required(true).args(["config", "zone_file"])))]
pub struct RunArgs {
    /// Set the configuration file to use
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = [
            "zone_file",
            "origin",
            "bind",
            "ip",
            "port",
            "threads",
            "no_compress",
            "reload_interval",
        ]
    )]
    pub config: Option<PathBuf>,

    /// Set the zone file to serve
    #[arg(short = 'f', long, value_name = "FILE")]
    pub zone_file: Option<PathBuf>,

    /// Set the origin of the zone file
    #[arg(long, value_name = "NAME")]
    pub origin: Option<Name>,

    /// Set the server bind IP address and port
    #[arg(long, value_name = "IP:PORT")]
    pub bind: Option<SocketAddr>,

    /// Set the server bind IP address
    #[arg(short = 's', long, conflicts_with = "bind", value_name = "IP")]
    pub ip: Option<IpAddr>,

    /// Set the server port
    #[arg(short = 'p', long, conflicts_with = "bind", value_name = "PORT")]
    pub port: Option<u16>,

    /// Set the number of worker threads per transport
    #[arg(short = 'T', long, value_name = "COUNT")]
    pub threads: Option<usize>,

    /// Disable name compression in answers
    #[arg(short = 'C', long)]
    pub no_compress: bool,

    /// Set how often to check the zone file for changes, in seconds
    /// (0 disables checking)
    #[arg(long, value_name = "SECONDS")]
    pub reload_interval: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn run_accepts_short_options() {
        let args = Args::try_parse_from([
            "quickrootd", "run", "-f", "root.zone", "-s", "127.0.0.1", "-p", "5353", "-T", "8",
            "-C",
        ])
        .unwrap();
        let Command::Run(run_args) = args.command;
        assert_eq!(run_args.zone_file, Some(PathBuf::from("root.zone")));
        assert_eq!(run_args.ip, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(run_args.port, Some(5353));
        assert_eq!(run_args.threads, Some(8));
        assert!(run_args.no_compress);
    }

    #[test]
    fn run_requires_a_zone_source() {
        assert!(Args::try_parse_from(["quickrootd", "run"]).is_err());
    }

    #[test]
    fn config_conflicts_with_zone_options() {
        assert!(Args::try_parse_from([
            "quickrootd", "run", "--config", "quickroot.toml", "-f", "root.zone",
        ])
        .is_err());
    }

    #[test]
    fn bind_conflicts_with_ip() {
        assert!(Args::try_parse_from([
            "quickrootd", "run", "-f", "root.zone", "--bind", "[::1]:53", "--ip", "::1",
        ])
        .is_err());
    }
}
