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

//! Implements the server configuration file.

use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use quickroot::io::BlockingIoConfig;
use quickroot::loader::LoaderConfig;
use quickroot::name::Name;

use crate::args::RunArgs;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads the server configuration from the file given by `path`.
///
/// A relative zone file path is interpreted relative to the directory
/// containing the configuration file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let dir = match path.as_ref().parent() {
        Some(p) => p,
        None => return Err(anyhow!("the configuration file path has no parent")),
    };
    let raw_config = fs::read(path.as_ref()).context("failed to read the configuration file")?;
    let mut config: Config =
        toml::from_slice(&raw_config).context("failed to parse the configuration file")?;
    if config.zone.path.is_relative() {
        config.zone.path = dir.join(&config.zone.path);
    }
    log_config_summary(&config);
    Ok(config)
}

/// Loads the server configuration from the parsed command line
/// arguments given by `args`.
pub fn load_from_args(args: RunArgs) -> Result<Config> {
    let bind = args.bind.unwrap_or_else(|| {
        let ip = args.ip.unwrap_or(DEFAULT_BIND_IP);
        let port = args.port.unwrap_or(DEFAULT_BIND_PORT);
        SocketAddr::new(ip, port)
    });

    let mut io = IoConfig::default();
    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err(anyhow!("the thread count must be at least 1"));
        }
        io.udp_workers = threads;
        io.tcp_workers = threads;
    }

    let config = Config {
        bind,
        zone: ZoneConfig {
            path: args
                .zone_file
                .ok_or_else(|| anyhow!("no zone file was given"))?,
            origin: args.origin.map_or_else(default_origin, ConfigName),
            compress: !args.no_compress,
            reload_interval: args
                .reload_interval
                .unwrap_or_else(default_reload_interval),
        },
        io,
    };
    log_config_summary(&config);
    Ok(config)
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
fn log_config_summary(config: &Config) {
    if !log_enabled!(Debug) {
        return;
    }
    debug!(
        "Configuration loaded:\n\
         Bind address:    {}\n\
         Zone file:       {}\n\
         Origin:          {}\n\
         Compression:     {}\n\
         Reload interval: {}\n\
         Workers:         {} UDP, {} TCP",
        config.bind,
        config.zone.path.display(),
        config.zone.origin.0,
        if config.zone.compress { "enabled" } else { "disabled" },
        if config.zone.reload_interval == 0 {
            "disabled".to_owned()
        } else {
            format!("{} s", config.zone.reload_interval)
        },
        config.io.udp_workers,
        config.io.tcp_workers,
    );
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    pub zone: ZoneConfig,
    #[serde(default)]
    pub io: IoConfig,
}

const DEFAULT_BIND_IP: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);
const DEFAULT_BIND_PORT: u16 = 53;

fn default_bind() -> SocketAddr {
    SocketAddr::new(DEFAULT_BIND_IP, DEFAULT_BIND_PORT)
}

impl Config {
    /// Returns the [`LoaderConfig`] for the configured zone.
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            path: self.zone.path.clone(),
            origin: self.zone.origin.0.clone(),
            compress: self.zone.compress,
            reload_interval: Duration::from_secs(self.zone.reload_interval),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: ZONE                                        //
////////////////////////////////////////////////////////////////////////

/// The configuration of the served zone.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneConfig {
    pub path: PathBuf,
    #[serde(default = "default_origin")]
    pub origin: ConfigName,
    #[serde(default = "default_compress")]
    pub compress: bool,
    #[serde(default = "default_reload_interval")]
    pub reload_interval: u64,
}

fn default_origin() -> ConfigName {
    ConfigName(Name::root().clone())
}

fn default_compress() -> bool {
    true
}

fn default_reload_interval() -> u64 {
    1
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: I/O                                         //
////////////////////////////////////////////////////////////////////////

/// Configuration for the blocking I/O provider. This mirrors
/// [`BlockingIoConfig`] and can be converted into one; its purpose is
/// to make the configuration deserializable and to provide defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    #[serde(default = "default_udp_workers")]
    pub udp_workers: usize,
    #[serde(default = "default_tcp_workers")]
    pub tcp_workers: usize,
    #[serde(default = "default_tcp_backlog")]
    pub tcp_backlog: usize,
}

fn default_udp_workers() -> usize {
    BlockingIoConfig::default().udp_workers_per_socket
}

fn default_tcp_workers() -> usize {
    BlockingIoConfig::default().tcp_workers
}

fn default_tcp_backlog() -> usize {
    BlockingIoConfig::default().tcp_backlog
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            udp_workers: default_udp_workers(),
            tcp_workers: default_tcp_workers(),
            tcp_backlog: default_tcp_backlog(),
        }
    }
}

impl From<&IoConfig> for BlockingIoConfig {
    fn from(toml_config: &IoConfig) -> Self {
        Self {
            udp_workers_per_socket: toml_config.udp_workers,
            tcp_workers: toml_config.tcp_workers,
            tcp_backlog: toml_config.tcp_backlog,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER QUICKROOT TYPES FOR SERDE                            //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type
/// from [`quickroot`], using its [`FromStr`](std::str::FromStr)
/// implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper over a [`quickroot`]
        /// type.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigName, Name, "domain name");
