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

//! Loading and reloading of the served zone.
//!
//! A [`Loader`] parses the zone file, builds a [`ZoneIndex`] from it,
//! and publishes the index in a [`SharedIndex`]. Run on its own thread
//! (see [`Loader::run`]), it reloads the zone whenever the file's
//! modification time changes or a reload is requested (the daemon
//! requests one on SIGHUP). A zone that fails to load is never
//! published: the previous generation keeps being served.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use log::{debug, error, info};

use crate::answer;
use crate::index::{SharedIndex, ZoneIndex};
use crate::name::Name;
use crate::thread::ThreadGroup;
use crate::zone::{LoadError, Zone};

/// The longest [`Loader::run`] sleeps before checking for shutdown or
/// a requested reload.
const TICK: Duration = Duration::from_millis(100);

/// What to load, and how.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoaderConfig {
    pub path: PathBuf,
    pub origin: Name,

    /// Whether answers use name compression.
    pub compress: bool,

    /// How often to check the file for changes. Zero disables checking;
    /// the zone is then only reloaded on request.
    pub reload_interval: Duration,
}

/// Facts about a successfully loaded zone.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoadSummary {
    pub serial: Option<u32>,
    pub names: usize,
}

/// Loads the zone described by a [`LoaderConfig`] into a
/// [`SharedIndex`].
pub struct Loader {
    config: LoaderConfig,
    index: Arc<SharedIndex>,
    reload_requested: Arc<AtomicBool>,

    /// The modification time of the file at the last load attempt.
    last_seen: Mutex<Option<SystemTime>>,
}

impl Loader {
    pub fn new(config: LoaderConfig, index: Arc<SharedIndex>) -> Self {
        Self {
            config,
            index,
            reload_requested: Arc::new(AtomicBool::new(false)),
            last_seen: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Returns the flag that requests a reload when set. It is shared
    /// so that signal handlers can set it directly.
    pub fn reload_flag(&self) -> Arc<AtomicBool> {
        self.reload_requested.clone()
    }

    pub fn request_reload(&self) {
        self.reload_requested.store(true, Ordering::Relaxed);
    }

    /// Loads the zone and publishes it. On failure, nothing is
    /// published.
    pub fn load(&self) -> Result<LoadSummary, Error> {
        let started = Instant::now();
        let modified = self.modified();
        *self.last_seen.lock().unwrap_or_else(|p| p.into_inner()) = modified;

        let zone = Zone::load_from_path(&self.config.path, &self.config.origin)?;
        let index = ZoneIndex::build(&zone, self.config.compress)?;
        let summary = LoadSummary {
            serial: index.serial(),
            names: index.len(),
        };
        self.index.publish(index);

        info!(
            "Loaded zone {} from {} (serial {}, {} names) in {} ms.",
            self.config.origin,
            self.config.path.display(),
            summary.serial.map_or_else(|| "unknown".to_owned(), |s| s.to_string()),
            summary.names,
            started.elapsed().as_millis(),
        );
        Ok(summary)
    }

    /// Reloads the zone if a reload was requested or the file has
    /// changed since the last attempt. Returns whether a reload was
    /// attempted; failures are logged.
    pub fn poll(&self) -> bool {
        let requested = self.reload_requested.swap(false, Ordering::Relaxed);
        let modified = self.modified();
        let changed = modified.is_some()
            && modified != *self.last_seen.lock().unwrap_or_else(|p| p.into_inner());
        if !requested && !changed {
            return false;
        }

        if requested {
            info!("Reloading zone {} on request.", self.config.origin);
        } else {
            info!("Zone file {} changed; reloading.", self.config.path.display());
        }
        if let Err(e) = self.load() {
            error!(
                "Failed to reload zone {}: {}. Still serving the previous version.",
                self.config.origin, e
            );
        }
        true
    }

    /// Polls for reloads until `group` shuts down.
    pub fn run(&self, group: &ThreadGroup) {
        let interval = self.config.reload_interval;
        let mut next_check = Instant::now() + interval;
        while !group.is_shutting_down() {
            let due = !interval.is_zero() && Instant::now() >= next_check;
            if due || self.reload_requested.load(Ordering::Relaxed) {
                self.poll();
                next_check = Instant::now() + interval;
            }
            thread::sleep(if interval.is_zero() { TICK } else { TICK.min(interval) });
        }
        debug!("Zone loader for {} stopped.", self.config.origin);
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.config.path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }
}

/// Errors that cause a zone load to fail.
#[derive(Debug)]
pub enum Error {
    Zone(LoadError),
    Answers(answer::Error),
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Self {
        Self::Zone(err)
    }
}

impl From<answer::Error> for Error {
    fn from(err: answer::Error) -> Self {
        Self::Answers(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Zone(err) => err.fmt(f),
            Self::Answers(err) => write!(f, "failed to build answers: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Zone(err) => Some(err),
            Self::Answers(err) => Some(err),
        }
    }
}
