use anyhow::{Context, Result, bail};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::{
    config::{Ownership, Settings},
    record::{EpisodeRecord, FailureKind},
};

/// Records after relocation, plus every path that needs its owner and
/// mode fixed, in the order they were created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relocation {
    pub records: Vec<EpisodeRecord>,
    pub fixups: Vec<PathBuf>,
}

impl Relocation {
    pub fn moved(&self) -> impl Iterator<Item = &EpisodeRecord> {
        self.records.iter().filter(|record| !record.failed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EpisodeRecord> {
        self.records.iter().filter(|record| record.failed())
    }
}

/// Moves named records into `<destination>/<show>/<new_name>`.
#[derive(Debug, Clone)]
pub struct Relocator {
    destination: PathBuf,
    clean: bool,
}

impl Relocator {
    pub fn new(destination: impl Into<PathBuf>, clean: bool) -> Self {
        Self {
            destination: destination.into(),
            clean,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.destination, settings.clean)
    }

    pub fn relocate_all<I>(&self, records: I) -> Relocation
    where
        I: IntoIterator<Item = EpisodeRecord>,
    {
        let mut fixups = Vec::new();
        let records = records
            .into_iter()
            .map(|record| self.relocate(record, &mut fixups))
            .collect();
        Relocation { records, fixups }
    }

    /// Failed records are returned untouched. Any error along the way fails
    /// only this record.
    pub fn relocate(&self, record: EpisodeRecord, fixups: &mut Vec<PathBuf>) -> EpisodeRecord {
        if record.failed() {
            return record;
        }

        match self.try_relocate(&record, fixups) {
            Ok(moved_to) => {
                info!("moved {:?} -> {:?}", record.filename(), moved_to);
                EpisodeRecord {
                    moved_to: Some(moved_to),
                    ..record
                }
            }
            Err(e) => {
                warn!("failed to move {:?}: {:#}", record.filename(), e);
                EpisodeRecord {
                    moved_to: None,
                    ..record
                }
                .fail(
                    FailureKind::Relocation,
                    format!("Error moving file ({:#})", e),
                )
            }
        }
    }

    fn try_relocate(&self, record: &EpisodeRecord, fixups: &mut Vec<PathBuf>) -> Result<PathBuf> {
        let show = record
            .identified_as
            .as_deref()
            .context("record has no identified show")?;
        let new_name = record
            .new_name
            .as_deref()
            .context("record has no generated name")?;

        let dir = self.destination.join(show);
        if ensure_dir(&dir).with_context(|| format!("failed to create {:?}", dir))? {
            debug!("created {:?}", dir);
            fixups.push(dir.clone());
        }

        let target = dir.join(new_name);
        if target.exists() {
            bail!("destination {:?} already exists", target);
        }

        move_file(record.filename(), &target)
            .with_context(|| format!("failed to move to {:?}", target))?;
        fixups.push(target.clone());

        if self.clean {
            remove_if_present(record.filename())
                .with_context(|| format!("failed to remove {:?}", record.filename()))?;
        }

        Ok(target)
    }
}

/// Returns whether the directory was created by this call.
fn ensure_dir(dir: &Path) -> io::Result<bool> {
    match fs::create_dir(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir)?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Rename, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[derive(Debug)]
pub struct FixupFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

/// Applies `owner` to every path in order. Failures are collected rather
/// than aborting the remaining paths.
pub fn fix_ownership(paths: &[PathBuf], owner: &Ownership) -> Result<Vec<FixupFailure>> {
    let mode = owner.mode_bits()?;
    let mut failures = Vec::new();
    for path in paths {
        match apply_ownership(path, owner.uid, owner.gid, mode) {
            Ok(()) => debug!("set {}:{} {:o} on {:?}", owner.uid, owner.gid, mode, path),
            Err(error) => {
                warn!("failed to fix ownership of {:?}: {}", path, error);
                failures.push(FixupFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }
    Ok(failures)
}

#[cfg(unix)]
fn apply_ownership(path: &Path, uid: u32, gid: u32, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::{PermissionsExt, chown};

    chown(path, Some(uid), Some(gid))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_ownership(_path: &Path, _uid: u32, _gid: u32, _mode: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "ownership changes need a unix platform",
    ))
}
