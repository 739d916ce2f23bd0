//! Backup - Writes timestamped backup instances and enforces retention
//!
//! Layout: `<root>/<game>/<YYYY-MM-DD_HH-mm>/{path1,path2,...,backup_info.json}`.
//! Instances are built under `<name>.tmp` with the manifest written last, and
//! only renamed into place once complete.

use crate::context::ResolutionContext;
use crate::copy;
use crate::game::Game;
use crate::manifest::{BackupManifest, BackupPathRecord, PathType};
use crate::placeholder::PlaceholderRegistry;
use crate::probe::Probe;
use crate::reducer;
use crate::regtool::RegistryTool;
use crate::report::{BatchReport, GameOutcome, Operation};
use crate::resolver::{ResolvedPath, Resolver};
use crate::{Error, Result, INSTANCE_NAME_FORMAT, INSTANCE_NAME_REGEX, REGISTRY_EXPORT_FILE};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the directory an instance is built in before it is complete
const STAGING_SUFFIX: &str = ".tmp";

/// A backup instance with a readable manifest
#[derive(Debug, Clone)]
pub struct BackupInstance {
    /// Directory name, `YYYY-MM-DD_HH-mm`
    pub name: String,
    pub path: PathBuf,
    pub manifest: BackupManifest,
}

/// Creates, lists and evicts backup instances under a backup root
pub struct Backup<'a> {
    root: PathBuf,
    max_backups: usize,
    placeholders: &'a PlaceholderRegistry,
    registry: &'a dyn RegistryTool,
}

impl<'a> Backup<'a> {
    /// Create a new Backup; a `max_backups` of 0 is treated as 1
    pub fn new(
        root: PathBuf,
        max_backups: usize,
        placeholders: &'a PlaceholderRegistry,
        registry: &'a dyn RegistryTool,
    ) -> Self {
        Self {
            root,
            max_backups: max_backups.max(1),
            placeholders,
            registry,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn placeholders(&self) -> &'a PlaceholderRegistry {
        self.placeholders
    }

    pub fn registry(&self) -> &'a dyn RegistryTool {
        self.registry
    }

    /// Directory holding every instance of a game
    pub fn game_dir(&self, game: &Game) -> PathBuf {
        self.root.join(game.backup_dir_name())
    }

    /// Back up already-resolved paths into a new instance named after now
    pub fn backup(
        &self,
        game: &Game,
        paths: &[ResolvedPath],
        context: &ResolutionContext,
    ) -> Result<BackupInstance> {
        self.backup_at(game, paths, context, chrono::Local::now().naive_local())
    }

    /// Back up already-resolved paths into an instance named after `now`
    ///
    /// The instance is built in a staging directory and only moved into
    /// place once its manifest is written. An existing instance with the
    /// same name is replaced at that point; a failed run leaves it intact.
    pub fn backup_at(
        &self,
        game: &Game,
        paths: &[ResolvedPath],
        context: &ResolutionContext,
        now: NaiveDateTime,
    ) -> Result<BackupInstance> {
        if paths.is_empty() {
            return Err(Error::NoSaveData(game.title.clone()));
        }

        let game_dir = self.game_dir(game);
        let name = now.format(INSTANCE_NAME_FORMAT).to_string();
        let instance_dir = game_dir.join(&name);
        let staging_dir = game_dir.join(format!("{}{}", name, STAGING_SUFFIX));

        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir)?;
        }
        fs::create_dir_all(&staging_dir)?;

        let (manifest, bytes) = match self.write_instance(game, paths, context, &staging_dir) {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging_dir) {
                    tracing::warn!("Could not remove {}: {}", staging_dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        if instance_dir.exists() {
            tracing::debug!("Replacing existing instance {}", instance_dir.display());
            fs::remove_dir_all(&instance_dir)?;
        }
        fs::rename(&staging_dir, &instance_dir)?;
        tracing::info!(
            "Backed up {} ({} paths, {} bytes) to {}",
            game.title,
            paths.len(),
            bytes,
            instance_dir.display()
        );

        let evicted = self.evict(&game_dir)?;
        if !evicted.is_empty() {
            tracing::info!("Evicted old backups of {}: {:?}", game.title, evicted);
        }

        Ok(BackupInstance {
            name,
            path: instance_dir,
            manifest,
        })
    }

    /// Copy every path into `dir` and write the manifest last
    fn write_instance(
        &self,
        game: &Game,
        paths: &[ResolvedPath],
        context: &ResolutionContext,
        dir: &Path,
    ) -> Result<(BackupManifest, u64)> {
        let mut manifest = BackupManifest::new(game.title.clone(), game.zh_cn.clone());
        let mut bytes = 0;

        for (i, path) in paths.iter().enumerate() {
            let folder_name = format!("path{}", i + 1);
            let dest = dir.join(&folder_name);
            let source = Path::new(&path.resolved);

            match path.path_type {
                PathType::Folder => {
                    bytes += copy::copy_dir_recursive(source, &dest)?;
                }
                PathType::File => {
                    let file_name = source
                        .file_name()
                        .ok_or_else(|| Error::InvalidPath(path.resolved.clone()))?;
                    bytes += copy::copy_file(source, &dest.join(file_name))?;
                }
                PathType::Reg => {
                    fs::create_dir_all(&dest)?;
                    self.registry
                        .export(&path.resolved, &dest.join(REGISTRY_EXPORT_FILE))?;
                }
            }

            manifest.backup_paths.push(BackupPathRecord {
                folder_name,
                template: reducer::finalize(
                    &path.template,
                    &path.resolved,
                    path.uid.as_deref(),
                    self.placeholders,
                    context,
                ),
                path_type: path.path_type,
                install_folder: game.install_folder.clone(),
            });
        }

        manifest.write_to(dir)?;
        Ok((manifest, bytes))
    }

    /// Resolve and back up each game, collecting failures
    pub fn backup_batch(
        &self,
        games: &[Game],
        context: &ResolutionContext,
        probe: &dyn Probe,
    ) -> BatchReport {
        let mut report = BatchReport::new();

        for game in games {
            let game_context = context.for_game(game.install_path.as_deref());
            let resolver = Resolver::new(self.placeholders, &game_context, probe);
            let paths = resolver.resolve_game(game, self.registry);

            let outcome = match self.backup(game, &paths, &game_context) {
                Ok(instance) => GameOutcome::new(
                    &game.title,
                    Operation::Backup,
                    true,
                    Some(format!("Backed up {} paths", instance.manifest.backup_paths.len())),
                )
                .with_detail("instance", serde_json::json!(instance.name)),
                Err(e) => {
                    tracing::warn!("Backup of {} failed: {}", game.title, e);
                    GameOutcome::failed(&game.title, e.to_string())
                }
            };
            report.push(outcome);
        }

        report
    }

    /// Names of instance directories of a game, oldest first
    fn instance_names(game_dir: &Path) -> Result<Vec<String>> {
        if !game_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = fs::read_dir(game_dir)?
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
            .filter(|name| INSTANCE_NAME_REGEX.is_match(name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Delete the oldest valid instances beyond the retention limit
    ///
    /// Only instances with a readable manifest count toward the limit.
    /// Instances without one are deleted when older than the newest valid
    /// instance.
    fn evict(&self, game_dir: &Path) -> Result<Vec<String>> {
        let names = Self::instance_names(game_dir)?;
        let valid: Vec<&String> = names
            .iter()
            .filter(|name| BackupManifest::read_from(&game_dir.join(name)).is_ok())
            .collect();
        let newest_valid = valid.last().copied();
        let excess = valid.len().saturating_sub(self.max_backups);
        let expired = &valid[..excess];

        let evicted: Vec<String> = names
            .iter()
            .filter(|name| {
                if valid.contains(name) {
                    expired.contains(name)
                } else {
                    newest_valid.map_or(false, |newest| *name < newest)
                }
            })
            .cloned()
            .collect();
        for name in &evicted {
            fs::remove_dir_all(game_dir.join(name))?;
        }
        Ok(evicted)
    }

    /// Instances of a game that have a readable manifest, newest first
    pub fn list_instances(&self, game: &Game) -> Result<Vec<BackupInstance>> {
        let game_dir = self.game_dir(game);
        let mut instances = Vec::new();

        for name in Self::instance_names(&game_dir)?.into_iter().rev() {
            let path = game_dir.join(&name);
            match BackupManifest::read_from(&path) {
                Ok(manifest) => instances.push(BackupInstance {
                    name,
                    path,
                    manifest,
                }),
                Err(e) => tracing::debug!("Ignoring instance {}: {}", path.display(), e),
            }
        }

        Ok(instances)
    }

    /// Newest usable instance of a game
    pub fn latest_instance(&self, game: &Game) -> Result<BackupInstance> {
        self.list_instances(game)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoBackup(game.title.clone()))
    }
}
