//! Restore - Puts the newest backup of each game back in place
//!
//! Each game in a run goes through: find newest valid instance, re-resolve
//! the stored templates on this machine, check for a conflict, then apply
//! or skip. A decision remembered earlier in the run settles later
//! conflicts without prompting.

use crate::backup::{Backup, BackupInstance};
use crate::conflict::{Conflict, ConflictResolver, PathPair, PromptAnswer};
use crate::context::ResolutionContext;
use crate::copy;
use crate::game::Game;
use crate::manifest::PathType;
use crate::probe::Probe;
use crate::report::{BatchReport, GameOutcome, Operation};
use crate::resolver::{Resolution, Resolver};
use crate::template;
use crate::{Error, Result, REGISTRY_EXPORT_FILE};
use std::fs;
use std::path::{Path, PathBuf};

/// Restores backup instances written by a [`Backup`]
pub struct Restorer<'a> {
    backup: &'a Backup<'a>,
    probe: &'a dyn Probe,
}

/// One manifest record ready to be restored
#[derive(Debug, Clone)]
struct Planned {
    source: PathBuf,
    live: String,
    path_type: PathType,
}

impl<'a> Restorer<'a> {
    pub fn new(backup: &'a Backup<'a>, probe: &'a dyn Probe) -> Self {
        Self { backup, probe }
    }

    /// Restore every game in order, collecting failures
    pub fn restore_batch<F>(
        &self,
        games: &[Game],
        context: &ResolutionContext,
        conflicts: &mut ConflictResolver,
        mut prompt: F,
    ) -> BatchReport
    where
        F: FnMut(&Conflict) -> PromptAnswer,
    {
        let mut report = BatchReport::new();

        for game in games {
            let outcome = match self.restore_game(game, context, conflicts, &mut prompt) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("Restore of {} failed: {}", game.title, e);
                    GameOutcome::failed(&game.title, e.to_string())
                }
            };
            report.push(outcome);
        }

        report
    }

    /// Restore the newest valid instance of one game
    pub fn restore_game<F>(
        &self,
        game: &Game,
        context: &ResolutionContext,
        conflicts: &mut ConflictResolver,
        prompt: &mut F,
    ) -> Result<GameOutcome>
    where
        F: FnMut(&Conflict) -> PromptAnswer,
    {
        let instance = self.backup.latest_instance(game)?;
        let game_context = context.for_game(game.install_path.as_deref());
        let plan = self.plan(&instance, &game_context)?;

        if plan.is_empty() {
            return Err(Error::NoSaveData(game.title.clone()));
        }

        let pairs: Vec<PathPair> = plan
            .iter()
            .map(|p| PathPair {
                backup: p.source.to_string_lossy().to_string(),
                live: p.live.clone(),
                path_type: p.path_type,
            })
            .collect();

        if conflicts.should_skip(&game.title, &pairs, self.probe, prompt) {
            return Ok(GameOutcome::new(
                &game.title,
                Operation::Skip,
                true,
                Some("Live saves are newer than the backup".to_string()),
            )
            .with_detail("instance", serde_json::json!(instance.name)));
        }

        for planned in &plan {
            self.apply(planned)?;
        }

        tracing::info!(
            "Restored {} from {} ({} paths)",
            game.title,
            instance.name,
            plan.len()
        );

        Ok(GameOutcome::new(
            &game.title,
            Operation::Restore,
            true,
            Some(format!("Restored {} paths", plan.len())),
        )
        .with_detail("instance", serde_json::json!(instance.name)))
    }

    /// Resolve each manifest record against this machine; records that do
    /// not resolve are skipped
    fn plan(&self, instance: &BackupInstance, context: &ResolutionContext) -> Result<Vec<Planned>> {
        let resolver = Resolver::new(self.backup.placeholders(), context, self.probe);
        let mut plan = Vec::new();

        for record in &instance.manifest.backup_paths {
            let folder = instance.path.join(&record.folder_name);
            let live = match resolver.resolve(&record.template) {
                Resolution::Resolved { path, .. } if !template::has_wildcard(&path) => path,
                Resolution::Resolved { path, .. } => {
                    tracing::warn!("Skipping {}: still ambiguous after resolution", path);
                    continue;
                }
                Resolution::Unresolved(_) | Resolution::NoMatch => continue,
            };

            let source = match record.path_type {
                PathType::Folder => folder,
                PathType::File => Self::backed_up_file(&folder)?,
                PathType::Reg => folder.join(REGISTRY_EXPORT_FILE),
            };

            plan.push(Planned {
                source,
                live,
                path_type: record.path_type,
            });
        }

        Ok(plan)
    }

    /// The single file stored in a `file` record's folder
    fn backed_up_file(folder: &Path) -> Result<PathBuf> {
        fs::read_dir(folder)?
            .flatten()
            .map(|entry| entry.path())
            .find(|path| path.is_file())
            .ok_or_else(|| Error::InvalidPath(folder.display().to_string()))
    }

    fn apply(&self, planned: &Planned) -> Result<()> {
        let live = Path::new(&planned.live);
        match planned.path_type {
            PathType::Folder => {
                copy::copy_dir_recursive(&planned.source, live)?;
            }
            PathType::File => {
                copy::copy_file(&planned.source, live)?;
            }
            PathType::Reg => {
                self.backup.registry().import(&planned.source)?;
            }
        }
        tracing::debug!("Restored {} -> {}", planned.source.display(), planned.live);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::Choice;
    use crate::placeholder::PlaceholderRegistry;
    use crate::probe::DiskProbe;
    use crate::regtool::NoRegistry;
    use crate::timestamps::Precision;
    use std::fs::File;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn set_mtime(path: &Path, secs: u64) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn game_with_saves(dir: &TempDir) -> Game {
        let install = dir.path().join("install");
        fs::create_dir_all(install.join("Saves")).unwrap();
        fs::write(install.join("Saves/slot1.sav"), b"old progress").unwrap();
        set_mtime(&install.join("Saves/slot1.sav"), 1_000);

        let mut game = Game::new("Hades");
        game.install_path = Some(install.to_string_lossy().to_string());
        game.win_paths = vec!["{{p|game}}/Saves".to_string()];
        game.linux_paths = game.win_paths.clone();
        game.mac_paths = game.win_paths.clone();
        game
    }

    #[test]
    fn restores_when_backup_is_newer() {
        let dir = TempDir::new().unwrap();
        let placeholders = PlaceholderRegistry::new();
        let backup = Backup::new(dir.path().join("backups"), 3, &placeholders, &NoRegistry);
        let game = game_with_saves(&dir);
        let context = ResolutionContext::new();

        let report = backup.backup_batch(&[game.clone()], &context, &DiskProbe);
        assert!(!report.has_errors(), "{:?}", report.errors);

        // Make the backup newer than the (now damaged) live save
        let instance = backup.latest_instance(&game).unwrap();
        set_mtime(&instance.path.join("path1/slot1.sav"), 5_000);
        let live = Path::new(game.install_path.as_deref().unwrap()).join("Saves/slot1.sav");
        fs::write(&live, b"corrupt").unwrap();
        set_mtime(&live, 2_000);

        let restorer = Restorer::new(&backup, &DiskProbe);
        let mut conflicts = ConflictResolver::new(Precision::Seconds);
        let report = restorer.restore_batch(&[game], &context, &mut conflicts, |_| {
            panic!("no conflict expected")
        });

        assert!(!report.has_errors(), "{:?}", report.errors);
        assert_eq!(report.with_operation(Operation::Restore).count(), 1);
        assert_eq!(fs::read(&live).unwrap(), b"old progress");
    }

    #[test]
    fn newer_live_saves_prompt_and_can_be_skipped() {
        let dir = TempDir::new().unwrap();
        let placeholders = PlaceholderRegistry::new();
        let backup = Backup::new(dir.path().join("backups"), 3, &placeholders, &NoRegistry);
        let game = game_with_saves(&dir);
        let context = ResolutionContext::new();
        backup.backup_batch(&[game.clone()], &context, &DiskProbe);

        let live = Path::new(game.install_path.as_deref().unwrap()).join("Saves/slot1.sav");
        fs::write(&live, b"newer progress").unwrap();
        set_mtime(&live, 9_000);

        let restorer = Restorer::new(&backup, &DiskProbe);
        let mut conflicts = ConflictResolver::new(Precision::Seconds);
        let mut prompts = 0;
        let report = restorer.restore_batch(&[game], &context, &mut conflicts, |conflict| {
            prompts += 1;
            assert_eq!(conflict.game, "Hades");
            PromptAnswer::once(Choice::Skip)
        });

        assert_eq!(prompts, 1);
        assert_eq!(report.with_operation(Operation::Skip).count(), 1);
        assert_eq!(fs::read(&live).unwrap(), b"newer progress");
    }

    #[test]
    fn game_without_backup_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let placeholders = PlaceholderRegistry::new();
        let backup = Backup::new(dir.path().join("backups"), 3, &placeholders, &NoRegistry);
        let restorer = Restorer::new(&backup, &DiskProbe);
        let mut conflicts = ConflictResolver::default();

        let report = restorer.restore_batch(
            &[Game::new("Never Backed Up")],
            &ResolutionContext::new(),
            &mut conflicts,
            |_| PromptAnswer::once(Choice::Replace),
        );

        assert_eq!(report.errors, vec!["Never Backed Up: No backup available for Never Backed Up".to_string()]);
    }
}
