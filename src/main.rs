//! Savekeeper CLI - Back up and restore game saves from the command line

use clap::{Parser, Subcommand};
use savekeeper::conflict::Choice;
use savekeeper::game::GAMES_FILE;
use savekeeper::{
    copy, regtool, Backup, BatchDecision, BatchReport, Conflict, ConflictResolver, DiskProbe,
    Formatters, Game, GameDatabase, GameOutcome, PlaceholderRegistry, PromptAnswer, Resolver,
    Restorer, Settings,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "savekeeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to $SAVEKEEPER_CONFIG, then settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Game database file
    #[arg(long, global = true, default_value = GAMES_FILE)]
    games: PathBuf,

    /// Output formatter (text, json, shell)
    #[arg(short, long, global = true, default_value = "text")]
    formatter: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a save-path template on this machine
    Resolve {
        /// Template, e.g. "{{p|steam}}\userdata\{{p|uid}}\327030"
        template: String,

        /// Install directory used for {{p|game}}
        #[arg(long)]
        game_path: Option<String>,
    },
    /// Back up the saves of one or more games
    Backup {
        #[arg(required = true)]
        games: Vec<String>,
    },
    /// Restore the newest backup of one or more games
    Restore {
        #[arg(required = true)]
        games: Vec<String>,

        /// Overwrite newer live saves without asking
        #[arg(long, conflicts_with = "skip_all")]
        replace_all: bool,

        /// Keep newer live saves without asking
        #[arg(long)]
        skip_all: bool,
    },
    /// List the backups of a game
    List { game: String },
    /// Move the backup root to a new location
    Migrate { new_root: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("savekeeper=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a command; `Ok(false)` means it finished but reported errors
fn run(cli: Cli) -> savekeeper::Result<bool> {
    let settings_path = Settings::path(cli.config.as_deref());
    let settings = Settings::load(&settings_path)?;
    let placeholders = PlaceholderRegistry::from_env();
    let registry = regtool::system_registry();
    let backup = Backup::new(
        settings.backup_root.clone(),
        settings.retention(),
        &placeholders,
        registry.as_ref(),
    );

    match cli.command {
        Commands::Resolve {
            template,
            game_path,
        } => {
            let context = settings.context_for(game_path.as_deref());
            let resolver = Resolver::new(&placeholders, &context, &DiskProbe);
            let paths = resolver.expand(&template, registry.as_ref());
            if paths.is_empty() {
                eprintln!("No existing location for {}", template);
                return Ok(false);
            }
            for path in paths {
                println!("{}\t{}", path.path_type, path.resolved);
            }
            Ok(true)
        }
        Commands::Backup { games } => {
            let database = GameDatabase::load(&cli.games)?;
            let (found, mut report) = lookup(&database, &games);
            let context = settings.context_for(None);
            for outcome in backup.backup_batch(&found, &context, &DiskProbe).outcomes {
                report.push(outcome);
            }
            print_report(&report, &cli.formatter)
        }
        Commands::Restore {
            games,
            replace_all,
            skip_all,
        } => {
            let database = GameDatabase::load(&cli.games)?;
            let (found, mut report) = lookup(&database, &games);
            let context = settings.context_for(None);

            let mut conflicts = ConflictResolver::new(settings.time_precision);
            if replace_all {
                conflicts = conflicts.with_decision(BatchDecision::ReplaceAll);
            } else if skip_all {
                conflicts = conflicts.with_decision(BatchDecision::SkipAll);
            }

            let restorer = Restorer::new(&backup, &DiskProbe);
            let restored = restorer.restore_batch(&found, &context, &mut conflicts, prompt_stdin);
            for outcome in restored.outcomes {
                report.push(outcome);
            }
            print_report(&report, &cli.formatter)
        }
        Commands::List { game } => {
            let database = GameDatabase::load(&cli.games)?;
            let game = database.find(&game)?;
            let instances = backup.list_instances(game)?;
            if instances.is_empty() {
                println!("No backups of {}", game.title);
            }
            for instance in instances {
                println!(
                    "{}\t{} paths\t{}",
                    instance.name,
                    instance.manifest.backup_paths.len(),
                    instance.path.display()
                );
            }
            Ok(true)
        }
        Commands::Migrate { new_root } => {
            migrate(&settings, &settings_path, &new_root)?;
            Ok(true)
        }
    }
}

/// Look up each requested game; unknown names become failed outcomes
fn lookup(database: &GameDatabase, names: &[String]) -> (Vec<Game>, BatchReport) {
    let mut games = Vec::new();
    let mut report = BatchReport::new();
    for name in names {
        match database.find(name) {
            Ok(game) => games.push(game.clone()),
            Err(e) => report.push(GameOutcome::failed(name, e.to_string())),
        }
    }
    (games, report)
}

fn print_report(report: &BatchReport, formatter_name: &str) -> savekeeper::Result<bool> {
    let formatter = Formatters::by_name(formatter_name);
    let mut stdout = io::stdout();
    formatter.write_to(report, &mut stdout)?;
    stdout.flush()?;
    Ok(!report.has_errors())
}

/// Ask on stdin whether to overwrite newer live saves
fn prompt_stdin(conflict: &Conflict) -> PromptAnswer {
    let backup_time = conflict
        .backup_time
        .map(|time| {
            chrono::DateTime::<chrono::Local>::from(time)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "no files".to_string());
    let live_time = chrono::DateTime::<chrono::Local>::from(conflict.live_time);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!(
            "{}: live saves ({}) are newer than the backup ({}).\n\
             [r]eplace, [s]kip, [R]eplace all, [S]kip all? ",
            conflict.game,
            live_time.format("%Y-%m-%d %H:%M:%S"),
            backup_time,
        );
        if stdout.flush().is_err() {
            return PromptAnswer::once(Choice::Skip);
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            // EOF or a broken stdin never overwrites anything
            Ok(0) | Err(_) => return PromptAnswer::once(Choice::Skip),
            Ok(_) => {}
        }

        match line.trim() {
            "r" => return PromptAnswer::once(Choice::Replace),
            "s" => return PromptAnswer::once(Choice::Skip),
            "R" => return PromptAnswer::for_all(Choice::Replace),
            "S" => return PromptAnswer::for_all(Choice::Skip),
            _ => continue,
        }
    }
}

/// Move every backup to `new_root` and remember the new location
fn migrate(settings: &Settings, settings_path: &Path, new_root: &Path) -> savekeeper::Result<()> {
    let mut last_percent = None;
    copy::move_tree(&settings.backup_root, new_root, |progress| {
        let percent = if progress.total == 0 {
            100
        } else {
            progress.copied * 100 / progress.total
        };
        if last_percent != Some(percent) {
            eprint!("\rMoving backups... {}%", percent);
            last_percent = Some(percent);
        }
    })?;
    eprintln!();

    let updated = Settings {
        backup_root: new_root.to_path_buf(),
        ..settings.clone()
    };
    updated.save(settings_path)?;
    println!("Backups moved to {}", new_root.display());
    Ok(())
}
