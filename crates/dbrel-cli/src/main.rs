use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::Result;
use dbrel_core::{
    run_sync, Config, ReleaseRequest, SyncRequest, SyncSummary, UserError, MANIFEST_FILE,
};

#[derive(Parser)]
#[command(
    name = "dbrel",
    version,
    about = "Reconcile a releases.json manifest against published GitHub releases"
)]
struct DbrelCli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, global = true)]
    trace: bool,

    /// Suppress per-tag output; the summary line still prints.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit the run summary as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Path to the manifest file.
    #[arg(long, global = true, default_value = MANIFEST_FILE)]
    manifest: PathBuf,

    /// Repository the manifest tracks (owner/name); required only to
    /// initialize a manifest that does not exist yet.
    #[arg(long, global = true)]
    repo: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full maintenance sweep: diff the manifest against every remote
    /// release, admit new tags, drop vanished ones.
    Sync {
        /// Compute and print the diff without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Commit and push the manifest after writing (CI mode).
        #[arg(long)]
        push: bool,
    },
    /// Record one freshly published release, then run the full sweep.
    Release {
        /// Database key, as used in the build configuration.
        database: String,
        /// Upstream version string.
        version: String,
        /// Release tag, expected to equal {database}-{version}.
        tag: String,

        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        push: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = DbrelCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let config = Config::from_env();
    let request = build_request(&cli);

    match run_sync(&config, &request) {
        Ok(summary) => {
            emit_summary(&cli, &summary);
            Ok(())
        }
        Err(err) => {
            let code = if err.downcast_ref::<UserError>().is_some() {
                1
            } else {
                2
            };
            if cli.json {
                let payload = serde_json::json!({
                    "error": format!("{err:#}"),
                    "code": code,
                });
                println!("{payload}");
            } else {
                eprintln!("error: {err:#}");
            }
            std::process::exit(code);
        }
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("dbrel_cli={level},dbrel_core={level},dbrel_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn build_request(cli: &DbrelCli) -> SyncRequest {
    let (release, dry_run, push) = match &cli.command {
        Command::Sync { dry_run, push } => (None, *dry_run, *push),
        Command::Release {
            database,
            version,
            tag,
            dry_run,
            push,
        } => (
            Some(ReleaseRequest {
                database: database.clone(),
                version: version.clone(),
                tag: tag.clone(),
            }),
            *dry_run,
            *push,
        ),
    };
    SyncRequest {
        manifest_path: cli.manifest.clone(),
        repository: cli.repo.clone(),
        release,
        dry_run,
        push,
    }
}

fn emit_summary(cli: &DbrelCli, summary: &SyncSummary) {
    if cli.json {
        match serde_json::to_string_pretty(summary) {
            Ok(payload) => println!("{payload}"),
            Err(err) => eprintln!("error: failed to encode summary: {err}"),
        }
        return;
    }

    if !cli.quiet {
        for tag in &summary.added {
            println!("+ {tag}");
        }
        for tag in &summary.removed {
            println!("- {tag}");
        }
    }

    let mut line = format!(
        "{} added, {} removed, {} warnings",
        summary.added.len(),
        summary.removed.len(),
        summary.warnings.len()
    );
    if summary.dry_run {
        line = format!("dry run: {line}");
    } else if summary.pushed {
        line.push_str(" (pushed)");
    } else if !summary.wrote {
        line.push_str(" (no changes needed)");
    }
    println!("{line}");
}
