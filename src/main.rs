mod cli;

use seqport::{
    config::{self, Config},
    dedupe, discovery,
    export::{self, ExportController, ExportSettings},
    inventory,
    reconcile::{self, purge, ReconcileRequest, ReconcileTarget},
    summary,
};
use seqport_common::BYTES_PER_MB;
use seqport_db::models::TableName;
use seqport_db::pool::{get_conn, init_pool, DbPool};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "seqport=trace,seqport_convert=debug,seqport_db=debug,seqport_common=debug".to_string()
        } else {
            "seqport=info,seqport_convert=info,seqport_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("seqport {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(db) = cli.db {
                config.paths.database = db;
            }
            run_command(command, &config)
        }
    }
}

fn run_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Export {
            paths,
            root,
            out,
            simulate,
            no_skip_existing,
            no_clean,
            no_fallback,
            only_value,
            workers,
            json,
        } => {
            let mut config = config.clone();
            let export_cfg = &mut config.export;
            export_cfg.simulate |= simulate;
            export_cfg.skip_existing &= !no_skip_existing;
            export_cfg.clean_invalid &= !no_clean;
            export_cfg.fallback_enabled &= !no_fallback;
            if let Some(value) = only_value {
                export_cfg.only_value = value;
            }
            if let Some(workers) = workers {
                anyhow::ensure!(workers >= 1, "--workers must be at least 1");
                export_cfg.workers = workers;
            }
            run_export(&config, &paths, root, out, json)
        }
        Commands::Reconcile {
            target,
            root,
            threshold_mb,
            dry_run,
            yes,
            delete_small_mb,
            json,
        } => {
            let request = ReconcileRequest::resolve(config, target, root, threshold_mb)?;
            run_reconcile(config, &request, dry_run, yes, delete_small_mb, json)
        }
        Commands::Inventory { root } => run_inventory(config, root),
        Commands::Dedupe { root, apply } => run_dedupe(config, root, apply),
        Commands::Summary { target, json } => show_summary(config, target, json),
        Commands::CheckTools => check_tools(config),
        Commands::Validate { .. } | Commands::Version => Ok(()),
    }
}

fn open_store(config: &Config) -> Result<DbPool> {
    let db_path = config.paths.database.to_string_lossy();
    tracing::debug!("Opening status store at {}", db_path);
    init_pool(&db_path).with_context(|| format!("Failed to open status store {}", db_path))
}

fn required_root(
    explicit: Option<PathBuf>,
    configured: Option<&Path>,
    what: &str,
) -> Result<PathBuf> {
    explicit
        .or_else(|| configured.map(Path::to_path_buf))
        .with_context(|| {
            format!(
                "No {} given; pass it on the command line or set it under [paths]",
                what
            )
        })
}

fn run_export(
    config: &Config,
    paths: &[PathBuf],
    root: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let out_root = required_root(out, config.paths.recordings_root.as_deref(), "output root")?;
    let suffix = &config.export.source_suffix;

    let candidates = if paths.is_empty() {
        let root = required_root(root, config.paths.sequence_root.as_deref(), "sequence root")?;
        let pool = open_store(config)?;
        let conn = get_conn(&pool)?;
        let table = TableName::new(config.export.table.as_str())?;
        discovery::discover(&conn, &table, config.export.only_value, &root, suffix)
            .with_context(|| format!("Failed to read flagged channels from {}", table))?
    } else {
        discovery::expand_paths(paths, suffix)
    };

    if candidates.is_empty() {
        println!("No channels flagged for export.");
        return Ok(());
    }

    let converter = export::build_converter(&config.converter, config.export.simulate);
    let settings = ExportSettings::from_config(&config.export, &out_root);
    let controller = Arc::new(
        ExportController::new(converter, settings)
            .with_context(|| format!("Failed to open run log under {}", out_root.display()))?,
    );

    tracing::info!(
        "Exporting {} candidates to {}",
        candidates.len(),
        out_root.display()
    );
    let rt = tokio::runtime::Runtime::new()?;
    let run = rt.block_on(controller.run(candidates));

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        for report in &run.reports {
            let output = report
                .output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "[{}] {} -> {} ({})",
                report.outcome,
                report.source.display(),
                output,
                report.reason
            );
        }
        println!("\n{}", run.stats);
        println!("Run log: {}", controller.run_log_path().display());
    }

    Ok(())
}

fn run_reconcile(
    config: &Config,
    request: &ReconcileRequest,
    dry_run: bool,
    yes: bool,
    delete_small_mb: Option<u64>,
    json: bool,
) -> Result<()> {
    if let Some(mb) = delete_small_mb {
        if dry_run {
            println!("[DRY-RUN] Would delete .{} files < {}MB", request.suffix, mb);
        } else {
            let report =
                purge::purge_small_files(&request.root, &request.suffix, mb * BYTES_PER_MB);
            println!(
                "Deleted {}/{} small files, freed {:.1}MB",
                report.deleted,
                report.found,
                report.freed_bytes as f64 / BYTES_PER_MB as f64
            );
            if !report.failed.is_empty() {
                println!("{} file(s) could not be deleted:", report.failed.len());
                for (path, err) in &report.failed {
                    println!("  {} ({})", path.display(), err);
                }
            }
        }
    }

    let pool = open_store(config)?;
    let conn = get_conn(&pool)?;
    let plan = request.plan(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }

    if plan.is_empty() {
        if !json {
            println!("No changes detected. Database is already up to date.");
        }
        return Ok(());
    }
    if dry_run {
        if !json {
            println!("\nDry run: nothing written.");
        }
        return Ok(());
    }

    if !yes {
        if json {
            anyhow::bail!("--json requires --yes or --dry-run to avoid an interactive prompt");
        }
        println!(
            "\nThis will update {} entries in {}.",
            plan.len(),
            plan.table
        );
        if !confirm("Do you want to proceed? (y/N): ")? {
            println!("Cancelled. Nothing written.");
            return Ok(());
        }
    }

    let written = reconcile::commit(&conn, &request.table, &plan)?;
    if !json {
        println!(
            "Updated {} with {} entries (threshold {} MB).",
            request.table,
            written,
            request.threshold_bytes / BYTES_PER_MB
        );
    }
    Ok(())
}

fn print_plan(plan: &reconcile::ReconcilePlan) {
    if !plan.new.is_empty() {
        println!("{} new entries:", plan.new.len());
        for entry in &plan.new {
            println!("  {}", entry);
        }
    }
    if !plan.changed.is_empty() {
        println!("{} changed entries:", plan.changed.len());
        for change in &plan.changed {
            println!("  {}", change);
        }
    }
}

/// Read one answer from stdin. Only `y` and `yes` confirm.
fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn run_inventory(config: &Config, root: Option<PathBuf>) -> Result<()> {
    let root = required_root(root, config.paths.recordings_root.as_deref(), "recordings root")?;
    let table = TableName::new(config.inventory.table.as_str())?;
    let pool = open_store(config)?;
    let conn = get_conn(&pool)?;

    let written = inventory::refresh(&conn, &table, &root, &config.inventory.suffix)?;
    println!("Wrote or updated {} rows in {}.", written, table);
    Ok(())
}

fn run_dedupe(config: &Config, root: Option<PathBuf>, apply: bool) -> Result<()> {
    let root = required_root(root, config.paths.recordings_root.as_deref(), "recordings root")?;
    let mut formats = vec![config.export.primary.format];
    if config.export.fallback.format != config.export.primary.format {
        formats.push(config.export.fallback.format);
    }

    let plan = dedupe::plan(&root, &formats)?;
    if plan.remove.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }

    println!(
        "Found {} duplicates in {} groups:",
        plan.remove.len(),
        plan.duplicate_groups
    );
    for staged in &plan.remove {
        println!(
            "  remove: {} ({:.1} MB), keep {}",
            staged.path.display(),
            staged.size_bytes as f64 / BYTES_PER_MB as f64,
            staged.kept.display()
        );
    }

    if !apply {
        println!("\nDry run: nothing deleted. Pass --apply to delete.");
        return Ok(());
    }

    let report = dedupe::apply(&plan);
    println!("\nRemoved {} files.", report.removed);
    for (path, err) in &report.failed {
        println!("  Could not delete {}: {}", path.display(), err);
    }
    Ok(())
}

fn show_summary(config: &Config, target: ReconcileTarget, json: bool) -> Result<()> {
    let table = TableName::new(target.table(config))?;
    let pool = open_store(config)?;
    let conn = get_conn(&pool)?;
    let summary = summary::summarize(&conn, &table)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tool = seqport_convert::check_converter(
        config.converter.path.as_deref(),
        &config.converter.search_paths,
        &config.converter.program,
    );

    if let Some(ref path) = tool.path {
        println!("✓ {} - {}", tool.name, path.display());
    } else {
        println!("✗ {}", tool.name);
        println!("  Searched:");
        for location in &tool.searched {
            println!("    {}", location.display());
        }
    }

    println!();
    if tool.available {
        println!("All required tools are available!");
    } else {
        println!("Converter is missing. Only --simulate exports will succeed.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Database: {}", config.paths.database.display());
    println!(
        "  Export: {} value={} -> {} x{} / {} x{}",
        config.export.table,
        config.export.only_value,
        config.export.primary.format,
        config.export.primary.retries,
        config.export.fallback.format,
        config.export.fallback.retries
    );
    println!("  Workers: {}", config.export.workers);
    println!("  Reconcile threshold: {} MB", config.reconcile.threshold_mb);
    Ok(())
}
