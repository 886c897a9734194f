use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::Parser;
use macpurge_core::{
    find_category, format_bytes, free_space_for, summarize, top_n, CategoryReport, CategorySpec,
    DeletionReport, DeletionTransaction, ElevationRouter, ExecutionMode, PathGuard, Report,
    ScanError, Scanner, DEFAULT_LARGE_FILE_MIN_MB,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "macpurge",
    version,
    about = "Guarded macOS maintenance tool: reclaim logs, caches, and build artifacts after explicit confirmation."
)]
struct Cli {
    /// Clean log files (~/Library/Logs, /private/var/log).
    #[arg(long)]
    clean_logs: bool,

    /// Clean cache files (~/Library/Caches, /Library/Caches).
    #[arg(long)]
    clean_cache: bool,

    /// Clean Xcode DerivedData.
    #[arg(long)]
    clean_xcode: bool,

    /// Find large files in the home directory (threshold in MB).
    #[arg(long, value_name = "MB", num_args = 0..=1, default_missing_value = "500")]
    find_large: Option<u64>,

    /// Flush the DNS cache.
    #[arg(long)]
    flush_dns: bool,

    /// Purge inactive memory.
    #[arg(long)]
    purge_mem: bool,

    /// Run the periodic maintenance scripts.
    #[arg(long)]
    run_scripts: bool,

    /// Run every cleanup module.
    #[arg(long)]
    all: bool,

    /// Skip confirmation prompts and apply deletions.
    #[arg(short = 'y', long)]
    yes: bool,

    /// Show what would be deleted without deleting, even with -y.
    #[arg(long)]
    dry_run: bool,

    /// Write the structured run report as JSON.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.clean_logs
            || self.clean_cache
            || self.clean_xcode
            || self.find_large.is_some()
            || self.flush_dns
            || self.purge_mem
            || self.run_scripts
            || self.all
    }
}

/// Engine handles shared by every category run.
struct Engine {
    guard: PathGuard,
    router: ElevationRouter,
    home: PathBuf,
}

/// Per-run tally deciding the process exit code: non-zero when an
/// apply-mode deletion failed or a requested root was missing.
#[derive(Default)]
struct RunStatus {
    failed_deletions: u64,
    missing_roots: u64,
    bytes_freed: u64,
}

impl RunStatus {
    fn absorb(&mut self, category: &CategoryReport) {
        self.missing_roots += category.missing_roots.len() as u64;
        if let Some(outcome) = &category.outcome {
            self.failed_deletions += outcome.failed;
            self.bytes_freed += outcome.bytes_freed;
        }
    }

    fn exit_code(&self) -> i32 {
        if self.failed_deletions > 0 || self.missing_roots > 0 {
            1
        } else {
            0
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let home = dirs::home_dir().context("could not determine home directory")?;
    let engine = Engine {
        guard: PathGuard::with_system_defaults(),
        router: ElevationRouter::with_system_removers(home.clone()),
        home,
    };

    let code = if cli.has_action() {
        run_flags(&engine, &cli)?
    } else {
        interactive_menu(&engine)?
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn run_flags(engine: &Engine, cli: &Cli) -> Result<i32> {
    // Deletions happen only with -y, and --dry-run wins over -y.
    let apply = cli.yes && !cli.dry_run;
    let min_mb = cli.find_large.unwrap_or(DEFAULT_LARGE_FILE_MIN_MB);

    let mut report = Report::new();
    let mut status = RunStatus::default();

    if cli.clean_logs || cli.all {
        let category = run_category(engine, &category_for(engine, "logs", min_mb)?, apply);
        status.absorb(&category);
        report.push(category);
    }
    if cli.clean_cache || cli.all {
        let category = run_category(engine, &category_for(engine, "caches", min_mb)?, apply);
        status.absorb(&category);
        report.push(category);
    }
    if cli.clean_xcode || cli.all {
        let category = run_category(
            engine,
            &category_for(engine, "xcode-derived-data", min_mb)?,
            apply,
        );
        status.absorb(&category);
        report.push(category);
    }
    if cli.find_large.is_some() || cli.all {
        let category = run_category(engine, &category_for(engine, "large-files", min_mb)?, apply);
        status.absorb(&category);
        report.push(category);
    }

    if cli.flush_dns || cli.all {
        run_maintenance(&FLUSH_DNS, !apply);
    }
    if cli.purge_mem || cli.all {
        run_maintenance(&PURGE_MEM, !apply);
    }
    if cli.run_scripts || cli.all {
        run_maintenance(&RUN_SCRIPTS, !apply);
    }

    if let Some(output) = &cli.output {
        let payload = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        fs::write(output, payload)
            .with_context(|| format!("failed to write report to {}", output.display()))?;
        println!("\nReport written to {}", output.display());
    }

    if status.bytes_freed > 0 {
        println!(
            "\nSuccessfully cleared {} of space.",
            format_bytes(status.bytes_freed)
        );
        if let Some(free) = free_space_for(&engine.home) {
            println!("Free space on home volume: {}", format_bytes(free));
        }
    } else if !apply && !report.categories.is_empty() {
        println!("\nDry run complete. Add -y to execute deletions.");
    }

    Ok(status.exit_code())
}

fn category_for(engine: &Engine, name: &str, min_mb: u64) -> Result<CategorySpec> {
    find_category(name, &engine.home, min_mb.saturating_mul(1024 * 1024))
        .with_context(|| format!("unknown category: {name}"))
}

/// Scan every root of a category, show what was found, and (for deletable
/// categories in apply mode) run the deletion transaction over the
/// candidates. Returns the structured record for the run report.
fn run_category(engine: &Engine, category: &CategorySpec, apply: bool) -> CategoryReport {
    let heading = if apply { "" } else { "[DRY RUN] " };
    println!("\n{heading}{}", category.label);

    let scanner = Scanner::new(&engine.guard);
    let options = category.scan_options();

    let mut scans = Vec::new();
    let mut missing_roots = Vec::new();
    let mut reclaimable_bytes = 0_u64;

    for root in &category.roots {
        match scanner.scan(root, &options) {
            Ok(result) => {
                println!(
                    "  {}: {}",
                    display_path(root, &engine.home),
                    format_bytes(result.total_bytes)
                );
                for warning in &result.warnings {
                    println!("  skip: {warning}");
                }
                reclaimable_bytes = reclaimable_bytes.saturating_add(result.total_bytes);
                scans.push(result);
            }
            Err(ScanError::NotFound { .. }) => {
                println!(
                    "  {} not found — skipping.",
                    display_path(root, &engine.home)
                );
                missing_roots.push(root.to_string_lossy().to_string());
            }
            Err(err) => println!("  {err}"),
        }
    }

    if category.report_only {
        for scan in &scans {
            for entry in top_n(scan, 10) {
                println!(
                    "  {:>10}  {}",
                    format_bytes(entry.size_bytes),
                    display_path(&entry.path, &engine.home)
                );
            }
        }
        let summaries: u64 = scans.iter().map(|s| summarize(s).eligible_entries).sum();
        if summaries == 0 {
            println!("  No matching files found.");
        }
        return CategoryReport {
            category: category.name.to_string(),
            label: category.label.to_string(),
            scans,
            reclaimable_bytes,
            missing_roots,
            outcome: None,
        };
    }

    let outcome = if apply {
        if reclaimable_bytes == 0 && scans.iter().all(|s| s.candidates.is_empty()) {
            println!("  Nothing to clean.");
            None
        } else {
            let txn = DeletionTransaction::new(&engine.guard, &engine.router);
            let mut merged = DeletionReport::default();
            for scan in &scans {
                merge_reports(&mut merged, txn.execute(&scan.candidates, ExecutionMode::Apply));
            }
            println!("  Freed: {}", format_bytes(merged.bytes_freed));
            if merged.failed > 0 {
                println!("  {} entries could not be removed.", merged.failed);
            }
            Some(merged)
        }
    } else {
        println!("  Total reclaimable: {}", format_bytes(reclaimable_bytes));
        None
    };

    CategoryReport {
        category: category.name.to_string(),
        label: category.label.to_string(),
        scans,
        reclaimable_bytes,
        missing_roots,
        outcome,
    }
}

fn merge_reports(into: &mut DeletionReport, part: DeletionReport) {
    into.bytes_freed = into.bytes_freed.saturating_add(part.bytes_freed);
    into.deleted += part.deleted;
    into.failed += part.failed;
    into.skipped += part.skipped;
    into.outcomes.extend(part.outcomes);
}

/// An opaque OS maintenance step: a fixed command sequence with a
/// boolean success outcome. Dry-run prints the commands instead.
struct MaintenanceAction {
    label: &'static str,
    commands: &'static [&'static [&'static str]],
}

const FLUSH_DNS: MaintenanceAction = MaintenanceAction {
    label: "Flush DNS Cache",
    commands: &[
        &["sudo", "dscacheutil", "-flushcache"],
        &["sudo", "killall", "-HUP", "mDNSResponder"],
    ],
};

const PURGE_MEM: MaintenanceAction = MaintenanceAction {
    label: "Purge Inactive Memory",
    commands: &[&["sudo", "purge"]],
};

const RUN_SCRIPTS: MaintenanceAction = MaintenanceAction {
    label: "Run Periodic Maintenance Scripts",
    commands: &[&["sudo", "periodic", "daily", "weekly", "monthly"]],
};

fn run_maintenance(action: &MaintenanceAction, dry_run: bool) -> bool {
    let heading = if dry_run { "[DRY RUN] " } else { "" };
    println!("\n{heading}{}", action.label);

    if dry_run {
        for command in action.commands {
            println!("  Would run: {}", command.join(" "));
        }
        return true;
    }

    for command in action.commands {
        let status = Command::new(command[0]).args(&command[1..]).status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                println!("  Failed: {} exited with {status}", command.join(" "));
                return false;
            }
            Err(err) => {
                println!("  Failed: {}: {err}", command.join(" "));
                return false;
            }
        }
    }
    println!("  Done.");
    true
}

/// Categories the menu's "run all" actually deletes.
const RUN_ALL_CLEANUPS: &[&str] = &["logs", "caches", "xcode-derived-data"];
/// Categories the menu's "run all" previews first; large-files is shown
/// for information only and never deleted.
const RUN_ALL_PREVIEW: &[&str] = &["logs", "caches", "xcode-derived-data", "large-files"];

const MENU: &str = "
macpurge — macOS maintenance

  1  Clean Logs             ~/Library/Logs, /private/var/log
  2  Clean Caches           ~/Library/Caches, /Library/Caches
  3  Flush DNS Cache
  4  Purge Inactive RAM
  5  Run Maintenance Scripts
  6  Find Large Files       (>500 MB in ~)
  7  Clean Xcode Data       ~/Library/Developer/Xcode/DerivedData
  A  Run All Cleanups
  Q  Quit
";

fn interactive_menu(engine: &Engine) -> Result<i32> {
    let mut status = RunStatus::default();

    loop {
        println!("{MENU}");
        let Some(choice) = prompt("Choose an option: ")? else {
            println!("Bye!");
            break;
        };

        match choice.as_str() {
            "1" => menu_cleanup(engine, "logs", &mut status)?,
            "2" => menu_cleanup(engine, "caches", &mut status)?,
            "3" => {
                run_maintenance(&FLUSH_DNS, false);
            }
            "4" => {
                run_maintenance(&PURGE_MEM, false);
            }
            "5" => {
                run_maintenance(&RUN_SCRIPTS, false);
            }
            "6" => {
                let category = category_for(engine, "large-files", DEFAULT_LARGE_FILE_MIN_MB)?;
                let report = run_category(engine, &category, false);
                status.absorb(&report);
            }
            "7" => menu_cleanup(engine, "xcode-derived-data", &mut status)?,
            "a" => {
                let mut reclaimable = 0_u64;
                for &name in RUN_ALL_PREVIEW {
                    let category = category_for(engine, name, DEFAULT_LARGE_FILE_MIN_MB)?;
                    let report = run_category(engine, &category, false);
                    if !category.report_only {
                        reclaimable = reclaimable.saturating_add(report.reclaimable_bytes);
                    }
                    status.absorb(&report);
                }
                println!("\nTotal reclaimable: {}", format_bytes(reclaimable));
                if reclaimable > 0 && confirm("Proceed with ALL deletions?")? {
                    for &name in RUN_ALL_CLEANUPS {
                        let category = category_for(engine, name, DEFAULT_LARGE_FILE_MIN_MB)?;
                        let report = run_category(engine, &category, true);
                        status.absorb(&report);
                    }
                    run_maintenance(&FLUSH_DNS, false);
                    run_maintenance(&PURGE_MEM, false);
                    run_maintenance(&RUN_SCRIPTS, false);
                }
            }
            "q" => {
                println!("Bye!");
                break;
            }
            _ => {
                println!("Invalid option.");
                continue;
            }
        }

        if status.bytes_freed > 0 {
            println!(
                "\nSuccessfully cleared {} of space.",
                format_bytes(status.bytes_freed)
            );
        }
    }

    Ok(status.exit_code())
}

fn menu_cleanup(engine: &Engine, name: &str, status: &mut RunStatus) -> Result<()> {
    let category = category_for(engine, name, DEFAULT_LARGE_FILE_MIN_MB)?;
    let preview = run_category(engine, &category, false);
    let reclaimable = preview.reclaimable_bytes;
    status.absorb(&preview);

    if reclaimable == 0 {
        println!("  Nothing to clean.");
        return Ok(());
    }
    if confirm("Proceed with deletion?")? {
        let applied = run_category(engine, &category, true);
        status.absorb(&applied);
    } else {
        println!("  Skipped.");
    }
    Ok(())
}

/// Y/n confirmation; EOF counts as no.
fn confirm(question: &str) -> Result<bool> {
    match prompt(&format!("{question} [Y/n] "))? {
        None => Ok(false),
        Some(answer) => Ok(matches!(answer.as_str(), "" | "y" | "yes")),
    }
}

fn prompt(text: &str) -> Result<Option<String>> {
    print!("{text}");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_lowercase()))
}

/// Shorten a path for display by replacing the home prefix with `~`.
fn display_path(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(relative) => format!("~/{}", relative.display()),
        Err(_) => path.display().to_string(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
