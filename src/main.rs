use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use loctag::script::SCRIPT_EXTENSION;
use loctag::{apply_plan, plan_sync, OutputMode, SyncOptions, SyncPlan};
use similar::{ChangeTag, TextDiff};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "loctag")]
#[command(about = "Localization tag synchronizer for scene scripts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag eligible lines, reusing existing IDs
    Tag {
        /// Script files or directories to process
        paths: Vec<PathBuf>,

        /// Regenerate every ID, discarding existing tags
        #[arg(long)]
        retag_all: bool,

        /// Overwrite the scripts instead of writing .tagged siblings
        #[arg(long)]
        in_place: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Write the collected string table as JSON to this file
        #[arg(long, value_name = "FILE")]
        strings: Option<PathBuf>,
    },

    /// Plan a run and report what would change, touching nothing
    Check {
        /// Script files or directories to process
        paths: Vec<PathBuf>,
    },

    /// Print the collected string table as JSON, touching nothing
    Strings {
        /// Script files or directories to process
        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Tag {
            paths,
            retag_all,
            in_place,
            diff,
            strings,
        } => cmd_tag(paths, retag_all, in_place, diff, strings),

        Commands::Check { paths } => cmd_check(paths),

        Commands::Strings { paths } => cmd_strings(paths),
    }
}

/// Expand files and directories into the sorted list of scripts to process.
///
/// Explicit files are taken as-is in the order given; directories are
/// walked for `*.scn` and sorted for a stable processing order.
fn discover_scripts(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let roots: Vec<PathBuf> = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    };

    let mut scripts = Vec::new();
    for root in roots {
        if root.is_file() {
            scripts.push(root);
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&root) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some(SCRIPT_EXTENSION)
            {
                found.push(entry.path().to_path_buf());
            }
        }
        found.sort();
        scripts.extend(found);
    }

    if scripts.is_empty() {
        anyhow::bail!("no .{} scripts found under the given paths", SCRIPT_EXTENSION);
    }

    Ok(scripts)
}

/// Helper: Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (tagged)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
    println!();
}

fn print_summary(kept: usize, inserted: usize, replaced: usize) {
    println!("{}", "Summary:".bold());
    println!("  {} inserted", format!("{}", inserted).green());
    println!("  {} replaced", format!("{}", replaced).yellow());
    println!("  {} kept", format!("{}", kept).cyan());
}

fn cmd_tag(
    paths: Vec<PathBuf>,
    retag_all: bool,
    in_place: bool,
    show_diff: bool,
    strings: Option<PathBuf>,
) -> Result<()> {
    let scripts = discover_scripts(&paths)?;
    let options = SyncOptions {
        retag_all,
        output: if in_place {
            OutputMode::InPlace
        } else {
            OutputMode::DebugSuffix
        },
        ..SyncOptions::default()
    };

    println!("Processing {} script(s)...", scripts.len());

    let plan = plan_sync(&scripts, &options)?;

    // Capture originals of the files the plan will rewrite, for diff output.
    let mut contents_before: HashMap<PathBuf, String> = HashMap::new();
    if show_diff {
        for path in plan.edits.keys() {
            if let Ok(content) = fs::read_to_string(path) {
                contents_before.insert(path.clone(), content);
            }
        }
    }

    if plan.is_noop() {
        println!("{}", "Everything already tagged; nothing to write.".green());
    }

    let sources: Vec<PathBuf> = plan.edits.keys().cloned().collect();
    let report = apply_plan(plan, &options)?;

    for (source, written) in sources.iter().zip(&report.files_written) {
        if in_place {
            println!("{} Tagged {}", "✓".green(), written.display());
        } else {
            println!(
                "{} Tagged {} -> {}",
                "✓".green(),
                source.display(),
                written.display()
            );
        }

        if show_diff {
            if let (Some(before), Ok(after)) = (
                contents_before.get(source),
                fs::read_to_string(written),
            ) {
                if before != &after {
                    display_diff(source, before, &after);
                }
            }
        }
    }

    println!();
    print_summary(report.kept, report.inserted, report.replaced);

    if let Some(out) = strings {
        let json = serde_json::to_string_pretty(&report.table)?;
        fs::write(&out, json)?;
        println!(
            "\nWrote {} string(s) to {}",
            report.table.len(),
            out.display()
        );
    }

    Ok(())
}

fn cmd_check(paths: Vec<PathBuf>) -> Result<()> {
    let scripts = discover_scripts(&paths)?;
    let plan = plan_sync(&scripts, &SyncOptions::default())?;

    report_plan(&plan);
    Ok(())
}

fn report_plan(plan: &SyncPlan) {
    if plan.is_noop() {
        println!(
            "{} All {} string(s) already tagged.",
            "✓".green(),
            plan.table.len()
        );
    } else {
        for (path, edits) in &plan.edits {
            println!(
                "{} {}: {} line(s) would change",
                "⊙".yellow(),
                path.display(),
                edits.len()
            );
        }
    }

    println!();
    print_summary(plan.kept, plan.inserted, plan.replaced);
}

fn cmd_strings(paths: Vec<PathBuf>) -> Result<()> {
    let scripts = discover_scripts(&paths)?;
    let plan = plan_sync(&scripts, &SyncOptions::default())?;
    println!("{}", serde_json::to_string_pretty(&plan.table)?);
    Ok(())
}
