use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use viewgraft::{parse_document, to_xml, Element, Rewriter};

#[derive(Parser)]
#[command(name = "viewgraft")]
#[command(about = "XML view-inheritance engine with declarative patch directives", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch document to a base view and print the result
    Apply {
        /// Path to the base XML document
        #[arg(short, long)]
        base: PathBuf,

        /// Path to the patch document (a spec or a <data> wrapper)
        #[arg(short, long)]
        patch: PathBuf,

        /// Stamp replaced nodes with their origin tag
        #[arg(long)]
        branding: bool,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a patch in memory and report whether it is applicable
    Check {
        #[arg(short, long)]
        base: PathBuf,

        #[arg(short, long)]
        patch: PathBuf,

        #[arg(long)]
        branding: bool,
    },

    /// Show a unified diff between the base and the patched result
    Diff {
        #[arg(short, long)]
        base: PathBuf,

        #[arg(short, long)]
        patch: PathBuf,

        #[arg(long)]
        branding: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            base,
            patch,
            branding,
            output,
        } => {
            let patched = rewrite(&base, &patch, branding)?;
            let xml = to_xml(&patched);
            match output {
                Some(path) => fs::write(&path, xml)
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => println!("{xml}"),
            }
        }
        Commands::Check {
            base,
            patch,
            branding,
        } => {
            rewrite(&base, &patch, branding)?;
            println!("{} {} applies cleanly", "OK".green().bold(), patch.display());
        }
        Commands::Diff {
            base,
            patch,
            branding,
        } => {
            let before = to_xml(&load(&base)?);
            let after = to_xml(&rewrite(&base, &patch, branding)?);
            print_diff(&before, &after);
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<Element> {
    let xml = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_document(&xml).with_context(|| format!("cannot parse {}", path.display()))
}

fn rewrite(base: &Path, patch: &Path, branding: bool) -> Result<Element> {
    let source = load(base)?;
    let specs = load(patch)?;
    Rewriter::new()
        .branding(branding)
        .apply(source, specs)
        .with_context(|| format!("cannot apply {}", patch.display()))
}

fn print_diff(before: &str, after: &str) {
    let diff = TextDiff::from_lines(before, after);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => print!("{}", format!("-{change}").red()),
            ChangeTag::Insert => print!("{}", format!("+{change}").green()),
            ChangeTag::Equal => print!(" {change}"),
        }
    }
    if before == after {
        println!("{}", "no changes".dimmed());
    }
}
