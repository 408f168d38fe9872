use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use cifscope::{
    load_first_structure, CrystalStructure, DisorderFilter, HydrogenFilter, StructureModifier,
    SymmetryGrower,
};

#[derive(Parser)]
#[command(author, version, about = "CIF crystal structure inspector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parses CIF files and reports their structure contents.
    Inspect {
        /// CIF file path or glob pattern.
        pattern: String,

        /// Hydrogen display filter: none, constant, anisotropic.
        #[arg(long)]
        hydrogens: Option<String>,

        /// Disorder filter: all, group1, group2.
        #[arg(long)]
        disorder: Option<String>,

        /// Symmetry growth mode, e.g. bonds-yes-hbonds-no.
        #[arg(long)]
        grow: Option<String>,
    },
}

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn main() -> Result<()> {
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Info));

    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect {
            pattern,
            hydrogens,
            disorder,
            grow,
        } => {
            let mut paths: Vec<PathBuf> = Vec::new();
            for entry in glob::glob(&pattern).context("Invalid glob pattern")? {
                paths.push(entry?);
            }
            if paths.is_empty() {
                anyhow::bail!("No files match '{pattern}'");
            }

            for path in paths {
                println!("--- {} ---", path.display());

                // 1. Parsing
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("Could not read CIF file: {path:?}"))?;
                let mut structure = load_first_structure(&text)?;

                // 2. Optional modifier passes
                if let Some(mode) = &hydrogens {
                    let mut filter = HydrogenFilter::new(mode.parse()?);
                    structure = filter.apply(&structure)?;
                }
                if let Some(mode) = &disorder {
                    let mut filter = DisorderFilter::new(mode.parse()?);
                    structure = filter.apply(&structure)?;
                }
                if let Some(mode) = &grow {
                    let mut grower = SymmetryGrower::new(mode.parse()?);
                    structure = grower.apply(&structure)?;
                }

                // 3. Report
                print_report(&structure);
            }
        }
    }

    Ok(())
}

fn print_report(structure: &CrystalStructure) {
    let cell = &structure.cell;
    println!(
        "Cell: a={:.4} b={:.4} c={:.4}  alpha={:.3} beta={:.3} gamma={:.3}",
        cell.a(),
        cell.b(),
        cell.c(),
        cell.alpha(),
        cell.beta(),
        cell.gamma()
    );
    println!(
        "Space group: {} (#{}), {} symmetry operations",
        structure.symmetry.space_group_name,
        structure.symmetry.space_group_number,
        structure.symmetry.operations.len()
    );
    println!(
        "Atoms: {}  Bonds: {}  H-bonds: {}",
        structure.atoms.len(),
        structure.bonds.len(),
        structure.h_bonds.len()
    );

    println!("Fragments: {}", structure.connected_groups.len());
    for (index, group) in structure.connected_groups.iter().enumerate() {
        let mut formula: Vec<&str> = group.atoms.iter().map(|a| a.element.as_str()).collect();
        formula.sort_unstable();
        println!(
            "  #{:<3} {} atoms, {} bonds, {} h-bonds  [{}]",
            index + 1,
            group.atoms.len(),
            group.bonds.len(),
            group.h_bonds.len(),
            formula.join(" ")
        );
    }
}
