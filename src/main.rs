use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use cartoexport::study::{load_dir, scan_pairs, LoadOptions};
use cartoexport::writer::{merge_files, save_study, write_traces, StudyFiles};
use cartoexport::EcgExport;

#[derive(Parser)]
#[command(name = "cartoexport", version, about = "Extract and merge CARTO 3 study text exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the contact-force/ECG export pairs in a study directory
    Scan {
        /// Study directory to scan
        dir: PathBuf,
        /// Stop after this many pairs
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Extract named channels from a single ECG export
    Extract {
        /// ECG export file
        file: PathBuf,
        /// Comma-separated channel names, e.g. I,II,M1-M2
        #[arg(long, value_delimiter = ',')]
        leads: Vec<String>,
        /// First sample of the window
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Number of samples (to end of file when omitted)
        #[arg(long)]
        count: Option<usize>,
        /// Write the traces to this CSV file instead of printing a summary
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load a study directory and save it as a CSV pair
    Study {
        /// Study directory to load
        dir: PathBuf,
        /// Stop after this many pairs
        #[arg(long)]
        limit: Option<usize>,
        /// Output prefix (writes <prefix>_cf.csv and <prefix>_ecg.csv)
        #[arg(long)]
        out: PathBuf,
    },
    /// Merge saved studies into one CSV pair
    Merge {
        /// Prefixes of previously saved studies
        inputs: Vec<PathBuf>,
        /// Output prefix for the merged study
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan { dir, limit } => {
            let pairs = scan_pairs(&dir, limit)
                .with_context(|| format!("scanning {}", dir.display()))?;
            for pair in &pairs {
                println!("{}", pair.id);
            }
            println!("{} paired points", pairs.len());
        }
        Command::Extract {
            file,
            leads,
            start,
            count,
            out,
        } => {
            if leads.is_empty() {
                bail!("--leads requires at least one channel name");
            }
            let export = EcgExport::open(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let names: Vec<&str> = leads.iter().map(String::as_str).collect();
            let traces = export.extract_millivolts(&names, start, count)?;

            match out {
                Some(out) => {
                    write_traces(&out, &names, &traces)?;
                    info!("wrote {} leads to {}", names.len(), out.display());
                }
                None => {
                    for (name, row) in names.iter().zip(traces.rows()) {
                        let min = row.iter().cloned().fold(f64::INFINITY, f64::min);
                        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                        println!(
                            "{name}: {} samples, {min:.3} to {max:.3} mV",
                            row.len()
                        );
                    }
                }
            }
        }
        Command::Study { dir, limit, out } => {
            let study = load_dir(&dir, limit, &LoadOptions::default())
                .with_context(|| format!("loading {}", dir.display()))?;
            if study.is_empty() {
                bail!("no paired points found in {}", dir.display());
            }
            let files = save_study(&out, &study)?;
            println!(
                "{} points saved to {} and {}",
                study.len(),
                files.contact_force.display(),
                files.ecg.display()
            );
        }
        Command::Merge { inputs, out } => {
            if inputs.is_empty() {
                bail!("merge requires at least one input prefix");
            }
            let files: Vec<StudyFiles> = inputs.iter().map(StudyFiles::with_prefix).collect();
            let merged = merge_files(&files, &out)?;
            println!("{} points in merged study", merged.len());
        }
    }

    Ok(())
}
