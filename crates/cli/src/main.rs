use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nzis_core::{resolve_data_dir, CoreConfig, ImportReport, ReferralStore};
use nzis_referral::{normalize, parse_json_batch, render_json, validate_now};

#[derive(Parser)]
#[command(name = "nzis")]
#[command(about = "NZIS referral import and management CLI")]
struct Cli {
    /// Referral data directory (default: referral_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Registry YAML document (default: bundled sample registry)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a referral batch file without storing anything
    Validate {
        /// JSON file holding an array of referral records
        file: PathBuf,
    },
    /// Import a referral batch file into the store
    Import {
        /// JSON file holding an array of referral records
        file: PathBuf,
    },
    /// List stored referrals in issue order
    List,
    /// Show one stored referral as JSON
    Show {
        /// NZIS reference id of the referral
        reference_id: String,
    },
    /// Record the material collection date for a referral
    RecordCollection {
        /// NZIS reference id of the referral
        reference_id: String,
        /// Collection date (YYYY-MM-DD)
        date: String,
    },
    /// Record the result date for a referral
    RecordResult {
        /// NZIS reference id of the referral
        reference_id: String,
        /// Result date (YYYY-MM-DD)
        date: String,
    },
}

fn parse_date(input: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("'{input}' is not a date in YYYY-MM-DD form"))
}

fn print_report(report: &ImportReport) {
    for reference_id in &report.accepted {
        println!("stored {reference_id}");
    }
    for rejected in &report.rejected {
        let label = rejected
            .reference_id
            .as_deref()
            .unwrap_or("<no referenceId>");
        eprintln!(
            "rejected record {} ({label}): {}",
            rejected.index, rejected.reason
        );
    }
    println!(
        "{} stored, {} rejected",
        report.accepted.len(),
        report.rejected.len()
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("nzis=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = CoreConfig::new(resolve_data_dir(cli.data_dir), cli.registry)?;

    match cli.command {
        Some(Commands::Validate { file }) => {
            let registry = config.load_registry()?;
            let input = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let batch = parse_json_batch(&input)?;

            let mut invalid = 0usize;
            for (index, wire) in batch.iter().enumerate() {
                let normalized = normalize(wire);
                let label = normalized
                    .reference_id
                    .clone()
                    .unwrap_or_else(|| "<no referenceId>".into());
                match validate_now(&normalized, &registry) {
                    Ok(_) => println!("record {index} ({label}): ok"),
                    Err(errors) => {
                        invalid += 1;
                        for error in errors {
                            eprintln!("record {index} ({label}): {error}");
                        }
                    }
                }
            }
            println!("{} records, {} invalid", batch.len(), invalid);
        }
        Some(Commands::Import { file }) => {
            let store = ReferralStore::open(config)?;
            let report = store.import_file(&file)?;
            print_report(&report);
        }
        Some(Commands::List) => {
            let store = ReferralStore::open(config)?;
            let records = store.list();
            if records.is_empty() {
                println!("No referrals stored.");
            } else {
                for record in records {
                    println!(
                        "{}  {}  id={}  {}  [{}]",
                        record.issued_date,
                        record.reference_id,
                        record.id,
                        record.patient_name,
                        record.stage()
                    );
                }
            }
        }
        Some(Commands::Show { reference_id }) => {
            let store = ReferralStore::open(config)?;
            match store.get(&reference_id)? {
                Some(record) => println!("{}", render_json(&record.to_wire())?),
                None => eprintln!("No referral with reference id '{reference_id}'."),
            }
        }
        Some(Commands::RecordCollection { reference_id, date }) => {
            let store = ReferralStore::open(config)?;
            let record = store.record_material_collection(&reference_id, parse_date(&date)?)?;
            println!(
                "Recorded material collection for {} on {date}; stage is now {}.",
                record.reference_id,
                record.stage()
            );
        }
        Some(Commands::RecordResult { reference_id, date }) => {
            let store = ReferralStore::open(config)?;
            let record = store.record_result(&reference_id, parse_date(&date)?)?;
            println!(
                "Recorded result for {} on {date}; stage is now {}.",
                record.reference_id,
                record.stage()
            );
        }
        None => {
            println!("Use 'nzis --help' for commands");
        }
    }

    Ok(())
}
