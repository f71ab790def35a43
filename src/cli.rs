//
// cli.rs
// XNAT-RTStruct-rs
//
// Defines the CLI surface with Clap and dispatches commands; parsing runs on a blocking worker.
//

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use crate::config::{XnatArgs, XnatConnection};
use crate::error::RtStructError;
use crate::models::{StructureSetSummary, ValidationReport};
use crate::rtstruct::RtStruct;
use crate::{batch, upload, web};

#[derive(Parser)]
#[command(name = "xnat-rtstruct")]
#[command(about = "Validate, subset and re-encode DICOM RT structure sets for XNAT", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub xnat: XnatArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a structure set and print its ROIs, warnings and errors
    Inspect {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Write a new structure set holding only the chosen ROIs
    Subset {
        file: PathBuf,
        /// Comma-separated ROI numbers
        #[arg(long, value_delimiter = ',', required = true)]
        roi: Vec<i32>,
        #[arg(short, long)]
        output: PathBuf,
        /// Also write one XML metadata document per kept ROI here
        #[arg(long)]
        xml_dir: Option<PathBuf>,
    },
    /// Decode and re-encode with fresh instance identifiers
    Reencode {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print or write the XML metadata of one ROI
    RoiXml {
        file: PathBuf,
        #[arg(long)]
        roi: i32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate every RT structure set below a directory
    Batch {
        #[arg(short, long)]
        directory: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Start the web server
    Web {
        #[arg(short, long, default_value = "127.0.0.1")]
        host: String,
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
        #[arg(long, default_value = "target/uploads")]
        storage: PathBuf,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let xnat = cli.xnat;

    match cli.command {
        Commands::Inspect { file, json } => {
            let name = file.display().to_string();
            match blocking(move || xnat.parse_file(&file)).await? {
                Ok(rtstruct) if json => {
                    println!("{}", serde_json::to_string_pretty(&rtstruct.report())?)
                }
                Ok(rtstruct) => print_summary(&rtstruct.report()),
                Err(e) => {
                    let report = ValidationReport::failed(&name, &e);
                    if json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        print_failure(&report);
                    }
                    bail!("{} error(s) found in {}", report.errors.len(), name);
                }
            }
        }
        Commands::Subset {
            file,
            roi,
            output,
            xml_dir,
        } => {
            let rtstruct = load(xnat, file).await?;
            let wanted: BTreeSet<i32> = roi.into_iter().collect();
            for number in wanted.iter().filter(|n| rtstruct.roi(**n).is_none()) {
                println!("ROI {number} not found, ignored");
            }
            let subset = rtstruct.derive_subset(&wanted)?;
            let encoded = subset.to_dicom()?;
            upload::write_encoded(&encoded, &output)?;
            println!(
                "Subset {} with ROIs {:?} saved to {:?}",
                subset.structure_set.label,
                subset.roi_numbers(),
                output
            );
            if let Some(dir) = xml_dir {
                let names = upload::write_roi_documents(&subset, &encoded.sop_instance_uid, &dir)?;
                println!("{} ROI document(s) written to {:?}", names.len(), dir);
            }
        }
        Commands::Reencode { file, output } => {
            let rtstruct = load(xnat, file).await?;
            let encoded = rtstruct.to_dicom()?;
            upload::write_encoded(&encoded, &output)?;
            for warning in &encoded.warnings {
                println!("  warning: {warning}");
            }
            println!(
                "Structure set re-encoded as {} to {:?}",
                encoded.sop_instance_uid, output
            );
        }
        Commands::RoiXml { file, roi, output } => {
            let rtstruct = load(xnat, file).await?;
            let Some(entry) = rtstruct.roi(roi) else {
                bail!("ROI {roi} not found (available: {:?})", rtstruct.roi_numbers());
            };
            let xml = upload::roi_xml(&rtstruct, entry, &rtstruct.structure_set.sop_instance_uid)?;
            match output {
                Some(path) => {
                    fs::write(&path, xml).context("Failed to write ROI XML")?;
                    println!("ROI {roi} metadata saved to {:?}", path);
                }
                None => print!("{xml}"),
            }
        }
        Commands::Batch { directory, json } => {
            let reports = blocking(move || {
                let connection = xnat.connect()?;
                let resolver = connection.as_ref().map(XnatConnection::resolver);
                batch::validate_directory(&directory, resolver.as_ref())
            })
            .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    if report.valid {
                        println!(
                            "OK      {} ({} ROI(s), {} warning(s))",
                            report.file,
                            report.roi_count.unwrap_or_default(),
                            report.warnings.len()
                        );
                    } else {
                        println!("FAILED  {} ({} error(s))", report.file, report.errors.len());
                        for error in &report.errors {
                            println!("        {error}");
                        }
                    }
                }
            }
            let failed = reports.iter().filter(|r| !r.valid).count();
            println!("{} structure set(s) checked, {} failed", reports.len(), failed);
        }
        Commands::Web {
            host,
            port,
            storage,
        } => web::start_server(&host, port, &storage, xnat).await?,
    }

    Ok(())
}

/// Blocking HTTP and file work stays off the async executor.
async fn blocking<T, F>(job: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .context("Worker thread failed")?
}

async fn load(xnat: XnatArgs, file: PathBuf) -> anyhow::Result<RtStruct> {
    let outcome: Result<RtStruct, RtStructError> =
        blocking(move || xnat.parse_file(&file)).await?;
    Ok(outcome?)
}

fn print_summary(summary: &StructureSetSummary) {
    println!("Structure set: {} ({})", summary.label, summary.sop_instance_uid);
    if let Some(name) = &summary.name {
        println!("  Name: {}", name);
    }
    println!(
        "  Patient: {} [{}]",
        summary.patient_name.as_deref().unwrap_or("-"),
        summary.patient_id.as_deref().unwrap_or("-")
    );
    println!(
        "  References: {} study(ies), {} series, {} image(s)",
        summary.study_uids.len(),
        summary.series_uids.len(),
        summary.image_count
    );
    if let Some(session) = &summary.session {
        println!("  XNAT session: {}", session);
    }
    println!("  ROIs:");
    for roi in &summary.rois {
        println!(
            "    {:>4}  {:<24} {:<12} {:>5} contour(s) {:>7} point(s)",
            roi.number,
            roi.name.as_deref().unwrap_or("-"),
            roi.interpreted_type.as_deref().unwrap_or("-"),
            roi.contour_count,
            roi.point_count
        );
    }
    if !summary.warnings.is_empty() {
        println!("  Warnings ({}):", summary.warnings.len());
        for warning in &summary.warnings {
            println!("    - {}", warning);
        }
    }
}

fn print_failure(report: &ValidationReport) {
    println!("Structure set {} is not valid", report.file);
    println!("  Errors ({}):", report.errors.len());
    for error in &report.errors {
        println!("    - {}", error);
    }
    if !report.warnings.is_empty() {
        println!("  Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("    - {}", warning);
        }
    }
}
