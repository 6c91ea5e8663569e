//! Command line front end for the shipment-cost pipeline.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::json;

use shipcost::common::config::{AppCfg, ValidationConfig};
use shipcost::common::error::{ShipError, ShipResult};
use shipcost::common::log;
use shipcost::data::read_csv;
use shipcost::inference::{CostPredictor, ShippingData};
use shipcost::schema::{SchemaCatalog, SchemaValidator};
use shipcost::validation::{ValidationOrchestrator, ValidationRun};

/// Shipment-cost pipeline: dataset validation and cost prediction
#[derive(Parser, Debug)]
#[command(name = "shipcost")]
#[command(version)]
pub struct Cli {
    /// YAML configuration file; environment variables override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a train/test split against the schema and check for drift
    Validate(ValidateArgs),

    /// Price shipments with the trained model or the fallback rule
    Predict(PredictArgs),

    /// Run the schema checks on a single CSV file
    CheckSchema(CheckSchemaArgs),
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Training split (reference for drift)
    pub train: PathBuf,

    /// Test split (production for drift)
    pub test: PathBuf,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PredictArgs {
    /// JSON file holding one shipment keyed by column name
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// CSV file of shipments to price row by row
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckSchemaArgs {
    /// CSV file to check
    pub file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code() as u32, error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ShipResult<()> {
    let cfg = match &cli.config {
        Some(path) => AppCfg::from_file(path)?,
        None => AppCfg::load()?,
    };
    log::init(&cfg)?;

    let output = match cli.command {
        Command::Validate(args) => {
            let orchestrator = ValidationOrchestrator::new(ValidationConfig::from_app(&cfg)?);
            let mut run = ValidationRun::new();
            let artifact = orchestrator.execute(&mut run, &args.train, &args.test)?;
            json!({
                "drift_report_path": artifact.drift_report_path,
                "validation_status": artifact.validation_status,
                "train_schema": run.train_checks(),
                "test_schema": run.test_checks(),
                "dataset_drift": run.dataset_drift(),
            })
        }
        Command::Predict(args) => {
            let predictor = CostPredictor::from_app(&cfg);
            match (args.input, args.csv) {
                (Some(path), _) => {
                    let raw = fs::read_to_string(&path).map_err(|e| ShipError::io(&path, e))?;
                    let data: ShippingData = serde_json::from_str(&raw)?;
                    json!({ "cost": predictor.predict(&data.to_dataset()?)? })
                }
                (None, Some(path)) => {
                    let dataset = read_csv(&path, "prediction")?;
                    json!({ "costs": predictor.batch_predict(&dataset)? })
                }
                (None, None) => return Err(ShipError::invalid("either --input or --csv is required")),
            }
        }
        Command::CheckSchema(args) => {
            let validator = SchemaValidator::new(Arc::new(SchemaCatalog::load(&cfg.schema_path)?));
            let dataset = read_csv(&args.file, "input")?;
            let result = validator.check(&dataset);
            json!({ "valid": result.is_valid(), "checks": result })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
