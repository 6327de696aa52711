//! Command-line interface for training, pricing and serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::inference::{format_price, AdvertForm, BodyType, FuelType, PriceEstimator};
use crate::lookup::LookupTable;
use crate::optimizer::format_params;
use crate::server::{run_server, ServerConfig};
use crate::training::{Trainer, TrainingConfig, TrainingReport};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "autoprice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Used-vehicle price estimation from advert data")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean the advert data, train and evaluate all models, write artifacts
    Train {
        /// Advert CSV export
        #[arg(long, default_value = "data/Adverts.csv")]
        csv: PathBuf,

        /// Subsample rows and skip grid search and cross-validation
        #[arg(long)]
        quick: bool,
    },

    /// Estimate the price of one advert
    Predict {
        #[arg(long, default_value_t = 50_000)]
        mileage: i64,

        /// Vehicle age in years
        #[arg(long, default_value_t = 5)]
        age: i64,

        #[arg(long, value_enum, default_value = "suv")]
        body_type: BodyType,

        #[arg(long, value_enum, default_value = "petrol")]
        fuel_type: FuelType,

        #[arg(long, default_value = "")]
        make: String,

        #[arg(long, default_value = "")]
        model: String,

        #[arg(long, default_value = "Black")]
        colour: String,

        /// Car-and-van crossover
        #[arg(long)]
        crossover: bool,

        /// Model artifact
        #[arg(long, default_value = "models/gbr.json")]
        model_path: PathBuf,
    },

    /// List known makes
    Makes {
        #[arg(long, default_value = "data/makes_models.csv")]
        lookup: PathBuf,
    },

    /// List known models for a make
    Models {
        #[arg(long)]
        make: String,

        #[arg(long, default_value = "data/makes_models.csv")]
        lookup: PathBuf,
    },

    /// Start the pricing form server
    Serve {
        /// Server host (defaults to AUTOPRICE_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Server port (defaults to AUTOPRICE_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(csv: &Path, quick: bool) -> anyhow::Result<()> {
    section(if quick { "Train (quick)" } else { "Train" });

    step_run(&format!("Training on {}", csv.display()));
    let start = Instant::now();
    let report = Trainer::new(TrainingConfig::default()).train(csv, quick)?;
    step_done(&format!("{:.1}s", start.elapsed().as_secs_f64()));

    print_report(&report);
    Ok(())
}

fn print_report(report: &TrainingReport) {
    section("Data");
    kv("Rows loaded", &report.rows_loaded.to_string());
    kv("Rows cleaned", &report.rows_cleaned.to_string());
    kv("Train / test", &format!("{} / {}", report.n_train, report.n_test));
    if report.non_used_rows > 0 {
        kv("Not USED", &report.non_used_rows.to_string().yellow().to_string());
    }

    section("Held-out performance");
    let best = report.best().map(|b| b.name.clone());
    for eval in &report.evaluations {
        let line = format!("MAE {:>10}   R² {:.3}", format_price(eval.mae), eval.r2);
        if best.as_deref() == Some(eval.name.as_str()) {
            kv(&eval.name, &format!("{} {}", line, ok("best")));
        } else {
            kv(&eval.name, &line);
        }
    }

    if !report.grid_search.is_empty() {
        section("Grid search");
        for summary in &report.grid_search {
            kv(
                &summary.estimator,
                &format!("{}  (MAE {:.0})", format_params(&summary.best_params), -summary.best_score),
            );
        }
    }

    if !report.cross_validation.is_empty() {
        section("Cross-validated MAE");
        for row in &report.cross_validation {
            kv(
                &row.name,
                &format!(
                    "test {:.0} ± {:.0}   train {:.0} ± {:.0}",
                    row.test_mae_mean, row.test_mae_std, row.train_mae_mean, row.train_mae_std
                ),
            );
        }
    }

    section("Outputs");
    for path in &report.artifacts {
        kv("Artifact", &path.display().to_string());
    }
    match &report.chart {
        Some(path) => kv("Chart", &path.display().to_string()),
        None => kv("Chart", &"not rendered".yellow().to_string()),
    }
    println!();
}

pub fn cmd_predict(form: AdvertForm, model_path: &Path) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let estimator = PriceEstimator::load(model_path)?;
    step_done(&model_path.display().to_string());

    let form = form.clamped();
    let price = estimator.predict(&form)?;

    kv("Vehicle", &format!("{} {} ({})", form.make, form.model, form.colour));
    kv("Mileage / age", &format!("{} mi / {} yrs", form.mileage, form.vehicle_age));
    kv("Body / fuel", &format!("{} / {}", form.body_type, form.fuel_type));
    println!();
    println!("  {:<18} {}", muted("Estimated price"), format_price(price).white().bold());
    println!();
    Ok(())
}

pub fn cmd_makes(lookup: &Path) -> anyhow::Result<()> {
    let table = LookupTable::from_csv(lookup)?;
    for make in table.list_makes() {
        println!("{make}");
    }
    Ok(())
}

pub fn cmd_models(make: &str, lookup: &Path) -> anyhow::Result<()> {
    let table = LookupTable::from_csv(lookup)?;
    let models = table.list_models(make);
    if models.is_empty() {
        eprintln!("  {}", format!("No models known for '{make}'").yellow());
    }
    for model in models {
        println!("{model}");
    }
    Ok(())
}

pub async fn cmd_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    run_server(config).await
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Train { csv, quick } => cmd_train(&csv, quick),
        Commands::Predict {
            mileage,
            age,
            body_type,
            fuel_type,
            make,
            model,
            colour,
            crossover,
            model_path,
        } => {
            let form = AdvertForm {
                mileage,
                vehicle_age: age,
                body_type,
                fuel_type,
                make,
                model,
                colour,
                crossover,
            };
            cmd_predict(form, &model_path)
        }
        Commands::Makes { lookup } => cmd_makes(&lookup),
        Commands::Models { make, lookup } => cmd_models(&make, &lookup),
        Commands::Serve { host, port } => cmd_serve(host, port).await,
    }
}
