//! Synthetic advert data shared by the integration tests

#![allow(dead_code)]

use autoprice::optimizer::ParamGrid;
use autoprice::training::{Trainer, TrainingConfig, TrainingReport};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const CURRENT_YEAR: i32 = 2021;

const VEHICLES: [(&str, &str, f64); 6] = [
    ("Ford", "Fiesta", 0.0),
    ("Ford", "Focus", 1_500.0),
    ("Ford", "Kuga", 4_000.0),
    ("BMW", "3 Series", 7_000.0),
    ("Kia", "Picanto", -1_200.0),
    ("Audi", "A3", 5_500.0),
];
const COLOURS: [&str; 4] = ["Black", "White", "Grey", "Red"];
const BODIES: [&str; 3] = ["Hatchback", "SUV", "Saloon"];
const FUELS: [&str; 2] = ["Petrol", "Diesel"];

/// CSV text in the advert export layout. Prices fall with mileage and age
/// and carry a per-model premium plus noise. One pre-1975 car, one colour
/// gap and one `NEW` vehicle are mixed in.
pub fn adverts_csv(n: usize, seed: u64) -> String {
    adverts_csv_registered(n, seed, None)
}

/// As [`adverts_csv`], but every regular advert is registered in `year`
/// when one is given, which makes `vehicle_age` constant after cleaning.
pub fn adverts_csv_registered(n: usize, seed: u64, year: Option<i32>) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut csv = String::from(
        "public_reference,mileage,reg_code,standard_colour,standard_make,standard_model,\
         vehicle_condition,year_of_registration,price,body_type,crossover_car_and_van,fuel_type\n",
    );
    for i in 0..n {
        let (make, model, premium) = VEHICLES[i % VEHICLES.len()];
        let drawn: i32 = rng.gen_range(2006..=2020);
        let year = year.unwrap_or(drawn);
        let mileage: u32 = rng.gen_range(1_000..80_000);
        let colour = if i == 5 { "" } else { COLOURS[rng.gen_range(0..COLOURS.len())] };
        let body = BODIES[i % BODIES.len()];
        let fuel = FUELS[rng.gen_range(0..FUELS.len())];
        let condition = if i == 7 { "NEW" } else { "USED" };
        let age = f64::from(CURRENT_YEAR - year);
        let price = 14_000.0 - age * 650.0 - f64::from(mileage) * 0.05 + premium + rng.gen_range(-300.0..300.0);
        writeln!(
            csv,
            "{},{mileage},{},{colour},{make},{model},{condition},{year},{:.0},{body},False,{fuel}",
            100_000 + i,
            reg_code(year),
            price.max(500.0),
        )
        .unwrap();
    }
    writeln!(csv, "{},52000,K,Blue,Ford,Fiesta,USED,1972,4500,Saloon,False,Petrol", 100_000 + n).unwrap();
    csv
}

fn reg_code(year: i32) -> String {
    format!("{:02}", year % 100)
}

pub fn write_adverts(dir: &Path, n: usize) -> PathBuf {
    let path = dir.join("Adverts.csv");
    std::fs::write(&path, adverts_csv(n, 7)).unwrap();
    path
}

pub fn write_lookup(dir: &Path) -> PathBuf {
    let path = dir.join("makes_models.csv");
    let mut csv = String::from("standard_make,standard_model\n");
    for (make, model, _) in VEHICLES {
        writeln!(csv, "{make},{model}").unwrap();
    }
    csv.push_str("Ford,Fiesta\nFord,\n");
    std::fs::write(&path, csv).unwrap();
    path
}

/// A configuration writing into `dir`, with small search grids.
pub fn test_config(dir: &Path) -> TrainingConfig {
    TrainingConfig::new()
        .with_models_dir(dir.join("models"))
        .with_chart_path(dir.join("images").join("mae_bar.svg"))
        .with_current_year(CURRENT_YEAR)
        .with_cv_folds(3)
        .with_rf_grid(ParamGrid::new().with_ints("n_estimators", &[10, 20]).with_ints("max_depth", &[4]))
        .with_gbr_grid(ParamGrid::new().with_floats("learning_rate", &[0.1, 0.2]).with_ints("max_depth", &[3]))
}

/// Quick-train on synthetic adverts; artifacts land in `dir/models`.
pub fn train_quick(dir: &Path, n: usize) -> TrainingReport {
    let csv = write_adverts(dir, n);
    Trainer::new(test_config(dir)).train(&csv, true).unwrap()
}

/// An engineered-style frame for pipeline tests.
pub fn feature_frame(n: usize) -> (DataFrame, ndarray::Array1<f64>, Vec<String>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut mileage = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut ratio = Vec::with_capacity(n);
    let mut makes = Vec::with_capacity(n);
    let mut colours = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let (make, _, premium) = VEHICLES[i % VEHICLES.len()];
        let m: f64 = rng.gen_range(1_000.0..80_000.0);
        let a = f64::from(rng.gen_range(0..15));
        mileage.push(m);
        age.push(a);
        ratio.push(m / a.max(1.0));
        makes.push(make);
        colours.push(COLOURS[i % COLOURS.len()]);
        y.push(14_000.0 - a * 650.0 - m * 0.05 + premium + rng.gen_range(-200.0..200.0));
    }
    let df = df! {
        "mileage" => mileage,
        "vehicle_age" => age,
        "mileage_to_age_ratio" => ratio,
        "standard_make" => makes,
        "standard_colour" => colours,
    }
    .unwrap();
    (
        df,
        ndarray::Array1::from(y),
        vec!["mileage".into(), "vehicle_age".into(), "mileage_to_age_ratio".into()],
        vec!["standard_make".into(), "standard_colour".into()],
    )
}
