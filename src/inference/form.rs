//! Pricing form input

use crate::data::{
    BODY_TYPE, CROSSOVER, FUEL_TYPE, MILEAGE, STANDARD_COLOUR, STANDARD_MAKE, STANDARD_MODEL, VEHICLE_CONDITION,
};
use crate::error::Result;
use crate::feature_engineering::{mileage_to_age_ratio, MILEAGE_TO_AGE_RATIO, VEHICLE_AGE};
use clap::ValueEnum;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_MILEAGE: i64 = 500_000;
pub const MAX_VEHICLE_AGE: i64 = 50;

/// Body styles offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum BodyType {
    #[serde(rename = "SUV")]
    #[value(name = "suv")]
    Suv,
    Hatchback,
    Saloon,
    Estate,
    Coupe,
    Convertible,
    #[serde(rename = "MPV")]
    #[value(name = "mpv")]
    Mpv,
    Other,
}

impl BodyType {
    pub const ALL: [BodyType; 8] = [
        BodyType::Suv,
        BodyType::Hatchback,
        BodyType::Saloon,
        BodyType::Estate,
        BodyType::Coupe,
        BodyType::Convertible,
        BodyType::Mpv,
        BodyType::Other,
    ];

    /// Label as it appears in the advert data
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Suv => "SUV",
            BodyType::Hatchback => "Hatchback",
            BodyType::Saloon => "Saloon",
            BodyType::Estate => "Estate",
            BodyType::Coupe => "Coupe",
            BodyType::Convertible => "Convertible",
            BodyType::Mpv => "MPV",
            BodyType::Other => "Other",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fuel types offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum FuelType {
    Petrol,
    Diesel,
    Hybrid,
    Electric,
    Other,
}

impl FuelType {
    pub const ALL: [FuelType; 5] = [
        FuelType::Petrol,
        FuelType::Diesel,
        FuelType::Hybrid,
        FuelType::Electric,
        FuelType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::Hybrid => "Hybrid",
            FuelType::Electric => "Electric",
            FuelType::Other => "Other",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One advert as entered by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvertForm {
    pub mileage: i64,
    pub vehicle_age: i64,
    pub body_type: BodyType,
    pub fuel_type: FuelType,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub colour: String,
    #[serde(default)]
    pub crossover: bool,
}

impl Default for AdvertForm {
    fn default() -> Self {
        Self {
            mileage: 50_000,
            vehicle_age: 5,
            body_type: BodyType::Suv,
            fuel_type: FuelType::Petrol,
            make: String::new(),
            model: String::new(),
            colour: "Black".to_string(),
            crossover: false,
        }
    }
}

impl AdvertForm {
    /// Pull mileage and age into the ranges the form accepts
    pub fn clamped(mut self) -> Self {
        self.mileage = self.mileage.clamp(0, MAX_MILEAGE);
        self.vehicle_age = self.vehicle_age.clamp(0, MAX_VEHICLE_AGE);
        self
    }

    /// One-row frame in the engineered advert layout. Condition is always `USED`.
    pub fn to_record(&self) -> Result<DataFrame> {
        let form = self.clone().clamped();
        let mileage = form.mileage as f64;
        let age = form.vehicle_age as f64;

        let df = df! {
            MILEAGE => [mileage],
            VEHICLE_AGE => [age],
            MILEAGE_TO_AGE_RATIO => [mileage_to_age_ratio(mileage, age)],
            STANDARD_COLOUR => [form.colour.as_str()],
            STANDARD_MAKE => [form.make.as_str()],
            STANDARD_MODEL => [form.model.as_str()],
            VEHICLE_CONDITION => ["USED"],
            BODY_TYPE => [form.body_type.as_str()],
            CROSSOVER => [form.crossover],
            FUEL_TYPE => [form.fuel_type.as_str()],
        }?;
        Ok(df)
    }
}
