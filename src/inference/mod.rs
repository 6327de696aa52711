//! Serving surface
//!
//! Turns a pricing form into a one-row feature frame, applies a persisted
//! model and formats the result. The serving model is loaded once per
//! process through [`ModelCache`].

mod artifact;
mod estimator;
mod form;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use estimator::{format_price, ModelCache, PriceEstimator};
pub use form::{AdvertForm, BodyType, FuelType, MAX_MILEAGE, MAX_VEHICLE_AGE};
