//! Request handlers

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::inference::{format_price, AdvertForm, BodyType, FuelType, MAX_MILEAGE, MAX_VEHICLE_AGE};
use axum::{
    extract::{Path, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub price: f64,
    pub formatted: String,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.model.is_loaded(),
    }))
}

pub async fn list_makes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>> {
    let makes = tokio::task::spawn_blocking(move || state.lookup.list_makes())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok(Json(makes))
}

pub async fn list_models(State(state): State<Arc<AppState>>, Path(make): Path<String>) -> Result<Json<Vec<String>>> {
    let models = tokio::task::spawn_blocking(move || state.lookup.list_models(&make))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok(Json(models))
}

pub async fn predict(State(state): State<Arc<AppState>>, Json(form): Json<AdvertForm>) -> Result<Json<PredictResponse>> {
    let form = form.clamped();
    let price = tokio::task::spawn_blocking(move || -> crate::error::Result<f64> {
        let estimator = state.model.get()?;
        estimator.predict(&form)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    let formatted = format_price(price);
    info!(price, formatted = %formatted, "Served estimate");
    Ok(Json(PredictResponse { price, formatted }))
}

pub async fn serve_index() -> Html<String> {
    let options = |labels: &[&str]| {
        labels
            .iter()
            .map(|l| format!(r#"<option value="{l}">{l}</option>"#))
            .collect::<String>()
    };
    let body_types: Vec<&str> = BodyType::ALL.iter().map(BodyType::as_str).collect();
    let fuel_types: Vec<&str> = FuelType::ALL.iter().map(FuelType::as_str).collect();

    Html(
        INDEX_HTML
            .replace("{{MAX_MILEAGE}}", &MAX_MILEAGE.to_string())
            .replace("{{MAX_AGE}}", &MAX_VEHICLE_AGE.to_string())
            .replace("{{BODY_TYPES}}", &options(&body_types))
            .replace("{{FUEL_TYPES}}", &options(&fuel_types)),
    )
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Used Car Price Estimator</title>
    <style>
        body { font-family: sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }
        form { display: grid; grid-template-columns: 1fr 1fr; gap: 0.75rem 1.5rem; }
        label { display: flex; flex-direction: column; font-size: 0.9rem; }
        button { grid-column: span 2; padding: 0.6rem; font-size: 1rem; }
        #result { margin-top: 1.5rem; font-size: 1.4rem; }
    </style>
</head>
<body>
    <h1>Used Car Price Estimator</h1>
    <p>Fill in the advert details below and hit <strong>Predict</strong> to see an estimated price (&pound;).</p>
    <form id="advert">
        <label>Mileage <input type="number" name="mileage" min="0" max="{{MAX_MILEAGE}}" step="1000" value="50000"></label>
        <label>Make <select name="make" id="make"><option value="">Select make&hellip;</option></select></label>
        <label>Vehicle age (years) <input type="number" name="vehicle_age" min="0" max="{{MAX_AGE}}" value="5"></label>
        <label>Model <select name="model" id="model"><option value="">Select model&hellip;</option></select></label>
        <label>Body type <select name="body_type">{{BODY_TYPES}}</select></label>
        <label>Colour <input type="text" name="colour" value="Black"></label>
        <label>Fuel type <select name="fuel_type">{{FUEL_TYPES}}</select></label>
        <label>Car-and-Van crossover? <input type="checkbox" name="crossover"></label>
        <button type="submit">Predict</button>
    </form>
    <div id="result"></div>
    <script>
        const make = document.getElementById('make');
        const model = document.getElementById('model');
        const fill = (select, values, placeholder) => {
            select.replaceChildren(new Option(placeholder, ''), ...values.map(v => new Option(v, v)));
        };
        fetch('/api/makes').then(r => r.ok ? r.json() : []).then(m => fill(make, m, 'Select make…'));
        make.addEventListener('change', () => {
            if (!make.value) { fill(model, [], 'Select model…'); return; }
            fetch(`/api/makes/${encodeURIComponent(make.value)}/models`)
                .then(r => r.ok ? r.json() : []).then(m => fill(model, m, 'Select model…'));
        });
        document.getElementById('advert').addEventListener('submit', async (e) => {
            e.preventDefault();
            const f = new FormData(e.target);
            const payload = {
                mileage: parseInt(f.get('mileage') || '0', 10),
                vehicle_age: parseInt(f.get('vehicle_age') || '0', 10),
                body_type: f.get('body_type'),
                fuel_type: f.get('fuel_type'),
                make: f.get('make'),
                model: f.get('model'),
                colour: f.get('colour'),
                crossover: f.get('crossover') === 'on',
            };
            const res = await fetch('/api/predict', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(payload),
            });
            const body = await res.json();
            document.getElementById('result').textContent =
                res.ok ? `Estimated price: ${body.formatted}` : body.message;
        });
    </script>
</body>
</html>
"#;
