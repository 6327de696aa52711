//! Model comparison chart
//!
//! A bar per trained model showing its held-out mean absolute error,
//! written as SVG.

use crate::error::{AutopriceError, Result};
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 500;

fn render_error(e: impl std::fmt::Display) -> AutopriceError {
    AutopriceError::RenderError(e.to_string())
}

/// Render `(model, mae)` bars to an SVG document.
pub fn render_mae_bar(entries: &[(String, f64)]) -> Result<String> {
    if entries.is_empty() {
        return Err(AutopriceError::ValidationError("no models to chart".to_string()));
    }
    if let Some((name, mae)) = entries.iter().find(|(_, mae)| !mae.is_finite()) {
        return Err(AutopriceError::ValidationError(format!("MAE for '{name}' is {mae}")));
    }

    let y_max = entries.iter().map(|(_, mae)| *mae).fold(0.0_f64, f64::max).max(1.0);
    let n = entries.len();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Mean absolute error by model", ("sans-serif", 26))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..n as f64, 0f64..y_max * 1.1)
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| {
                let idx = x.floor() as usize;
                entries.get(idx).map(|(name, _)| name.clone()).unwrap_or_default()
            })
            .y_desc("MAE (£)")
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(entries.iter().enumerate().map(|(i, (_, mae))| {
                let x = i as f64;
                Rectangle::new([(x + 0.15, 0.0), (x + 0.85, *mae)], Palette99::pick(i).filled())
            }))
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
    }
    Ok(svg)
}

/// Render the MAE bar chart and write it to `path`, creating parent directories.
pub fn mae_bar(entries: &[(String, f64)], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let svg = render_mae_bar(entries)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, svg)?;
    info!(path = %path.display(), bars = entries.len(), "Wrote MAE chart");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<(String, f64)> {
        vec![
            ("lr".to_string(), 2_100.0),
            ("rfr".to_string(), 1_400.0),
            ("gbr".to_string(), 1_200.0),
            ("ensemble".to_string(), 1_300.0),
        ]
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(matches!(render_mae_bar(&[]), Err(AutopriceError::ValidationError(_))));
        let bad = vec![("lr".to_string(), f64::NAN)];
        assert!(matches!(render_mae_bar(&bad), Err(AutopriceError::ValidationError(_))));
    }

    #[test]
    fn test_writes_svg_or_reports_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images").join("mae_bar.svg");
        // Text layout needs a system font; without one plotters fails to render.
        match mae_bar(&entries(), &path) {
            Ok(()) => {
                let svg = std::fs::read_to_string(&path).unwrap();
                assert!(svg.contains("<svg"));
                assert!(svg.contains("<rect"));
            }
            Err(e) => assert!(matches!(e, AutopriceError::RenderError(_))),
        }
    }
}
