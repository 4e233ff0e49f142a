use anyhow::Result;
use chrono::Utc;
use ndvi::analysis::{image_index, latest_clear_image, ndvi_summary};
use ndvi::expr::Expression;
use ndvi::Coordinate;
use serde::Serialize;

#[derive(Serialize)]
struct Expressions {
    lookup: Expression,
    evaluation: Expression,
}

pub fn run(lat: f64, lon: f64) -> Result<()> {
    let point = Coordinate::new(lat, lon)?;
    let image = latest_clear_image(&point, Utc::now());

    let output = Expressions {
        lookup: image_index(&image),
        evaluation: Expression::new(ndvi_summary(&image, &point)),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
