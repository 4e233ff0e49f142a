use anyhow::{Context, Result};
use ndvi::{ClientConfig, Coordinate, EarthEngineClient, NdviAnalyzer, ServiceAccountKey};
use serde::Serialize;
use std::path::PathBuf;

/// Connection options shared by commands that reach Earth Engine.
pub struct Options {
    pub key_file: Option<PathBuf>,
    pub api_url: Option<String>,
    pub token_url: Option<String>,
    pub project: Option<String>,
}

#[derive(Serialize)]
struct NdviOutput {
    lat: f64,
    lon: f64,
    date: String,
    ndvi: f64,
}

pub async fn run(options: Options, lat: f64, lon: f64, json: bool) -> Result<()> {
    let point = Coordinate::new(lat, lon)?;

    let key = match &options.key_file {
        Some(path) => ServiceAccountKey::from_file(path)?,
        None => ServiceAccountKey::from_env()
            .context("No service-account key. Use --key-file or set GEE_PRIVATE_KEY")?,
    };

    let mut config = ClientConfig::default();
    if let Some(url) = options.api_url {
        config = config.with_api_url(url);
    }
    if let Some(url) = options.token_url {
        config = config.with_token_url(url);
    }
    if let Some(project) = options.project {
        config = config.with_project(project);
    }

    let client = EarthEngineClient::new(config).context("Failed to create Earth Engine client")?;
    let result = NdviAnalyzer::new(client)
        .analyze(&key, point)
        .await
        .context("Failed to get NDVI")?;

    if json {
        let output = NdviOutput {
            lat,
            lon,
            date: result.date,
            ndvi: result.ndvi,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} {:.4}", result.date, result.ndvi);
    }

    Ok(())
}
