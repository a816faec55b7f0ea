use std::fs::read_to_string;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use extract::{coverage_to_geojson, read_geometry, shape_to_geojson, write_feature_collection};
use geojson::{Feature, FeatureCollection};
use log::info;
use process::{
    adaptive_geohash_coverage, geohash_coverage, geohash_coverage_debug, geohashes_to_shape,
};
use types::{CoverageConfig, CoverageResult, LevelStats};

#[derive(Parser)]
#[command(version, about, long_about)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refine geohash tiles from min to max level over a polygon.
    Adaptive {
        #[arg(short, long)]
        geometry_path: String,

        #[arg(long)]
        min_level: Option<usize>,

        #[arg(long)]
        max_level: Option<usize>,

        #[arg(short, long)]
        threshold: Option<f64>,

        #[arg(long)]
        no_index: bool,

        #[arg(short, long)]
        config_path: Option<String>,

        #[arg(short, long)]
        output_path: Option<String>,
    },
    /// Geohash tiles of a single level covering a polygon.
    Single {
        #[arg(short, long)]
        geometry_path: String,

        #[arg(short, long)]
        level: usize,

        #[arg(short, long)]
        threshold: Option<f64>,

        #[arg(long)]
        no_index: bool,

        #[arg(short, long)]
        debug: bool,

        #[arg(long)]
        dissolve: bool,

        #[arg(short, long)]
        config_path: Option<String>,

        #[arg(short, long)]
        output_path: Option<String>,
    },
    /// Turn geohashes into box polygons.
    Boxes {
        #[arg(long, value_delimiter = ',', required = true)]
        geohashes: Vec<String>,

        #[arg(long)]
        dissolve: bool,

        #[arg(short, long)]
        output_path: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Args::parse();

    match cli.command {
        Commands::Adaptive {
            geometry_path,
            min_level,
            max_level,
            threshold,
            no_index,
            config_path,
            output_path,
        } => {
            let mut config = coverage_config(config_path.as_deref())?;
            config.min_level = min_level.unwrap_or(config.min_level);
            config.max_level = max_level.unwrap_or(config.max_level);
            config.threshold = threshold.unwrap_or(config.threshold);
            config.use_index &= !no_index;
            config.validate()?;

            let shape = read_geometry(&geometry_path, true)?;
            let (result, tiles) = adaptive_geohash_coverage(
                shape,
                config.min_level,
                config.max_level,
                &config.options(),
            )?;
            log_level_stats(&result);

            if let Some(output_path) = output_path {
                write_feature_collection(&output_path, &coverage_to_geojson(&tiles))?;
            }
        }
        Commands::Single {
            geometry_path,
            level,
            threshold,
            no_index,
            debug,
            dissolve,
            config_path,
            output_path,
        } => {
            let config = single_config(config_path.as_deref(), threshold, no_index, dissolve)?;
            let options = config.options();

            let shape = read_geometry(&geometry_path, true)?;
            let result = if debug {
                let classification = geohash_coverage_debug(shape, level, &options)?;
                info!(
                    "level {}: {} covering, {} partial",
                    level,
                    classification.covering.len(),
                    classification.partial.len()
                );
                for hash in &classification.partial {
                    info!("  partial {}", hash);
                }
                CoverageResult::from(classification)
            } else {
                geohash_coverage(shape, level, &options)?
            };
            log_level_stats(&result);

            if let Some(output_path) = output_path {
                let shape = geohashes_to_shape(result.geohashes(), config.dissolve)?;
                write_feature_collection(&output_path, &shape_to_geojson(&shape, false))?;
            }
        }
        Commands::Boxes {
            geohashes,
            dissolve,
            output_path,
        } => {
            let shape = geohashes_to_shape(&geohashes, dissolve)?;
            info!(
                "{} geohashes -> {} parts, area {:.10} square degrees",
                geohashes.len(),
                shape.num_parts(),
                shape.area()
            );
            let collection = shape_to_geojson(&shape, false);
            match output_path {
                Some(output_path) => write_feature_collection(&output_path, &collection)?,
                None => println!("{}", feature_or_collection(collection)),
            }
        }
    }
    Ok(())
}

fn coverage_config(config_path: Option<&str>) -> Result<CoverageConfig> {
    let Some(config_path) = config_path else {
        return Ok(CoverageConfig::default());
    };
    let config_str = read_to_string(config_path)
        .with_context(|| format!("reading config {config_path}"))?;
    serde_json::from_str(&config_str).with_context(|| format!("parsing config {config_path}"))
}

/// Config file values, overridden by the `single` flags.
fn single_config(
    config_path: Option<&str>,
    threshold: Option<f64>,
    no_index: bool,
    dissolve: bool,
) -> Result<CoverageConfig> {
    let mut config = coverage_config(config_path)?;
    config.threshold = threshold.unwrap_or(config.threshold);
    config.use_index &= !no_index;
    config.dissolve |= dissolve;
    Ok(config)
}

fn log_level_stats(result: &CoverageResult) {
    let stats = LevelStats::from_result(result);
    for level in &stats.levels {
        info!(
            "level {}: {} tiles ({:.1}%)",
            level.level,
            level.tiles,
            level.share * 100.0
        );
    }
    info!("total tiles: {}", stats.total);
}

fn feature_or_collection(mut collection: FeatureCollection) -> String {
    if collection.features.len() == 1 {
        let feature: Feature = collection.features.remove(0);
        return feature.to_string();
    }
    collection.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_accepts_dissolve_flag() {
        let args = Args::try_parse_from([
            "polycover", "single", "-g", "area.geojson", "-l", "6", "--dissolve",
        ])
        .unwrap();
        let Commands::Single { level, dissolve, .. } = args.command else {
            panic!("expected the single subcommand");
        };
        assert_eq!(level, 6);
        assert!(dissolve);
    }

    #[test]
    fn single_flags_override_defaults() {
        let config = single_config(None, Some(0.5), true, true).unwrap();
        assert!(config.dissolve);
        assert!(!config.use_index);
        assert_eq!(config.threshold, 0.5);

        let config = single_config(None, None, false, false).unwrap();
        assert!(!config.dissolve);
        assert!(config.use_index);
        assert_eq!(config.threshold, CoverageConfig::default().threshold);
    }
}
