mod biomass;
mod config;
mod grid;
mod reader;
mod render;

use biomass::compute_biomass_estimates;
use config::AnalysisConfig;
use std::path::Path;

const CONFIG_PATH: &str = "./data/config/analysis.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting chlorophyll-a biomass analysis...");

    let config = AnalysisConfig::from_file_or_default(CONFIG_PATH)?;
    println!("Dataset: {}", config.dataset());

    let slice = reader::load_chlorophyll(&config)?;
    match slice.timestamp {
        Some(timestamp) => println!(
            "Time step {} ({})",
            config.time_index(),
            timestamp.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("Time step {}", config.time_index()),
    }
    println!("{}", slice.field);

    let estimate = compute_biomass_estimates(
        &slice.field,
        config.mixed_layer_depth_m(),
        config.pixel_area_km2(),
    );

    render::render_figure(
        &slice.grid,
        &slice.field,
        &estimate,
        config.mixed_layer_depth_m(),
        Path::new(config.output()),
    )?;

    println!("\n{}", estimate.text_block());
    println!("\nFigure written to {}", config.output());

    Ok(())
}
