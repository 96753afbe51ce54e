#![warn(clippy::all, rust_2018_idioms)]

use mapper::{config::Config, synthetic::SyntheticScene};
use slam::{grid::sensor_model::UNSEEN_VALUE, GridMap};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    // Log to stdout (if you run with `RUST_LOG=debug`).
    tracing_subscriber::fmt::init();

    // load configuration file
    let mut args = std::env::args();
    let config = match args.nth(1) {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    let mut map = GridMap::new(&config.map);
    if let Some(path) = &config.settings.resume_from {
        map.load(path)?;
    }

    let scene = SyntheticScene::new(&config.scene)?;
    let mut rng = rand::thread_rng();

    for i in 0..config.settings.scans {
        let scan = scene.scan(i, map.readings_per_scan(), map.sensor_range(), &mut rng);

        if let Err(e) = map.ingest(&scan.readings) {
            error!("{e}");
            std::process::exit(e.exit_code());
        }

        map.save(config.settings.output_path(i))?;
    }

    if let Some(raster) = map.raster() {
        let observed = raster.iter().filter(|&&v| v != UNSEEN_VALUE).count();
        info!(
            "Mapping has been completed, {observed} of {} cells observed",
            raster.as_slice().len()
        );
    }

    Ok(())
}
