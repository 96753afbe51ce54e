use std::{fs, path::PathBuf};

use anyhow::anyhow;
use serde::Deserialize;
use slam::{GridMapConfig, SensorPose};

use crate::synthetic::SceneConfig;

#[derive(Deserialize)]
pub struct Config {
    pub map: GridMapConfig,

    #[serde(default)]
    pub scene: SceneConfig,

    pub settings: Settings,
}

#[derive(Deserialize)]
pub struct Settings {
    /// number of scans to integrate
    pub scans: usize,

    /// output file name, `{}` is replaced by the scan number
    #[serde(default = "default_output")]
    pub output: String,

    /// previously saved map to continue from
    #[serde(default)]
    pub resume_from: Option<PathBuf>,
}

fn default_output() -> String {
    "occ_grid{}.png".to_owned()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map: GridMapConfig {
                width: 80,
                height: 80,
                resolution: 0.2,
                sensor_range: 8.0,
                decay_rate: 1.0,
                sensor_cov: 0.2,
                readings_per_scan: 360,
                pose: SensorPose::default(),
            },
            scene: SceneConfig::default(),
            settings: Settings {
                scans: 10,
                output: default_output(),
                resume_from: None,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &String) -> anyhow::Result<Self> {
        // read file contents
        let contents = fs::read_to_string(path)?;

        serde_yaml::from_str(&contents).map_err(|e| anyhow!(e))
    }
}

impl Settings {
    pub fn output_path(&self, scan: usize) -> PathBuf {
        PathBuf::from(self.output.replace("{}", &scan.to_string()))
    }
}
