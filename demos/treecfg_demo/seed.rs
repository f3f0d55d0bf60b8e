//! Host data used to seed a fresh configuration file.
//!
//! Any `Serialize` type can become a tree through
//! [`treecfg::Config::from_serialize`]; nested structs become groups and
//! vectors become lists.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SeedConfig {
    pub name: String,
    pub data_dir: String,
    pub server: ServerSeed,
    pub servers: Vec<PeerSeed>,
    /// 2x2 calibration matrix, stored as nested lists.
    pub calibration: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub struct ServerSeed {
    pub host: String,
    pub port: u16,
    pub log_file: String,
}

#[derive(Debug, Serialize)]
pub struct PeerSeed {
    pub name: String,
    pub weight: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            name: "treecfg-demo".into(),
            data_dir: "data/%USER%".into(),
            server: ServerSeed {
                host: "localhost".into(),
                port: 8080,
                log_file: "logs/server.log".into(),
            },
            servers: vec![
                PeerSeed {
                    name: "alpha".into(),
                    weight: 1.0,
                },
                PeerSeed {
                    name: "beta".into(),
                    weight: 0.5,
                },
            ],
            calibration: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        }
    }
}
