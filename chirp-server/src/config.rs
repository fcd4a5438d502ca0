use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Upper bound for request bodies; base64 images make these large
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub path: String,
    /// Insert the fixed seed user on startup
    pub seed: bool,
}

#[derive(Debug, Deserialize)]
pub struct Uploads {
    pub dir: String,
}

#[derive(Debug, Deserialize)]
pub struct Placeholder {
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub uploads: Uploads,
    pub placeholder: Placeholder,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // settings.toml is optional; look in the current dir, then the crate dir
        let config_file_name = "settings.toml";

        let current_dir_path = PathBuf::from(config_file_name);
        if current_dir_path.exists() {
            builder = builder.add_source(File::from(current_dir_path).required(false));
        }

        let dev_path = PathBuf::from("chirp-server").join(config_file_name);
        if dev_path.exists() {
            builder = builder.add_source(File::from(dev_path).required(false));
        }

        builder = builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.max_body_bytes", 10 * 1024 * 1024)?
            .set_default("database.path", "chirp.db")?
            .set_default("database.seed", true)?
            .set_default("uploads.dir", "uploads")?
            .set_default("placeholder.enabled", true)?
            .set_default("placeholder.url", "https://picsum.photos/200/300")?
            .set_default("placeholder.timeout_secs", 10)?;

        // Environment variables win over the file
        if let Ok(db_path) = std::env::var("DATABASE_PATH") {
            builder = builder.set_override("database.path", db_path)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }
        if let Ok(host) = std::env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }
        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            builder = builder.set_override("uploads.dir", dir)?;
        }
        if let Ok(url) = std::env::var("PLACEHOLDER_URL") {
            builder = builder.set_override("placeholder.url", url)?;
        }

        let s = builder.build()?;
        s.try_deserialize()
    }
}
