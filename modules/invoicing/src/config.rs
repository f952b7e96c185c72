use std::env;
use std::path::PathBuf;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub store_type: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").ok();

        let store_type = env::var("STORE_TYPE").unwrap_or_else(|_| "inmemory".to_string());

        let bus_type = env::var("BUS_TYPE").unwrap_or_else(|_| "inmemory".to_string());

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8082".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/app/uploads/invoices"));

        Ok(Config {
            database_url,
            store_type,
            bus_type,
            nats_url,
            host,
            port,
            upload_dir,
        })
    }
}
