use std::env;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub orders_base_url: String,
    pub invoicing_base_url: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let orders_base_url =
            env::var("ORDERS_BASE_URL").unwrap_or_else(|_| "http://localhost:8081".to_string());

        let invoicing_base_url =
            env::var("INVOICING_BASE_URL").unwrap_or_else(|_| "http://localhost:8082".to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        Ok(Config {
            orders_base_url,
            invoicing_base_url,
            host,
            port,
        })
    }
}
