use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_token: String,
    pub api_base_url: String,
    pub page_size: u32,
    pub fetch_timeout_secs: u64,
    pub read_status_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            api_token: env::var("MESSAGING_API_TOKEN")
                .map_err(|e| format!("MESSAGING_API_TOKEN: {}", e))?,
            api_base_url: env::var("MESSAGING_API_BASE_URL")
                .unwrap_or_else(|_| "https://slack.com/api".to_string()),
            page_size: env::var("MESSAGING_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            fetch_timeout_secs: env::var("MESSAGING_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            read_status_path: env::var("READ_STATUS_PATH")
                .unwrap_or_else(|_| "read_status.json".to_string()),
        })
    }
}
