use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "PORT", default = "5000")]
    pub port: u16,

    #[envconfig(
        from = "BRIGHTDATA_API_URL",
        default = "https://api.brightdata.com/datasets/v3"
    )]
    pub brightdata_api_url: String,

    // Used when a caller does not pass `datasetId`
    #[envconfig(from = "BRIGHTDATA_DATASET_ID", default = "gd_lz11l67o2cb3r0lkj3")]
    pub dataset_id: String,

    // Optional proxy for upstream traffic, e.g. "socks5://127.0.0.1:9050"
    #[envconfig(from = "UPSTREAM_PROXY")]
    pub upstream_proxy: Option<String>,

    #[envconfig(from = "UPSTREAM_TIMEOUT_SECS", default = "30")]
    pub upstream_timeout_secs: u64,
}

impl Config {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}
