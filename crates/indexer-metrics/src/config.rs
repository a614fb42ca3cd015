use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Metrics server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Metrics server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9090
}

impl MetricsConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("METRICS_HOST").unwrap_or_else(|_| default_host()),
            port: std::env::var("METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_port),
        }
    }

    /// The endpoint runs when a port is given or metrics are switched on
    pub fn enabled_in_env() -> bool {
        std::env::var("METRICS_PORT").is_ok()
            || std::env::var("METRICS_ENABLED")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_and_serde_defaults() {
        let config: MetricsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.address(), "0.0.0.0:9090");

        let config: MetricsConfig = serde_json::from_str(r#"{"host":"127.0.0.1","port":9100}"#).unwrap();
        assert_eq!(config.address(), "127.0.0.1:9100");
    }
}
