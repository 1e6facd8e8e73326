use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    pub scraper: ScraperSettings,
    pub search: SearchSettings,
    pub webdriver: WebdriverSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ScraperSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_concurrent_http: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_concurrent_browsers: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pipeline_concurrency: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub internal_batch_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub min_html_len: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub host_delay_min_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub host_delay_max_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub fetch_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub stealth_timeout_secs: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SearchSettings {
    pub endpoint: String,
    pub region: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_results: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub directory_max_results: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub delay_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct WebdriverSettings {
    pub url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub page_load_timeout_secs: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CacheSettings {
    pub url_cache_file: String,
    pub results_cache_file: String,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");
    let environment_filename = format!("{}.yaml", environment.as_str());
    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
