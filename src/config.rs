use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// ESP32-CAM multi-stream relay server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "camrelay-server", version, about = "Multi-stream WebSocket relay server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "CAMRELAY_PORT", default_value = "3000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "CAMRELAY_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./camrelay.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "CAMRELAY_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persisted device config records
    #[arg(long, env = "CAMRELAY_DATA_DIR", default_value = "./data")]
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "0.0.0.0".to_string(),
            config: "./camrelay.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (CAMRELAY_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(std::env::args_os())
    }

    fn load_from<I, T>(args: I) -> Result<Self, figment::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Config::command().get_matches_from(args);
        let cli = Config::from_arg_matches(&matches)
            .map_err(|e| figment::Error::from(e.to_string()))?;
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("CAMRELAY_"))
            .merge(Serialized::defaults(cli_overrides(&cli, &matches)))
            .extract()
    }
}

/// Collect only the values actually given on the command line. Merging the
/// whole parsed struct would let clap's fallback defaults shadow the TOML
/// file and env vars.
fn cli_overrides(cli: &Config, matches: &ArgMatches) -> serde_json::Value {
    let given = |key: &str| matches.value_source(key) == Some(ValueSource::CommandLine);

    let mut overrides = serde_json::Map::new();
    if given("port") {
        overrides.insert("port".to_string(), cli.port.into());
    }
    if given("bind_address") {
        overrides.insert("bind_address".to_string(), cli.bind_address.clone().into());
    }
    if given("config") {
        overrides.insert("config".to_string(), cli.config.clone().into());
    }
    if given("json_logs") {
        overrides.insert("json_logs".to_string(), cli.json_logs.into());
    }
    if given("generate_config") {
        overrides.insert("generate_config".to_string(), cli.generate_config.into());
    }
    if given("data_dir") {
        overrides.insert("data_dir".to_string(), cli.data_dir.clone().into());
    }

    serde_json::Value::Object(overrides)
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# camrelay Server Configuration
# Place this file at ./camrelay.toml or specify with --config <path>
# All settings can be overridden via environment variables (CAMRELAY_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 3000)
# port = 3000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for persisted device config records
# data_dir = "./data"
"#
    .to_string()
}
