use {
    bondgov_client::{
        config::{ClientConfig, ConfigError},
        ClientError,
    },
    clap::ArgMatches,
    serde::Serialize,
    std::{fmt, path::Path},
    thiserror::Error,
};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

pub type ProcessResult = Result<String, CliError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Display,
    Json,
    JsonCompact,
}

impl OutputFormat {
    pub fn from_matches_value(value: Option<&str>) -> Self {
        match value {
            Some("json") => Self::Json,
            Some("json-compact") => Self::JsonCompact,
            _ => Self::Display,
        }
    }

    pub fn formatted_string<T: Serialize + fmt::Display>(&self, item: &T) -> ProcessResult {
        Ok(match self {
            Self::Display => item.to_string(),
            Self::Json => serde_json::to_string_pretty(item)?,
            Self::JsonCompact => serde_json::to_string(item)?,
        })
    }
}

/// Resolved command-line settings.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub output_format: OutputFormat,
}

/// Load the config file and apply flag overrides.  Global flags are read
/// from the subcommand's matches, where clap places them.
pub fn load_config(matches: &ArgMatches<'_>) -> Result<(CliConfig, ClientConfig), CliError> {
    let mut client = ClientConfig::load_or_default(matches.value_of("config_file").map(Path::new))?;
    if let Some(url) = matches.value_of("json_rpc_url") {
        client.json_rpc_url = url.to_string();
    }
    if let Some(keypair) = matches.value_of("keypair") {
        client.keypair_path = keypair.to_string();
    }
    client.validate()?;
    let config = CliConfig {
        output_format: OutputFormat::from_matches_value(matches.value_of("output_format")),
    };
    Ok((config, client))
}
