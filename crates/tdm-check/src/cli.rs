use clap::Parser;
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "tdm-check", version, about = "Check TDM reservation signals for a URL")]
pub struct Cli {
    /// URL to check
    pub url: Url,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Request timeout in seconds (overrides config file setting)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// User-Agent header sent with requests (overrides config file setting)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Print the decision as a JSON object instead of prose
    #[arg(long)]
    pub json: bool,

    /// Skip the well-known tdmrep.json channel
    #[arg(long)]
    pub no_document: bool,

    /// Skip the response-header channel
    #[arg(long)]
    pub no_headers: bool,

    /// Skip the HTML meta-tag channel
    #[arg(long)]
    pub no_meta: bool,
}
