use crate::template::DEFAULT_TEMPLATE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Command {
    /** Fetch a subscription and generate a config */
    Generate {
        url: String,
        #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
        template: String,
        #[arg(short, long, default_value = "openclash_config.yaml")]
        output: PathBuf,
    },
    /** Generate a config from a local subscription body */
    Convert {
        file: PathBuf,
        #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
        template: String,
        #[arg(short, long, default_value = "openclash_config.yaml")]
        output: PathBuf,
    },
    /** Generate one config per entry of a JSON or text list */
    Batch {
        file: PathBuf,
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },
    /** Check an existing config */
    Validate { file: PathBuf },
    /** List available templates */
    Templates,
    /** Run the web API */
    #[cfg(feature = "web")]
    Serve {
        #[arg(short, long, default_value = "127.0.0.1:5000")]
        listen: std::net::SocketAddr,
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },
}

#[derive(Parser)]
#[command(version)]
pub struct Args {
    /// Directory of `{name}_template.yaml` files, built-in templates otherwise
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,
    /// Skip certificate verification when fetching
    #[arg(long, global = true)]
    pub insecure: bool,
    #[command(subcommand)]
    pub command: Command,
}
