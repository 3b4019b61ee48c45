use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::filter::FilterConfig;
use crate::sink::SinkConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "traffi-filter", about = "Durable vehicle ids and prohibited-turn counting over detection frames")]
pub struct Settings {
    /// Boundary zone file, one zone per line
    #[arg(long, env = "TRAFFI_ZONES", default_value = DEFAULT_CONFIG_PATH)]
    pub zones: PathBuf,

    /// JSON-lines frame input, stdin when omitted
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Reload the zone file whenever it is rewritten
    #[arg(long)]
    pub watch: bool,

    /// Post detection and crossing events to the line-protocol endpoint
    #[arg(long)]
    pub sink: bool,

    #[arg(long, env = "TRAFFI_SINK_HOST", default_value = "http://localhost:8086")]
    pub sink_host: String,

    #[arg(long, env = "TRAFFI_SINK_ORG", default_value = "traffi")]
    pub sink_org: String,

    #[arg(long, env = "TRAFFI_SINK_BUCKET", default_value = "traffi")]
    pub sink_bucket: String,

    #[arg(long, env = "TRAFFI_SINK_TOKEN", hide_env_values = true)]
    pub sink_token: Option<String>,

    /// Directory for periodic raw detection dumps
    #[arg(long, value_name = "DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Dump every N-th frame
    #[arg(long, default_value_t = 100)]
    pub dump_interval: u64,

    /// Frames an unseen vehicle is kept for
    #[arg(long, default_value_t = crate::tracker::INITIAL_TTL)]
    pub ttl: i32,
}

impl Settings {
    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            host: self.sink_host.clone(),
            org: self.sink_org.clone(),
            bucket: self.sink_bucket.clone(),
            token: self.sink_token.clone(),
            ..Default::default()
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            initial_ttl: self.ttl,
            ..Default::default()
        }
    }
}
