use {
    crate::{
        bid::entities::{
            BidLadder,
            LadderBand,
            LadderError,
        },
        kernel::lock::LockOptions,
    },
    anyhow::Result,
    clap::{
        crate_authors,
        crate_description,
        crate_name,
        crate_version,
        Args,
        Parser,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::{
        fs,
        net::SocketAddr,
        path::Path,
    },
};

#[derive(Parser, Debug)]
#[command(name = crate_name!())]
#[command(author = crate_authors!())]
#[command(about = crate_description!())]
#[command(version = crate_version!())]
pub enum Options {
    /// Run the auction server.
    Run(RunOptions),
}

#[derive(Args, Clone, Debug)]
pub struct RunOptions {
    #[command(flatten)]
    pub server: ServerOptions,

    #[command(flatten)]
    pub config: ConfigOptions,
}

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Server Options")]
#[group(id = "Server")]
pub struct ServerOptions {
    /// Address and port to bind the HTTP server to.
    #[arg(long = "listen-addr")]
    #[arg(env = "LISTEN_ADDR")]
    #[arg(default_value = "127.0.0.1:9000")]
    pub listen_addr: SocketAddr,
}

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Config Options")]
#[group(id = "Config")]
pub struct ConfigOptions {
    /// Path to a YAML file overriding the engine defaults. Missing file means
    /// defaults.
    #[arg(long = "config")]
    #[arg(env = "AUCTION_CONFIG")]
    #[arg(default_value = "config.yaml")]
    pub config: String,
}

/// Engine tunables. Every field has a default, so any subset can be given in
/// the config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lock_timeout_ms:          u64,
    pub lock_max_retries:         u32,
    pub lock_retry_delay_ms:      u64,
    pub scheduler_interval_ms:    u64,
    /// Fail-safe: force-close ACTIVE auctions this long past their end time.
    pub grace_period_ms:          u64,
    /// How long the scheduler waits past the end time before auto-ending, so
    /// in-flight bids can drain. Bidders still see a hard close at the end
    /// time itself.
    pub bid_grace_period_ms:      u64,
    pub min_auction_duration_ms:  u64,
    pub ending_soon_threshold_ms: u64,
    pub ending_soon_throttle_ms:  u64,
    pub max_bids_per_minute:      u32,
    pub max_requests_per_minute:  u32,
    /// Custom bid ladder; the production table when absent.
    pub ladder:                   Option<Vec<LadderBand>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_timeout_ms:          500,
            lock_max_retries:         3,
            lock_retry_delay_ms:      100,
            scheduler_interval_ms:    5_000,
            grace_period_ms:          60_000,
            bid_grace_period_ms:      2_000,
            min_auction_duration_ms:  300_000,
            ending_soon_threshold_ms: 300_000,
            ending_soon_throttle_ms:  30_000,
            max_bids_per_minute:      10,
            max_requests_per_minute:  100,
            ladder:                   None,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Config> {
        if !Path::new(path).exists() {
            tracing::info!(path, "No config file found, using defaults.");
            return Ok(Config::default());
        }
        let yaml_content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&yaml_content)?;
        Ok(config)
    }

    pub fn bid_ladder(&self) -> Result<BidLadder, LadderError> {
        match &self.ladder {
            Some(bands) => BidLadder::new(bands.clone()),
            None => Ok(BidLadder::production()),
        }
    }

    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            timeout:     std::time::Duration::from_millis(self.lock_timeout_ms),
            max_retries: self.lock_max_retries,
            retry_delay: std::time::Duration::from_millis(self.lock_retry_delay_ms),
        }
    }

    pub fn scheduler_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.scheduler_interval_ms)
    }

    pub fn ending_soon_throttle(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ending_soon_throttle_ms)
    }

    pub fn grace_period(&self) -> time::Duration {
        time::Duration::milliseconds(self.grace_period_ms as i64)
    }

    pub fn bid_grace_period(&self) -> time::Duration {
        time::Duration::milliseconds(self.bid_grace_period_ms as i64)
    }

    pub fn min_auction_duration(&self) -> time::Duration {
        time::Duration::milliseconds(self.min_auction_duration_ms as i64)
    }

    pub fn ending_soon_threshold(&self) -> time::Duration {
        time::Duration::milliseconds(self.ending_soon_threshold_ms as i64)
    }
}
