//! Harness configuration.
//!
//! The only switch that changes behaviour is the real-service flag. It is
//! read from, in order of precedence:
//! 1. The command line: `--use-real-aws-may-incur-charges`
//! 2. Environment: `USE_REAL_AWS_MAY_INCUR_CHARGES=true` (also `1`, `yes`, `on`)
//!
//! `cargo test` rejects flags it does not know, so the environment variable
//! is the usual way to turn it on. A value that is not a boolean is an
//! error, never a silent fallback to stubbing.

use clap::builder::BoolishValueParser;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::sync::OnceLock;
use stubkit_util::{HarnessError, StubResult};
use tracing::warn;

/// Command line flag that switches tests to the real service.
pub const REAL_AWS_FLAG: &str = "--use-real-aws-may-incur-charges";

/// Environment variable equivalent of [`REAL_AWS_FLAG`].
pub const REAL_AWS_ENV: &str = "USE_REAL_AWS_MAY_INCUR_CHARGES";

/// Region used when neither `--region` nor `AWS_REGION` is set.
pub const DEFAULT_REGION: &str = "us-west-2";

static CONFIG: OnceLock<HarnessConfig> = OnceLock::new();

/// Command line options understood by the harness.
#[derive(Debug, Clone, Parser)]
#[command(name = "stubkit", about = "Options for stubbed AWS tests", long_about = None)]
pub struct HarnessArgs {
    /// Connect to real AWS services while testing. **Warning: this might incur
    /// charges on your account!**
    #[arg(
        long = "use-real-aws-may-incur-charges",
        env = REAL_AWS_ENV,
        value_parser = BoolishValueParser::new()
    )]
    pub use_real_aws: bool,

    /// Default region for clients and buckets.
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,
}

/// Resolved harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Pass calls through to the real service instead of stubbing them.
    pub use_real_aws: bool,

    /// Default region for clients and buckets.
    pub default_region: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            use_real_aws: false,
            default_region: DEFAULT_REGION.to_string(),
        }
    }
}

impl From<HarnessArgs> for HarnessConfig {
    fn from(args: HarnessArgs) -> Self {
        Self {
            use_real_aws: args.use_real_aws,
            default_region: args.region,
        }
    }
}

impl HarnessConfig {
    /// A stubbing configuration in the default region.
    pub fn stubbed() -> Self {
        Self::default()
    }

    /// A passthrough configuration in the default region.
    pub fn real_aws() -> Self {
        Self {
            use_real_aws: true,
            ..Self::default()
        }
    }

    /// Whether stubbers should queue stubs.
    pub fn use_stubs(&self) -> bool {
        !self.use_real_aws
    }

    /// Parse command line arguments. The first item is the program name.
    pub fn from_args<I, T>(args: I) -> StubResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        HarnessArgs::try_parse_from(args)
            .map(Self::from)
            .map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Read the configuration from the environment only.
    pub fn from_env() -> StubResult<Self> {
        Self::from_args(["stubkit"])
    }

    /// The process-wide configuration, read from the environment once.
    ///
    /// An invalid environment is reported on every call and nothing is cached,
    /// so a mistyped switch never degrades into stubbing.
    pub fn load() -> StubResult<&'static HarnessConfig> {
        if let Some(config) = CONFIG.get() {
            return Ok(config);
        }
        let config = Self::from_env()?;
        if config.use_real_aws {
            warn!("Tests will call real AWS services and may incur charges");
        }
        Ok(CONFIG.get_or_init(|| config))
    }
}
