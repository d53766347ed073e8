//! Pool and capture settings for the pooled engine.
//!
//! Environment variables read by [`PoolConfig::from_env`]:
//!
//! | Variable                   | Meaning                                  |
//! |----------------------------|------------------------------------------|
//! | `PRESS_POOL_SIZE`          | maximum number of live pages (default 2) |
//! | `CHROME_PATH`              | browser executable                       |
//! | `PRESS_ACQUIRE_TIMEOUT_MS` | how long `acquire` may wait for a page   |

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PressError, Result};

pub const DEFAULT_POOL_SIZE: usize = 2;

pub const ENV_POOL_SIZE: &str = "PRESS_POOL_SIZE";
pub const ENV_CHROME_PATH: &str = "CHROME_PATH";
pub const ENV_ACQUIRE_TIMEOUT_MS: &str = "PRESS_ACQUIRE_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on pages alive at once.
    pub capacity: usize,
    /// Browser executable; resolved from the environment and well-known
    /// install locations when absent.
    pub executable: Option<PathBuf>,
    /// `None` waits forever.
    pub acquire_timeout_ms: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_SIZE,
            executable: None,
            acquire_timeout_ms: None,
        }
    }
}

impl PoolConfig {
    /// Defaults overridden by whichever environment variables are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_POOL_SIZE) {
            config.capacity = parse_positive(ENV_POOL_SIZE, &raw)? as usize;
        }
        if let Some(raw) = lookup(ENV_CHROME_PATH) {
            if !raw.trim().is_empty() {
                config.executable = Some(PathBuf::from(raw.trim()));
            }
        }
        if let Some(raw) = lookup(ENV_ACQUIRE_TIMEOUT_MS) {
            config.acquire_timeout_ms = Some(parse_positive(ENV_ACQUIRE_TIMEOUT_MS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(PressError::Config(
                "pool size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(PressError::Config(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}

/// Page geometry handed to the browser's print-to-PDF call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    pub landscape: bool,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
    /// Inches.
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl PrintOptions {
    /// A4 portrait, no margins, backgrounds printed.
    pub fn a4() -> Self {
        Self {
            landscape: false,
            print_background: true,
            prefer_css_page_size: true,
            paper_width: 8.27,
            paper_height: 11.69,
            margin_top: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            margin_right: 0.0,
        }
    }
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self::a4()
    }
}
