//! Headless Chrome/Chromium behind the pool's browser traits.
//!
//! `headless_chrome` talks to the browser synchronously, so every call runs on
//! tokio's blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::config::{PrintOptions, ENV_CHROME_PATH};
use crate::error::{PressError, Result};
use crate::pool::{BrowserLauncher, BrowserPage, BrowserProcess};

/// Also honoured, after `CHROME_PATH`.
pub const ENV_PUPPETEER_PATH: &str = "PUPPETEER_EXECUTABLE_PATH";

/// How long the driver keeps a quiet browser connection open. headless_chrome
/// drops it after 30s without events by default, which kills an idle pool.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Text of headless_chrome's error once the browser connection is gone.
const CONNECTION_CLOSED: &str = "connection is closed";

/// Install locations tried when nothing is configured.
pub const FALLBACK_EXECUTABLES: [&str; 4] = [
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/snap/bin/chromium",
];

/// Pick the browser executable: `explicit` if given (it must exist), then
/// `CHROME_PATH`, then `PUPPETEER_EXECUTABLE_PATH`, then the first fallback
/// location that exists.
pub fn resolve_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_with(explicit, |key| std::env::var(key).ok(), &FALLBACK_EXECUTABLES)
}

fn resolve_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    fallbacks: &[&str],
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(PressError::Config(format!(
            "browser executable not found: {}",
            path.display()
        )));
    }

    for key in [ENV_CHROME_PATH, ENV_PUPPETEER_PATH] {
        if let Some(value) = env(key).filter(|v| !v.trim().is_empty()) {
            log::debug!("browser executable from {key}: {value}");
            return Ok(PathBuf::from(value.trim()));
        }
    }

    fallbacks
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            PressError::Config(format!(
                "no Chrome/Chromium executable found; set {ENV_CHROME_PATH} or install one of: {}",
                fallbacks.join(", ")
            ))
        })
}

/// Launches a local headless Chrome.
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserProcess>> {
        let path = resolve_executable(self.executable.as_deref())?;
        log::info!("starting {}", path.display());

        let browser = blocking(move || {
            let options = LaunchOptions::default_builder()
                .path(Some(path))
                .headless(true)
                .sandbox(false)
                .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
                .build()
                .map_err(|e| PressError::Browser(e.to_string()))?;
            Browser::new(options).map_err(|e| PressError::Browser(e.to_string()))
        })
        .await?;

        Ok(Arc::new(ChromeProcess {
            browser: Mutex::new(Some(browser)),
            connected: Arc::new(AtomicBool::new(true)),
        }))
    }
}

struct ChromeProcess {
    browser: Mutex<Option<Browser>>,
    /// Cleared once any driver call reports a closed connection. Shared with
    /// every page so they all go dead together.
    connected: Arc<AtomicBool>,
}

impl ChromeProcess {
    fn handle(&self) -> Option<Browser> {
        self.browser
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl BrowserProcess for ChromeProcess {
    fn is_alive(&self) -> bool {
        self.connected.load(Ordering::Acquire) && self.handle().is_some()
    }

    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        let browser = self.handle().ok_or(PressError::PoolShutDown)?;
        let result = blocking(move || {
            browser
                .new_tab()
                .map_err(|e| PressError::Browser(e.to_string()))
        })
        .await;
        let tab = track_connection(&self.connected, result)?;
        Ok(Box::new(ChromePage {
            tab,
            broken: AtomicBool::new(false),
            connected: Arc::clone(&self.connected),
        }))
    }

    async fn close(&self) -> Result<()> {
        let browser = self
            .browser
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        // Dropping the last handle kills the process.
        if let Some(browser) = browser {
            blocking(move || {
                drop(browser);
                Ok(())
            })
            .await?;
        }
        Ok(())
    }
}

struct ChromePage {
    tab: Arc<Tab>,
    /// Set once a driver call fails; the pool then replaces the page.
    broken: AtomicBool,
    connected: Arc<AtomicBool>,
}

impl ChromePage {
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.broken.store(true, Ordering::Release);
        }
        track_connection(&self.connected, result)
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    fn is_alive(&self) -> bool {
        !self.broken.load(Ordering::Acquire) && self.connected.load(Ordering::Acquire)
    }

    async fn set_content(&self, html: &str) -> Result<()> {
        let url = format!("data:text/html;charset=utf-8;base64,{}", BASE64.encode(html));
        let tab = Arc::clone(&self.tab);
        let result = blocking(move || {
            tab.navigate_to(&url)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| PressError::Browser(e.to_string()))
        })
        .await;
        self.track(result)
    }

    async fn print_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>> {
        let options = PrintToPdfOptions {
            landscape: Some(options.landscape),
            print_background: Some(options.print_background),
            paper_width: Some(options.paper_width),
            paper_height: Some(options.paper_height),
            margin_top: Some(options.margin_top),
            margin_bottom: Some(options.margin_bottom),
            margin_left: Some(options.margin_left),
            margin_right: Some(options.margin_right),
            prefer_css_page_size: Some(options.prefer_css_page_size),
            ..Default::default()
        };
        let tab = Arc::clone(&self.tab);
        let result = blocking(move || {
            tab.print_to_pdf(Some(options))
                .map_err(|e| PressError::Capture(e.to_string()))
        })
        .await;
        self.track(result)
    }

    async fn close(&self) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.close(true)
                .map(|_| ())
                .map_err(|e| PressError::Browser(e.to_string()))
        })
        .await
    }
}

/// Clear `connected` if `result` failed because the browser went away.
fn track_connection<T>(connected: &AtomicBool, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if is_connection_lost(e) {
            log::warn!("browser connection lost: {e}");
            connected.store(false, Ordering::Release);
        }
    }
    result
}

fn is_connection_lost(err: &PressError) -> bool {
    match err {
        PressError::Browser(msg) | PressError::Capture(msg) => msg.contains(CONNECTION_CLOSED),
        _ => false,
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PressError::Task(e.to_string()))?
}
