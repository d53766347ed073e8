//! Engine selection: one call that renders HTML with either the pooled
//! browser or the native layout engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PrintOptions;
use crate::error::{PressError, Result};
use crate::pipeline::{generate_pdf, PipelineConfig};
use crate::pool::PagePool;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Headless browser page from the pool.
    #[default]
    Pooled,
    /// Built-in flow layout, no browser needed.
    Native,
}

impl FromStr for Engine {
    type Err = PressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pooled" | "chromium" | "chrome" => Ok(Engine::Pooled),
            "native" => Ok(Engine::Native),
            other => Err(PressError::Config(format!(
                "unknown engine '{other}' (expected 'native' or 'pooled')"
            ))),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Engine::Pooled => "pooled",
            Engine::Native => "native",
        })
    }
}

/// Per-render settings.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Native engine: PDF title. Falls back to the renderer's default.
    pub title: Option<String>,
    /// Pooled engine: page geometry for the capture.
    pub print: PrintOptions,
}

/// Dispatches renders to an engine. Cheap to clone.
#[derive(Clone, Default)]
pub struct Renderer {
    pool: Option<PagePool>,
    native: PipelineConfig,
}

impl Renderer {
    /// A renderer without a browser; only [`Engine::Native`] works.
    pub fn native_only() -> Self {
        Self::default()
    }

    pub fn with_pool(pool: PagePool) -> Self {
        Self {
            pool: Some(pool),
            native: PipelineConfig::default(),
        }
    }

    pub fn native_config(mut self, config: PipelineConfig) -> Self {
        self.native = config;
        self
    }

    pub fn pool(&self) -> Option<&PagePool> {
        self.pool.as_ref()
    }

    pub async fn generate(&self, html: &str, engine: Engine, options: &RenderOptions) -> Result<Vec<u8>> {
        log::debug!("rendering {} bytes of HTML with the {engine} engine", html.len());
        match engine {
            Engine::Native => self.generate_native(html, options).await,
            Engine::Pooled => self.generate_pooled(html, options).await,
        }
    }

    async fn generate_native(&self, html: &str, options: &RenderOptions) -> Result<Vec<u8>> {
        let mut config = self.native.clone();
        if let Some(title) = &options.title {
            config.title = title.clone();
        }
        let html = html.to_owned();
        // Layout is CPU-bound; keep it off the async workers.
        let (bytes, _) = tokio::task::spawn_blocking(move || generate_pdf(&html, &config))
            .await
            .map_err(|e| PressError::Task(e.to_string()))??;
        Ok(bytes)
    }

    async fn generate_pooled(&self, html: &str, options: &RenderOptions) -> Result<Vec<u8>> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            PressError::Config("the pooled engine needs a browser page pool".to_string())
        })?;
        // The lease goes back to the pool on every exit path.
        let mut page = pool.acquire().await?;
        if let Err(e) = page.set_content(html).await {
            if page.is_alive() {
                return Err(e);
            }
            // A page that died while idle (e.g. the browser crashed) fails on
            // first use. Drop it and try once more on a fresh one.
            log::warn!("page {} failed to load content ({e}), retrying", page.id());
            drop(page);
            page = pool.acquire().await?;
            page.set_content(html).await?;
        }
        page.print_pdf(&options.print).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names() {
        assert_eq!("native".parse::<Engine>().unwrap(), Engine::Native);
        assert_eq!(" Pooled ".parse::<Engine>().unwrap(), Engine::Pooled);
        assert_eq!("chromium".parse::<Engine>().unwrap(), Engine::Pooled);
        assert!(matches!("wkhtml".parse::<Engine>(), Err(PressError::Config(_))));
        assert_eq!(Engine::default(), Engine::Pooled);
        assert_eq!(Engine::Native.to_string(), "native");
    }

    #[tokio::test]
    async fn native_engine_needs_no_pool() {
        let options = RenderOptions {
            title: Some("Native".into()),
            ..RenderOptions::default()
        };
        let pdf = Renderer::native_only()
            .generate("<h1>Hi</h1>", Engine::Native, &options)
            .await
            .unwrap();
        assert_eq!(&pdf[0..5], b"%PDF-");
    }

    #[tokio::test]
    async fn pooled_engine_without_pool_is_a_config_error() {
        let err = Renderer::native_only()
            .generate("<p>x</p>", Engine::Pooled, &RenderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PressError::Config(_)));
    }
}
