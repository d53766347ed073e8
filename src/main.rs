//! press – fill an HTML template from JSON data and render it to PDF.
//!
//! Usage:
//!   press <template.html> [output.pdf] [--data data.json] [--engine native|pooled]
//!         [--title "My Report"] [--pool-size N] [--chrome PATH]
//!   press --sample invoice [output.pdf] [--engine native]
//!   press <template.html> --placeholders
//!
//! If `output.pdf` is omitted the PDF is written next to the template with
//! the same stem (e.g. `report.html` → `report.pdf`).

use std::{env, fs, path::{Path, PathBuf}, process};

#[cfg(feature = "chrome")]
use pdf_press::config::PoolConfig;
use pdf_press::engine::{Engine, RenderOptions, Renderer};
use pdf_press::error::{PressError, Result};
use pdf_press::template::{self, TemplateCache};
use pdf_press::{samples, PagePool};

#[derive(Default)]
struct Args {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    data: Option<PathBuf>,
    engine: Engine,
    title: Option<String>,
    pool_size: Option<usize>,
    chrome: Option<PathBuf>,
    sample: Option<String>,
    placeholders: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let argv: Vec<String> = env::args().collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("Error: {msg}");
            print_usage(&argv[0]);
            process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn parse_args(argv: &[String]) -> std::result::Result<Args, String> {
    let mut args = Args::default();
    let mut positional = 0usize;

    let mut iter = argv.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--data" | "-d" => args.data = Some(PathBuf::from(value(arg)?)),
            "--engine" | "-e" => args.engine = value(arg)?.parse().map_err(|e: PressError| e.to_string())?,
            "--title" | "-t" => args.title = Some(value(arg)?),
            "--pool-size" => {
                let raw = value(arg)?;
                args.pool_size = Some(
                    raw.parse()
                        .map_err(|_| format!("--pool-size must be a number, got '{raw}'"))?,
                );
            }
            "--chrome" => args.chrome = Some(PathBuf::from(value(arg)?)),
            "--sample" => args.sample = Some(value(arg)?),
            "--placeholders" => args.placeholders = true,
            "--help" | "-h" => {
                print_usage(&argv[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => return Err(format!("unknown flag: {other}")),
            path => {
                // With --sample the only positional is the output.
                let slot = if args.sample.is_some() { positional + 1 } else { positional };
                match slot {
                    0 => args.input = Some(PathBuf::from(path)),
                    1 => args.output = Some(PathBuf::from(path)),
                    _ => return Err(format!("unexpected argument: {path}")),
                }
                positional += 1;
            }
        }
    }

    if args.input.is_none() && args.sample.is_none() {
        return Err("no template specified".to_string());
    }
    Ok(args)
}

async fn run(args: Args) -> Result<()> {
    let (html, stem) = match (&args.sample, &args.input) {
        (Some(name), _) => {
            let (source, sample_data) = samples::by_name(name).ok_or_else(|| {
                PressError::Config(format!(
                    "unknown sample '{name}' (available: {})",
                    samples::SAMPLE_NAMES.join(", ")
                ))
            })?;
            if args.placeholders {
                return print_placeholders(&source);
            }
            let data = match &args.data {
                Some(path) => read_data(path)?,
                None => sample_data,
            };
            (template::render(&source, &data), name.clone())
        }
        (None, Some(input)) => {
            if args.placeholders {
                let source = fs::read_to_string(input).map_err(|source| PressError::Template {
                    path: input.clone(),
                    source,
                })?;
                return print_placeholders(&source);
            }
            let data = match &args.data {
                Some(path) => read_data(path)?,
                None => serde_json::Value::Object(Default::default()),
            };
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("press output")
                .to_string();
            (TemplateCache::new().render_file(input, &data)?, stem)
        }
        (None, None) => return Err(PressError::Config("no template specified".to_string())),
    };

    // Default output: same directory + same stem as the template, but .pdf
    let output = args.output.clone().unwrap_or_else(|| {
        let mut o = args.input.clone().unwrap_or_else(|| PathBuf::from(&stem));
        o.set_extension("pdf");
        o
    });

    let options = RenderOptions {
        title: Some(args.title.clone().unwrap_or(stem)),
        ..RenderOptions::default()
    };

    let renderer = match args.engine {
        Engine::Native => Renderer::native_only(),
        Engine::Pooled => Renderer::with_pool(browser_pool(&args)?),
    };
    if let Some(pool) = renderer.pool() {
        pdf_press::spawn_signal_shutdown(pool.clone());
    }

    let result = renderer.generate(&html, args.engine, &options).await;
    if let Some(pool) = renderer.pool() {
        pool.shutdown().await;
    }
    let bytes = result?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&output, &bytes)?;
    eprintln!(
        "Wrote '{}' ({} bytes, {} engine)",
        output.display(),
        bytes.len(),
        args.engine
    );
    Ok(())
}

fn read_data(path: &Path) -> Result<serde_json::Value> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_placeholders(source: &str) -> Result<()> {
    for name in template::list_placeholders(source) {
        println!("{name}");
    }
    Ok(())
}

#[cfg(feature = "chrome")]
fn browser_pool(args: &Args) -> Result<PagePool> {
    let mut config = PoolConfig::from_env()?;
    if let Some(size) = args.pool_size {
        config.capacity = size;
    }
    if let Some(path) = &args.chrome {
        config.executable = Some(path.clone());
    }
    config.validate()?;
    Ok(PagePool::chrome(&config))
}

#[cfg(not(feature = "chrome"))]
fn browser_pool(_args: &Args) -> Result<PagePool> {
    Err(PressError::Config(
        "this build has no browser support; use --engine native".to_string(),
    ))
}

fn print_usage(prog: &str) {
    eprintln!("press – HTML template to PDF renderer (pdf-press)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <template.html> [output.pdf] [--data data.json] [--engine native|pooled]");
    eprintln!("  {prog} --sample <name> [output.pdf]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <template.html>  Template with {{{{placeholders}}}}");
    eprintln!("  [output.pdf]     Output path  (default: same stem as the template with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --data, -d       JSON file with the template data (default: {{}})");
    eprintln!("  --engine, -e     native | pooled (default: pooled)");
    eprintln!("  --title, -t      Document title for the native engine (default: file stem)");
    eprintln!("  --pool-size N    Browser pages kept alive (default: $PRESS_POOL_SIZE or 2)");
    eprintln!("  --chrome PATH    Browser executable (default: $CHROME_PATH, then common locations)");
    eprintln!("  --sample NAME    Render a built-in sample: {}", samples::SAMPLE_NAMES.join(", "));
    eprintln!("  --placeholders   List the template's placeholders and exit");
    eprintln!("  --help           Print this message");
}
