//! pdf-watermark
//!
//! Stamps a text or image watermark onto PDF files, either once at a given
//! position (`insert`) or tiled across each page (`grid`).

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use watermark_core::{
    add_watermark_from_options, needs_installed_fonts, FontDiscovery, FontSource, NoFonts,
    RunSummary, WatermarkConfig,
};

mod cli;

use cli::{Cli, Command, Job};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Logs go to stderr so stdout stays clean for --json
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &args.command {
        Command::ListChineseFonts => list_chinese_fonts(args.json),
        Command::Insert { common, insert } => {
            let job = load_config(&args)
                .and_then(|config| Ok(Job::insert(common, insert, &config)?));
            run_job(job, args.json)
        }
        Command::Grid { common, grid } => {
            let job =
                load_config(&args).and_then(|config| Ok(Job::grid(common, grid, &config)?));
            run_job(job, args.json)
        }
    }
}

fn load_config(args: &Cli) -> anyhow::Result<WatermarkConfig> {
    match &args.config {
        Some(path) => WatermarkConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(WatermarkConfig::default()),
    }
}

/// Run a job, folding any failure into the summary
fn run_summary(job: anyhow::Result<Job>) -> RunSummary {
    let result = job.and_then(|job| {
        // Scanning system fonts is only worth it when a base font won't do
        let fonts: Box<dyn FontSource> = if needs_installed_fonts(&job.drawing) {
            Box::new(FontDiscovery::system())
        } else {
            Box::new(NoFonts)
        };

        info!("Watermarking {} file(s)", job.files.len());
        add_watermark_from_options(&job.files, &job.drawing, &job.layout, fonts.as_ref())
            .context("Failed to watermark PDF")
    });

    match result {
        Ok(reports) => RunSummary::completed(reports),
        Err(e) => RunSummary::failed(format!("{:#}", e)),
    }
}

fn run_job(job: anyhow::Result<Job>, json: bool) -> anyhow::Result<()> {
    let summary = run_summary(job);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        if !summary.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    if let Some(error) = summary.error {
        anyhow::bail!(error);
    }
    for report in &summary.files {
        println!(
            "{} -> {} ({} pages)",
            report.input.display(),
            report.output.display(),
            report.page_count
        );
    }
    Ok(())
}

fn list_chinese_fonts(json: bool) -> anyhow::Result<()> {
    let families = FontDiscovery::system().chinese_families();

    if families.is_empty() {
        warn!("No Chinese font is installed, please install one to watermark Chinese text");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&families)?);
    } else {
        for family in &families {
            println!("{}", family);
        }
    }
    Ok(())
}
