mod downloader;
mod prompt;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn, Level};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use url::Url;

use downloader::config::{self, ExtractionConfig};
use downloader::formats;
use downloader::models::{JobRequest, OutcomeStatus, SessionTally};
use downloader::probe;
use downloader::runner;
use downloader::tools::{self, Toolchain};
use downloader::urls;

/// Interactive media downloader: prompts for a URL, an output subfolder
/// under the downloads directory and one or more export formats, then runs
/// one extractor invocation per format.
#[derive(Parser, Debug)]
#[command(name = "vidgrab", version, about)]
struct Args {
    /// Explicit cookie file (Netscape format); overrides auto-detection
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    println!("=== Universal media downloader (YouTube / X / Instagram / TikTok / Facebook) ===");
    println!("Empty URL -> exit.\n");

    let toolchain = tools::preflight()?;
    if !toolchain.ffmpeg.is_available() {
        warn!("ffmpeg not found");
        println!("⚠️ ffmpeg was not found; container merging and MP3 extraction will fail until it is installed.");
    }
    if !toolchain.node.is_available() {
        debug!("node not found; JS challenge solving stays disabled this session");
    }

    let mut tally = SessionTally::default();

    loop {
        let raw = prompt::ask("→ Paste URL(s): ");
        if raw.is_empty() {
            println!("Done. Bye!");
            break;
        }

        // A paste may carry several links; all of them share the subfolder
        // and format selection below.
        let candidates = {
            let found = urls::extract_urls(&raw);
            if found.is_empty() {
                vec![urls::normalize_url(&raw)]
            } else {
                found
            }
        };

        let mut queue: Vec<Url> = Vec::new();
        for candidate in candidates {
            match urls::validate_url(&candidate) {
                Ok(url) => queue.push(url),
                Err(e) => println!("❌ {e}"),
            }
        }
        if queue.is_empty() {
            continue;
        }

        let target = prompt::ask("→ Output subfolder (relative to Downloads, empty = Downloads): ");
        let out_dir = match config::resolve_output_dir(&target) {
            Ok(dir) => dir,
            Err(e) => {
                println!("❌ {e}");
                continue;
            }
        };
        println!("[i] Saving to: {}", out_dir.display());

        println!("\n{}", formats::render_menu());
        let raw_selection =
            prompt::ask("→ Choose format(s) by number (e.g. 1 4). Enter = default MP4: ");
        let selection = formats::parse_selection(&raw_selection);
        for token in &selection.rejected {
            println!("⚠️ Ignoring invalid selection '{token}'");
        }
        println!(
            "[i] Export(s): {}",
            selection
                .formats
                .iter()
                .map(|f| f.ext())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let extraction = ExtractionConfig::build(out_dir, args.cookies.as_deref(), &toolchain);

        let multi = queue.len() > 1;
        for url in queue {
            let job = JobRequest {
                url,
                out_dir: extraction.out_dir.clone(),
                formats: selection.formats.clone(),
            };
            if multi {
                println!("\n=== URL: {} ===", job.url);
            }
            process_job(&toolchain, &extraction, &job, &mut tally).await;
        }
    }

    Ok(ExitCode::from(tally.exit_code()))
}

/// Run every selected format of one job, reporting per-format outcomes.
/// A format's failure never stops the remaining formats.
async fn process_job(
    toolchain: &Toolchain,
    extraction: &ExtractionConfig,
    job: &JobRequest,
    tally: &mut SessionTally,
) {
    if let Err(e) = probe::reachability_check(&job.url).await {
        println!("❌ {e}");
        return;
    }

    match probe::probe_media(toolchain.ytdlp_path(), job.url.as_str(), extraction).await {
        Ok(summary) => {
            let duration = summary
                .duration_display()
                .map(|d| format!(" ({d})"))
                .unwrap_or_default();
            let uploader = summary
                .uploader
                .as_deref()
                .map(|u| format!(" by {u}"))
                .unwrap_or_default();
            println!("[i] {}{}{}", summary.title, duration, uploader);
            if let Some(first) = job.formats.first() {
                println!(
                    "[i] Will be saved as: {}",
                    job.out_dir
                        .join(config::planned_filename(&summary.title, &summary.id, *first))
                        .display()
                );
            }
        }
        Err(e) => {
            debug!("media probe failed: {e}");
            println!("⚠️ Could not prefetch media info; continuing anyway.");
        }
    }

    let mut failed = 0usize;
    for kind in &job.formats {
        println!("\n=== Export: {kind} ===");
        let outcome =
            runner::run_format(toolchain.ytdlp_path(), extraction, *kind, job.url.as_str()).await;

        match &outcome.status {
            OutcomeStatus::Success => println!("✅ Done: {kind}"),
            OutcomeStatus::Failure { reason, detail } => {
                failed += 1;
                println!("❌ Error on export {kind}: {}", reason.description());
                if let Some(hint) = reason.hint() {
                    println!("   {hint}");
                }
                if !detail.is_empty() {
                    println!("   Details: {detail}");
                }
            }
        }
        tally.record(&outcome);
    }

    if failed == 0 {
        println!("\n✅ All exports complete.\n");
    } else if failed < job.formats.len() {
        println!("\n⚠️ Finished with some errors.\n");
    } else {
        println!("\n❌ All exports failed.\n");
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
