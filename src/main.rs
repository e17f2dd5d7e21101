use anyhow::{Context, Result};
use log::{LevelFilter, debug, error, info, warn};
use mmd_publish::{
    arguments::Arguments,
    error::PublishError,
    publisher::{self, PublisherInvocation},
    resolver::{self, ResolvedPaths},
    vcs::Git2Vcs,
    version::Version,
    versioning::{CommitRequest, CommitWorkflow},
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Arguments::parse_known(std::env::args()).unwrap_or_else(|e| e.exit());
    pretty_env_logger::env_logger::builder()
        .filter_level(if args.debug { LevelFilter::Debug } else { LevelFilter::Info })
        .format_timestamp(None)
        .init();

    let base_dir = std::env::current_dir().context("Failed to determine the working directory")?;

    let code = match run(&args, &base_dir).await {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<PublishError>() {
            Some(publish_error) if publish_error.is_usage_error() => {
                error!("{}", publish_error);
                eprintln!("Type 'mmdp -h' for help");
                1
            }
            _ => return Err(e),
        },
    };

    std::process::exit(code);
}

async fn run(args: &Arguments, base_dir: &Path) -> Result<i32> {
    // Both steps fail before any git call is made
    let request = args.commit_request()?;
    let paths = resolver::resolve(base_dir, &args.resolve_options())?;

    let version = request.as_ref().and_then(|request| resolve_version(base_dir, request));
    log_summary(&paths, version.as_ref());

    let invocation = PublisherInvocation::build(
        &args.publisher,
        &paths,
        version.as_ref(),
        args.format,
        &args.passthrough,
    );
    let code = publisher::invoke(&invocation, &paths, !args.no_open)
        .await
        .context("Failed to run the publisher")?;

    if code == 0 {
        info!("Done!");
    }
    Ok(code)
}

/// Commits and tags as requested; any git trouble only costs the version metadata
fn resolve_version(base_dir: &Path, request: &CommitRequest) -> Option<Version> {
    let vcs = match Git2Vcs::open(base_dir) {
        Ok(vcs) => vcs,
        Err(e) => {
            warn!("{} - publishing without version", e);
            return None;
        }
    };

    match CommitWorkflow::new(&vcs).commit_and_tag(request) {
        Ok(outcome) => Some(outcome.version),
        Err(e) => {
            warn!("{} - publishing without version", e);
            None
        }
    }
}

fn log_summary(paths: &ResolvedPaths, version: Option<&Version>) {
    info!("base directory is     : {}", paths.base_dir.display());
    info!("source file is        : {}", paths.source_file.display());
    info!("template file is      : {}", paths.template_file.display());
    info!("target file is        : {}", paths.output_file.display());
    if let Some(bib) = &paths.bibliography_file {
        info!("bibliography file is  : {}", bib.display());
    }
    info!(
        "version is            : {}",
        version.map(|v| v.to_string()).unwrap_or_default()
    );
    for dir in &paths.search_directories {
        debug!("search directory      : {}", dir.display());
    }
}
