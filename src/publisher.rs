//! Publisher (pandoc) command line and invocation.

use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};

use crate::arguments::TargetFormat;
use crate::error::PublishError;
use crate::resolver::ResolvedPaths;
use crate::version::Version;
use crate::workdir::WorkDirGuard;

/// MultiMarkdown reader with the extensions every manuscript relies on
pub const INPUT_FORMAT: &str = concat!(
    "markdown_mmd",
    "+auto_identifiers",
    "+implicit_header_references",
    "+yaml_metadata_block",
    "+citations",
    "+implicit_figures",
    "+header_attributes",
    "+pipe_tables",
    "+grid_tables",
    "+multiline_tables",
    "+table_captions",
    "+strikeout",
    "+footnotes",
    "+inline_notes",
    "+tex_math_dollars",
    "+superscript",
    "+subscript",
    "+raw_tex",
    "+definition_lists",
    "+fancy_lists",
    "+example_lists",
    "+startnum",
    "+fenced_code_blocks",
    "+fenced_code_attributes",
    "+link_attributes",
);

pub const CITATION_FILTER: &str = "pandoc-citeproc";

/// Section numbering, top-level headers as chapters, typographic punctuation
pub const SWITCHES: [&str; 3] = ["--number-sections", "--chapters", "--smart"];

/// The full publisher command line, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherInvocation {
    pub program: String,
    pub options: Vec<(String, String)>,
    pub switches: Vec<String>,
    pub passthrough: Vec<String>,
    pub source: PathBuf,
}

impl PublisherInvocation {
    /// Builds the command line for `paths`.
    ///
    /// Output and input format always come first; the version, when known, is
    /// injected as `version` metadata for the template.
    pub fn build(
        program: &str,
        paths: &ResolvedPaths,
        version: Option<&Version>,
        format: TargetFormat,
        passthrough: &[String],
    ) -> Self {
        let mut options = vec![
            ("-o".to_string(), path_arg(&paths.output_file)),
            ("-f".to_string(), INPUT_FORMAT.to_string()),
            ("--data-dir".to_string(), path_arg(&paths.base_dir)),
            ("--filter".to_string(), CITATION_FILTER.to_string()),
        ];
        if let Some(bib) = &paths.bibliography_file {
            options.push(("--bibliography".to_string(), path_arg(bib)));
        }
        if let Some(version) = version {
            options.push(("-M".to_string(), format!("version={}", version)));
        }
        let template_flag = if format.uses_reference_doc() { "--reference-docx" } else { "--template" };
        options.push((template_flag.to_string(), path_arg(&paths.template_file)));

        PublisherInvocation {
            program: program.to_string(),
            options,
            switches: SWITCHES.iter().map(|s| s.to_string()).collect(),
            passthrough: passthrough.to_vec(),
            source: paths.source_file.clone(),
        }
    }

    /// Value of the first occurrence of `flag`
    pub fn option(&self, flag: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(name, _)| name == flag)
            .map(|(_, value)| value.as_str())
    }

    /// Arguments after the program name
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (flag, value) in &self.options {
            args.push(flag.clone());
            args.push(value.clone());
        }
        args.extend(self.switches.iter().cloned());
        args.extend(self.passthrough.iter().cloned());
        args.push(path_arg(&self.source));
        args
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Runs the publisher from the project root and opens the result on success.
///
/// Returns the publisher's exit code; a publisher killed by a signal counts as 1.
/// The working directory is restored whatever the outcome.
pub async fn invoke(
    invocation: &PublisherInvocation,
    paths: &ResolvedPaths,
    open_result: bool,
) -> Result<i32, PublishError> {
    let _guard = WorkDirGuard::enter(&paths.base_dir)?;
    let args = invocation.args();
    info!("About to run {} {}", invocation.program, args.join(" "));

    let status = tokio::process::Command::new(&invocation.program)
        .args(&args)
        .status()
        .await
        .map_err(|source| PublishError::PublisherSpawn {
            program: invocation.program.clone(),
            source,
        })?;

    let code = status.code().unwrap_or(1);
    if !status.success() {
        error!("{} returned with {}", invocation.program, code);
        return Ok(code);
    }

    let output = paths.base_dir.join(&paths.output_file);
    info!("Generated {}", output.display());
    if open_result {
        debug!("Opening {}", output.display());
        if let Err(e) = open::that(&output) {
            warn!("Could not open {}: {}", output.display(), e);
        }
    }
    Ok(code)
}
