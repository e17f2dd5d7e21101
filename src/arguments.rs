use clap::{Command, CommandFactory, Parser, ValueEnum};
use log::warn;
use std::path::PathBuf;

use crate::error::PublishError;
use crate::resolver::ResolveOptions;
use crate::version::BumpLevel;
use crate::versioning::CommitRequest;

pub const DEFAULT_TEMPLATE: &str = "pandoc-docstyle";
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";
pub const DEFAULT_SOURCE_DIR: &str = "src";
pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_PROJECT: &str = "DissertatieBrandt";
pub const DEFAULT_PUBLISHER: &str = "pandoc";
/// Commit message used when neither `-g` nor `-l` is given
pub const AUTO_COMMIT_MESSAGE: &str = "(auto message) Small textual changes only";

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum TargetFormat {
    Doc,
    Docx,
    Tex,
    Pdf,
}

impl TargetFormat {
    /// Extension of the produced file
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Doc => "doc",
            TargetFormat::Docx => "docx",
            TargetFormat::Tex => "tex",
            TargetFormat::Pdf => "pdf",
        }
    }

    /// Template extension when the template name has none; pdf is typeset through tex
    pub fn default_template_extension(&self) -> &'static str {
        match self {
            TargetFormat::Doc => ".doc",
            TargetFormat::Docx => ".docx",
            TargetFormat::Tex | TargetFormat::Pdf => ".tex",
        }
    }

    /// Whether the template is passed as a reference document instead of a template
    pub fn uses_reference_doc(&self) -> bool {
        matches!(self, TargetFormat::Docx)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LevelArg {
    Minor,
    Major,
    None,
}

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Wrapper around pandoc to spare lots of typing",
    bin_name = "mmdp",
    after_help = "Any arguments not listed above (e.g. --toc) are passed 1-to-1 to the publisher, \
                  in the order given. All relative directories are relative to the current working \
                  directory, which is expected to hold templates/, src/{docs,bib,images}/ and results/."
)]
pub struct Arguments {
    /// The name of the source file; leaving out the extension assumes .mmd
    pub source: String,
    /// The target format
    #[arg(value_enum, ignore_case = true)]
    pub format: TargetFormat,
    /// Commit the current text with this message, tagged as a new minor version unless -l says otherwise
    #[arg(long, short)]
    pub git: Option<String>,
    /// The version level to increment (requires -g <msg>, unless "none")
    #[arg(long, short, value_enum, ignore_case = true)]
    pub level: Option<LevelArg>,
    /// Style template; leaving out the extension implies the target format's default
    #[arg(long, short, default_value = DEFAULT_TEMPLATE)]
    pub template: String,
    /// Directory holding the style template
    #[arg(long = "dDir", short = 'd', default_value = DEFAULT_TEMPLATE_DIR)]
    pub template_dir: String,
    /// Root directory holding the document sources
    #[arg(long = "sDir", short = 's', default_value = DEFAULT_SOURCE_DIR)]
    pub source_dir: String,
    /// Directory receiving the generated document
    #[arg(long = "rDir", short = 'r', default_value = DEFAULT_RESULTS_DIR)]
    pub results_dir: String,
    /// Bibliography file overriding the YAML block; leaving out the extension assumes .bib
    #[arg(long, short)]
    pub bib: Option<String>,
    /// The scrivener project (.scriv) whose documents are committed
    #[arg(long, short, default_value = DEFAULT_PROJECT)]
    pub proj: String,
    /// Log debug output
    #[arg(long)]
    pub debug: bool,
    /// Publisher executable
    #[arg(long, default_value = DEFAULT_PUBLISHER)]
    pub publisher: String,
    /// Do not open the generated document
    #[arg(long)]
    pub no_open: bool,
    #[arg(skip)]
    pub passthrough: Vec<String>,
}

impl Arguments {
    /// Parses the recognised arguments and collects everything else for the publisher.
    ///
    /// Unknown options, surplus bare tokens and everything after `--` end up in
    /// [Arguments::passthrough], in the order given.
    pub fn parse_known<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut tokens = args.into_iter().map(Into::into);
        let bin = tokens.next().unwrap_or_else(|| "mmdp".to_string());
        let (known, passthrough) = split_known(&Self::command(), tokens);

        let mut arguments = Self::try_parse_from(std::iter::once(bin).chain(known))?;
        arguments.passthrough = passthrough;
        Ok(arguments)
    }

    /// Bump level implied by the `-l`/`-g` combination
    pub fn bump_level(&self) -> BumpLevel {
        match (self.level, &self.git) {
            (Some(LevelArg::None), _) => BumpLevel::Suppressed,
            (Some(LevelArg::Minor), _) => BumpLevel::Minor,
            (Some(LevelArg::Major), _) => BumpLevel::Major,
            (None, Some(_)) => BumpLevel::Minor,
            (None, None) => BumpLevel::None,
        }
    }

    /// The commit to make before publishing, or `None` when versioning is suppressed
    pub fn commit_request(&self) -> Result<Option<CommitRequest>, PublishError> {
        let level = self.bump_level();
        match level {
            BumpLevel::Suppressed => {
                if self.git.is_some() {
                    warn!("'-l none' suppresses versioning; ignoring the commit message");
                }
                Ok(None)
            }
            BumpLevel::Minor | BumpLevel::Major => {
                let message = self.git.as_deref().ok_or_else(|| {
                    PublishError::config(
                        "will not create a new version without a proper commit message; '-l' demands '-g <msg>'",
                    )
                })?;
                CommitRequest::new(&self.proj, message, level).map(Some)
            }
            BumpLevel::None => {
                let message = self.git.as_deref().unwrap_or(AUTO_COMMIT_MESSAGE);
                CommitRequest::new(&self.proj, message, level).map(Some)
            }
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            source: self.source.clone(),
            format: self.format,
            template: self.template.clone(),
            template_dir: PathBuf::from(&self.template_dir),
            source_dir: PathBuf::from(&self.source_dir),
            results_dir: PathBuf::from(&self.results_dir),
            bib: self.bib.clone(),
        }
    }
}

struct OptionTable {
    shorts: Vec<(char, bool)>,
    longs: Vec<(String, bool)>,
    positionals: usize,
}

impl OptionTable {
    fn from_command(command: &Command) -> Self {
        let mut table = OptionTable {
            shorts: vec![('h', false)],
            longs: vec![("help".to_string(), false)],
            positionals: 0,
        };
        for arg in command.get_arguments() {
            if arg.is_positional() {
                table.positionals += 1;
                continue;
            }
            let takes_value = arg.get_action().takes_values();
            if let Some(short) = arg.get_short() {
                table.shorts.push((short, takes_value));
            }
            if let Some(long) = arg.get_long() {
                table.longs.push((long.to_string(), takes_value));
            }
        }
        table
    }

    fn short(&self, flag: char) -> Option<bool> {
        self.shorts.iter().find(|(c, _)| *c == flag).map(|(_, takes)| *takes)
    }

    /// Walks a cluster such as `-qg` or `-tmystyle`; `None` if any flag before
    /// the value is unknown, otherwise whether the next token is the value
    fn short_cluster(&self, cluster: &str) -> Option<bool> {
        for (index, flag) in cluster.char_indices() {
            if self.short(flag)? {
                return Some(index + flag.len_utf8() == cluster.len());
            }
        }
        Some(false)
    }

    fn long(&self, flag: &str) -> Option<bool> {
        self.longs.iter().find(|(name, _)| name == flag).map(|(_, takes)| *takes)
    }
}

/// Splits raw tokens into those `command` recognises and those it does not
fn split_known(
    command: &Command,
    tokens: impl Iterator<Item = String>,
) -> (Vec<String>, Vec<String>) {
    let table = OptionTable::from_command(command);
    let mut known = Vec::new();
    let mut passthrough = Vec::new();
    let mut positionals = 0;
    let mut tokens = tokens;

    while let Some(token) = tokens.next() {
        if token == "--" {
            passthrough.extend(tokens.by_ref());
            break;
        }

        let takes_value = if let Some(long) = token.strip_prefix("--") {
            match long.split_once('=') {
                Some((name, _)) => table.long(name).map(|_| false),
                None => table.long(long),
            }
        } else if let Some(cluster) = token.strip_prefix('-').filter(|rest| !rest.is_empty()) {
            table.short_cluster(cluster)
        } else if positionals < table.positionals {
            positionals += 1;
            known.push(token);
            continue;
        } else {
            passthrough.push(token);
            continue;
        };

        match takes_value {
            Some(takes_value) => {
                known.push(token);
                if takes_value {
                    known.extend(tokens.next());
                }
            }
            None => passthrough.push(token),
        }
    }

    (known, passthrough)
}
