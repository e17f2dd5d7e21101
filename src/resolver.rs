use log::debug;
use std::path::{Path, PathBuf};

use crate::arguments::TargetFormat;
use crate::error::PublishError;

pub const DOCS_DIR: &str = "docs";
pub const BIB_DIR: &str = "bib";
pub const IMAGES_DIR: &str = "images";
pub const SOURCE_EXTENSION: &str = ".mmd";
pub const BIB_EXTENSION: &str = ".bib";

/// Raw path inputs as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub source: String,
    pub format: TargetFormat,
    pub template: String,
    pub template_dir: PathBuf,
    pub source_dir: PathBuf,
    pub results_dir: PathBuf,
    pub bib: Option<String>,
}

/// Concrete paths for one run. All paths except `base_dir` are relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub base_dir: PathBuf,
    pub source_file: PathBuf,
    pub template_file: PathBuf,
    pub bibliography_file: Option<PathBuf>,
    pub output_file: PathBuf,
    /// docs, bib and images directories of the source root
    pub search_directories: Vec<PathBuf>,
}

/// Appends `extension` (with its dot) when `name` has none
pub fn with_default_extension(name: &str, extension: &str) -> String {
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{}{}", name, extension)
    }
}

/// Resolves the source, template, bibliography and output paths below `base_dir`.
///
/// The source argument may carry a directory. When that directory already ends in
/// `docs` it is taken as the docs directory; otherwise the docs directory is
/// `<dir>/<source_dir>/docs`. The source is looked up in the docs directory and
/// then one level deeper, inside a directory with the same name as the file,
/// which is how scrivener compiles into a folder. The bibliography is not checked.
pub fn resolve(base_dir: &Path, options: &ResolveOptions) -> Result<ResolvedPaths, PublishError> {
    let source = Path::new(&options.source);
    let file_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PublishError::config(format!("invalid source file '{}'", options.source)))?;
    let source_name = with_default_extension(file_name, SOURCE_EXTENSION);
    let parent = source.parent().unwrap_or_else(|| Path::new(""));

    let (source_root, docs_dir) = if parent.file_name().is_some_and(|name| name == DOCS_DIR) {
        (parent.parent().unwrap_or_else(|| Path::new("")).to_path_buf(), parent.to_path_buf())
    } else {
        let root = parent.join(&options.source_dir);
        let docs = root.join(DOCS_DIR);
        (root, docs)
    };
    let bib_dir = source_root.join(BIB_DIR);
    let images_dir = source_root.join(IMAGES_DIR);

    let primary = docs_dir.join(&source_name);
    let source_file = if base_dir.join(&primary).is_file() {
        primary
    } else {
        debug!("Source file not found at {}, searching subfolder", primary.display());
        let nested = primary.join(&source_name);
        if !base_dir.join(&nested).is_file() {
            return Err(PublishError::SourceNotFound {
                primary: base_dir.join(&primary),
                nested: base_dir.join(&nested),
            });
        }
        nested
    };

    let template_name = with_default_extension(&options.template, options.format.default_template_extension());
    let template_file = options.template_dir.join(template_name);
    if !base_dir.join(&template_file).exists() {
        return Err(PublishError::TemplateNotFound(base_dir.join(&template_file)));
    }

    let bibliography_file = options
        .bib
        .as_deref()
        .map(|bib| bib_dir.join(with_default_extension(bib, BIB_EXTENSION)));

    let stem = Path::new(&source_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(&source_name);
    let output_file = options
        .results_dir
        .join(format!("{}.{}", stem, options.format.extension()));

    Ok(ResolvedPaths {
        base_dir: base_dir.to_path_buf(),
        source_file,
        template_file,
        bibliography_file,
        output_file,
        search_directories: vec![docs_dir, bib_dir, images_dir],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options(source: &str, format: TargetFormat, template: &str) -> ResolveOptions {
        ResolveOptions {
            source: source.to_string(),
            format,
            template: template.to_string(),
            template_dir: PathBuf::from("templates"),
            source_dir: PathBuf::from("src"),
            results_dir: PathBuf::from("results"),
            bib: None,
        }
    }

    fn touch(base: &Path, relative: &str) {
        let path = base.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_with_default_extension() {
        assert_eq!(with_default_extension("paper", ".mmd"), "paper.mmd");
        assert_eq!(with_default_extension("paper.md", ".mmd"), "paper.md");
        assert_eq!(with_default_extension("refs", ".bib"), "refs.bib");
    }

    #[test]
    fn test_resolve_defaults_for_docx() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "src/docs/paper.mmd");
        touch(temp_dir.path(), "templates/pandoc-docstyle.docx");

        let paths = resolve(temp_dir.path(), &options("paper", TargetFormat::Docx, "pandoc-docstyle")).unwrap();

        assert_eq!(paths.source_file.file_name().unwrap(), "paper.mmd");
        assert_eq!(paths.source_file, PathBuf::from("src/docs/paper.mmd"));
        assert_eq!(paths.template_file, PathBuf::from("templates/pandoc-docstyle.docx"));
        assert_eq!(paths.output_file, PathBuf::from("results/paper.docx"));
        assert_eq!(paths.bibliography_file, None);
        assert_eq!(
            paths.search_directories,
            vec![
                PathBuf::from("src/docs"),
                PathBuf::from("src/bib"),
                PathBuf::from("src/images"),
            ]
        );
    }

    #[test]
    fn test_resolve_pdf_uses_tex_template() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "src/docs/paper.mmd");
        touch(temp_dir.path(), "templates/mystyle.tex");

        let paths = resolve(temp_dir.path(), &options("paper", TargetFormat::Pdf, "mystyle")).unwrap();

        assert_eq!(paths.template_file, PathBuf::from("templates/mystyle.tex"));
        assert_eq!(paths.output_file, PathBuf::from("results/paper.pdf"));
    }

    #[test]
    fn test_resolve_explicit_extensions_kept() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "src/docs/paper.md");
        touch(temp_dir.path(), "templates/custom.latex");

        let paths = resolve(temp_dir.path(), &options("paper.md", TargetFormat::Tex, "custom.latex")).unwrap();

        assert_eq!(paths.source_file, PathBuf::from("src/docs/paper.md"));
        assert_eq!(paths.template_file, PathBuf::from("templates/custom.latex"));
        assert_eq!(paths.output_file, PathBuf::from("results/paper.tex"));
    }

    #[test]
    fn test_resolve_nested_source() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "src/docs/paper.mmd/paper.mmd");
        touch(temp_dir.path(), "templates/pandoc-docstyle.tex");

        let paths = resolve(temp_dir.path(), &options("paper", TargetFormat::Tex, "pandoc-docstyle")).unwrap();

        assert_eq!(paths.source_file, PathBuf::from("src/docs/paper.mmd/paper.mmd"));
    }

    #[test]
    fn test_resolve_source_dir_ending_in_docs() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "manuscript/docs/paper.mmd");
        touch(temp_dir.path(), "templates/pandoc-docstyle.tex");

        let mut opts = options("manuscript/docs/paper", TargetFormat::Pdf, "pandoc-docstyle");
        opts.bib = Some("refs".to_string());
        let paths = resolve(temp_dir.path(), &opts).unwrap();

        assert_eq!(paths.source_file, PathBuf::from("manuscript/docs/paper.mmd"));
        assert_eq!(paths.bibliography_file, Some(PathBuf::from("manuscript/bib/refs.bib")));
    }

    #[test]
    fn test_resolve_source_dir_appends_source_root() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "book/src/docs/paper.mmd");
        touch(temp_dir.path(), "templates/pandoc-docstyle.tex");

        let paths = resolve(temp_dir.path(), &options("book/paper", TargetFormat::Tex, "pandoc-docstyle")).unwrap();

        assert_eq!(paths.source_file, PathBuf::from("book/src/docs/paper.mmd"));
    }

    #[test]
    fn test_resolve_missing_source_names_both_paths() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "templates/pandoc-docstyle.tex");

        let err = resolve(temp_dir.path(), &options("paper", TargetFormat::Pdf, "pandoc-docstyle")).unwrap_err();

        match err {
            PublishError::SourceNotFound { primary, nested } => {
                assert_eq!(primary, temp_dir.path().join("src/docs/paper.mmd"));
                assert_eq!(nested, temp_dir.path().join("src/docs/paper.mmd/paper.mmd"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_resolve_missing_template_names_path() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "src/docs/paper.mmd");

        let err = resolve(temp_dir.path(), &options("paper", TargetFormat::Docx, "mystyle")).unwrap_err();

        match err {
            PublishError::TemplateNotFound(path) => {
                assert_eq!(path, temp_dir.path().join("templates/mystyle.docx"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_resolve_bibliography_not_checked() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "src/docs/paper.mmd");
        touch(temp_dir.path(), "templates/pandoc-docstyle.docx");

        let mut opts = options("paper", TargetFormat::Docx, "pandoc-docstyle");
        opts.bib = Some("missing".to_string());
        let paths = resolve(temp_dir.path(), &opts).unwrap();

        assert_eq!(paths.bibliography_file, Some(PathBuf::from("src/bib/missing.bib")));
    }
}
