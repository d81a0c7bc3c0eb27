//! Loader for a directory of pre-downloaded documentation pages

use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use docbot_core::{ChunkMetadata, Document, Error, Result};

/// Elements that hold the main body of a ReadTheDocs-style page, in priority order
const MAIN_CONTENT_SELECTORS: [&str; 4] = [
    "main#main-content",
    r#"div[role="main"]"#,
    "main.main-content",
    r#"article[role="main"]"#,
];

/// Loads every file under a directory as a [`Document`]
///
/// HTML pages contribute only the text of their main content element; any
/// other file is read as UTF-8 text. Each document's `source` is the file
/// path joined onto the configured directory.
#[derive(Debug, Clone)]
pub struct DocsLoader {
    directory: PathBuf,
}

impl DocsLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Load all files, sorted by path
    ///
    /// The outer error means the directory itself could not be walked; each
    /// inner result reports one file.
    pub async fn load(&self) -> Result<Vec<Result<Document>>> {
        let entries = collect_files(&self.directory)?;

        debug!(directory = %self.directory.display(), entries = entries.len(), "loading documents");

        let mut documents = Vec::with_capacity(entries.len());
        for entry in entries {
            documents.push(match entry {
                Ok(path) => load_file(&path).await,
                Err(e) => Err(e),
            });
        }
        Ok(documents)
    }
}

async fn load_file(path: &Path) -> Result<Document> {
    let source = source_for(path);
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::loader(source.clone(), e.to_string()))?;
    let raw = String::from_utf8(bytes)
        .map_err(|_| Error::loader(source.clone(), "file is not valid UTF-8 text"))?;

    let text = if is_html(path) {
        extract_main_text(&raw)
    } else {
        raw
    };

    Ok(Document {
        text,
        metadata: ChunkMetadata { source },
    })
}

/// Text of the page's main content element with empty lines removed
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector in MAIN_CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text: String = element.text().collect();
            return drop_empty_lines(&text);
        }
    }

    String::new()
}

fn drop_empty_lines(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false)
}

fn source_for(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Files under `directory` in path order, one `Err` per entry that could not be read
///
/// Symbolic links to directories are not walked, so a link cycle in the
/// mirror cannot repeat pages. Other links are read like files.
fn collect_files(directory: &Path) -> Result<Vec<Result<PathBuf>>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(directory).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                if file_type.is_file() || (file_type.is_symlink() && !entry.path().is_dir()) {
                    files.push(Ok(entry.into_path()));
                }
            }
            Err(e) if e.depth() == 0 => {
                return Err(Error::loader(directory.display().to_string(), e.to_string()));
            }
            Err(e) => {
                let source = e
                    .path()
                    .map(source_for)
                    .unwrap_or_else(|| directory.display().to_string());
                files.push(Err(Error::loader(source, e.to_string())));
            }
        }
    }

    Ok(files)
}
