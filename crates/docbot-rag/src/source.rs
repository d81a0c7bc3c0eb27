//! Rewriting local document paths into canonical documentation URLs

use serde::{Deserialize, Serialize};
use url::Url;

use docbot_core::{DocumentChunk, Error, Result};

/// Replaces a local path prefix with the documentation site's URL prefix
///
/// This is plain string substitution on the leading prefix: with the
/// defaults, `langchain-docs/api.python.langchain.com/x.html` becomes
/// `https://api.python.langchain.com/x.html`. The result must parse as an
/// absolute http(s) URL with a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRewriter {
    local_prefix: String,
    remote_prefix: String,
}

impl SourceRewriter {
    pub const DEFAULT_LOCAL_PREFIX: &'static str = "langchain-docs";
    pub const DEFAULT_REMOTE_PREFIX: &'static str = "https:/";

    pub fn new(local_prefix: impl Into<String>, remote_prefix: impl Into<String>) -> Self {
        Self {
            local_prefix: local_prefix.into(),
            remote_prefix: remote_prefix.into(),
        }
    }

    /// Rewrite one source path into its URL
    pub fn rewrite(&self, source: &str) -> Result<String> {
        let rest = source.strip_prefix(&self.local_prefix).ok_or_else(|| {
            Error::InvalidInput(format!(
                "source '{}' does not start with '{}'",
                source, self.local_prefix
            ))
        })?;

        let rewritten = format!("{}{}", self.remote_prefix, rest);
        let url = Url::parse(&rewritten).map_err(|e| {
            Error::InvalidInput(format!("'{}' is not a valid URL: {}", rewritten, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(Error::InvalidInput(format!(
                "'{}' is not an absolute http(s) URL",
                rewritten
            )));
        }

        Ok(rewritten)
    }

    /// Rewrite the source of every chunk in place
    pub fn rewrite_chunks(&self, chunks: &mut [DocumentChunk]) -> Result<()> {
        for chunk in chunks.iter_mut() {
            chunk.metadata.source = self.rewrite(&chunk.metadata.source)?;
        }
        Ok(())
    }
}

impl Default for SourceRewriter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LOCAL_PREFIX, Self::DEFAULT_REMOTE_PREFIX)
    }
}
