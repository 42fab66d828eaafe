//! Sources of model links
//!
//! A run is fed by one or more [`InputSource`]s: a text file scanned for
//! marketplace links, or a literal list given on the command line.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

use crate::core::{DownloadError, FileOperation, Result};

static MODEL_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?sketchfab\.com/(?:3d-models|models)/[A-Za-z0-9-]+")
        .expect("valid model link pattern")
});

/// Something that yields model links in processing order
pub trait InputSource {
    fn references(&self) -> Result<Vec<String>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Links found anywhere inside a text file
#[derive(Debug, Clone)]
pub struct TextFileSource {
    path: PathBuf,
}

impl TextFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl InputSource for TextFileSource {
    fn references(&self) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| DownloadError::file_system(&self.path, FileOperation::Read, e))?;

        let links = extract_links(&content);
        debug!("Found {} unique link(s) in {}", links.len(), self.path.display());
        Ok(links)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// A fixed list of links
#[derive(Debug, Clone, Default)]
pub struct UrlListSource {
    urls: Vec<String>,
}

impl UrlListSource {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

impl InputSource for UrlListSource {
    fn references(&self) -> Result<Vec<String>> {
        Ok(dedup_preserving_order(
            self.urls
                .iter()
                .map(|url| url.trim())
                .filter(|url| !url.is_empty())
                .map(str::to_string),
        ))
    }

    fn describe(&self) -> String {
        format!("{} link(s) from the command line", self.urls.len())
    }
}

/// Scan text for marketplace links, keeping the first occurrence of each
pub fn extract_links(text: &str) -> Vec<String> {
    dedup_preserving_order(MODEL_LINK.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Gather links from several sources, in source order, without duplicates
pub fn collect_references(sources: &[Box<dyn InputSource>]) -> Result<Vec<String>> {
    let mut all = Vec::new();
    for source in sources {
        let links = source.references()?;
        debug!("{}: {} link(s)", source.describe(), links.len());
        all.extend(links);
    }
    Ok(dedup_preserving_order(all))
}

fn dedup_preserving_order<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
