//! Model link normalization and identifier extraction
//!
//! Marketplace links come in two shapes:
//!
//! - `/models/<id>` (embed and API style links)
//! - `/3d-models/<slug>-<32 char id>` (public model pages)
//!
//! Links copied out of chat logs and documents sometimes lose the hyphen
//! between the slug and the ID (`/3d-models/infusion-pump678e...`). The
//! normalizer repairs exactly that case and leaves every other link untouched.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::{DownloadError, Result};

/// Slug made of letters and hyphens glued to a 32 char lowercase hex ID, ending the path
static MISSING_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/3d-models/([A-Za-z-]+)([a-f0-9]{32})(?:[/?#\s]|$)")
        .expect("valid missing-separator pattern")
});

static MODELS_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/models/([A-Za-z0-9]+)(?:[/?#\s]|$)").expect("valid models pattern")
});

static SLUG_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/3d-models/[^/?#\s]+-([A-Za-z0-9]{32})(?:[/?#\s]|$)").expect("valid slug pattern")
});

/// Insert the missing `-` between a model slug and its 32 character hex ID
///
/// Returns the input unchanged when the link does not have that defect. A slug
/// that already ends in `-` is treated as separated, which keeps
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw_url: &str) -> String {
    let Some(caps) = MISSING_SEPARATOR.captures(raw_url) else {
        return raw_url.to_string();
    };

    let (Some(name), Some(hex)) = (caps.get(1), caps.get(2)) else {
        return raw_url.to_string();
    };

    if name.as_str().ends_with('-') {
        return raw_url.to_string();
    }

    let split = hex.start();
    format!("{}-{}", &raw_url[..split], &raw_url[split..])
}

/// Extract the model identifier from a link
///
/// `/models/<id>` is checked first, then `/3d-models/<slug>-<id>` where the
/// final hyphen-delimited component is exactly 32 alphanumerics.
pub fn extract_id(url: &str) -> Option<String> {
    if let Some(caps) = MODELS_SEGMENT.captures(url) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    SLUG_SEGMENT
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// A model link together with its repaired form and extracted identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReference {
    /// Link as it appeared in the input
    pub raw: String,
    /// Link after separator repair
    pub url: String,
    pub model_id: String,
}

impl ModelReference {
    /// Normalize a raw link and extract its model ID
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let url = normalize(raw);
        let model_id = extract_id(&url).ok_or_else(|| DownloadError::UnresolvableUrl {
            url: url.clone(),
        })?;

        Ok(Self {
            raw: raw.to_string(),
            url,
            model_id,
        })
    }

    /// Whether normalization had to repair the link
    pub fn was_repaired(&self) -> bool {
        self.raw != self.url
    }
}
