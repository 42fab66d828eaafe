//! Export formats and priority-based format selection
//!
//! The download-location endpoint answers with a JSON object keyed by format
//! name. [`FormatOffer`] is the typed form of that answer and [`select`] picks
//! one entry by a fixed priority, which makes the choice a pure function of the
//! set of formats on offer.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Export formats we know how to pick, declared in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExportFormat {
    Fbx,
    Obj,
    Gltf,
    Usdz,
    Source,
}

impl ExportFormat {
    /// Fixed preference order used by [`select`]
    pub const PRIORITY: [ExportFormat; 5] = [
        ExportFormat::Fbx,
        ExportFormat::Obj,
        ExportFormat::Gltf,
        ExportFormat::Usdz,
        ExportFormat::Source,
    ];

    /// Key used by the API
    pub fn key(&self) -> &'static str {
        match self {
            ExportFormat::Fbx => "fbx",
            ExportFormat::Obj => "obj",
            ExportFormat::Gltf => "gltf",
            ExportFormat::Usdz => "usdz",
            ExportFormat::Source => "source",
        }
    }

    /// File extension of the downloaded archive
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Fbx => "fbx.zip",
            ExportFormat::Obj => "obj.zip",
            ExportFormat::Gltf => "gltf.zip",
            ExportFormat::Usdz => "usdz.zip",
            ExportFormat::Source => "source.zip",
        }
    }

    /// Uppercase label for filenames and console output
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Fbx => "FBX",
            ExportFormat::Obj => "OBJ",
            ExportFormat::Gltf => "GLTF",
            ExportFormat::Usdz => "USDZ",
            ExportFormat::Source => "SOURCE",
        }
    }

    /// Look up a format by its API key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|format| format.key() == key)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One downloadable export as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatLink {
    /// Pre-signed download location
    pub url: String,
    /// Archive size in bytes, when the API reports it
    #[serde(default)]
    pub size: Option<u64>,
    /// Seconds until `url` expires
    #[serde(default)]
    pub expires: Option<u64>,
}

/// Typed download-location response
///
/// Entries for recognized formats must carry a `url`; entries for any other
/// key are remembered by name only so they can be reported, never selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, serde_json::Value>")]
pub struct FormatOffer {
    links: BTreeMap<ExportFormat, FormatLink>,
    unrecognized: Vec<String>,
}

impl TryFrom<BTreeMap<String, serde_json::Value>> for FormatOffer {
    type Error = String;

    fn try_from(raw: BTreeMap<String, serde_json::Value>) -> std::result::Result<Self, Self::Error> {
        let mut offer = FormatOffer::default();

        for (key, value) in raw {
            match ExportFormat::from_key(&key) {
                Some(format) => {
                    let link: FormatLink = serde_json::from_value(value)
                        .map_err(|e| format!("format '{}' has an unexpected shape: {}", key, e))?;
                    offer.links.insert(format, link);
                }
                None => {
                    debug!("Ignoring unrecognized export format '{}'", key);
                    offer.unrecognized.push(key);
                }
            }
        }

        Ok(offer)
    }
}

impl FormatOffer {
    /// Empty offer
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recognized format
    pub fn with_link<S: Into<String>>(mut self, format: ExportFormat, url: S) -> Self {
        self.links.insert(format, FormatLink { url: url.into(), size: None, expires: None });
        self
    }

    /// Add a key we do not recognize
    pub fn with_unrecognized<S: Into<String>>(mut self, key: S) -> Self {
        self.unrecognized.push(key.into());
        self
    }

    /// Link for a recognized format
    pub fn get(&self, format: ExportFormat) -> Option<&FormatLink> {
        self.links.get(&format)
    }

    /// Every key in the response, recognized formats first in priority order
    pub fn available(&self) -> Vec<String> {
        self.links
            .keys()
            .map(|format| format.key().to_string())
            .chain(self.unrecognized.iter().cloned())
            .collect()
    }

    /// True when the response listed no formats at all
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.unrecognized.is_empty()
    }
}

/// The format picked for a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFormat {
    pub format: ExportFormat,
    pub url: String,
    /// Size advertised by the API, used when the transfer lacks Content-Length
    pub size: Option<u64>,
}

impl SelectedFormat {
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    pub fn label(&self) -> &'static str {
        self.format.label()
    }
}

/// Pick the first offered format in priority order: FBX > OBJ > GLTF > USDZ > SOURCE
///
/// Returns `None` when no recognized format is on offer, even if the offer
/// lists other keys.
pub fn select(offer: &FormatOffer) -> Option<SelectedFormat> {
    ExportFormat::PRIORITY.into_iter().find_map(|format| {
        offer.get(format).map(|link| SelectedFormat {
            format,
            url: link.url.clone(),
            size: link.size,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> FormatOffer {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_priority_fbx_over_obj() {
        let offer = FormatOffer::new()
            .with_link(ExportFormat::Obj, "https://cdn/obj.zip")
            .with_link(ExportFormat::Fbx, "https://cdn/fbx.zip");

        let selected = select(&offer).unwrap();
        assert_eq!(selected.format, ExportFormat::Fbx);
        assert_eq!(selected.url, "https://cdn/fbx.zip");
        assert_eq!(selected.extension(), "fbx.zip");
        assert_eq!(selected.label(), "FBX");
    }

    #[test]
    fn test_priority_obj_over_gltf() {
        let offer = parse(r#"{"gltf": {"url": "g"}, "obj": {"url": "o"}}"#);
        assert_eq!(select(&offer).unwrap().format, ExportFormat::Obj);
    }

    #[test]
    fn test_single_usdz() {
        let offer = parse(r#"{"usdz": {"url": "u", "size": 2048, "expires": 300}}"#);
        let selected = select(&offer).unwrap();
        assert_eq!(selected.format, ExportFormat::Usdz);
        assert_eq!(selected.size, Some(2048));
        assert_eq!(selected.extension(), "usdz.zip");
    }

    #[test]
    fn test_empty_offer() {
        let offer = parse("{}");
        assert!(offer.is_empty());
        assert_eq!(select(&offer), None);
    }

    #[test]
    fn test_unknown_formats_are_not_a_fallback() {
        let offer = parse(r#"{"glb": {"url": "x"}, "stl": "weird"}"#);
        assert!(!offer.is_empty());
        assert_eq!(select(&offer), None);
        assert_eq!(offer.available(), vec!["glb".to_string(), "stl".to_string()]);
    }

    #[test]
    fn test_selection_depends_only_on_key_set() {
        let a = parse(r#"{"source": {"url": "s1"}, "gltf": {"url": "g1"}}"#);
        let b = FormatOffer::new()
            .with_link(ExportFormat::Gltf, "g2")
            .with_unrecognized("glb")
            .with_link(ExportFormat::Source, "s2");

        assert_eq!(select(&a).unwrap().format, select(&b).unwrap().format);
        assert_eq!(select(&a).unwrap().format, ExportFormat::Gltf);
    }

    #[test]
    fn test_malformed_known_format_is_rejected() {
        let result: std::result::Result<FormatOffer, _> = serde_json::from_str(r#"{"fbx": {"size": 10}}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("fbx"), "unexpected error: {}", err);
    }

    #[test]
    fn test_format_keys_round_trip() {
        for format in ExportFormat::PRIORITY {
            assert_eq!(ExportFormat::from_key(format.key()), Some(format));
            assert_eq!(format.extension(), format!("{}.zip", format.key()));
            assert_eq!(format.label(), format.key().to_uppercase());
        }
        assert_eq!(ExportFormat::from_key("FBX"), None);
    }
}
