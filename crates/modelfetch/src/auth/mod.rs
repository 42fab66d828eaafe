//! Session credentials for the marketplace API
//!
//! Credentials are resolved once at startup and handed to the HTTP layer
//! explicitly. Three mechanisms are supported:
//!
//! - an API token, sent as `Authorization: Token <token>` on API calls
//! - session cookies read from a local browser's cookie store
//! - session cookies read from a Netscape `cookies.txt` export
//!
//! Cookies end up in the client's cookie jar. A token takes precedence when
//! both a token and a cookie source are configured.

pub mod browser;

pub use browser::{Browser, BrowserCookieStore, RookieStore};

use reqwest::RequestBuilder;
use reqwest::cookie::Jar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::{DownloadError, FileOperation, Result};

/// Where session cookies come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Netscape `cookies.txt` export
    File(PathBuf),
    /// Cookie store of a locally installed browser
    Browser(Browser),
}

/// Credentials attached to the run's HTTP session
#[derive(Debug, Clone)]
pub enum Credentials {
    /// No credentials; only public endpoints will work
    Anonymous,
    /// Personal API token
    Token(String),
    /// Browser session cookies
    Cookies {
        jar: Arc<Jar>,
        count: usize,
    },
}

impl Credentials {
    /// Resolve the credentials for a run
    ///
    /// `token` wins over `cookies`. A cookie file that cannot be read or parsed
    /// is a setup error. A browser store that cannot be read only produces a
    /// warning and the run continues anonymously.
    pub fn resolve(token: Option<&str>, cookies: Option<&CookieSource>, api_base: &str) -> Result<Self> {
        Self::resolve_with(token, cookies, api_base, &RookieStore)
    }

    /// [`resolve`](Self::resolve) with an explicit browser cookie store
    pub fn resolve_with(
        token: Option<&str>,
        cookies: Option<&CookieSource>,
        api_base: &str,
        store: &dyn BrowserCookieStore,
    ) -> Result<Self> {
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            info!("Using API token for authentication");
            return Ok(Credentials::Token(token.to_string()));
        }

        match cookies {
            Some(CookieSource::File(path)) => {
                let credentials = Self::from_cookie_file(path, api_base)?;
                if let Credentials::Cookies { count, .. } = &credentials {
                    info!("Loaded {} cookie(s) from {}", count, path.display());
                }
                Ok(credentials)
            }
            Some(CookieSource::Browser(browser)) => match Self::from_browser(store, *browser, api_base) {
                Ok(credentials) => {
                    if let Credentials::Cookies { count, .. } = &credentials {
                        info!("Loaded {} cookie(s) from {}", count, browser);
                    }
                    Ok(credentials)
                }
                Err(e) => {
                    warn!("{}; continuing without credentials", e);
                    Ok(Credentials::Anonymous)
                }
            },
            None => {
                warn!("No API token or cookies given; models that require login will fail");
                Ok(Credentials::Anonymous)
            }
        }
    }

    /// Load cookies for the marketplace domain from a Netscape cookie export
    pub fn from_cookie_file(path: &Path, api_base: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DownloadError::file_system(path, FileOperation::Read, e))?;

        let cookies = parse_netscape_cookies(&content, path)?;
        let credentials = Self::from_session_cookies(&cookies, api_base)?;
        if let Credentials::Cookies { count: 0, .. } = credentials {
            warn!("Cookie file {} has no usable cookies for {}", path.display(), api_base);
        }
        Ok(credentials)
    }

    /// Load cookies for the marketplace domain from a browser's cookie store
    pub fn from_browser(store: &dyn BrowserCookieStore, browser: Browser, api_base: &str) -> Result<Self> {
        let origin = parse_origin(api_base)?;
        let host = origin.host_str().unwrap_or_default();

        let cookies = store.load(browser, host).map_err(|reason| DownloadError::BrowserCookies {
            browser: browser.to_string(),
            reason,
        })?;

        let credentials = Self::from_session_cookies(&cookies, api_base)?;
        if let Credentials::Cookies { count: 0, .. } = credentials {
            return Err(DownloadError::BrowserCookies {
                browser: browser.to_string(),
                reason: format!("no cookies for {}; log in with that browser first", host),
            });
        }
        Ok(credentials)
    }

    /// Put the cookies that apply to the API host into a fresh jar
    fn from_session_cookies(cookies: &[SessionCookie], api_base: &str) -> Result<Self> {
        let origin = parse_origin(api_base)?;
        let host = origin.host_str().unwrap_or_default().to_string();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let jar = Jar::default();
        let mut count = 0;

        for cookie in cookies.iter().filter(|c| c.matches_host(&host)) {
            if cookie.is_expired(now) {
                debug!("Skipping expired cookie '{}'", cookie.name);
                continue;
            }

            // Stored as host cookies for the API origin, the only place they are sent
            jar.add_cookie_str(&cookie.set_cookie_header(), &origin);
            count += 1;
        }

        Ok(Credentials::Cookies {
            jar: Arc::new(jar),
            count,
        })
    }

    /// Cookie jar to install on the HTTP client, if any
    pub fn cookie_jar(&self) -> Option<Arc<Jar>> {
        match self {
            Credentials::Cookies { jar, .. } => Some(Arc::clone(jar)),
            _ => None,
        }
    }

    /// Add per-request authentication to an API request
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Token(token) => request.header("Authorization", format!("Token {}", token)),
            _ => request,
        }
    }

    /// Short description for logs and console output
    pub fn describe(&self) -> &'static str {
        match self {
            Credentials::Anonymous => "anonymous",
            Credentials::Token(_) => "API token",
            Credentials::Cookies { .. } => "browser cookies",
        }
    }
}

fn parse_origin(api_base: &str) -> Result<Url> {
    Url::parse(api_base).map_err(|e| DownloadError::Configuration {
        message: format!("Invalid API base '{}': {}", api_base, e),
        field: Some("api_base".to_string()),
        suggestion: None,
    })
}

/// A cookie taken from a browser store or a cookie export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix timestamp; `0` marks a session cookie
    pub expires: u64,
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    /// Whether this cookie would be sent to `host`
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        if host.eq_ignore_ascii_case(domain) {
            return true;
        }
        (self.include_subdomains || self.domain.starts_with('.'))
            && host.to_ascii_lowercase().ends_with(&format!(".{}", domain.to_ascii_lowercase()))
    }

    fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires < now
    }

    /// `Set-Cookie` form keeping the cookie's path and secure flag
    fn set_cookie_header(&self) -> String {
        let path = if self.path.starts_with('/') { self.path.as_str() } else { "/" };
        let mut header = format!("{}={}; Path={}", self.name, self.value, path);
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

/// Parse a Netscape `cookies.txt` export
///
/// Blank lines and `#` comments are skipped; the `#HttpOnly_` prefix used by
/// curl and browser export extensions is understood.
pub fn parse_netscape_cookies(content: &str, path: &Path) -> Result<Vec<SessionCookie>> {
    let mut cookies = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        let line = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => rest,
            None if line.trim().is_empty() || line.starts_with('#') => continue,
            None => line,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return Err(DownloadError::CookieFile {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("expected 7 tab-separated fields, found {}", fields.len()),
            });
        }

        let expires = fields[4].trim().parse::<u64>().map_err(|_| DownloadError::CookieFile {
            path: path.to_path_buf(),
            line: index + 1,
            reason: format!("invalid expiry '{}'", fields[4]),
        })?;

        cookies.push(SessionCookie {
            domain: fields[0].to_string(),
            include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            expires,
            name: fields[5].to_string(),
            value: fields[6].to_string(),
        });
    }

    Ok(cookies)
}
