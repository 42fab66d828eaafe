//! Reading session cookies from locally installed browsers

use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::SessionCookie;

/// Browser whose cookie store is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
    Brave,
    /// Try every supported browser and merge what is found
    Any,
}

impl Browser {
    pub const ALL: [Browser; 5] = [Browser::Chrome, Browser::Firefox, Browser::Edge, Browser::Brave, Browser::Any];

    pub fn name(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "edge",
            Browser::Brave => "brave",
            Browser::Any => "any",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|browser| browser.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(Browser::name).collect();
                format!("unknown browser '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Access to browser cookie databases
pub trait BrowserCookieStore {
    /// Cookies stored by `browser` whose domain contains `domain`
    fn load(&self, browser: Browser, domain: &str) -> std::result::Result<Vec<SessionCookie>, String>;
}

/// Cookie store backed by the browsers' on-disk databases
#[derive(Debug, Clone, Copy, Default)]
pub struct RookieStore;

impl BrowserCookieStore for RookieStore {
    fn load(&self, browser: Browser, domain: &str) -> std::result::Result<Vec<SessionCookie>, String> {
        let domains = Some(vec![domain.to_string()]);
        let cookies = match browser {
            Browser::Chrome => rookie::chrome(domains),
            Browser::Firefox => rookie::firefox(domains),
            Browser::Edge => rookie::edge(domains),
            Browser::Brave => rookie::brave(domains),
            Browser::Any => rookie::load(domains),
        }
        .map_err(|e| e.to_string())?;

        debug!("{} returned {} cookie(s) for {}", browser, cookies.len(), domain);
        Ok(cookies
            .into_iter()
            .map(|cookie| SessionCookie {
                include_subdomains: cookie.domain.starts_with('.'),
                domain: cookie.domain,
                path: cookie.path,
                secure: cookie.secure,
                expires: cookie.expires.unwrap_or(0),
                name: cookie.name,
                value: cookie.value,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_from_str() {
        assert_eq!("chrome".parse::<Browser>(), Ok(Browser::Chrome));
        assert_eq!(" Firefox ".parse::<Browser>(), Ok(Browser::Firefox));
        assert_eq!("EDGE".parse::<Browser>(), Ok(Browser::Edge));
        assert_eq!("brave".parse::<Browser>(), Ok(Browser::Brave));
        assert_eq!("any".parse::<Browser>(), Ok(Browser::Any));

        let err = "safari".parse::<Browser>().unwrap_err();
        assert!(err.contains("chrome, firefox, edge, brave, any"), "{}", err);
    }

    #[test]
    fn test_browser_names_round_trip() {
        for browser in Browser::ALL {
            assert_eq!(browser.to_string().parse::<Browser>(), Ok(browser));
        }
    }
}
