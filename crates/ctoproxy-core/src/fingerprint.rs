use ctoproxy_provider_core::{Headers, header_merge, header_set};
use rand::Rng;

/// Produces browser-like request headers. One instance keeps the same
/// identity markers for every call, so a session never changes browsers
/// midway.
pub trait HeaderBuilder: Send + Sync {
    fn build_http_headers(
        &self,
        target_url: Option<&str>,
        origin: Option<&str>,
        referer: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Headers;

    fn build_stream_headers(
        &self,
        origin: Option<&str>,
        referer: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Headers;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Edge,
    Firefox,
    Safari,
}

const BROWSER_WEIGHTS: &[BrowserKind] = &[
    BrowserKind::Chrome,
    BrowserKind::Chrome,
    BrowserKind::Edge,
    BrowserKind::Firefox,
    BrowserKind::Safari,
];

const CHROME_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
];

const EDGE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
];

const FIREFOX_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:132.0) Gecko/20100101 Firefox/132.0",
];

const SAFARI_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "zh-CN,zh;q=0.9,en;q=0.8",
    "zh-CN,zh;q=0.8,en-US;q=0.6,en;q=0.5",
    "en-US,en;q=0.9,zh-CN;q=0.7",
];

const ACCEPT_ENCODINGS: &[&str] = &["gzip, deflate, br", "gzip, deflate"];

const FALLBACK_CHROME_MAJOR: &str = "126";

fn pick<'a, R: Rng + ?Sized, T>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// A browser identity fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserFingerprint {
    pub user_agent: String,
    pub browser: BrowserKind,
    pub accept_language: String,
    pub accept_encoding: String,
}

impl BrowserFingerprint {
    pub fn random() -> Self {
        Self::from_rng(&mut rand::rng())
    }

    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let wanted = *pick(rng, BROWSER_WEIGHTS);
        let agents = match wanted {
            BrowserKind::Chrome => CHROME_AGENTS,
            BrowserKind::Edge => EDGE_AGENTS,
            BrowserKind::Firefox => FIREFOX_AGENTS,
            BrowserKind::Safari => SAFARI_AGENTS,
        };
        Self::with_user_agent(
            *pick(rng, agents),
            pick(rng, ACCEPT_LANGUAGES),
            pick(rng, ACCEPT_ENCODINGS),
        )
    }

    pub fn with_user_agent(user_agent: &str, accept_language: &str, accept_encoding: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            browser: detect_browser(user_agent),
            accept_language: accept_language.to_string(),
            accept_encoding: accept_encoding.to_string(),
        }
    }

    fn client_hints(&self) -> Option<String> {
        if !matches!(self.browser, BrowserKind::Chrome | BrowserKind::Edge) {
            return None;
        }
        let chrome = major_version(&self.user_agent, "Chrome/").unwrap_or(FALLBACK_CHROME_MAJOR);
        let mut brands = Vec::with_capacity(4);
        if let Some(edge) = major_version(&self.user_agent, "Edg/") {
            brands.push(format!("\"Microsoft Edge\";v=\"{edge}\""));
        }
        brands.push(format!("\"Chromium\";v=\"{chrome}\""));
        if self.browser == BrowserKind::Chrome {
            brands.push(format!("\"Google Chrome\";v=\"{chrome}\""));
        }
        brands.push("\"Not_A Brand\";v=\"8\"".to_string());
        Some(brands.join(", "))
    }
}

impl HeaderBuilder for BrowserFingerprint {
    fn build_http_headers(
        &self,
        target_url: Option<&str>,
        origin: Option<&str>,
        referer: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Headers {
        let mut headers: Headers = vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Accept".to_string(), "application/json, text/event-stream".to_string()),
            ("Accept-Language".to_string(), self.accept_language.clone()),
            ("Accept-Encoding".to_string(), self.accept_encoding.clone()),
            ("Cache-Control".to_string(), "no-cache".to_string()),
            ("Pragma".to_string(), "no-cache".to_string()),
        ];
        if let Some(referer) = referer {
            header_set(&mut headers, "Referer", referer);
        }
        if let Some(origin) = origin {
            header_set(&mut headers, "Origin", origin);
        }
        if let Some(hints) = self.client_hints() {
            header_set(&mut headers, "sec-ch-ua", hints);
            header_set(&mut headers, "sec-ch-ua-mobile", "?0");
            header_set(&mut headers, "sec-ch-ua-platform", detect_platform(&self.user_agent));
            header_set(&mut headers, "Sec-Fetch-Dest", "empty");
            header_set(&mut headers, "Sec-Fetch-Mode", "cors");
            header_set(
                &mut headers,
                "Sec-Fetch-Site",
                infer_fetch_site(origin, referer, target_url),
            );
        }
        header_merge(&mut headers, extra);
        headers
    }

    fn build_stream_headers(
        &self,
        origin: Option<&str>,
        referer: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Headers {
        let mut headers: Headers = vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Cache-Control".to_string(), "no-cache".to_string()),
            ("Pragma".to_string(), "no-cache".to_string()),
        ];
        if let Some(referer) = referer {
            header_set(&mut headers, "Referer", referer);
        }
        if let Some(origin) = origin {
            header_set(&mut headers, "Origin", origin);
        }
        header_merge(&mut headers, extra);
        headers
    }
}

fn major_version<'a>(user_agent: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = user_agent.split_once(marker)?;
    rest.split('.').next().filter(|major| !major.is_empty())
}

pub fn detect_browser(user_agent: &str) -> BrowserKind {
    let lower = user_agent.to_ascii_lowercase();
    if lower.contains("edg/") {
        BrowserKind::Edge
    } else if lower.contains("chrome/") {
        BrowserKind::Chrome
    } else if lower.contains("firefox/") {
        BrowserKind::Firefox
    } else if lower.contains("safari") {
        BrowserKind::Safari
    } else {
        BrowserKind::Chrome
    }
}

pub fn detect_platform(user_agent: &str) -> &'static str {
    if user_agent.contains("Windows") {
        "\"Windows\""
    } else if user_agent.contains("Mac OS X") || user_agent.contains("Macintosh") {
        "\"macOS\""
    } else if user_agent.contains("Android") {
        "\"Android\""
    } else if user_agent.contains("iPhone") || user_agent.contains("iPad") {
        "\"iOS\""
    } else if user_agent.contains("Linux") {
        "\"Linux\""
    } else {
        "\"Windows\""
    }
}

fn host_of(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    let absolute = if value.contains("://") {
        value.to_string()
    } else {
        format!("https://{value}")
    };
    let uri: http::Uri = absolute.parse().ok()?;
    let authority = uri.authority()?.as_str().to_ascii_lowercase();
    (!authority.is_empty()).then_some(authority)
}

/// Registrable site approximated as the last two host labels.
fn site_of(host: &str) -> &str {
    let host = host.split(':').next().unwrap_or(host);
    let mut dots = host.rmatch_indices('.');
    dots.next();
    match dots.next() {
        Some((index, _)) => &host[index + 1..],
        None => host,
    }
}

fn relation(source: &str, target: &str) -> &'static str {
    if source == target {
        "same-origin"
    } else if site_of(source) == site_of(target) {
        "same-site"
    } else {
        "cross-site"
    }
}

/// `Sec-Fetch-Site` for a request to `target_url` issued from `origin`
/// (falling back to `referer`).
pub fn infer_fetch_site(
    origin: Option<&str>,
    referer: Option<&str>,
    target_url: Option<&str>,
) -> &'static str {
    let origin = host_of(origin);
    let referer = host_of(referer);
    let target = host_of(target_url);
    match (&target, &origin, &referer) {
        (Some(target), Some(origin), _) => relation(origin, target),
        (Some(target), None, Some(referer)) => relation(referer, target),
        (_, None, None) => "none",
        (_, origin, referer) => {
            if origin == referer {
                "same-origin"
            } else {
                "cross-site"
            }
        }
    }
}
