use crate::error::FetchError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How a relay hands back the page it fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// JSON envelope with the page under `contents`
    JsonContents,
    /// Response body is the page itself
    RawText,
}

/// One indirect route to a third-party page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRoute {
    pub name: String,
    pub prefix: String,
    pub mode: PayloadMode,
}

#[derive(Deserialize)]
struct ContentsEnvelope {
    contents: Option<String>,
}

impl RelayRoute {
    pub fn new(prefix: impl Into<String>, mode: PayloadMode) -> Self {
        let prefix = prefix.into();
        let name = url::Url::parse(&prefix)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| prefix.clone());
        Self { name, prefix, mode }
    }

    pub fn all_origins() -> Self {
        Self::new("https://api.allorigins.win/get?url=", PayloadMode::JsonContents)
    }

    pub fn thing_proxy() -> Self {
        Self::new("https://thingproxy.freeboard.io/fetch/", PayloadMode::RawText)
    }

    pub fn cors_sh() -> Self {
        Self::new("https://proxy.cors.sh/", PayloadMode::RawText)
    }

    /// Relay URL for `target`, percent-encoded into the prefix
    pub fn wrap(&self, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("{}{}", self.prefix, encoded)
    }

    /// Pull the relayed page out of the relay's response body
    pub fn unwrap_payload(&self, body: String) -> Result<String, FetchError> {
        match self.mode {
            PayloadMode::RawText => Ok(body),
            PayloadMode::JsonContents => {
                let envelope: ContentsEnvelope = serde_json::from_str(&body)
                    .map_err(|e| FetchError::InvalidJson(e.to_string()))?;
                Ok(envelope.contents.unwrap_or_default())
            }
        }
    }
}

impl fmt::Display for RelayRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for RelayRoute {
    type Err = String;

    /// Parses `json:<prefix>` or `raw:<prefix>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mode, prefix) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid relay route: {}", s))?;

        let mode = match mode.to_lowercase().as_str() {
            "json" => PayloadMode::JsonContents,
            "raw" => PayloadMode::RawText,
            other => return Err(format!("unknown relay payload mode: {}", other)),
        };

        if !prefix.starts_with("http://") && !prefix.starts_with("https://") {
            return Err(format!("relay prefix must be an http(s) URL: {}", prefix));
        }

        Ok(Self::new(prefix, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_encodes_target() {
        let route = RelayRoute::all_origins();
        assert_eq!(
            route.wrap("https://coinpaprika.com/exchanges/bithumb/"),
            "https://api.allorigins.win/get?url=https%3A%2F%2Fcoinpaprika.com%2Fexchanges%2Fbithumb%2F"
        );
        assert_eq!(route.name, "api.allorigins.win");
    }

    #[test]
    fn test_unwrap_json_envelope() {
        let route = RelayRoute::all_origins();
        let body = r#"{"contents":"<html>hi</html>","status":{"http_code":200}}"#.to_string();
        assert_eq!(route.unwrap_payload(body).unwrap(), "<html>hi</html>");

        let empty = r#"{"contents":null}"#.to_string();
        assert_eq!(route.unwrap_payload(empty).unwrap(), "");
    }

    #[test]
    fn test_unwrap_raw_passthrough() {
        let route = RelayRoute::thing_proxy();
        assert_eq!(route.unwrap_payload("<p>x</p>".into()).unwrap(), "<p>x</p>");
    }

    #[test]
    fn test_parse_route() {
        let route: RelayRoute = "raw:https://proxy.cors.sh/".parse().unwrap();
        assert_eq!(route, RelayRoute::cors_sh());
        assert!("ftp:https://x/".parse::<RelayRoute>().is_err());
        assert!("json:not-a-url".parse::<RelayRoute>().is_err());
    }
}
