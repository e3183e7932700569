use http::header::{AsHeaderName, USER_AGENT};
use http::HeaderMap;
use std::borrow::Cow;
use std::net::IpAddr;

/// The parts of an inbound request the guard looks at
#[derive(Debug, Clone, Copy)]
pub struct ClientRequest<'a> {
    /// Request headers, as received (possibly forged)
    pub headers: &'a HeaderMap,
    /// Socket address of the directly connected peer, if known
    pub peer: Option<IpAddr>,
}

impl<'a> ClientRequest<'a> {
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self { headers, peer: None }
    }

    pub fn with_peer(mut self, peer: IpAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Trimmed header value; missing, empty and non-visible-ASCII values read as `None`
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&'a str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Trimmed user agent. Unlike [`ClientRequest::header`], a value carrying
    /// obs-text bytes is kept, decoded lossily, so it still identifies the caller.
    pub fn user_agent(&self) -> Option<Cow<'a, str>> {
        let value = self.headers.get(USER_AGENT)?;
        let user_agent = match value.to_str() {
            Ok(ua) => Cow::Borrowed(ua.trim()),
            Err(_) => match String::from_utf8_lossy(value.as_bytes()) {
                Cow::Borrowed(ua) => Cow::Borrowed(ua.trim()),
                Cow::Owned(ua) => Cow::Owned(ua.trim().to_string()),
            },
        };
        (!user_agent.is_empty()).then_some(user_agent)
    }
}
