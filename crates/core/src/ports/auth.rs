/// A request about to be sent to the server, reduced to what authentication touches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingRequest {
    url: String,
    headers: Vec<(String, String)>,
}

impl OutgoingRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Already resolved credentials, applied to every outgoing request
pub trait Authentication: Send + Sync {
    fn apply(&self, request: &mut OutgoingRequest);
}
