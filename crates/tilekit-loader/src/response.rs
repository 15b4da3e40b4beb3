use std::collections::BTreeMap;
use std::io::Read;
use tilekit_schema::filter_headers;

/// Body of a resolved resource: owned bytes for small/trusted backends, or a
/// bounded stream for backends that can serve content without buffering it.
pub enum Body {
    Bytes(Vec<u8>),
    Stream(Box<dyn Read + Send>),
}

impl Body {
    /// Drain the body into owned bytes.
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self {
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

/// The uniform response every path loader returns: an HTTP-shaped status,
/// allow-list-filtered headers, and a body.
#[derive(Debug)]
pub struct PathResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Body,
}

impl PathResponse {
    /// A 200 response. Headers are routed through the allow-list filter here
    /// so no backend can leak an unlisted header.
    pub fn found(headers: &BTreeMap<String, String>, body: Body) -> Self {
        Self {
            status: 200,
            headers: filter_headers(headers),
            body,
        }
    }

    /// The typed "no result" outcome: 404, empty headers, empty body.
    pub fn not_found() -> Self {
        Self {
            status: 404,
            headers: BTreeMap::new(),
            body: Body::Bytes(Vec::new()),
        }
    }

    pub fn ok(&self) -> bool {
        self.status == 200
    }
}
