use crate::record::TileRecord;
use crate::{RemoteError, COLLECTION};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tilekit_schema::{Cid, Did, RecordKey};

/// An authenticated repository session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub did: Did,
    pub handle: String,
    #[serde(rename = "accessJwt")]
    pub access_jwt: String,
}

/// Location of a record after a write.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRef {
    pub uri: String,
    pub rkey: RecordKey,
}

/// Repository operations tile publishing and loading need. Read operations
/// take the already-resolved service endpoint so callers decide how long to
/// cache a DID resolution; write operations go to the session's own service.
pub trait RepoClient: Send + Sync {
    /// Resolve a DID to its repository service endpoint.
    fn resolve_service(&self, did: &Did) -> Result<String, RemoteError>;

    /// Fetch a record from a repository. Missing records are `NotFound`.
    fn get_record(
        &self,
        service: &str,
        did: &Did,
        collection: &str,
        rkey: &RecordKey,
    ) -> Result<TileRecord, RemoteError>;

    /// Fetch a blob by CID. `Ok(None)` for any not-ok response; `Err` is
    /// reserved for transport failures.
    fn fetch_blob(&self, service: &str, did: &Did, cid: &Cid)
        -> Result<Option<Vec<u8>>, RemoteError>;

    /// Upload a blob to the session repository, returning the CID the
    /// remote computed for it.
    fn upload_blob(&self, data: &[u8], content_type: &str) -> Result<Cid, RemoteError>;

    /// Create or overwrite a record in the session repository. With no
    /// `rkey` the server assigns one.
    fn put_record(
        &self,
        collection: &str,
        rkey: Option<&RecordKey>,
        record: &TileRecord,
    ) -> Result<RecordRef, RemoteError>;

    /// Delete a record from the session repository.
    fn delete_record(&self, collection: &str, rkey: &RecordKey) -> Result<(), RemoteError>;
}

#[derive(Debug, Deserialize)]
struct DidDocument {
    #[serde(default)]
    service: Vec<DidService>,
}

#[derive(Debug, Deserialize)]
struct DidService {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "serviceEndpoint", default)]
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct UploadBlobOut {
    cid: Cid,
}

#[derive(Debug, Deserialize)]
struct GetRecordOut {
    value: TileRecord,
}

/// HTTP repository client speaking the XRPC-style API:
/// - `POST /xrpc/com.atproto.server.createSession` — login
/// - `POST /xrpc/com.atproto.repo.uploadBlob`      — upload resource blob
/// - `POST /xrpc/com.atproto.repo.putRecord`       — write tile record
/// - `POST /xrpc/com.atproto.repo.deleteRecord`    — delete tile record
/// - `GET  /xrpc/com.atproto.repo.getRecord`       — read tile record
/// - `GET  /xrpc/com.atproto.sync.getBlob`         — read resource blob
///
/// DID resolution goes through the PLC directory for `did:plc:` and the
/// `.well-known` document for `did:web:`.
pub struct HttpRepoClient {
    service: String,
    plc_directory: String,
    agent: ureq::Agent,
    session: Option<Session>,
}

impl HttpRepoClient {
    pub fn new(config: &crate::RemoteConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .new_agent();
        Self {
            service: config.service.trim_end_matches('/').to_owned(),
            plc_directory: config.plc_directory.trim_end_matches('/').to_owned(),
            agent,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Resume a previously established session without logging in again.
    pub fn restore_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn login(&mut self, identifier: &str, password: &str) -> Result<Session, RemoteError> {
        let url = format!("{}/xrpc/com.atproto.server.createSession", self.service);
        let body = serde_json::to_vec(&serde_json::json!({
            "identifier": identifier,
            "password": password,
        }))
        .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        let resp = self.do_post(&url, "application/json", &body)?;
        let session: Session = serde_json::from_slice(&resp)
            .map_err(|e| RemoteError::Serialization(format!("invalid session response: {e}")))?;
        tracing::debug!("logged in as {} ({})", session.handle, session.did);
        self.session = Some(session.clone());
        Ok(session)
    }

    fn bearer(&self) -> Result<String, RemoteError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| RemoteError::Config("not logged in".to_owned()))?;
        Ok(format!("Bearer {}", session.access_jwt))
    }

    fn session_did(&self) -> Result<&Did, RemoteError> {
        self.session
            .as_ref()
            .map(|s| &s.did)
            .ok_or_else(|| RemoteError::Config("not logged in".to_owned()))
    }

    fn do_get(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let resp = match self.agent.get(url).call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };
        read_body(resp)
    }

    fn do_get_optional(&self, url: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        let resp = match self.agent.get(url).call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(_)) => return Ok(None),
            Err(e) => return Err(RemoteError::Http(e.to_string())),
        };
        read_body(resp).map(Some)
    }

    fn do_post(&self, url: &str, content_type: &str, data: &[u8]) -> Result<Vec<u8>, RemoteError> {
        let mut req = self.agent.post(url).header("Content-Type", content_type);
        if let Some(ref session) = self.session {
            req = req.header("Authorization", &format!("Bearer {}", session.access_jwt));
        }
        let resp = match req.send(data) {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };
        read_body(resp)
    }
}

fn read_body(resp: ureq::http::Response<ureq::Body>) -> Result<Vec<u8>, RemoteError> {
    let mut reader = resp.into_body().into_reader();
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|e| RemoteError::Http(e.to_string()))?;
    Ok(body)
}

impl RepoClient for HttpRepoClient {
    fn resolve_service(&self, did: &Did) -> Result<String, RemoteError> {
        let url = if did.starts_with("did:plc:") {
            format!("{}/{}", self.plc_directory, did.as_str())
        } else if let Some(host) = did.strip_prefix("did:web:") {
            format!("https://{host}/.well-known/did.json")
        } else {
            return Err(RemoteError::Config(format!("unsupported DID method: {did}")));
        };
        tracing::debug!("resolving {did} via {url}");
        let body = self.do_get(&url)?;
        let doc: DidDocument = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::Serialization(format!("invalid DID document: {e}")))?;
        doc.service
            .into_iter()
            .find(|s| s.kind.ends_with("PersonalDataServer") || s.id.ends_with("#pds"))
            .map(|s| s.endpoint.trim_end_matches('/').to_owned())
            .ok_or_else(|| {
                RemoteError::Config(format!("no repository service in DID document for {did}"))
            })
    }

    fn get_record(
        &self,
        service: &str,
        did: &Did,
        collection: &str,
        rkey: &RecordKey,
    ) -> Result<TileRecord, RemoteError> {
        let url = format!(
            "{service}/xrpc/com.atproto.repo.getRecord?repo={did}&collection={collection}&rkey={rkey}"
        );
        tracing::debug!("GET {url}");
        let body = self.do_get(&url)?;
        let out: GetRecordOut = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::Serialization(format!("invalid record response: {e}")))?;
        Ok(out.value)
    }

    fn fetch_blob(
        &self,
        service: &str,
        did: &Did,
        cid: &Cid,
    ) -> Result<Option<Vec<u8>>, RemoteError> {
        let url = format!("{service}/xrpc/com.atproto.sync.getBlob?did={did}&cid={cid}");
        tracing::debug!("GET {url}");
        self.do_get_optional(&url)
    }

    fn upload_blob(&self, data: &[u8], content_type: &str) -> Result<Cid, RemoteError> {
        self.bearer()?;
        let url = format!("{}/xrpc/com.atproto.repo.uploadBlob", self.service);
        tracing::debug!("POST {url} ({} bytes)", data.len());
        let body = self.do_post(&url, content_type, data)?;
        let out: UploadBlobOut = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::Serialization(format!("invalid upload response: {e}")))?;
        Ok(out.cid)
    }

    fn put_record(
        &self,
        collection: &str,
        rkey: Option<&RecordKey>,
        record: &TileRecord,
    ) -> Result<RecordRef, RemoteError> {
        let did = self.session_did()?.clone();
        let url = format!("{}/xrpc/com.atproto.repo.putRecord", self.service);
        let body = serde_json::to_vec(&serde_json::json!({
            "repo": did,
            "collection": collection,
            "rkey": rkey,
            "record": record,
        }))
        .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        tracing::debug!("POST {url}");
        let resp = self.do_post(&url, "application/json", &body)?;
        serde_json::from_slice(&resp)
            .map_err(|e| RemoteError::Serialization(format!("invalid putRecord response: {e}")))
    }

    fn delete_record(&self, collection: &str, rkey: &RecordKey) -> Result<(), RemoteError> {
        let did = self.session_did()?.clone();
        let url = format!("{}/xrpc/com.atproto.repo.deleteRecord", self.service);
        let body = serde_json::to_vec(&serde_json::json!({
            "repo": did,
            "collection": collection,
            "rkey": rkey,
        }))
        .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        tracing::debug!("POST {url}");
        self.do_post(&url, "application/json", &body)?;
        Ok(())
    }
}

/// Parse an `at://<did>/<collection>/<rkey>` URL.
pub fn parse_at_url(url: &str) -> Option<(Did, String, RecordKey)> {
    let rest = url.strip_prefix("at://")?;
    let mut parts = rest.splitn(3, '/');
    let did = parts.next()?;
    let collection = parts.next()?;
    let rkey = parts.next()?;
    if did.is_empty() || collection.is_empty() || rkey.is_empty() {
        return None;
    }
    Some((Did::from(did), collection.to_owned(), RecordKey::from(rkey)))
}

/// Build the canonical `at://` URL for a record.
pub fn at_url(did: &Did, rkey: &RecordKey) -> String {
    format!("at://{did}/{COLLECTION}/{rkey}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RemoteConfig;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use tilekit_schema::parse_manifest_str;

    /// Minimal in-process repository server speaking just enough of the
    /// XRPC API for the client methods under test.
    struct MockRepo {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockRepo {
        fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let blobs: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::new(Mutex::new(HashMap::new()));
            let records: Arc<Mutex<HashMap<String, serde_json::Value>>> =
                Arc::new(Mutex::new(HashMap::new()));

            let blobs_clone = Arc::clone(&blobs);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let blobs = Arc::clone(&blobs_clone);
                    let records = Arc::clone(&records);

                    std::thread::spawn(move || {
                        let mut reader = BufReader::new(stream.try_clone().unwrap());
                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).is_err() {
                            return;
                        }
                        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
                        if parts.len() < 2 {
                            return;
                        }
                        let method = parts[0].to_owned();
                        let path = parts[1].to_owned();

                        let mut content_length: usize = 0;
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                                break;
                            }
                            let lower = line.to_lowercase();
                            if let Some(val) = lower.strip_prefix("content-length: ") {
                                content_length = val.trim().parse().unwrap_or(0);
                            }
                        }
                        let mut body = vec![0u8; content_length];
                        if content_length > 0 {
                            let _ = reader.read_exact(&mut body);
                        }

                        let (status, payload) =
                            route(&method, &path, &body, &blobs, &records);
                        let head = format!(
                            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            payload.len()
                        );
                        let _ = stream.write_all(head.as_bytes());
                        let _ = stream.write_all(&payload);
                        let _ = stream.flush();
                    });
                }
            });

            MockRepo {
                addr,
                _handle: handle,
                blobs,
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn route(
        method: &str,
        path: &str,
        body: &[u8],
        blobs: &Mutex<HashMap<String, Vec<u8>>>,
        records: &Mutex<HashMap<String, serde_json::Value>>,
    ) -> (&'static str, Vec<u8>) {
        let not_found = ("404 Not Found", b"{}".to_vec());
        match (method, path.split('?').next().unwrap_or(path)) {
            ("POST", "/xrpc/com.atproto.server.createSession") => (
                "200 OK",
                br#"{"did":"did:plc:mock","handle":"mock.test","accessJwt":"jwt-mock"}"#.to_vec(),
            ),
            ("POST", "/xrpc/com.atproto.repo.uploadBlob") => {
                let cid = Cid::compute(body);
                blobs.lock().unwrap().insert(cid.to_string(), body.to_vec());
                ("200 OK", format!(r#"{{"cid":"{cid}"}}"#).into_bytes())
            }
            ("POST", "/xrpc/com.atproto.repo.putRecord") => {
                let req: serde_json::Value = serde_json::from_slice(body).unwrap();
                let rkey = req["rkey"].as_str().unwrap_or("3kmockrkey").to_owned();
                records
                    .lock()
                    .unwrap()
                    .insert(rkey.clone(), req["record"].clone());
                let uri = format!("at://did:plc:mock/{COLLECTION}/{rkey}");
                (
                    "200 OK",
                    format!(r#"{{"uri":"{uri}","rkey":"{rkey}"}}"#).into_bytes(),
                )
            }
            ("GET", "/xrpc/com.atproto.repo.getRecord") => {
                let rkey = path
                    .split("rkey=")
                    .nth(1)
                    .unwrap_or("")
                    .split('&')
                    .next()
                    .unwrap_or("");
                match records.lock().unwrap().get(rkey) {
                    Some(value) => (
                        "200 OK",
                        serde_json::to_vec(&serde_json::json!({ "value": value })).unwrap(),
                    ),
                    None => not_found,
                }
            }
            ("GET", "/xrpc/com.atproto.sync.getBlob") => {
                let cid = path
                    .split("cid=")
                    .nth(1)
                    .unwrap_or("")
                    .split('&')
                    .next()
                    .unwrap_or("");
                match blobs.lock().unwrap().get(cid) {
                    Some(bytes) => ("200 OK", bytes.clone()),
                    None => not_found,
                }
            }
            ("GET", p) if p.starts_with("/did:plc:") => {
                // Served in place of the PLC directory for resolution tests:
                // the endpoint in the doc is stored as a blob under "endpoint".
                let endpoint = blobs
                    .lock()
                    .unwrap()
                    .get("endpoint")
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                (
                    "200 OK",
                    format!(
                        r##"{{"service":[{{"id":"#pds","type":"PersonalDataServer","serviceEndpoint":"{endpoint}"}}]}}"##
                    )
                    .into_bytes(),
                )
            }
            _ => not_found,
        }
    }

    fn client_for(repo: &MockRepo) -> HttpRepoClient {
        HttpRepoClient::new(&RemoteConfig {
            service: repo.addr.clone(),
            plc_directory: repo.addr.clone(),
            ..RemoteConfig::default()
        })
    }

    fn logged_in(repo: &MockRepo) -> HttpRepoClient {
        let mut client = client_for(repo);
        client.login("mock.test", "hunter2").unwrap();
        client
    }

    #[test]
    fn login_stores_session() {
        let repo = MockRepo::start();
        let mut client = client_for(&repo);
        let session = client.login("mock.test", "hunter2").unwrap();
        assert_eq!(session.did, Did::new("did:plc:mock"));
        assert_eq!(session.handle, "mock.test");
        assert!(client.session().is_some());
    }

    #[test]
    fn upload_requires_session() {
        let repo = MockRepo::start();
        let client = client_for(&repo);
        let err = client.upload_blob(b"data", "text/plain").unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    fn upload_returns_remote_cid() {
        let repo = MockRepo::start();
        let client = logged_in(&repo);
        let cid = client.upload_blob(b"blob bytes", "text/plain").unwrap();
        assert_eq!(cid, Cid::compute(b"blob bytes"));
    }

    #[test]
    fn put_then_get_record_roundtrip() {
        let repo = MockRepo::start();
        let client = logged_in(&repo);
        let manifest = parse_manifest_str(
            r#"{"name":"Wire","resources":{"/":{"content-type":"text/html"}}}"#,
        )
        .unwrap();
        let record = TileRecord::new(manifest).unwrap();

        let rkey = RecordKey::new("3kstable01");
        let record_ref = client.put_record(COLLECTION, Some(&rkey), &record).unwrap();
        assert_eq!(record_ref.rkey, rkey);
        assert!(record_ref.uri.starts_with("at://did:plc:mock/"));

        let fetched = client
            .get_record(&repo.addr, &Did::new("did:plc:mock"), COLLECTION, &rkey)
            .unwrap();
        fetched.verify().unwrap();
        assert_eq!(fetched.cid, record.cid);
    }

    #[test]
    fn missing_record_is_not_found() {
        let repo = MockRepo::start();
        let client = client_for(&repo);
        let err = client
            .get_record(
                &repo.addr,
                &Did::new("did:plc:mock"),
                COLLECTION,
                &RecordKey::new("3kghost"),
            )
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[test]
    fn fetch_blob_maps_not_ok_to_none() {
        let repo = MockRepo::start();
        let client = logged_in(&repo);
        let did = Did::new("did:plc:mock");

        let missing = Cid::compute(b"never uploaded");
        assert!(client.fetch_blob(&repo.addr, &did, &missing).unwrap().is_none());

        let cid = client.upload_blob(b"present", "text/plain").unwrap();
        let bytes = client.fetch_blob(&repo.addr, &did, &cid).unwrap().unwrap();
        assert_eq!(bytes, b"present");
    }

    #[test]
    fn resolve_plc_did_reads_directory() {
        let repo = MockRepo::start();
        repo.blobs
            .lock()
            .unwrap()
            .insert("endpoint".to_owned(), b"https://pds.example.com/".to_vec());
        let client = client_for(&repo);
        let endpoint = client.resolve_service(&Did::new("did:plc:mock")).unwrap();
        // Trailing slash stripped.
        assert_eq!(endpoint, "https://pds.example.com");
    }

    #[test]
    fn unsupported_did_method_is_config_error() {
        let repo = MockRepo::start();
        let client = client_for(&repo);
        let err = client.resolve_service(&Did::new("did:key:zabc")).unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    fn connection_refused_is_http_error() {
        let mut client = HttpRepoClient::new(&RemoteConfig {
            service: "http://127.0.0.1:1".to_owned(),
            plc_directory: "http://127.0.0.1:1".to_owned(),
            ..RemoteConfig::default()
        });
        assert!(matches!(
            client.login("a", "b").unwrap_err(),
            RemoteError::Http(_)
        ));
    }

    #[test]
    fn unresponsive_server_times_out() {
        // Accepts the connection but never answers; the configured deadline
        // must turn that into an error rather than hanging.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        let mut client = HttpRepoClient::new(&RemoteConfig {
            service: addr.clone(),
            plc_directory: addr,
            timeout_secs: 1,
        });
        let start = std::time::Instant::now();
        let err = client.login("mock.test", "hunter2").unwrap_err();
        assert!(matches!(err, RemoteError::Http(_)));
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
        drop(listener);
    }

    #[test]
    fn at_url_parse_and_build() {
        let (did, collection, rkey) =
            parse_at_url("at://did:plc:abc/ing.dasl.tile/3kxyz").unwrap();
        assert_eq!(did, Did::new("did:plc:abc"));
        assert_eq!(collection, COLLECTION);
        assert_eq!(rkey, RecordKey::new("3kxyz"));
        assert_eq!(at_url(&did, &rkey), "at://did:plc:abc/ing.dasl.tile/3kxyz");

        assert!(parse_at_url("at://did:plc:abc").is_none());
        assert!(parse_at_url("https://example.com").is_none());
    }
}
