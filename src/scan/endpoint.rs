//! Unauthenticated probes against bucket endpoints.
//!
//! `Endpoint` is the raw HTTP capability (a real agent, or a scripted double in
//! tests). `Prober` sits on top of it and turns status codes into answers:
//! - resolves the public root URL of a bucket, looking up the region for
//!   dotted bucket names (the wildcard certificate does not cover them)
//! - decides whether a bucket is listable, uploadable, deletable
//! - decides whether a single object is readable
//!
//! A response that fits none of the expected shapes is an error, never a
//! silent "no issue".

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use chrono::Utc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::snapshot::format_timestamp;

const GLOBAL_ENDPOINT: &str = "https://s3.amazonaws.com";
const REGION_HEADER: &str = "x-amz-bucket-region";
const LIST_RESULT_MARKER: &[u8] = b"</ListBucketResult>";

pub const UPLOAD_TEST_KEY: &str = "s3_bucket_inspector.upload.test";
pub const DELETE_TEST_KEY: &str = "s3_bucket_inspector.delete.test";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProbeResponse {
    pub status: u16,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ProbeResponse {
    pub fn status(status: u16) -> Self {
        ProbeResponse {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Raw HTTP capability. Any status code is a successful response; only
/// transport failures are errors.
pub trait Endpoint {
    fn send(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<ProbeResponse>;
}

/// Blocking HTTP endpoint. Never follows redirects, since the region lookup
/// needs to see the 301 itself. No timeouts are set.
pub struct HttpEndpoint {
    agent: ureq::Agent,
}

impl HttpEndpoint {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new().redirects(0).build();
        HttpEndpoint { agent }
    }
}

impl Default for HttpEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Endpoint for HttpEndpoint {
    fn send(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<ProbeResponse> {
        let request = self.agent.request(method.as_str(), url);
        let outcome = match body {
            Some(bytes) => request.send_bytes(bytes),
            None => request.call(),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(Error::http(url, e)),
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name.to_ascii_lowercase(), value))
            })
            .collect();

        let mut body = Vec::new();
        if method != Method::Head {
            response
                .into_reader()
                .read_to_end(&mut body)
                .map_err(|e| Error::io("read response body", url, e))?;
        }

        debug!("{} {} -> {}", method.as_str(), url, status);
        Ok(ProbeResponse { status, headers, body })
    }
}

/// Interprets probe responses for bucket checks.
pub struct Prober {
    endpoint: Box<dyn Endpoint>,
    // bucket name -> region, only ever filled for dotted names
    regions: RefCell<HashMap<String, String>>,
}

impl Prober {
    pub fn new(endpoint: impl Endpoint + 'static) -> Self {
        Prober {
            endpoint: Box::new(endpoint),
            regions: RefCell::new(HashMap::new()),
        }
    }

    /// Public root URL of a bucket, without trailing slash.
    pub fn bucket_root(&self, bucket: &str) -> Result<String> {
        if !bucket.contains('.') {
            return Ok(format!("https://{bucket}.s3.amazonaws.com"));
        }
        let region = self.bucket_region(bucket)?;
        Ok(format!("https://s3-{region}.amazonaws.com/{bucket}"))
    }

    fn bucket_region(&self, bucket: &str) -> Result<String> {
        if let Some(region) = self.regions.borrow().get(bucket) {
            return Ok(region.clone());
        }

        let url = format!("{GLOBAL_ENDPOINT}/{bucket}");
        let response = self.endpoint.send(Method::Head, &url, None)?;
        let region = match response.header(REGION_HEADER) {
            Some(region) if response.status == 301 && !region.is_empty() => region.to_string(),
            _ => {
                return Err(Error::unexpected(
                    bucket,
                    format!("cannot find region (status {})", response.status),
                ))
            }
        };

        self.regions
            .borrow_mut()
            .insert(bucket.to_string(), region.clone());
        Ok(region)
    }

    pub fn bucket_publicly_listable(&self, bucket: &str) -> Result<bool> {
        let url = format!("{}/?max-keys=0", self.bucket_root(bucket)?);
        let response = self.endpoint.send(Method::Get, &url, None)?;
        match response.status {
            200 if response.body.ends_with(LIST_RESULT_MARKER) => Ok(true),
            200 => Err(Error::unexpected(bucket, "listing succeeded without a ListBucketResult")),
            403 => Ok(false),
            other => Err(Error::unexpected(bucket, format!("listing returned status {other}"))),
        }
    }

    /// The test object's body is the current timestamp, sent as-is rather
    /// than wrapped in a form upload. Only the status code matters.
    pub fn bucket_publicly_uploadable(&self, bucket: &str) -> Result<bool> {
        let url = format!("{}/{UPLOAD_TEST_KEY}", self.bucket_root(bucket)?);
        let content = format_timestamp(&Utc::now());
        let response = self.endpoint.send(Method::Put, &url, Some(content.as_bytes()))?;
        Ok(response.status == 200)
    }

    pub fn bucket_publicly_deletable(&self, bucket: &str) -> Result<bool> {
        let url = format!("{}/{DELETE_TEST_KEY}", self.bucket_root(bucket)?);
        let response = self.endpoint.send(Method::Delete, &url, None)?;
        Ok(response.status == 204)
    }

    /// Anything but an explicit 403 means the object is exposed.
    pub fn file_publicly_readable(&self, bucket: &str, key: &str) -> Result<bool> {
        let url = format!("{}/{key}", self.bucket_root(bucket)?);
        let response = self.endpoint.send(Method::Head, &url, None)?;
        Ok(response.status != 403)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedEndpoint;
    use super::*;

    const LISTING: &str = "<?xml version=\"1.0\"?><ListBucketResult></ListBucketResult>";

    #[test]
    fn plain_bucket_root_needs_no_lookup() {
        let endpoint = ScriptedEndpoint::new();
        let prober = Prober::new(endpoint.clone());
        assert_eq!(prober.bucket_root("assets").unwrap(), "https://assets.s3.amazonaws.com");
        assert!(endpoint.calls.borrow().is_empty());
    }

    #[test]
    fn dotted_bucket_root_uses_region_once() {
        let endpoint = ScriptedEndpoint::new().on(
            Method::Head,
            "https://s3.amazonaws.com/www.example.com",
            ProbeResponse::status(301).with_header("X-Amz-Bucket-Region", "eu-west-1"),
        );
        let prober = Prober::new(endpoint.clone());

        for _ in 0..3 {
            assert_eq!(
                prober.bucket_root("www.example.com").unwrap(),
                "https://s3-eu-west-1.amazonaws.com/www.example.com"
            );
        }
        assert_eq!(endpoint.calls_to(Method::Head).len(), 1);
    }

    #[test]
    fn missing_region_is_fatal() {
        let prober = Prober::new(ScriptedEndpoint::new());
        let err = prober.bucket_root("www.example.com").unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse { .. }));
    }

    #[test]
    fn listing_interpretation() {
        let endpoint = ScriptedEndpoint::new()
            .on(
                Method::Get,
                "https://open.s3.amazonaws.com/?max-keys=0",
                ProbeResponse::status(200).with_body(LISTING),
            )
            .on(
                Method::Get,
                "https://odd.s3.amazonaws.com/?max-keys=0",
                ProbeResponse::status(200).with_body("<html>hello</html>"),
            )
            .on(
                Method::Get,
                "https://gone.s3.amazonaws.com/?max-keys=0",
                ProbeResponse::status(404),
            );
        let prober = Prober::new(endpoint);

        assert!(prober.bucket_publicly_listable("open").unwrap());
        assert!(!prober.bucket_publicly_listable("closed").unwrap());
        assert!(matches!(
            prober.bucket_publicly_listable("odd"),
            Err(Error::UnexpectedResponse { .. })
        ));
        assert!(matches!(
            prober.bucket_publicly_listable("gone"),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn write_probes_use_reserved_keys() {
        let endpoint = ScriptedEndpoint::new()
            .on(
                Method::Put,
                "https://open.s3.amazonaws.com/s3_bucket_inspector.upload.test",
                ProbeResponse::status(200),
            )
            .on(
                Method::Delete,
                "https://open.s3.amazonaws.com/s3_bucket_inspector.delete.test",
                ProbeResponse::status(204),
            );
        let prober = Prober::new(endpoint);

        assert!(prober.bucket_publicly_uploadable("open").unwrap());
        assert!(prober.bucket_publicly_deletable("open").unwrap());
        assert!(!prober.bucket_publicly_uploadable("closed").unwrap());
        assert!(!prober.bucket_publicly_deletable("closed").unwrap());
    }

    #[test]
    fn upload_body_is_a_bare_timestamp() {
        let endpoint = ScriptedEndpoint::new();
        let prober = Prober::new(endpoint.clone());
        prober.bucket_publicly_uploadable("b").unwrap();
        prober.bucket_publicly_deletable("b").unwrap();

        let bodies = endpoint.bodies.borrow();
        let sent = String::from_utf8(bodies[0].clone().unwrap()).unwrap();
        assert!(crate::snapshot::parse_timestamp(&sent).is_ok(), "{sent}");
        assert!(!sent.contains("Content-Disposition"));
        assert_eq!(bodies[1], None);
    }

    #[test]
    fn anything_but_forbidden_is_readable() {
        let endpoint = ScriptedEndpoint::new()
            .on(Method::Head, "https://b.s3.amazonaws.com/ok.txt", ProbeResponse::status(200))
            .on(Method::Head, "https://b.s3.amazonaws.com/gone.txt", ProbeResponse::status(404));
        let prober = Prober::new(endpoint);

        assert!(prober.file_publicly_readable("b", "ok.txt").unwrap());
        assert!(prober.file_publicly_readable("b", "gone.txt").unwrap());
        assert!(!prober.file_publicly_readable("b", "secret.txt").unwrap());
    }
}
