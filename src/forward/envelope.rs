//! JSON envelope POSTed to the downstream proxy.
//!
//! ```text
//! { "url": ..., "method": ..., "headers": {...}, "params": {...}?, "body": ... }
//! ```
//!
//! Repeated headers become arrays; single ones stay plain strings. `params` is
//! left out when empty because the query already travels inside `url`.
//! Header values that are not valid UTF-8 are dropped with a warning; a header
//! whose every value was dropped is left out.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::forward::{ForwardBody, ForwardRequest};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EnvelopeHeader {
    Single(String),
    Multi(Vec<String>),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EnvelopeBody<'a> {
    Object(&'a Map<String, Value>),
    Text(&'a str),
    Bytes(&'a [u8]),
}

#[derive(Debug, Serialize)]
pub struct ProxyEnvelope<'a> {
    pub url: &'a str,
    pub method: &'static str,
    pub headers: BTreeMap<String, EnvelopeHeader>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
    pub body: EnvelopeBody<'a>,
}

impl<'a> ProxyEnvelope<'a> {
    pub fn from_request(request: &'a ForwardRequest) -> Self {
        let mut headers = BTreeMap::new();
        for name in request.headers().keys() {
            let mut values: Vec<String> = Vec::new();
            for value in request.headers().get_all(name) {
                match std::str::from_utf8(value.as_bytes()) {
                    Ok(text) => values.push(text.to_string()),
                    Err(_) => tracing::warn!(header = %name, "Skipping header value that is not valid UTF-8"),
                }
            }
            if values.is_empty() {
                continue;
            }
            let header = if values.len() == 1 {
                EnvelopeHeader::Single(values.remove(0))
            } else {
                EnvelopeHeader::Multi(values)
            };
            headers.insert(name.as_str().to_string(), header);
        }

        let body = match request.body() {
            ForwardBody::Structured(map) => EnvelopeBody::Object(map),
            ForwardBody::Raw(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => EnvelopeBody::Text(text),
                Err(_) => EnvelopeBody::Bytes(bytes),
            },
        };

        Self {
            url: request.target_url(),
            method: request.method().as_str(),
            headers,
            params: BTreeMap::new(),
            body,
        }
    }
}
