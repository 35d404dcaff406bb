//! Scoring of recorded mocks against an outgoing request.
//!
//! A score of `None` rules the mock out; among the rest the highest score
//! wins. Scores only compare within one request kind.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::matcher::{match_json, match_values, match_yaml, ArrayMatch};
use crate::models::generic::{Origin, Payload};
use crate::models::grpc::GrpcReq;
use crate::models::http::{HttpReq, HttpSpec};
use crate::models::mongo::{MongoMessage, MongoPacket, Section};
use crate::models::mysql::MySqlPacket;
use crate::models::postgres::PostgresPacket;
use crate::models::{Kind, Mock, MockSpec, Noise};
use crate::noise::flatten;

/// Header prefix added by the recorder itself; never required to match.
const RECORDER_HEADER_PREFIX: &str = "keploy";

/// Session fields that differ on every Mongo connection.
const MONGO_SESSION_FIELDS: &[&str] = &["lsid", "$clusterTime"];

/// A request the application sent to one of its dependencies.
#[derive(Debug, Clone, Copy)]
pub enum Outgoing<'a> {
    /// HTTP call.
    Http(&'a HttpReq),
    /// gRPC call.
    Grpc(&'a GrpcReq),
    /// MySQL command packets.
    MySql(&'a [MySqlPacket]),
    /// MongoDB wire messages.
    Mongo(&'a [MongoPacket]),
    /// Postgres frontend messages.
    Postgres(&'a [PostgresPacket]),
    /// Raw client bytes of a generic or Redis exchange.
    Generic(&'a [u8]),
}

impl Outgoing<'_> {
    /// Kind of mock that can answer this request.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Http(_) => Kind::Http,
            Self::Grpc(_) => Kind::Grpc,
            Self::MySql(_) => Kind::Sql,
            Self::Mongo(_) => Kind::Mongo,
            Self::Postgres(_) => Kind::Postgres,
            Self::Generic(_) => Kind::Generic,
        }
    }
}

/// Scores `mock` against `request`.
///
/// # Errors
///
/// Returns an error if the recorded request cannot be decoded.
pub fn score(mock: &Mock, request: &Outgoing<'_>) -> Result<Option<u32>> {
    Ok(match (&mock.spec, request) {
        (MockSpec::Http(spec), Outgoing::Http(req)) => http_score(spec, req),
        (MockSpec::Grpc(spec), Outgoing::Grpc(req)) => grpc_score(&spec.grpc_req, req),
        (MockSpec::MySql(spec), Outgoing::MySql(packets)) => mysql_score(&mock.name, &spec.requests, packets)?,
        (MockSpec::Mongo(spec), Outgoing::Mongo(packets)) => mongo_score(&mock.name, &spec.requests, packets)?,
        (MockSpec::Postgres(spec), Outgoing::Postgres(packets)) => postgres_score(&spec.requests, packets),
        (MockSpec::Generic(spec) | MockSpec::Redis(spec), Outgoing::Generic(bytes)) => {
            (client_bytes(&mock.name, &spec.requests)? == *bytes).then_some(1)
        }
        _ => None,
    })
}

/// Path of a URL, without scheme, authority, query or fragment.
fn url_path(url: &str) -> &str {
    let rest = match url.split_once("://") {
        Some((_, authority)) => authority.find('/').map_or("", |i| &authority[i..]),
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    match &rest[..end] {
        "" => "/",
        path => path,
    }
}

fn http_score(spec: &HttpSpec, req: &HttpReq) -> Option<u32> {
    let recorded = &spec.req;
    if !recorded.method.eq_ignore_ascii_case(&req.method) || url_path(&recorded.url) != url_path(&req.url) {
        return None;
    }
    let present: BTreeSet<String> = req.header.keys().map(|k| k.to_ascii_lowercase()).collect();
    let headers_ok = recorded.header.keys().all(|k| {
        let k = k.to_ascii_lowercase();
        k.starts_with(RECORDER_HEADER_PREFIX) || present.contains(&k)
    });
    if !headers_ok {
        return None;
    }
    if recorded.body == req.body {
        return Some(3);
    }
    let (Ok(expected), Ok(actual)) = (
        serde_json::from_str::<Value>(&recorded.body),
        serde_json::from_str::<Value>(&req.body),
    ) else {
        return (serde_json::from_str::<Value>(&req.body).is_err()
            && serde_json::from_str::<Value>(&recorded.body).is_err())
        .then_some(1);
    };
    if match_json(&recorded.body, &req.body, &[]).unwrap_or(false) {
        return Some(2);
    }
    let schema = |v: &Value| flatten(v).into_keys().collect::<BTreeSet<_>>();
    (schema(&expected) == schema(&actual)).then_some(1)
}

fn grpc_score(recorded: &GrpcReq, req: &GrpcReq) -> Option<u32> {
    let path = |r: &GrpcReq| r.headers.pseudo_headers.get(":path").cloned();
    if path(recorded) != path(req) {
        return None;
    }
    let data = |r: &GrpcReq| r.body.iter().map(|m| m.decoded_data.clone()).collect::<Vec<_>>();
    Some(if data(recorded) == data(req) { 2 } else { 1 })
}

fn as_yaml<T: Serialize>(mock: &str, value: &T) -> Result<serde_yaml::Value> {
    serde_yaml::to_value(value).map_err(|e| Error::yaml(format!("mock {mock} request"), e))
}

/// Packet types must line up; the score counts messages equal apart from
/// their headers.
fn mysql_score(mock: &str, recorded: &[MySqlPacket], actual: &[MySqlPacket]) -> Result<Option<u32>> {
    if recorded.len() != actual.len()
        || recorded.iter().zip(actual).any(|(r, a)| r.header.packet_type != a.header.packet_type)
    {
        return Ok(None);
    }
    let noise: Noise = [("header".to_string(), Vec::new())].into();
    let mut equal = 0;
    for (r, a) in recorded.iter().zip(actual) {
        if match_yaml(&as_yaml(mock, r)?, &as_yaml(mock, a)?, &noise, ArrayMatch::Strict)? {
            equal += 1;
        }
    }
    Ok((equal > 0 || recorded.is_empty()).then_some(equal))
}

fn parse_document(mock: &str, doc: &str) -> Result<Value> {
    serde_json::from_str(doc).map_err(|e| Error::json(format!("mock {mock} document"), e))
}

fn documents(section: &Section) -> Vec<&str> {
    match section {
        Section::Body { document } => vec![document.as_str()],
        Section::DocumentSequence { documents, .. } => documents.iter().map(String::as_str).collect(),
    }
}

/// Opcodes must line up; `OP_MSG` scores one point per matching section,
/// other messages one point when equal.
fn mongo_score(mock: &str, recorded: &[MongoPacket], actual: &[MongoPacket]) -> Result<Option<u32>> {
    if recorded.len() != actual.len()
        || recorded.iter().zip(actual).any(|(r, a)| r.header.opcode != a.header.opcode)
    {
        return Ok(None);
    }
    let noise: Noise = MONGO_SESSION_FIELDS.iter().map(|f| ((*f).to_string(), Vec::new())).collect();
    let mut total = 0;
    for (r, a) in recorded.iter().zip(actual) {
        match (&r.message, &a.message) {
            (MongoMessage::Msg(r), MongoMessage::Msg(a)) => {
                for (rs, as_) in r.sections.iter().zip(&a.sections) {
                    let (rd, ad) = (documents(rs), documents(as_));
                    if rd.len() != ad.len() {
                        continue;
                    }
                    let mut same = true;
                    for (rdoc, adoc) in rd.iter().zip(&ad) {
                        let (rv, av) = (parse_document(mock, rdoc)?, parse_document(mock, adoc)?);
                        if !match_values(rv, av, &noise, ArrayMatch::Unordered).unwrap_or(false) {
                            same = false;
                            break;
                        }
                    }
                    total += u32::from(same);
                }
            }
            (r, a) => total += u32::from(r == a),
        }
    }
    Ok((total > 0 || recorded.is_empty()).then_some(total))
}

fn postgres_score(recorded: &[PostgresPacket], actual: &[PostgresPacket]) -> Option<u32> {
    if recorded.len() != actual.len()
        || recorded.iter().zip(actual).any(|(r, a)| r.message_type != a.message_type)
    {
        return None;
    }
    let equal = recorded.iter().zip(actual).filter(|(r, a)| r.payload == a.payload).count();
    Some(u32::try_from(equal).unwrap_or(u32::MAX))
}

/// Concatenated client-side bytes of a generic exchange.
fn client_bytes(mock: &str, payloads: &[Payload]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for payload in payloads.iter().filter(|p| p.origin == Origin::Client) {
        out.extend(payload.to_bytes().map_err(|e| Error::decode(format!("mock {mock} request"), e))?);
    }
    Ok(out)
}
