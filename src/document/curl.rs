//! Best-effort curl reconstruction of a recorded request.

use std::fmt::Write as _;

use crate::models::http::{BodyType, HttpReq};

/// Quotes `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Builds a curl command equivalent to `req`.
///
/// `Content-Length` is omitted; multipart fields use `--form` with their
/// first value, otherwise a non-empty text body becomes `--data`.
/// Binary bodies are not reproduced.
#[must_use]
pub fn to_curl(req: &HttpReq) -> String {
    let mut curl = String::new();
    let _ = writeln!(curl, "curl --request {} \\", req.method);
    let _ = write!(curl, "  --url {}", shell_quote(&req.url));
    for (name, value) in &req.header {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        let _ = write!(curl, " \\\n  --header {}", shell_quote(&format!("{name}: {value}")));
    }
    if req.form.is_empty() {
        if !req.body.is_empty() && req.body_type == BodyType::Utf8 {
            let _ = write!(curl, " \\\n  --data {}", shell_quote(&req.body));
        }
    } else {
        for field in &req.form {
            if let Some(value) = field.values.first() {
                let _ = write!(curl, " \\\n  --form {}", shell_quote(&format!("{}={value}", field.key)));
            }
        }
    }
    curl
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::http::FormData;

    #[test]
    fn builds_request_with_headers_and_body() {
        let mut req = HttpReq { method: "POST".into(), url: "http://localhost:8080/users".into(), ..HttpReq::default() };
        req.header.insert("Content-Type".into(), "application/json".into());
        req.header.insert("Content-Length".into(), "13".into());
        req.body = r#"{"name":"o'k"}"#.into();

        let curl = to_curl(&req);
        assert_eq!(
            curl,
            "curl --request POST \\\n  --url 'http://localhost:8080/users' \\\n  --header 'Content-Type: application/json' \\\n  --data '{\"name\":\"o'\\''k\"}'"
        );
    }

    #[test]
    fn form_fields_replace_the_body() {
        let req = HttpReq {
            method: "POST".into(),
            url: "http://x/upload".into(),
            body: "ignored".into(),
            form: vec![
                FormData { key: "a".into(), values: vec!["1".into(), "2".into()], paths: Vec::new() },
                FormData { key: "file".into(), values: Vec::new(), paths: vec!["/tmp/f".into()] },
            ],
            ..HttpReq::default()
        };
        let curl = to_curl(&req);
        assert!(curl.ends_with("--form 'a=1'"));
        assert!(!curl.contains("ignored"));
    }
}
