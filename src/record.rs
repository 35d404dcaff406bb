//! Recording: turns captured traffic into persisted mocks and test cases.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::document::curl::to_curl;
use crate::error::{Error, Result};
use crate::models::generic::{GenericSpec, Origin, OutputBinary, Payload};
use crate::models::http::{HttpReq, HttpResp};
use crate::models::{Kind, Mock, MockTimestamps, TestCase};
use crate::noise::derive_noise;
use crate::store::{MockDb, TestDb};

/// Writes recorded traffic into one test set.
pub struct Recorder<'a> {
    ctx: &'a ServiceContext,
    config: &'a Config,
    test_set: String,
}

impl<'a> Recorder<'a> {
    /// Creates a recorder for `test_set`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, config: &'a Config, test_set: &str) -> Self {
        Self { ctx, config, test_set: test_set.to_string() }
    }

    fn mocks(&self) -> MockDb<'a> {
        MockDb::new(self.ctx, &self.config.path, &self.config.mock_file)
    }

    fn tests(&self) -> TestDb<'a> {
        TestDb::new(self.ctx, &self.config.path)
    }

    /// Persists a mock built by a protocol parser, naming it `mock-N`
    /// after the highest name already in the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the mock cannot be written.
    pub fn record_mock(&self, mut mock: Mock) -> Result<Mock> {
        mock.name = self.mocks().next_mock_name(&self.test_set)?;
        self.mocks().insert_mock(&self.test_set, &mock)?;
        Ok(mock)
    }

    /// Records an opaque exchange (generic or Redis) from its chunks in
    /// wire order.
    ///
    /// # Errors
    ///
    /// Returns an error for any other kind, or if encoding or writing
    /// fails.
    pub fn record_exchange(
        &self,
        kind: &Kind,
        chunks: &[(Origin, Vec<u8>)],
        req_time: DateTime<Utc>,
        res_time: DateTime<Utc>,
    ) -> Result<Mock> {
        let compress = self.config.generic.compress_binary;
        let mut spec = GenericSpec {
            created: self.ctx.clock.unix_seconds(),
            timestamps: MockTimestamps::new(req_time, res_time),
            ..GenericSpec::default()
        };
        for (origin, bytes) in chunks {
            let chunk = OutputBinary::from_bytes(bytes, compress)
                .map_err(|e| Error::io(format!("{kind} payload"), e))?;
            let side = if *origin == Origin::Client { &mut spec.requests } else { &mut spec.responses };
            match side.last_mut() {
                Some(last) if last.origin == *origin => last.message.push(chunk),
                _ => side.push(Payload { origin: *origin, message: vec![chunk] }),
            }
        }
        let mock = match kind {
            Kind::Generic => Mock::generic("", spec),
            Kind::Redis => Mock::redis("", spec),
            other => {
                return Err(Error::KindMismatch {
                    name: String::new(),
                    kind: other.to_string(),
                    reason: "not an opaque payload kind".into(),
                })
            }
        };
        self.record_mock(mock)
    }

    /// Records an inbound HTTP call as the next free `test-N`, deriving timestamp noise
    /// and attaching the mocks it used.
    ///
    /// # Errors
    ///
    /// Returns an error if the test case cannot be written.
    pub fn record_test_case(&self, req: HttpReq, resp: HttpResp, mocks: &[Mock]) -> Result<TestCase> {
        let now = self.ctx.clock.now();
        let name = self.tests().next_test_name(&self.test_set)?;
        let mut tc = TestCase::from_http(name, req, resp, now.timestamp());
        tc.curl = Some(to_curl(&tc.http_req));
        tc.mocks = mocks.iter().map(|m| m.name.clone()).collect();
        let noisy = derive_noise(&mut tc, now);
        self.tests().insert_test_case(&self.test_set, &tc)?;
        info!(test_set = %self.test_set, test_case = %tc.name, noisy = noisy.len(), "recorded test case");
        Ok(tc)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::generic::BinaryType;
    use crate::models::MockSpec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn exchange_groups_consecutive_chunks() {
        let ctx = ServiceContext::in_memory(now());
        let mut config = Config::default();
        config.generic.compress_binary = true;
        let recorder = Recorder::new(&ctx, &config, "test-set-0");

        let chunks = vec![
            (Origin::Client, b"*1\r\n".to_vec()),
            (Origin::Client, b"$4\r\nPING\r\n".to_vec()),
            (Origin::Server, vec![0xff, 0x00, 0x01]),
        ];
        let mock = recorder.record_exchange(&Kind::Redis, &chunks, now(), now()).unwrap();
        assert_eq!(mock.name, "mock-0");
        let MockSpec::Redis(spec) = &mock.spec else { panic!("not a redis mock") };
        assert_eq!(spec.requests.len(), 1);
        assert_eq!(spec.requests[0].message.len(), 2);
        assert_eq!(spec.responses[0].message[0].kind, BinaryType::Gzip);

        let second = recorder.record_exchange(&Kind::Generic, &chunks, now(), now()).unwrap();
        assert_eq!(second.name, "mock-1");
        let stored = MockDb::new(&ctx, &config.path, &config.mock_file).read_mocks("test-set-0").unwrap();
        assert_eq!(stored, vec![mock, second]);
    }

    #[test]
    fn structured_kinds_are_not_opaque() {
        let ctx = ServiceContext::in_memory(now());
        let config = Config::default();
        let err = Recorder::new(&ctx, &config, "s").record_exchange(&Kind::Sql, &[], now(), now()).unwrap_err();
        assert!(matches!(err, Error::KindMismatch { .. }));
    }

    #[test]
    fn test_cases_get_noise_and_curl() {
        let ctx = ServiceContext::in_memory(now());
        let config = Config::default();
        let recorder = Recorder::new(&ctx, &config, "test-set-0");
        let req = HttpReq { method: "GET".into(), url: "http://localhost:8080/users".into(), ..HttpReq::default() };
        let mut resp = HttpResp { status_code: 200, body: r#"{"ts":"2024-06-01T09:29:59Z","n":1}"#.into(), ..HttpResp::default() };
        resp.header.insert("Date".into(), "Sat, 01 Jun 2024 09:29:59 GMT".into());

        let tc = recorder.record_test_case(req.clone(), resp.clone(), &[]).unwrap();
        assert_eq!(tc.name, "test-1");
        assert!(tc.noise.contains_key("header.Date"));
        assert!(tc.noise.contains_key("body.ts"));
        assert!(!tc.noise.contains_key("body.n"));
        assert!(tc.curl.as_deref().unwrap().contains("localhost:8080/users"));

        assert_eq!(recorder.record_test_case(req, resp, &[]).unwrap().name, "test-2");
    }

    #[test]
    fn deleted_test_case_names_are_not_reused() {
        let ctx = ServiceContext::in_memory(now());
        let config = Config::default();
        let recorder = Recorder::new(&ctx, &config, "test-set-0");
        let req = HttpReq { method: "GET".into(), url: "http://localhost/ping".into(), ..HttpReq::default() };
        let resp = HttpResp { status_code: 200, body: "pong".into(), ..HttpResp::default() };

        recorder.record_test_case(req.clone(), resp.clone(), &[]).unwrap();
        recorder.record_test_case(req.clone(), resp.clone(), &[]).unwrap();
        TestDb::new(&ctx, &config.path).delete_test_case("test-set-0", "test-1").unwrap();

        let third = recorder.record_test_case(req, resp, &[]).unwrap();
        assert_eq!(third.name, "test-3");
        let names = TestDb::new(&ctx, &config.path).list("test-set-0").unwrap();
        assert_eq!(names, ["test-2", "test-3"]);
    }

    #[test]
    fn mock_names_skip_past_foreign_documents() {
        let ctx = ServiceContext::in_memory(now());
        let config = Config::default();
        let recorder = Recorder::new(&ctx, &config, "test-set-0");
        let first = recorder.record_exchange(&Kind::Generic, &[(Origin::Client, b"a".to_vec())], now(), now()).unwrap();
        assert_eq!(first.name, "mock-0");

        let kafka = b"---\nversion: api.keploy.io/v1beta1\nkind: Kafka\nname: mock-1\nspec: {}\n";
        ctx.store.write(&config.path.join("test-set-0"), &config.mock_file, kafka, true).unwrap();

        let second = recorder.record_exchange(&Kind::Generic, &[(Origin::Client, b"b".to_vec())], now(), now()).unwrap();
        assert_eq!(second.name, "mock-2");
    }
}
