use super::{RunTransport, TransportError};
use crate::model::{RunConfig, RunReply, RunRequest, RunResponse};
use anyhow::{Context, Result};
use std::time::Duration;

/// reqwest-backed client for `POST /api/run`.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    run_url: reqwest::Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base = reqwest::Url::parse(endpoint)
            .with_context(|| format!("invalid endpoint URL: {endpoint}"))?;
        // `join` replaces the last segment unless the base path ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let run_url = base.join("api/run").context("build run URL")?;

        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().context("build HTTP client")?;

        Ok(Self { http, run_url })
    }

    pub fn run_url(&self) -> &reqwest::Url {
        &self.run_url
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::Malformed(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

impl RunTransport for HttpTransport {
    async fn run_tuning_job(&self, config: &RunConfig) -> Result<RunReply, TransportError> {
        let body = RunRequest::from(config);
        tracing::debug!(url = %self.run_url, app_ids = %body.app_ids, "posting run request");

        let resp = self
            .http
            .post(self.run_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(classify)?;
        let body: RunResponse = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        tracing::debug!(status = status.as_u16(), "run response received");
        Ok(RunReply {
            ok: status.is_success(),
            status_code: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Architecture;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if request_complete(&buf) {
                    break;
                }
            }
            let resp = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&buf).into_owned()
        });
        (format!("http://{addr}/"), handle)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let len = text[..split]
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.eq_ignore_ascii_case("content-length")
                    .then(|| v.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        buf.len() >= split + 4 + len
    }

    fn config() -> RunConfig {
        RunConfig {
            app_ids: "Foo.Bar".into(),
            architecture: Architecture::X64,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn success_reply_is_ok_and_request_carries_config() {
        let (url, server) =
            one_shot_server("200 OK", r#"{"status":"done","message":"tuned"}"#).await;
        let transport = HttpTransport::new(&url, "test-agent", None).unwrap();

        let reply = transport.run_tuning_job(&config()).await.unwrap();
        assert!(reply.ok);
        assert_eq!(reply.status_code, 200);
        assert_eq!(reply.body.status.as_deref(), Some("done"));
        assert_eq!(reply.body.message.as_deref(), Some("tuned"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/run "));
        assert!(raw.contains(r#""app_ids":"Foo.Bar""#));
        assert!(raw.contains(r#""installer_context":"system""#));
    }

    #[tokio::test]
    async fn error_status_is_not_ok_but_still_parsed() {
        let (url, _server) =
            one_shot_server("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let transport = HttpTransport::new(&url, "test-agent", None).unwrap();

        let reply = transport.run_tuning_job(&config()).await.unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.status_code, 500);
        assert_eq!(reply.body.error_text().as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let (url, _server) = one_shot_server("502 Bad Gateway", "<html>oops</html>").await;
        let transport = HttpTransport::new(&url, "test-agent", None).unwrap();

        let err = transport.run_tuning_job(&config()).await.unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)), "{err}");
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let transport = HttpTransport::new(&format!("http://{addr}/"), "test-agent", None).unwrap();

        let err = transport.run_tuning_job(&config()).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)), "{err}");
    }

    #[tokio::test]
    async fn structured_error_body_is_still_an_application_failure() {
        let (url, _server) =
            one_shot_server("500 Internal Server Error", r#"{"error":{"code":1}}"#).await;
        let transport = HttpTransport::new(&url, "test-agent", None).unwrap();

        let reply = transport.run_tuning_job(&config()).await.unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.body.error_text().as_deref(), Some(r#"{"code":1}"#));
    }

    #[tokio::test]
    async fn silent_server_hits_request_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        let _server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(sock);
        });
        let transport = HttpTransport::new(
            &format!("http://{addr}/"),
            "test-agent",
            Some(Duration::from_millis(200)),
        )
        .unwrap();

        let err = transport.run_tuning_job(&config()).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout), "{err}");
    }

    #[test]
    fn endpoint_path_is_joined() {
        let t = HttpTransport::new("http://localhost:5000", "ua", None).unwrap();
        assert_eq!(t.run_url().as_str(), "http://localhost:5000/api/run");
        assert!(HttpTransport::new("not a url", "ua", None).is_err());
    }

    #[test]
    fn endpoint_path_prefix_is_kept() {
        for endpoint in ["http://host:5000/automattuner", "http://host:5000/automattuner/"] {
            let t = HttpTransport::new(endpoint, "ua", None).unwrap();
            assert_eq!(t.run_url().as_str(), "http://host:5000/automattuner/api/run");
        }
    }
}
