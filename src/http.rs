use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) retry_delay: Duration,
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

/// A failed request, with the status and body when the server answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpFailure {
    pub(crate) message: String,
    pub(crate) status: Option<u16>,
    pub(crate) body: Option<String>,
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub(crate) fn get_text_with_retries(
    url: &str,
    query: &[(&str, String)],
    policy: &RetryPolicy,
) -> Result<String, HttpFailure> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    for attempt in 1..=attempts {
        let mut request = agent.get(url).set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        log::debug!("GET {url} (attempt {attempt}/{attempts})");
        match request.call() {
            Ok(response) => match response.into_string() {
                Ok(body) => return Ok(body),
                Err(err) => {
                    return Err(HttpFailure {
                        message: format!("request failed: response decode failed: {err}"),
                        status: None,
                        body: None,
                    });
                }
            },
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body.trim();
                let status_error = if body.is_empty() {
                    format!("HTTP status {status}")
                } else {
                    let truncated = body.chars().take(240).collect::<String>();
                    format!("HTTP status {status} ({truncated})")
                };

                if should_retry_http_status(status) && attempt < attempts {
                    log::warn!("GET {url}: {status_error}; retrying");
                    thread::sleep(policy.retry_delay);
                    continue;
                }

                let message = if should_retry_http_status(status) {
                    format!("request failed after {attempts} attempt(s): {status_error}")
                } else {
                    format!("request failed: {status_error}")
                };
                return Err(HttpFailure {
                    message,
                    status: Some(status),
                    body: (!body.is_empty()).then(|| body.to_string()),
                });
            }
            Err(ureq::Error::Transport(err)) => {
                let transport_error = format!("transport error: {err}");
                if attempt < attempts {
                    log::warn!("GET {url}: {transport_error}; retrying");
                    thread::sleep(policy.retry_delay);
                    continue;
                }
                return Err(HttpFailure {
                    message: format!(
                        "request failed after {attempts} attempt(s): {transport_error}"
                    ),
                    status: None,
                    body: None,
                });
            }
        }
    }

    Err(HttpFailure {
        message: "request failed: exhausted attempts without a concrete error".to_string(),
        status: None,
        body: None,
    })
}
