//! Newline-delimited JSON bridge between a host process and the dispatcher.
//!
//! Each input line is one request, `{"action": "...", "args": {...}}`, and
//! gets exactly one response line. Every request runs in its own
//! [`Session`](authtrail_events::Session), so mapping lookups are never
//! shared between requests.

use authtrail_events::{ActionArgs, AuthTrailService};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Deserialize)]
pub struct Request {
    pub action: String,
    #[serde(default)]
    pub args: ActionArgs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Success { ok: bool, result: Value },
    Failure { ok: bool, error: String },
}

impl Response {
    pub fn success(result: Option<Value>) -> Self {
        Self::Success {
            ok: true,
            result: result.unwrap_or(Value::Null),
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self::Failure {
            ok: false,
            error: error.to_string(),
        }
    }
}

/// Handle a single request line.
pub async fn handle_line(service: &AuthTrailService, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed request line");
            return Response::failure(format!("Invalid request: {e}"));
        }
    };

    match service.session().call(&request.action, &request.args).await {
        Ok(result) => Response::success(result),
        Err(e) => {
            tracing::debug!(action = %request.action, error = %e, "Request failed");
            Response::failure(e)
        }
    }
}

/// Serve requests from `reader` until end of input. Blank lines are skipped.
pub async fn serve<R, W>(service: &AuthTrailService, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(service, &line).await;
        let mut out = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        handled += 1;
    }

    tracing::info!(handled, "Request stream closed");
    Ok(())
}
