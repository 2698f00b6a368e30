//! Request-line reading and route classification

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// What a connection asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /stream`, with any suffix
    Stream,
    /// `GET /set_<field>?value=<v>`; `value` is the raw query value
    Set { field: String, value: Option<String> },
    /// `GET /get_<field>`
    Get { field: String },
    /// Anything else
    Page,
}

impl Route {
    /// Classifies the first line of an HTTP request
    pub fn classify(request: &str) -> Self {
        let line = request.lines().next().unwrap_or_default();
        let mut parts = line.split_whitespace();
        let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
            return Route::Page;
        };

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        if path.starts_with("/stream") {
            Route::Stream
        } else if let Some(field) = path.strip_prefix("/set_").filter(|f| !f.is_empty()) {
            Route::Set {
                field: field.to_string(),
                value: query.and_then(query_value),
            }
        } else if let Some(field) = path.strip_prefix("/get_").filter(|f| !f.is_empty()) {
            Route::Get {
                field: field.to_string(),
            }
        } else {
            Route::Page
        }
    }
}

fn query_value(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("value="))
        .map(str::to_string)
}

/// Reads until the request line ends (`\n`), `limit` bytes are buffered,
/// the peer stops sending or `wait` runs out. Whatever arrived is returned,
/// lossily decoded, so a stalled client still gets classified.
pub async fn read_request<R>(
    reader: &mut R,
    limit: usize,
    wait: Duration,
) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + wait;
    let mut buf = vec![0u8; limit];
    let mut filled = 0;

    while filled < limit {
        let n = match timeout_at(deadline, reader.read(&mut buf[filled..])).await {
            Ok(read) => read?,
            Err(_) => {
                debug!(bytes = filled, "Request read timed out");
                break;
            }
        };
        if n == 0 {
            break;
        }
        let start = filled;
        filled += n;
        if buf[start..filled].contains(&b'\n') {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&buf[..filled]).into_owned())
}
