//! HTTP/1.1 responses and multipart framing

use crate::camera::PixelFormat;
use bytes::{BufMut, Bytes, BytesMut};

/// Multipart boundary used by `/stream`
pub const BOUNDARY: &str = "frame";

/// Response head of a `/stream` session, sent once
pub const STREAM_HEADER: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: multipart/x-mixed-replace; boundary=frame\r\n\
Cache-Control: no-cache\r\n\
Connection: close\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    ServiceUnavailable,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::ServiceUnavailable => 503,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// A complete, non-streaming response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: Option<&'static str>,
    pub body: Bytes,
}

impl Response {
    pub fn empty(status: Status) -> Self {
        Self {
            status,
            content_type: None,
            body: Bytes::new(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            content_type: Some("text/plain"),
            body: Bytes::from(body.into()),
        }
    }

    pub fn html(body: Bytes) -> Self {
        Self {
            status: Status::Ok,
            content_type: Some("text/html"),
            body,
        }
    }

    pub fn not_found() -> Self {
        Self::empty(Status::NotFound)
    }

    pub fn busy() -> Self {
        Self {
            status: Status::ServiceUnavailable,
            content_type: Some("text/plain"),
            body: Bytes::from_static(b"camera busy"),
        }
    }

    /// Serializes head and body into one buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.code(),
            self.status.reason()
        );
        if let Some(content_type) = self.content_type {
            head.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));

        let mut out = BytesMut::with_capacity(head.len() + self.body.len());
        out.put_slice(head.as_bytes());
        out.put_slice(&self.body);
        out.freeze()
    }
}

/// MIME type of a streamed frame; everything that is not JPEG goes out as BMP
pub fn frame_content_type(format: PixelFormat) -> &'static str {
    match format {
        PixelFormat::Jpeg => "image/jpeg",
        _ => "image/bmp",
    }
}

/// Boundary and part header preceding one frame
pub fn part_header(content_type: &str) -> Bytes {
    Bytes::from(format!(
        "--{}\r\nContent-Type: {}\r\n\r\n",
        BOUNDARY, content_type
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ok() {
        let bytes = Response::empty(Status::Ok).to_bytes();
        assert_eq!(
            &bytes[..],
            b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_text_body() {
        let bytes = Response::text("2").to_bytes();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 1\r\n"));
        assert!(text.ends_with("\r\n\r\n2"));
    }

    #[test]
    fn test_status_lines() {
        assert!(Response::not_found().to_bytes().starts_with(b"HTTP/1.1 404 Not Found\r\n"));
        assert!(Response::busy()
            .to_bytes()
            .starts_with(b"HTTP/1.1 503 Service Unavailable\r\n"));
    }

    #[test]
    fn test_part_header() {
        assert_eq!(
            &part_header(frame_content_type(PixelFormat::Rgb565))[..],
            b"--frame\r\nContent-Type: image/bmp\r\n\r\n"
        );
        assert_eq!(frame_content_type(PixelFormat::Jpeg), "image/jpeg");
    }
}
