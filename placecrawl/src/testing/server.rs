//! A loopback HTTP server answering with canned responses.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Serves one canned response per connection, in order, then stops listening.
///
/// Every request is recorded verbatim (request line, headers and body) so
/// tests can assert on what an adapter actually sent.
#[derive(Debug)]
pub struct StubServer {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    /// Starts a server answering each connection with the next `(status, body)`.
    pub async fn start<I, B>(responses: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = (u16, B)>,
        B: Into<String>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        let responses: Vec<(u16, String)> = responses
            .into_iter()
            .map(|(status, body)| (status, body.into()))
            .collect();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                if let Ok(request) = read_request(&mut socket).await {
                    recorded.lock().push(request);
                }
                let _ = write_response(&mut socket, status, &body).await;
            }
        });

        Ok(Self {
            url,
            requests,
            task,
        })
    }

    /// Starts a server that answers a single request.
    pub async fn respond(status: u16, body: impl Into<String>) -> io::Result<Self> {
        Self::start([(status, body.into())]).await
    }

    /// Base URL, without a trailing slash.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_request(socket: &mut TcpStream) -> io::Result<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(head_end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..head_end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= head_end + 4 + body_len {
                break;
            }
        }
    }
    Ok(String::from_utf8_lossy(&data).into_owned())
}

async fn write_response(socket: &mut TcpStream, status: u16, body: &str) -> io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status} Stub\r\ncontent-type: text/plain; charset=utf-8\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_serves_responses_in_order_and_records_requests() {
        let server = StubServer::start([(503, ""), (200, "ok")]).await.unwrap();
        let client = reqwest::Client::new();

        let first = client.get(format!("{}/a", server.url())).send().await.unwrap();
        assert_eq!(first.status().as_u16(), 503);

        let second = client
            .post(format!("{}/b", server.url()))
            .body("payload")
            .send()
            .await
            .unwrap();
        assert_eq!(second.status().as_u16(), 200);
        assert_eq!(second.text().await.unwrap(), "ok");

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("GET /a HTTP/1.1"));
        assert!(requests[1].starts_with("POST /b HTTP/1.1"));
        assert!(requests[1].ends_with("payload"));
    }
}
