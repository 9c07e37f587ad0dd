use buildnum_protocol::{
    next_build_num_url, BuildNumRequest, BuildNumResponse, BuildNumber, ResponseError,
};
use tracing::debug;
use ureq::Agent;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error(transparent)]
    Response(#[from] ResponseError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Anything able to hand out the next build number for a version.
pub trait BuildNumberSource {
    fn next_build_num(&self, request: &BuildNumRequest) -> Result<BuildNumber>;
}

/// Blocking client for a build-number server. No timeout is configured, a
/// request waits for as long as the transport allows.
pub struct BuildNumClient {
    agent: Agent,
    url: String,
}

impl BuildNumClient {
    pub fn new(server: &str) -> Self {
        Self {
            agent: Agent::new_with_defaults(),
            url: next_build_num_url(server),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self, request: &BuildNumRequest) -> std::result::Result<String, ureq::Error> {
        let mut response = self.agent.post(self.url.as_str()).send_form(request.form_fields())?;
        response.body_mut().read_to_string()
    }
}

impl BuildNumberSource for BuildNumClient {
    fn next_build_num(&self, request: &BuildNumRequest) -> Result<BuildNumber> {
        debug!(url = %self.url, ?request, "Requesting next build number");

        let body = self.fetch(request).map_err(|source| ClientError::Transport {
            url: self.url.clone(),
            source,
        })?;
        debug!(body = %body.trim_end(), "Build server replied");

        let build = BuildNumResponse::from_text(&body)?.into_build_number()?;
        Ok(build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildnum_protocol::DecodeError;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    /// Answers a single request and hands back what was received.
    fn serve_once(status: &str, body: &str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            stream.write_all(response.as_bytes()).unwrap();
            request
        });

        (format!("http://{}", addr), handle)
    }

    fn sample_request() -> BuildNumRequest {
        BuildNumRequest::new("desktop", "1.2.3", "abc123")
    }

    #[test]
    fn test_url_normalization() {
        assert_eq!(
            BuildNumClient::new("http://builds.local/").url(),
            "http://builds.local/cmd/next_build_num"
        );
    }

    #[test]
    fn test_posts_form_and_reads_build_number() {
        let (server, handle) = serve_once("200 OK", "{'next_build_num': 42}");
        let client = BuildNumClient::new(&format!("{}/", server));

        let build = client.next_build_num(&sample_request()).unwrap();
        assert_eq!(build.as_str(), "42");

        let received = handle.join().unwrap();
        assert!(received.starts_with("POST /cmd/next_build_num HTTP/1.1\r\n"));
        assert!(received
            .to_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert!(received.ends_with("product=desktop&version=1.2.3&commit=abc123"));
    }

    #[test]
    fn test_server_error_reply() {
        let (server, handle) = serve_once("200 OK", "{'error': 'boom'}");
        let client = BuildNumClient::new(&server);

        let err = client.next_build_num(&sample_request()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Response(ResponseError::Server(ref msg)) if msg == "boom"
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_undecodable_reply() {
        let (server, handle) = serve_once("200 OK", "{'next_build_num': 4");
        let client = BuildNumClient::new(&server);

        let err = client.next_build_num(&sample_request()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Response(ResponseError::Decode(DecodeError::Syntax { .. }))
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_http_error_status_is_transport_error() {
        let (server, handle) = serve_once("500 Internal Server Error", "oops");
        let client = BuildNumClient::new(&server);

        let err = client.next_build_num(&sample_request()).unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
        handle.join().unwrap();
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BuildNumClient::new(&format!("http://{}", addr));
        let err = client.next_build_num(&sample_request()).unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
        assert!(err.to_string().contains("/cmd/next_build_num"));
    }
}
