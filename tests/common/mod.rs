//! Local stand-ins for dump1090 and InfluxDB.
#![allow(dead_code)]

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const SAMPLE: &str = "MSG,3,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,TEST123,5000,250,90,51.5,-0.1,0,1234,0,0,0,0";

/// A request received by [`spawn_influx`].
#[derive(Debug)]
pub struct Request {
    /// Path and query, e.g. `/write?precision=s&db=adsb`
    pub target: String,
    pub body: String,
}

pub struct FakeInflux {
    pub url: String,
    pub requests: mpsc::UnboundedReceiver<Request>,
}

/// Minimal HTTP/1.1 server answering every request with `status`.
pub async fn spawn_influx(status: u16) -> FakeInflux {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve_http(socket, status, tx.clone()));
        }
    });

    FakeInflux { url, requests: rx }
}

async fn serve_http(mut socket: TcpStream, status: u16, tx: mpsc::UnboundedSender<Request>) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        // Headers
        let header_end = loop {
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }
        };

        let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
        let target = head
            .lines()
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .unwrap_or_default()
            .to_string();
        let content_length = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        // Body
        while buffer.len() < header_end + content_length {
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }
        }

        let body = String::from_utf8_lossy(&buffer[header_end..header_end + content_length])
            .into_owned();
        buffer.drain(..header_end + content_length);
        let _ = tx.send(Request { target, body });

        let reply_body = if status >= 300 { "{\"error\":\"boom\"}" } else { "" };
        let response = format!(
            "HTTP/1.1 {} Status\r\nContent-Length: {}\r\n\r\n{}",
            status,
            reply_body.len(),
            reply_body
        );
        if socket.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

/// A dump1090 stand-in that sends `line` every `every` to its first client.
/// Returns the listener port.
pub async fn spawn_feed(line: &'static str, every: Duration) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let Ok((socket, _)) = listener.accept().await else {
            return;
        };
        let (mut reader, mut writer) = socket.into_split();

        // Drain keepalive acknowledgements
        tokio::spawn(async move {
            let mut ack = [0u8; 64];
            while let Ok(n) = reader.read(&mut ack).await {
                if n == 0 {
                    break;
                }
            }
        });

        loop {
            if writer.write_all(format!("{}\r\n", line).as_bytes()).await.is_err() {
                break;
            }
            tokio::time::sleep(every).await;
        }
    });

    port
}

/// A dump1090 stand-in that sends `lines` and then closes the connection.
pub async fn spawn_closing_feed(lines: &'static [&'static str]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        for line in lines {
            let _ = socket.write_all(format!("{}\r\n", line).as_bytes()).await;
        }
        // Close our half, keep accepting acknowledgements until the client leaves
        let _ = socket.shutdown().await;
        let mut ack = [0u8; 64];
        while let Ok(n) = socket.read(&mut ack).await {
            if n == 0 {
                break;
            }
        }
    });

    port
}
