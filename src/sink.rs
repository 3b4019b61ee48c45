use crossbeam::channel::{self, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::error::Error;
use crate::track::TrackId;

const QUEUE_CAPACITY: usize = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Detection {
        vehicle_id: TrackId,
        side: String,
    },
    Crossing {
        vehicle_id: TrackId,
        side: String,
        origin: String,
        legal: bool,
    },
}

impl Event {
    /// Line-protocol record, timestamped in whole seconds.
    pub fn to_line(&self, unix_seconds: u64) -> String {
        match self {
            Event::Detection { vehicle_id, side } => {
                format!("detection,side=\"{}\" vehicle_id={} {}", side, vehicle_id, unix_seconds)
            }
            Event::Crossing {
                vehicle_id,
                side,
                origin,
                legal,
            } => format!(
                "crossing,side=\"{}\",origin=\"{}\",legal={} vehicle_id={} {}",
                side, origin, legal, vehicle_id, unix_seconds
            ),
        }
    }
}

pub fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Receiver of telemetry events. Implementations must not block the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    #[inline]
    fn emit(&self, _event: Event) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub host: String,
    pub org: String,
    pub bucket: String,
    pub token: Option<String>,
    pub request_timeout: Duration,
    /// How long a dropped sink keeps delivering what is still queued.
    pub drain_timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8086".to_string(),
            org: "traffi".to_string(),
            bucket: "traffi".to_string(),
            token: None,
            request_timeout: REQUEST_TIMEOUT,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }
}

impl SinkConfig {
    pub fn write_url(&self) -> String {
        format!(
            "{}/api/v2/write?org={}&bucket={}&precision=s",
            self.host.trim_end_matches('/'),
            self.org,
            self.bucket
        )
    }
}

/// Posts line-protocol records from a background worker.
///
/// Events are queued and the frame pipeline never waits on the network. A full
/// queue or a failed request drops the record with a warning; nothing is retried.
/// On drop the worker gets `drain_timeout` to flush the queue, whatever is left
/// after that is discarded.
pub struct HttpSink {
    tx: Option<Sender<String>>,
    worker: Option<JoinHandle<()>>,
    deadline: Arc<Mutex<Option<Instant>>>,
    drain_timeout: Duration,
}

impl HttpSink {
    pub fn new(config: SinkConfig) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let url = config.write_url();
        let auth = config.token.map(|t| format!("Token {}", t));

        let (tx, rx) = channel::bounded::<String>(QUEUE_CAPACITY);
        let deadline = Arc::new(Mutex::new(None::<Instant>));
        let worker_deadline = Arc::clone(&deadline);

        let worker = std::thread::Builder::new()
            .name("traffi-sink".into())
            .spawn(move || {
                for body in rx.iter() {
                    let expired = matches!(*worker_deadline.lock(), Some(d) if Instant::now() >= d);
                    if expired {
                        let dropped = 1 + rx.try_iter().count();
                        warn!(dropped, "event sink drain timed out, dropping queued records");
                        break;
                    }

                    let mut req = client
                        .post(&url)
                        .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                        .body(body);

                    if let Some(auth) = &auth {
                        req = req.header(reqwest::header::AUTHORIZATION, auth.as_str());
                    }

                    match req.send() {
                        Ok(resp) if resp.status().is_success() => {
                            debug!(status = %resp.status(), "event delivered");
                        }
                        Ok(resp) => {
                            warn!(status = %resp.status(), "event sink rejected record");
                        }
                        Err(err) => {
                            warn!(error = %err, "event sink unreachable");
                        }
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            deadline,
            drain_timeout: config.drain_timeout,
        })
    }
}

impl EventSink for HttpSink {
    fn emit(&self, event: Event) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event.to_line(unix_seconds())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("event sink queue full, dropping record"),
            Err(TrySendError::Disconnected(_)) => warn!("event sink worker gone, dropping record"),
        }
    }
}

impl Drop for HttpSink {
    fn drop(&mut self) {
        // closing the channel lets the worker drain and exit
        *self.deadline.lock() = Some(Instant::now() + self.drain_timeout);
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    #[test]
    fn test_detection_line() {
        let event = Event::Detection {
            vehicle_id: TrackId(12),
            side: "north".into(),
        };
        assert_eq!(
            event.to_line(1_700_000_000),
            "detection,side=\"north\" vehicle_id=12 1700000000"
        );
    }

    #[test]
    fn test_crossing_line() {
        let event = Event::Crossing {
            vehicle_id: TrackId(3),
            side: "north".into(),
            origin: "south".into(),
            legal: false,
        };
        assert_eq!(
            event.to_line(5),
            "crossing,side=\"north\",origin=\"south\",legal=false vehicle_id=3 5"
        );
    }

    #[test]
    fn test_write_url() {
        let config = SinkConfig {
            host: "http://influx:8086/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.write_url(),
            "http://influx:8086/api/v2/write?org=traffi&bucket=traffi&precision=s"
        );
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.emit(Event::Detection {
            vehicle_id: TrackId(1),
            side: "a".into(),
        });
        sink.emit(Event::Detection {
            vehicle_id: TrackId(2),
            side: "b".into(),
        });

        let ids: Vec<_> = sink
            .events()
            .into_iter()
            .map(|e| match e {
                Event::Detection { vehicle_id, .. } => vehicle_id,
                Event::Crossing { vehicle_id, .. } => vehicle_id,
            })
            .collect();
        assert_eq!(ids, vec![TrackId(1), TrackId(2)]);
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }

        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_http_sink_posts_line_protocol() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            stream
                .write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
            request
        });

        let sink = HttpSink::new(SinkConfig {
            host: format!("http://{}", addr),
            org: "acme".into(),
            bucket: "junction".into(),
            token: Some("secret".into()),
            ..Default::default()
        })
        .unwrap();

        sink.emit(Event::Crossing {
            vehicle_id: TrackId(3),
            side: "north".into(),
            origin: "south".into(),
            legal: false,
        });

        let request = server.join().unwrap();
        drop(sink);

        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        let mut lines = head.lines();
        assert_eq!(
            lines.next(),
            Some("POST /api/v2/write?org=acme&bucket=junction&precision=s HTTP/1.1")
        );

        let headers: Vec<String> = lines.map(|l| l.to_ascii_lowercase()).collect();
        assert!(headers.iter().any(|h| h == "authorization: token secret"), "{:?}", headers);
        assert!(headers.iter().any(|h| h.starts_with("content-type: text/plain")), "{:?}", headers);

        assert!(
            body.starts_with("crossing,side=\"north\",origin=\"south\",legal=false vehicle_id=3 "),
            "{}",
            body
        );
        let ts: u64 = body.rsplit(' ').next().unwrap().parse().unwrap();
        assert!(ts > 1_600_000_000);
    }

    #[test]
    fn test_http_sink_drop_bounded_by_drain_timeout() {
        // never accepted, every request sits in the backlog until it times out
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let sink = HttpSink::new(SinkConfig {
            host: format!("http://{}", addr),
            request_timeout: Duration::from_millis(200),
            drain_timeout: Duration::from_millis(300),
            ..Default::default()
        })
        .unwrap();

        for id in 0..20 {
            sink.emit(Event::Detection {
                vehicle_id: TrackId(id),
                side: "north".into(),
            });
        }

        let started = Instant::now();
        drop(sink);

        // draining all 20 at 200ms each would take four seconds
        assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
        drop(listener);
    }

    #[test]
    fn test_http_sink_drops_quietly_when_unreachable() {
        let sink = HttpSink::new(SinkConfig {
            host: "http://127.0.0.1:9".into(),
            ..Default::default()
        })
        .unwrap();

        sink.emit(Event::Detection {
            vehicle_id: TrackId(1),
            side: "north".into(),
        });
        drop(sink);
    }
}
