use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bytes::Bytes;
use url::Url;

use super::Transport;
use crate::download::playlist::segment::Segment;
use crate::error::transport_error::TransportError;

#[derive(Debug, Default)]
pub struct State {
    pub bodies: HashMap<String, Bytes>,
    /// Remaining failures per url before requests start succeeding.
    pub failures: HashMap<String, u32>,
    pub heads: Vec<String>,
    pub gets: Vec<String>,
    pub sessions: u32,
    pub omit_length: bool,
}

/// In-memory stand-in for the HTTP client. Sessions share their state so
/// tests can observe requests made through partitions.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    pub state: Rc<RefCell<State>>,
}

impl FakeTransport {
    pub fn serve(&self, uri: &Url, body: Vec<u8>) {
        self.state.borrow_mut().bodies.insert(uri.to_string(), Bytes::from(body));
    }

    pub fn fail_next(&self, uri: &Url, times: u32) {
        self.state.borrow_mut().failures.insert(uri.to_string(), times);
    }

    pub fn gets(&self) -> Vec<String> {
        self.state.borrow().gets.clone()
    }

    pub fn heads(&self) -> Vec<String> {
        self.state.borrow().heads.clone()
    }

    fn should_fail(&self, uri: &Url) -> bool {
        let mut state = self.state.borrow_mut();
        match state.failures.get_mut(uri.as_str()) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn body(&self, uri: &Url) -> Result<Bytes, TransportError> {
        if self.should_fail(uri) {
            return Err(TransportError::Status { url: uri.to_string(), status: 503 });
        }
        self.state
            .borrow()
            .bodies
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| TransportError::Status { url: uri.to_string(), status: 404 })
    }
}

impl Transport for FakeTransport {
    fn content_length(&self, uri: &Url) -> Result<u64, TransportError> {
        self.state.borrow_mut().heads.push(uri.to_string());
        let body = self.body(uri)?;
        if self.state.borrow().omit_length {
            return Err(TransportError::MissingContentLength { url: uri.to_string() });
        }
        Ok(body.len() as u64)
    }

    fn get(&self, uri: &Url) -> Result<Bytes, TransportError> {
        self.state.borrow_mut().gets.push(uri.to_string());
        self.body(uri)
    }

    fn new_session(&self) -> Result<Self, TransportError> {
        self.state.borrow_mut().sessions += 1;
        Ok(self.clone())
    }
}

/// Deterministic, position-dependent content so misplaced bytes show up.
pub fn content(segment: usize, len: usize) -> Vec<u8> {
    (0..len).map(|i| ((segment * 37 + i * 7) % 251) as u8).collect()
}

/// Segments of the given byte lengths and durations, served by a fresh fake.
/// With `hinted`, the URIs carry their byte ranges and no probes are needed.
pub fn recording(layout: &[(usize, f64)], hinted: bool) -> (Vec<Segment>, FakeTransport) {
    let transport = FakeTransport::default();
    let mut offset = 0;
    let segments = layout
        .iter()
        .enumerate()
        .map(|(i, &(len, duration))| {
            let uri = if hinted && len > 0 {
                format!(
                    "http://cdn.test/vod/{}.ts?start_offset={}&end_offset={}",
                    i,
                    offset,
                    offset + len - 1
                )
            } else {
                format!("http://cdn.test/vod/{}.ts", i)
            };
            offset += len;
            let uri = Url::parse(&uri).unwrap();
            transport.serve(&uri, content(i, len));
            Segment::new(uri, duration)
        })
        .collect();
    (segments, transport)
}

pub fn concatenation(layout: &[(usize, f64)]) -> Vec<u8> {
    layout
        .iter()
        .enumerate()
        .flat_map(|(i, &(len, _))| content(i, len))
        .collect()
}
