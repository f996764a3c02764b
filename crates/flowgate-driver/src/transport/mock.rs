/*!
 * Scripted in-memory transport.
 *
 * Stands in for a real device in tests and demos: responses are either
 * queued ahead of time or produced by a responder closure keyed on the
 * written command frame. Everything written is kept in a byte log so tests
 * can assert on the exact wire traffic.
 */
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::Transport;

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Default)]
struct Inner {
    /// Queued responses, consumed one per written frame ahead of the
    /// responder closure.
    script: VecDeque<Vec<u8>>,
    /// Bytes waiting to be read back.
    rx: VecDeque<u8>,
    /// Every byte ever written, in order.
    log: Vec<u8>,
    responder: Option<Responder>,
    closed: bool,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("script", &self.script.len())
            .field("rx", &self.rx.len())
            .field("log", &self.log.len())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Handle over a [`MockTransport`]'s shared state.
///
/// Stays valid after the transport itself has been handed to the driver.
#[derive(Debug, Clone)]
pub struct MockHandle {
    inner: Arc<Mutex<Inner>>,
}

impl MockHandle {
    /// Queue a canned response for the next unanswered write.
    pub fn push_response(&self, bytes: impl Into<Vec<u8>>) {
        self.inner.lock().unwrap().script.push_back(bytes.into());
    }

    /// Install a responder invoked for writes the script does not cover.
    /// Returning `None` leaves the write unanswered (a timeout, from the
    /// driver's point of view).
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        self.inner.lock().unwrap().responder = Some(Box::new(responder));
    }

    /// Everything written so far, as one flat byte sequence.
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().unwrap().log.clone()
    }

    /// Opcodes of the command frames written so far, in wire order.
    pub fn written_opcodes(&self) -> Vec<u8> {
        self.inner
            .lock()
            .unwrap()
            .log
            .chunks(flowgate_proto::FRAME_LEN)
            .map(|frame| frame[0])
            .collect()
    }

    /// Whether the driver has released the transport.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }
}

/// In-memory [`Transport`] implementation driven by a [`MockHandle`].
#[derive(Debug)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    /// Create a transport plus the handle that scripts it.
    pub fn new() -> (Self, MockHandle) {
        let inner = Arc::new(Mutex::new(Inner::default()));
        (
            Self {
                inner: inner.clone(),
            },
            MockHandle { inner },
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"));
        }
        inner.log.extend_from_slice(bytes);

        let reply = match inner.script.pop_front() {
            Some(reply) => Some(reply),
            None => inner
                .responder
                .as_mut()
                .and_then(|respond| respond(bytes)),
        };
        if let Some(reply) = reply {
            inner.rx.extend(reply);
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.inner.lock().unwrap().rx.len())
    }

    async fn read_byte(&mut self) -> io::Result<u8> {
        self.inner
            .lock()
            .unwrap()
            .rx
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no bytes buffered"))
    }

    fn close(&mut self) {
        self.inner.lock().unwrap().closed = true;
    }
}
