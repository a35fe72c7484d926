//! Pluggable needle production
//!
//! The engine never generates needles directly; it submits one
//! self-contained request per tick to a `Producer` and polls for the
//! response. Two strategies exist:
//! - `InlineProducer`: synchronous, in-process (wasm and tests)
//! - `ThreadProducer`: a worker thread behind mpsc channels (native), the
//!   request/response analogue of running generation off the UI thread
//!
//! At most one request is outstanding at any time. Requests carry an epoch
//! tag; the engine bumps its epoch on pause/reset/geometry change and
//! discards any response still in flight from before the bump.

use super::needle::{Needle, NeedleGen};

/// What to produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProduceKind {
    /// Continuous production: `count` uniformly placed needles.
    Batch { count: usize },
    /// Manual drop. `None` picks a random position; `Some` anchors the
    /// needle at a click position (angle is still random).
    Drop { at: Option<(f64, f64)> },
}

/// A self-contained production request. Carrying the bounds and geometry in
/// the request keeps producers stateless across configuration changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProduceRequest {
    pub kind: ProduceKind,
    pub width: f64,
    pub height: f64,
    pub needle_length: f64,
    pub line_spacing: f64,
    /// Cancellation tag, echoed back in the response.
    pub epoch: u64,
}

/// The produced batch, in generation order.
#[derive(Debug, Clone)]
pub struct ProduceResponse {
    pub needles: Vec<Needle>,
    pub kind: ProduceKind,
    pub epoch: u64,
}

/// Production strategy boundary. Implementations must answer every
/// submitted request exactly once, in submission order.
pub trait Producer {
    /// Submit a request. The engine guarantees at most one in flight.
    fn submit(&mut self, request: ProduceRequest);
    /// Non-blocking poll for the next completed response.
    fn try_recv(&mut self) -> Option<ProduceResponse>;
}

fn produce(generator: &mut NeedleGen, request: &ProduceRequest) -> ProduceResponse {
    let needles = match request.kind {
        ProduceKind::Batch { count } => (0..count)
            .map(|_| {
                generator.generate_random(
                    request.width,
                    request.height,
                    request.needle_length,
                    request.line_spacing,
                )
            })
            .collect(),
        ProduceKind::Drop { at } => {
            let needle = match at {
                Some((cx, cy)) => {
                    generator.generate_at(cx, cy, request.needle_length, request.line_spacing)
                }
                None => generator.generate_random(
                    request.width,
                    request.height,
                    request.needle_length,
                    request.line_spacing,
                ),
            };
            vec![needle]
        }
    };
    ProduceResponse {
        needles,
        kind: request.kind,
        epoch: request.epoch,
    }
}

/// Synchronous in-process production. The response is generated on submit
/// and handed out on the next poll, preserving the same submit/poll rhythm
/// the engine uses with the threaded strategy.
#[derive(Debug)]
pub struct InlineProducer {
    generator: NeedleGen,
    ready: Option<ProduceResponse>,
}

impl InlineProducer {
    pub fn new(seed: u64) -> Self {
        Self {
            generator: NeedleGen::new(seed),
            ready: None,
        }
    }
}

impl Producer for InlineProducer {
    fn submit(&mut self, request: ProduceRequest) {
        debug_assert!(self.ready.is_none(), "a request is already in flight");
        self.ready = Some(produce(&mut self.generator, &request));
    }

    fn try_recv(&mut self) -> Option<ProduceResponse> {
        self.ready.take()
    }
}

/// Worker-thread production over mpsc channels (not available on wasm).
#[cfg(not(target_arch = "wasm32"))]
pub struct ThreadProducer {
    requests: std::sync::mpsc::Sender<ProduceRequest>,
    responses: std::sync::mpsc::Receiver<ProduceResponse>,
}

#[cfg(not(target_arch = "wasm32"))]
impl ThreadProducer {
    /// Spawn the worker. It exits when the producer is dropped and the
    /// request channel disconnects.
    pub fn spawn(seed: u64) -> Self {
        use std::sync::mpsc;

        let (request_tx, request_rx) = mpsc::channel::<ProduceRequest>();
        let (response_tx, response_rx) = mpsc::channel::<ProduceResponse>();

        std::thread::spawn(move || {
            let mut generator = NeedleGen::new(seed);
            while let Ok(request) = request_rx.recv() {
                if response_tx.send(produce(&mut generator, &request)).is_err() {
                    break;
                }
            }
            log::debug!("needle producer thread exiting");
        });

        Self {
            requests: request_tx,
            responses: response_rx,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Producer for ThreadProducer {
    fn submit(&mut self, request: ProduceRequest) {
        // A send failure means the worker is gone; the poll side will
        // simply never yield a response.
        if self.requests.send(request).is_err() {
            log::error!("needle producer thread is gone; request dropped");
        }
    }

    fn try_recv(&mut self) -> Option<ProduceResponse> {
        self.responses.try_recv().ok()
    }
}
