use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::{EstimationBackend, EtaBoard, EtaClient, EtaRequest, EtaTicket, FALLBACK_ETA};

/// Runs estimates off the caller's thread and feeds results into an [`EtaBoard`].
///
/// Superseded estimates are not cancelled; they finish and are discarded by the board.
pub struct EtaDispatcher<B> {
    client: Arc<EtaClient<B>>,
    board: EtaBoard,
    sender: Sender<(EtaTicket, String)>,
    receiver: Receiver<(EtaTicket, String)>,
}

impl<B: EstimationBackend + 'static> EtaDispatcher<B> {
    pub fn new(client: EtaClient<B>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            client: Arc::new(client),
            board: EtaBoard::new(),
            sender,
            receiver,
        }
    }

    /// Start an estimate for `input` unless it equals the latest input.
    pub fn request(&mut self, input: EtaRequest) -> bool {
        let Some(ticket) = self.board.begin(input) else {
            return false;
        };

        let client = Arc::clone(&self.client);
        let sender = self.sender.clone();
        let worker_ticket = ticket.clone();
        let spawned = thread::Builder::new()
            .name("eta-estimate".to_string())
            .spawn(move || {
                let text = client.estimate_request(worker_ticket.input());
                // The dispatcher may be gone; nobody is left to show the result then.
                let _ = sender.send((worker_ticket, text));
            });

        if let Err(error) = spawned {
            tracing::warn!(%error, "failed to spawn eta worker");
            self.board.complete(&ticket, FALLBACK_ETA.to_string());
        }
        true
    }

    /// Drop the displayed estimate and any still in flight.
    pub fn invalidate(&mut self) {
        self.board.invalidate();
    }

    /// Apply every result that has already arrived. Returns how many were published.
    pub fn drain(&mut self) -> usize {
        let mut published = 0;
        while let Ok((ticket, text)) = self.receiver.try_recv() {
            if self.board.complete(&ticket, text) {
                published += 1;
            }
        }
        published
    }

    /// Block until the latest estimate is published or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<&str> {
        let deadline = Instant::now() + timeout;
        self.drain();
        while self.board.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.receiver.recv_timeout(remaining) {
                Ok((ticket, text)) => {
                    self.board.complete(&ticket, text);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.board.text()
    }

    pub fn board(&self) -> &EtaBoard {
        &self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eta::EstimationError;

    struct Echo;

    impl EstimationBackend for Echo {
        fn estimate(&self, request: &EtaRequest) -> Result<String, EstimationError> {
            Ok(format!("{} km", request.distance_km))
        }
    }

    fn input(distance_km: f64) -> EtaRequest {
        EtaRequest {
            distance_km,
            origin: "14.83, 120.28".to_string(),
            destination: "Gordon College Main Campus".to_string(),
        }
    }

    #[test]
    fn repeated_input_is_not_reissued() {
        let mut dispatcher = EtaDispatcher::new(EtaClient::new(Echo));
        assert!(dispatcher.request(input(1.0)));
        assert!(!dispatcher.request(input(1.0)));
        assert_eq!(dispatcher.wait(Duration::from_secs(5)), Some("1 km"));
    }
}
