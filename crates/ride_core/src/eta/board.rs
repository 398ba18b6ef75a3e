use super::EtaRequest;

/// Identifies one estimate request. Only the most recently issued ticket may publish.
#[derive(Debug, Clone, PartialEq)]
pub struct EtaTicket {
    seq: u64,
    input: EtaRequest,
}

impl EtaTicket {
    pub fn input(&self) -> &EtaRequest {
        &self.input
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EtaDisplay {
    #[default]
    Idle,
    Loading,
    Ready(String),
}

/// Last-request-wins holder for the displayed ETA.
///
/// Results are ordered by when their input was issued, not by when they arrive: a late
/// answer for a superseded input is dropped.
#[derive(Debug, Default)]
pub struct EtaBoard {
    latest_seq: u64,
    latest_input: Option<EtaRequest>,
    display: EtaDisplay,
}

impl EtaBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new input. Returns `None` when it equals the latest input.
    pub fn begin(&mut self, input: EtaRequest) -> Option<EtaTicket> {
        if self.latest_input.as_ref() == Some(&input) {
            return None;
        }
        self.latest_seq += 1;
        self.latest_input = Some(input.clone());
        self.display = EtaDisplay::Loading;
        Some(EtaTicket {
            seq: self.latest_seq,
            input,
        })
    }

    /// Forget the latest input so no estimate still in flight can publish.
    ///
    /// Used when the inputs changed but no longer form a complete request.
    pub fn invalidate(&mut self) {
        if self.latest_input.is_none() && self.display == EtaDisplay::Idle {
            return;
        }
        self.latest_seq += 1;
        self.latest_input = None;
        self.display = EtaDisplay::Idle;
    }

    /// Publish a result. Returns `false` and leaves the display alone if superseded.
    pub fn complete(&mut self, ticket: &EtaTicket, text: String) -> bool {
        if ticket.seq != self.latest_seq {
            tracing::debug!(
                ticket = ticket.seq,
                latest = self.latest_seq,
                destination = %ticket.input.destination,
                "eta_result_discarded"
            );
            return false;
        }
        self.display = EtaDisplay::Ready(text);
        true
    }

    pub fn display(&self) -> &EtaDisplay {
        &self.display
    }

    pub fn text(&self) -> Option<&str> {
        match &self.display {
            EtaDisplay::Ready(text) => Some(text),
            EtaDisplay::Idle | EtaDisplay::Loading => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.display == EtaDisplay::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(distance_km: f64) -> EtaRequest {
        EtaRequest {
            distance_km,
            origin: "14.83, 120.28".to_string(),
            destination: "Gordon College ANNEX Campus".to_string(),
        }
    }

    #[test]
    fn late_result_for_superseded_input_is_dropped() {
        let mut board = EtaBoard::new();
        let a = board.begin(input(2.0)).expect("ticket a");
        let b = board.begin(input(3.0)).expect("ticket b");

        assert!(board.complete(&b, "9 min, light".to_string()));
        assert!(!board.complete(&a, "6 min, heavy".to_string()));
        assert_eq!(board.text(), Some("9 min, light"));
    }

    #[test]
    fn early_result_for_superseded_input_is_dropped() {
        let mut board = EtaBoard::new();
        let a = board.begin(input(2.0)).expect("ticket a");
        let b = board.begin(input(3.0)).expect("ticket b");

        assert!(!board.complete(&a, "6 min".to_string()));
        assert!(board.is_loading());
        assert!(board.complete(&b, "9 min".to_string()));
        assert_eq!(board.text(), Some("9 min"));
    }

    #[test]
    fn invalidated_board_drops_pending_result() {
        let mut board = EtaBoard::new();
        let a = board.begin(input(2.0)).expect("ticket a");
        board.invalidate();

        assert!(!board.complete(&a, "6 min".to_string()));
        assert_eq!(board.display(), &EtaDisplay::Idle);
        // The same input is estimated again once it comes back.
        assert!(board.begin(input(2.0)).is_some());
    }

    #[test]
    fn unchanged_input_does_not_issue_a_ticket() {
        let mut board = EtaBoard::new();
        assert!(board.begin(input(2.0)).is_some());
        assert!(board.begin(input(2.0)).is_none());
        assert!(board.begin(input(2.5)).is_some());
    }
}
