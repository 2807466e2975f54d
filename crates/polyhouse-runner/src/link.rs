//! In-memory radio link.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use polyhouse_node::{RadioError, RadioLink};

/// One end of a point-to-point link carrying whole frames.
#[derive(Debug, Clone)]
pub struct RadioChannels {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

impl RadioChannels {
    /// Create both ends of a link.
    pub fn new_pair() -> (Self, Self) {
        let (a_tx, b_rx) = crossbeam_channel::unbounded();
        let (b_tx, a_rx) = crossbeam_channel::unbounded();
        (
            RadioChannels { tx: a_tx, rx: a_rx },
            RadioChannels { tx: b_tx, rx: b_rx },
        )
    }

    /// Frames waiting to be received on this end.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl RadioLink for RadioChannels {
    fn send(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        self.tx
            .send(frame.to_vec())
            .map_err(|_| RadioError::Disconnected)
    }

    fn try_recv(&mut self) -> Option<Vec<u8>> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_bidirectional_and_ordered() {
        let (mut node, mut gateway) = RadioChannels::new_pair();

        for i in 0..5u8 {
            gateway.send(&[i]).unwrap();
        }
        assert_eq!(node.pending(), 5);
        for i in 0..5u8 {
            assert_eq!(node.try_recv(), Some(vec![i]));
        }
        assert_eq!(node.try_recv(), None);

        node.send(b"1011").unwrap();
        assert_eq!(gateway.try_recv(), Some(b"1011".to_vec()));
    }

    #[test]
    fn test_send_to_dropped_peer_fails() {
        let (mut node, gateway) = RadioChannels::new_pair();
        drop(gateway);
        assert_eq!(node.send(b"10"), Err(RadioError::Disconnected));
        assert_eq!(node.try_recv(), None);
    }
}
