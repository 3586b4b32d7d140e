/// State shared between the BMS monitor task and the HTTP handlers
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{ConnectionState, MeasurementSnapshot};

/// Latest snapshot and link state
///
/// The monitor is the only writer. Snapshots are replaced whole, so a
/// reader sees either the previous or the new value, never a mix.
#[derive(Debug, Clone)]
pub struct MonitorState {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    snapshot: watch::Sender<Option<Arc<MeasurementSnapshot>>>,
    connection: watch::Sender<ConnectionState>,
    published: AtomicU64,
}

impl MonitorState {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(None);
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                snapshot,
                connection,
                published: AtomicU64::new(0),
            }),
        }
    }

    /// The latest decoded snapshot, `None` until the first valid frame
    pub fn snapshot(&self) -> Option<Arc<MeasurementSnapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.connection.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// Number of snapshots published since startup
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    pub(crate) fn publish(&self, snapshot: MeasurementSnapshot) {
        self.inner.snapshot.send_replace(Some(Arc::new(snapshot)));
        self.inner.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn clear_snapshot(&self) {
        self.inner.snapshot.send_replace(None);
    }

    pub(crate) fn set_connection(&self, state: ConnectionState) {
        self.inner.connection.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

#[cfg(test)]
impl MonitorState {
    pub(crate) fn subscribe_snapshot(&self) -> watch::Receiver<Option<Arc<MeasurementSnapshot>>> {
        self.inner.snapshot.subscribe()
    }

    pub(crate) fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.subscribe()
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bms::decoder::decode_frame;
    use crate::bms::frame::fixtures::sample_bytes_with_pack_voltage;
    use crate::bms::frame::RawFrame;
    use time::OffsetDateTime;

    fn snapshot_with_pack_voltage(raw: [u8; 3]) -> MeasurementSnapshot {
        let frame = RawFrame::try_from(sample_bytes_with_pack_voltage(raw)).unwrap();
        decode_frame(&frame, OffsetDateTime::now_utc())
    }

    #[test]
    fn starts_empty_and_disconnected() {
        let state = MonitorState::new();
        assert!(state.snapshot().is_none());
        assert_eq!(state.connection_state(), ConnectionState::Disconnected);
        assert!(!state.is_connected());
        assert_eq!(state.published_count(), 0);
    }

    #[test]
    fn publish_replaces_previous_snapshot() {
        let state = MonitorState::new();
        let first = snapshot_with_pack_voltage([0, 100, 0]);
        let second = snapshot_with_pack_voltage([0, 200, 0]);

        state.publish(first);
        state.publish(second.clone());

        assert_eq!(state.snapshot().as_deref(), Some(&second));
        assert_eq!(state.published_count(), 2);

        state.clear_snapshot();
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn connectivity_follows_connection_state() {
        let state = MonitorState::new();
        state.set_connection(ConnectionState::Connecting);
        assert!(!state.is_connected());
        state.set_connection(ConnectionState::Connected);
        assert!(state.is_connected());
        state.set_connection(ConnectionState::Disconnected);
        assert!(!state.is_connected());
    }

    #[test]
    fn concurrent_readers_never_see_mixed_snapshots() {
        let state = MonitorState::new();
        let a = snapshot_with_pack_voltage([0, 100, 0]);
        let mut b = snapshot_with_pack_voltage([0, 200, 0]);
        b.soc = 12;
        b.cell_count = 16;
        b.lowest_cell_temperature = -20;

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let state = state.clone();
                let (a, b) = (&a, &b);
                scope.spawn(move || {
                    for _ in 0..20_000 {
                        if let Some(seen) = state.snapshot() {
                            assert!(*seen == *a || *seen == *b, "mixed snapshot: {:?}", seen);
                        }
                    }
                });
            }

            for i in 0..20_000 {
                let next = if i % 2 == 0 { a.clone() } else { b.clone() };
                state.publish(next);
            }
        });

        assert_eq!(state.published_count(), 20_000);
    }
}
