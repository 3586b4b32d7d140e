/// Connection lifecycle for the BMS serial link
///
/// The monitor opens the byte source, feeds every received byte through
/// the stream synchronizer and publishes decoded snapshots. Any open or
/// read failure drops the port and starts over; only a shutdown signal
/// ends the loop.
use std::io;

use log::{debug, info, warn};
use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Duration, Instant};

use super::decoder::decode_frame;
use super::source::{open_failure_kind, ByteSource};
use super::sync::StreamSynchronizer;
use crate::config::LinkSettings;
use crate::models::ConnectionState;
use crate::state::MonitorState;

pub struct BmsMonitor<S: ByteSource> {
    source: S,
    state: MonitorState,
    settings: LinkSettings,
    synchronizer: StreamSynchronizer,
    stream: Option<S::Stream>,
}

impl<S: ByteSource> BmsMonitor<S> {
    pub fn new(source: S, state: MonitorState, settings: LinkSettings) -> Self {
        let synchronizer = StreamSynchronizer::new(settings.inactivity_gap);
        Self {
            source,
            state,
            settings,
            synchronizer,
            stream: None,
        }
    }

    /// Keep the link up until `shutdown` flips to true
    ///
    /// A dropped shutdown sender is treated the same as a shutdown request.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting BMS monitor on {}", self.source.describe());

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = self.connect() => {}
            }

            let err = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                err = self.pump() => err,
            };

            warn!(
                "Lost connection to {}: {}. Reconnecting...",
                self.source.describe(),
                err
            );
            self.disconnect();
        }

        self.disconnect();
        info!("BMS monitor stopped");
    }

    /// Open the byte source, retrying after every failure
    ///
    /// Only returns once the port is open. Connectivity stays false while
    /// attempts keep failing.
    pub async fn connect(&mut self) {
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            self.state.set_connection(ConnectionState::Connecting);
            debug!(
                "Attempting to open port {} (attempt {})",
                self.source.describe(),
                attempts
            );

            match self.source.open() {
                Ok(stream) => {
                    self.stream = Some(stream);
                    self.synchronizer.reset();
                    self.state.set_connection(ConnectionState::Connected);
                    info!("Connected to {}", self.source.describe());
                    return;
                }
                Err(e) => {
                    warn!(
                        "Failed to open port {} ({}): {}. Retrying in {:?}...",
                        self.source.describe(),
                        open_failure_kind(&e),
                        e,
                        self.settings.retry_delay
                    );
                    sleep(self.settings.retry_delay).await;
                }
            }
        }
    }

    /// Release the port if one is open
    ///
    /// Safe to call any number of times, also before the first connect.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            let stats = self.synchronizer.stats();
            info!(
                "Disconnected from {} ({} frames, {} checksum failures, {} resyncs, {} published in total)",
                self.source.describe(),
                stats.frames,
                stats.checksum_failures,
                stats.resyncs,
                self.state.published_count()
            );
        }

        self.state.set_connection(ConnectionState::Disconnected);
        if self.settings.clear_on_disconnect {
            self.state.clear_snapshot();
        }
    }

    /// Read bytes until the stream fails, publishing every valid frame
    async fn pump(&mut self) -> io::Error {
        let Some(stream) = self.stream.as_mut() else {
            return io::Error::new(io::ErrorKind::NotConnected, "port is not open");
        };

        loop {
            let byte = match read_byte(stream, self.settings.read_timeout).await {
                Ok(byte) => byte,
                Err(e) => return e,
            };

            if let Some(frame) = self.synchronizer.push(byte, Instant::now()) {
                let snapshot = decode_frame(&frame, OffsetDateTime::now_utc());
                debug!(
                    "Frame decoded: {:.2} V, {:.1} A, SOC {}%",
                    snapshot.pack_voltage, snapshot.pack_current, snapshot.soc
                );
                self.state.publish(snapshot);
            }
        }
    }
}

async fn read_byte<R>(stream: &mut R, limit: Option<Duration>) -> io::Result<u8>
where
    R: AsyncRead + Unpin,
{
    match limit {
        Some(limit) => timeout(limit, stream.read_u8()).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no data received for {:?}", limit),
            )
        })?,
        None => stream.read_u8().await,
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
