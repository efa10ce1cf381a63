//! The notification channel from the hotkeys process.
//!
//! The hotkeys process runs the generated registration script and writes the
//! canonical key of every binding that fires, one per line. There is no
//! request path; each line is handed straight to the [`HotkeyDispatcher`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelKind, LossSender};
use crate::dispatch::HotkeyDispatcher;
use crate::error::Result;
use crate::process::{read_output_line, ProcessHandle};

/// Inbound-only channel carrying hotkey notifications.
pub struct NotificationChannel {
    process: Option<ProcessHandle>,
    reader: JoinHandle<()>,
}

impl NotificationChannel {
    /// Launch the hotkeys process on the generated script.
    pub fn start(
        executable: &Path,
        script: &Path,
        dispatcher: Arc<HotkeyDispatcher>,
        loss: LossSender,
    ) -> Result<Self> {
        let (process, io) = ProcessHandle::spawn("hotkeys", executable, script)?;
        // The script never reads its input.
        drop(io.stdin);
        let mut channel = Self::connect(io.stdout, dispatcher, loss);
        channel.process = Some(process);
        Ok(channel)
    }

    /// Route lines from an already-connected stream.
    pub fn connect<R>(reader: R, dispatcher: Arc<HotkeyDispatcher>, loss: LossSender) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let reader = tokio::spawn(read_notifications(reader, dispatcher, loss));
        Self {
            process: None,
            reader,
        }
    }

    pub fn process(&self) -> Option<&ProcessHandle> {
        self.process.as_ref()
    }

    /// Stop routing and kill the hotkeys process if it is still alive.
    pub fn terminate(&self) {
        self.reader.abort();
        if let Some(process) = &self.process {
            process.terminate();
        }
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("process", &self.process)
            .field("finished", &self.reader.is_finished())
            .finish()
    }
}

async fn read_notifications<R>(reader: R, dispatcher: Arc<HotkeyDispatcher>, loss: LossSender)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        match read_output_line(&mut reader, &mut buf).await {
            Ok(Some(line)) if line.is_empty() => {}
            Ok(Some(line)) => {
                let outcome = dispatcher.dispatch(&line);
                debug!(key = %line, ?outcome, "hotkey notification");
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read hotkeys output");
                break;
            }
        }
    }

    error!(channel = %ChannelKind::Notification, "engine output closed");
    if loss.send(ChannelKind::Notification).is_err() {
        info!("no supervisor listening for channel loss");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::HotkeyAction;
    use tokio::io::{duplex, AsyncWriteExt};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_lines_are_dispatched() {
        let (hit_tx, mut hits) = mpsc::unbounded_channel();
        let dispatcher = HotkeyDispatcher::new();
        let tx = hit_tx.clone();
        dispatcher
            .register(
                "+^a",
                HotkeyAction::new(move || {
                    let tx = tx.clone();
                    async move {
                        tx.send("+^a")?;
                        anyhow::Ok(())
                    }
                }),
                true,
            )
            .unwrap();

        let (mut hotkeys_out, bridge_in) = duplex(256);
        let (loss_tx, _loss) = mpsc::unbounded_channel();
        let _channel = NotificationChannel::connect(bridge_in, Arc::clone(&dispatcher), loss_tx);

        hotkeys_out.write_all(b"F9\n+^a\n").await.unwrap();
        assert_eq!(hits.recv().await, Some("+^a"));
    }

    #[tokio::test]
    async fn test_non_utf8_line_does_not_close_channel() {
        let (hit_tx, mut hits) = mpsc::unbounded_channel();
        let dispatcher = HotkeyDispatcher::new();
        dispatcher
            .register(
                "F2",
                HotkeyAction::new(move || {
                    let tx = hit_tx.clone();
                    async move {
                        tx.send("F2")?;
                        anyhow::Ok(())
                    }
                }),
                true,
            )
            .unwrap();

        let (mut hotkeys_out, bridge_in) = duplex(256);
        let (loss_tx, mut loss) = mpsc::unbounded_channel();
        let _channel = NotificationChannel::connect(bridge_in, Arc::clone(&dispatcher), loss_tx);

        hotkeys_out.write_all(b"\xff\xfe\n\nF2\r\n").await.unwrap();
        assert_eq!(hits.recv().await, Some("F2"));
        assert!(loss.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_eof_reports_loss() {
        let (hotkeys_out, bridge_in) = duplex(64);
        let (loss_tx, mut loss) = mpsc::unbounded_channel();
        let _channel = NotificationChannel::connect(bridge_in, HotkeyDispatcher::new(), loss_tx);

        drop(hotkeys_out);
        assert_eq!(loss.recv().await, Some(ChannelKind::Notification));
    }
}
