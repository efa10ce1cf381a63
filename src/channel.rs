//! The command channel to the runner process.
//!
//! Commands are single lines written to the runner's stdin; each produces
//! exactly one line on its stdout. The protocol carries no request ids, so
//! correlation relies on there being at most one command in flight. The
//! channel enforces that: a [`send`](CommandChannel::send) while a response
//! is still outstanding fails with [`AhkError::ChannelBusy`] instead of
//! stealing the earlier caller's response. [`request`](CommandChannel::request)
//! pairs the two halves and queues concurrent callers in FIFO order.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{AhkError, Result};
use crate::process::{read_output_line, ProcessHandle};

/// Which of the two engine channels an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// The runner process executing commands.
    Command,
    /// The hotkeys process emitting notifications.
    Notification,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("runner"),
            Self::Notification => f.write_str("hotkeys"),
        }
    }
}

/// Reports that a channel's output reached end-of-file.
pub type LossSender = mpsc::UnboundedSender<ChannelKind>;

/// Receiving side of [`LossSender`].
pub type LossReceiver = mpsc::UnboundedReceiver<ChannelKind>;

/// The single response slot.
enum Slot {
    Empty,
    Waiting(oneshot::Sender<String>),
    Closed,
}

/// Response slot plus the receiver the requester has not collected yet.
struct Exchange {
    slot: Slot,
    pending: Option<oneshot::Receiver<String>>,
}

impl Exchange {
    fn idle() -> Self {
        Self {
            slot: Slot::Empty,
            pending: None,
        }
    }

    fn armed() -> Self {
        let mut exchange = Self::idle();
        exchange.arm();
        exchange
    }

    fn arm(&mut self) {
        let (tx, rx) = oneshot::channel();
        self.slot = Slot::Waiting(tx);
        self.pending = Some(rx);
    }

    fn is_busy(&self) -> bool {
        matches!(self.slot, Slot::Waiting(_)) || self.pending.is_some()
    }

    fn is_closed(&self) -> bool {
        matches!(self.slot, Slot::Closed)
    }
}

type SharedExchange = Arc<Mutex<Exchange>>;

fn lock(exchange: &SharedExchange) -> std::sync::MutexGuard<'_, Exchange> {
    exchange
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Request/response channel to the runner process.
pub struct CommandChannel {
    writer: tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    exchange: SharedExchange,
    round_trip: tokio::sync::Mutex<()>,
    process: Option<ProcessHandle>,
    reader: JoinHandle<()>,
}

impl CommandChannel {
    /// Launch the runner and perform the working-directory handshake.
    ///
    /// The slot is armed for the initialization payload the runner sends
    /// unprompted; collect it with [`await_response`](Self::await_response).
    pub async fn start(
        executable: &Path,
        script: &Path,
        working_dir: &Path,
        loss: LossSender,
    ) -> Result<Self> {
        let (process, io) = ProcessHandle::spawn("runner", executable, script)?;
        let mut channel = Self::with_exchange(io.stdout, io.stdin, loss, Exchange::armed());
        channel.process = Some(process);
        channel.handshake(working_dir).await?;
        Ok(channel)
    }

    /// Wrap already-connected streams. No response is expected until the first `send`.
    pub fn connect<R, W>(reader: R, writer: W, loss: LossSender) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_exchange(reader, writer, loss, Exchange::idle())
    }

    /// Wrap already-connected streams whose first output line is an unsolicited greeting.
    pub fn connect_with_greeting<R, W>(reader: R, writer: W, loss: LossSender) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_exchange(reader, writer, loss, Exchange::armed())
    }

    fn with_exchange<R, W>(reader: R, writer: W, loss: LossSender, exchange: Exchange) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let exchange = Arc::new(Mutex::new(exchange));
        let reader = tokio::spawn(read_responses(reader, Arc::clone(&exchange), loss));
        Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            exchange,
            round_trip: tokio::sync::Mutex::new(()),
            process: None,
            reader,
        }
    }

    /// Write the working directory as the first input line, as the runner script expects.
    pub async fn handshake(&self, working_dir: &Path) -> Result<()> {
        let dir = working_dir.display().to_string();
        debug!(working_dir = %dir, "sending handshake");
        self.write_line(&dir).await
    }

    /// Write one command line and arm the response slot.
    ///
    /// Fails with [`AhkError::ChannelBusy`] if the previous command's
    /// response has not been collected yet.
    pub async fn send(&self, command: &str) -> Result<()> {
        check_framing(command)?;
        {
            let mut exchange = lock(&self.exchange);
            if exchange.is_closed() {
                return Err(AhkError::channel_closed(ChannelKind::Command.to_string()));
            }
            if exchange.is_busy() {
                return Err(AhkError::channel_busy(command));
            }
            exchange.arm();
        }

        debug!(command, "sending command");
        if let Err(e) = self.write_line(command).await {
            let mut exchange = lock(&self.exchange);
            if !exchange.is_closed() {
                *exchange = Exchange::idle();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Wait for the line answering the last `send`.
    pub async fn await_response(&self) -> Result<String> {
        let rx = lock(&self.exchange)
            .pending
            .take()
            .ok_or(AhkError::NoPendingRequest)?;
        rx.await
            .map_err(|_| AhkError::channel_closed(ChannelKind::Command.to_string()))
    }

    /// Send a command and wait for its response.
    ///
    /// Concurrent callers take turns in the order they called.
    pub async fn request(&self, command: &str) -> Result<String> {
        let _turn = self.round_trip.lock().await;
        self.send(command).await?;
        let response = self.await_response().await?;
        debug!(command, response = %response, "command completed");
        Ok(response)
    }

    /// Write a command that produces no response.
    ///
    /// Waits for any in-flight request to finish first so the line cannot
    /// land between a command and its response.
    pub async fn notify(&self, command: &str) -> Result<()> {
        check_framing(command)?;
        let _turn = self.round_trip.lock().await;
        {
            let exchange = lock(&self.exchange);
            if exchange.is_closed() {
                return Err(AhkError::channel_closed(ChannelKind::Command.to_string()));
            }
            if exchange.is_busy() {
                return Err(AhkError::channel_busy(command));
            }
        }
        debug!(command, "sending command without response");
        self.write_line(command).await
    }

    /// Whether a response is still outstanding.
    pub fn is_busy(&self) -> bool {
        lock(&self.exchange).is_busy()
    }

    /// Whether the runner's output has ended.
    pub fn is_closed(&self) -> bool {
        lock(&self.exchange).is_closed()
    }

    pub fn process(&self) -> Option<&ProcessHandle> {
        self.process.as_ref()
    }

    /// Stop reading and kill the runner if it is still alive.
    pub fn terminate(&self) {
        self.reader.abort();
        lock(&self.exchange).slot = Slot::Closed;
        if let Some(process) = &self.process {
            process.terminate();
        }
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

impl Drop for CommandChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl fmt::Debug for CommandChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandChannel")
            .field("busy", &self.is_busy())
            .field("closed", &self.is_closed())
            .field("process", &self.process)
            .finish()
    }
}

fn check_framing(command: &str) -> Result<()> {
    if command.contains(['\n', '\r']) {
        return Err(AhkError::invalid_command(
            command,
            "commands must fit on a single line",
        ));
    }
    Ok(())
}

/// Hand each output line to whoever is waiting; report end-of-file as channel loss.
async fn read_responses<R>(reader: R, exchange: SharedExchange, loss: LossSender)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        match read_output_line(&mut reader, &mut buf).await {
            Ok(Some(line)) => deliver(&exchange, line),
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read runner output");
                break;
            }
        }
    }

    // Dropping a waiting sender wakes its requester with a closed-channel error.
    lock(&exchange).slot = Slot::Closed;
    error!(channel = %ChannelKind::Command, "engine output closed");
    if loss.send(ChannelKind::Command).is_err() {
        info!("no supervisor listening for channel loss");
    }
}

fn deliver(exchange: &SharedExchange, line: String) {
    let mut exchange = lock(exchange);
    match std::mem::replace(&mut exchange.slot, Slot::Empty) {
        Slot::Waiting(tx) => {
            debug!(response = %line, "received response");
            if tx.send(line).is_err() {
                debug!("requester stopped waiting for its response");
            }
        }
        Slot::Empty => debug!(line = %line, "dropping unsolicited runner output"),
        Slot::Closed => exchange.slot = Slot::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    struct Harness {
        channel: CommandChannel,
        engine_in: tokio::io::Lines<BufReader<DuplexStream>>,
        engine_out: DuplexStream,
        loss: LossReceiver,
    }

    fn harness() -> Harness {
        let (to_engine, from_bridge) = duplex(1024);
        let (to_bridge, from_engine) = duplex(1024);
        let (loss_tx, loss) = mpsc::unbounded_channel();
        Harness {
            channel: CommandChannel::connect(from_engine, to_engine, loss_tx),
            engine_in: BufReader::new(from_bridge).lines(),
            engine_out: to_bridge,
            loss,
        }
    }

    #[tokio::test]
    async fn test_send_then_response() {
        let mut h = harness();
        h.channel.send("click;100 100 L  ;2").await.unwrap();
        assert_eq!(
            h.engine_in.next_line().await.unwrap().unwrap(),
            "click;100 100 L  ;2"
        );
        h.engine_out.write_all(b"1\n").await.unwrap();
        assert_eq!(h.channel.await_response().await.unwrap(), "1");
        assert!(!h.channel.is_busy());
    }

    #[tokio::test]
    async fn test_second_send_is_rejected() {
        let h = harness();
        h.channel.send("getMousePos").await.unwrap();
        let err = h.channel.send("getClipboard").await.unwrap_err();
        assert!(matches!(err, AhkError::ChannelBusy { .. }));
    }

    #[tokio::test]
    async fn test_await_without_send() {
        let h = harness();
        let err = h.channel.await_response().await.unwrap_err();
        assert!(matches!(err, AhkError::NoPendingRequest));
    }

    #[tokio::test]
    async fn test_sequential_requests_are_correlated() {
        let Harness {
            channel,
            mut engine_in,
            mut engine_out,
            ..
        } = harness();
        let engine = tokio::spawn(async move {
            let mut seen = Vec::new();
            for reply in ["first", "second"] {
                seen.push(engine_in.next_line().await.unwrap().unwrap());
                engine_out
                    .write_all(format!("{}\n", reply).as_bytes())
                    .await
                    .unwrap();
            }
            seen
        });

        assert_eq!(channel.request("one").await.unwrap(), "first");
        assert_eq!(channel.request("two").await.unwrap(), "second");
        assert_eq!(engine.await.unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_unsolicited_output_is_dropped() {
        let mut h = harness();
        h.engine_out.write_all(b"stray\n").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        h.channel.send("getClipboard").await.unwrap();
        h.engine_in.next_line().await.unwrap();
        h.engine_out.write_all(b"clip\n").await.unwrap();
        assert_eq!(h.channel.await_response().await.unwrap(), "clip");
    }

    #[tokio::test]
    async fn test_eof_fails_waiter_and_reports_loss() {
        let mut h = harness();
        h.channel.send("getMousePos").await.unwrap();
        drop(h.engine_out);

        let err = h.channel.await_response().await.unwrap_err();
        assert!(matches!(err, AhkError::ChannelClosed { .. }));
        assert_eq!(h.loss.recv().await, Some(ChannelKind::Command));
        assert!(h.channel.is_closed());

        let err = h.channel.send("getMousePos").await.unwrap_err();
        assert!(matches!(err, AhkError::ChannelClosed { .. }));
    }

    #[tokio::test]
    async fn test_greeting_is_captured() {
        let (to_engine, _from_bridge) = duplex(1024);
        let (mut to_bridge, from_engine) = duplex(1024);
        let (loss_tx, _loss) = mpsc::unbounded_channel();
        to_bridge
            .write_all(b"{\"width\":800,\"height\":600}\n")
            .await
            .unwrap();

        let channel = CommandChannel::connect_with_greeting(from_engine, to_engine, loss_tx);
        assert!(channel.is_busy());
        assert_eq!(
            channel.await_response().await.unwrap(),
            "{\"width\":800,\"height\":600}"
        );
    }

    #[tokio::test]
    async fn test_non_utf8_response_is_delivered() {
        let mut h = harness();
        h.channel.send("getClipboard").await.unwrap();
        h.engine_in.next_line().await.unwrap();
        h.engine_out.write_all(b"caf\xe9\r\n").await.unwrap();

        assert_eq!(h.channel.await_response().await.unwrap(), "caf\u{FFFD}");
        assert!(!h.channel.is_closed());
        assert!(h.loss.try_recv().is_err());

        h.channel.send("getMousePos").await.unwrap();
        h.engine_out.write_all(b"1 2\n").await.unwrap();
        assert_eq!(h.channel.await_response().await.unwrap(), "1 2");
    }

    #[tokio::test]
    async fn test_empty_response_is_delivered() {
        let mut h = harness();
        h.channel.send("pixelSearch;0;0;9;9;0xFFFFFF;1").await.unwrap();
        h.engine_out.write_all(b"\n").await.unwrap();
        assert_eq!(h.channel.await_response().await.unwrap(), "");
        assert!(!h.channel.is_busy());
    }

    #[tokio::test]
    async fn test_multiline_command_rejected() {
        let h = harness();
        let err = h.channel.send("send;a\nb").await.unwrap_err();
        assert!(matches!(err, AhkError::InvalidCommand { .. }));
        assert!(!h.channel.is_busy());
    }
}
