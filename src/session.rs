//! Session lifecycle: open, initialized, running, terminated.
//!
//! A [`Session`] owns both engine channels, the hotkey dispatcher and the
//! screen geometry learned during the handshake. It is shared as an
//! `Arc<Session>` with the automation facade and torn down either explicitly
//! via [`Session::shutdown`], when it is dropped, when either engine process
//! goes away, or on Ctrl-C.

use std::sync::{Arc, Weak};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::action::HotkeyAction;
use crate::channel::{ChannelKind, CommandChannel, LossReceiver};
use crate::config::Config;
use crate::dispatch::HotkeyDispatcher;
use crate::error::{AhkError, Result};
use crate::geometry::Geometry;
use crate::hotkey::{registration_script, HotkeyDescriptor};
use crate::notification::NotificationChannel;

/// Exit status used when an engine channel is lost.
const CHANNEL_LOSS_EXIT_CODE: i32 = 1;
/// Exit status used after Ctrl-C.
const INTERRUPT_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Channels are up, waiting for the initialization payload.
    Open,
    /// Geometry is known.
    Initialized,
    /// Supervisors are installed and commands may be issued.
    Running,
    /// Both engine processes have been terminated.
    Terminated,
}

#[derive(Debug)]
pub struct Session {
    config: Config,
    geometry: Geometry,
    commands: CommandChannel,
    notifications: NotificationChannel,
    dispatcher: Arc<HotkeyDispatcher>,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// Start both engine processes and complete the handshake.
    pub async fn open(config: Config) -> Result<Arc<Self>> {
        config.validate()?;
        let dispatcher = HotkeyDispatcher::new();
        dispatcher.register_bulk(&config.hotkeys)?;

        let script_path = config.hotkey_script_path();
        tokio::fs::write(&script_path, registration_script(&config.hotkeys)).await?;
        debug!(
            path = %script_path.display(),
            hotkeys = config.hotkeys.len(),
            "wrote hotkeys script"
        );

        let (loss_tx, loss_rx) = mpsc::unbounded_channel();
        let working_dir = config.working_dir()?;
        let commands = CommandChannel::start(
            &config.executable,
            &config.runner_script(),
            &working_dir,
            loss_tx.clone(),
        )
        .await?;
        let notifications = NotificationChannel::start(
            &config.executable,
            &script_path,
            Arc::clone(&dispatcher),
            loss_tx,
        )?;

        Self::establish(config, commands, notifications, dispatcher, loss_rx).await
    }

    /// Run the same lifecycle over streams connected to an engine started elsewhere.
    ///
    /// `command_output`/`command_input` are the runner's stdout/stdin and
    /// `notification_output` is the hotkeys process's stdout.
    pub async fn attach<CR, CW, NR>(
        config: Config,
        command_output: CR,
        command_input: CW,
        notification_output: NR,
    ) -> Result<Arc<Self>>
    where
        CR: AsyncRead + Send + Unpin + 'static,
        CW: AsyncWrite + Send + Unpin + 'static,
        NR: AsyncRead + Send + Unpin + 'static,
    {
        config.validate()?;
        let dispatcher = HotkeyDispatcher::new();
        dispatcher.register_bulk(&config.hotkeys)?;

        let (loss_tx, loss_rx) = mpsc::unbounded_channel();
        let commands =
            CommandChannel::connect_with_greeting(command_output, command_input, loss_tx.clone());
        commands.handshake(&config.working_dir()?).await?;
        let notifications =
            NotificationChannel::connect(notification_output, Arc::clone(&dispatcher), loss_tx);

        Self::establish(config, commands, notifications, dispatcher, loss_rx).await
    }

    async fn establish(
        config: Config,
        commands: CommandChannel,
        notifications: NotificationChannel,
        dispatcher: Arc<HotkeyDispatcher>,
        loss_rx: LossReceiver,
    ) -> Result<Arc<Self>> {
        let (state, _) = watch::channel(SessionState::Open);

        // Dropping the channels on error kills both processes.
        let greeting = commands
            .await_response()
            .await
            .map_err(|e| AhkError::handshake(e.to_string()))?;
        let geometry = Geometry::from_handshake(&greeting)?;
        state.send_replace(SessionState::Initialized);
        info!(
            width = geometry.width,
            height = geometry.height,
            "session initialized"
        );

        let session = Arc::new(Self {
            config,
            geometry,
            commands,
            notifications,
            dispatcher,
            state,
        });

        spawn_loss_supervisor(Arc::downgrade(&session), loss_rx);
        if session.config.handle_interrupt {
            spawn_interrupt_handler(Arc::downgrade(&session), session.state.subscribe());
        }

        session.state.send_replace(SessionState::Running);
        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn commands(&self) -> &CommandChannel {
        &self.commands
    }

    pub fn dispatcher(&self) -> &Arc<HotkeyDispatcher> {
        &self.dispatcher
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Resolves once the session has been terminated.
    pub async fn terminated(&self) {
        let mut rx = self.state.subscribe();
        if rx.wait_for(|s| *s == SessionState::Terminated).await.is_err() {
            debug!("session state sender dropped");
        }
    }

    /// Create a hotkey binding in the running engine and attach an action to it.
    ///
    /// Returns the canonical key notifications will arrive under.
    pub async fn register_hotkey(
        &self,
        descriptor: impl Into<HotkeyDescriptor>,
        action: HotkeyAction,
        instant: bool,
    ) -> Result<String> {
        self.ensure_running()?;
        let descriptor = descriptor.into();
        let key = descriptor.canonical_key();
        if key.trim().is_empty() {
            return Err(AhkError::invalid_action(key, "hotkey key is empty"));
        }
        descriptor.validate()?;

        self.commands
            .request(&descriptor.registration_command())
            .await?;
        self.dispatcher.register(key.clone(), action, instant)?;
        info!(key = %key, instant, "registered hotkey");
        Ok(key)
    }

    /// Attach an action to a key already bound by the startup script.
    pub fn set_hotkey_action(
        &self,
        key: impl Into<String>,
        action: HotkeyAction,
        instant: bool,
    ) -> Result<()> {
        self.ensure_running()?;
        let key = key.into();
        if !self.dispatcher.is_registered(&key) {
            warn!(key = %key, "hotkey is not bound by the startup script");
        }
        self.dispatcher.register(key, action, instant)
    }

    /// Terminate both engine processes. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let previous = self.state.send_replace(SessionState::Terminated);
        if previous == SessionState::Terminated {
            return;
        }
        info!("shutting down session");
        self.commands.terminate();
        self.notifications.terminate();
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state() {
            SessionState::Terminated => Err(AhkError::SessionTerminated),
            _ => Ok(()),
        }
    }

    fn on_channel_loss(&self, kind: ChannelKind) {
        if self.state() == SessionState::Terminated {
            debug!(channel = %kind, "channel closed during shutdown");
            return;
        }
        error!(channel = %kind, "engine process exited, shutting down");
        self.shutdown();
        if self.config.exit_on_channel_loss {
            std::process::exit(CHANNEL_LOSS_EXIT_CODE);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_loss_supervisor(session: Weak<Session>, mut loss_rx: LossReceiver) {
    tokio::spawn(async move {
        let Some(kind) = loss_rx.recv().await else {
            return;
        };
        if let Some(session) = session.upgrade() {
            session.on_channel_loss(kind);
        }
    });
}

fn spawn_interrupt_handler(session: Weak<Session>, state: watch::Receiver<SessionState>) {
    tokio::spawn(async move {
        if !wait_for_interrupt(state).await {
            return;
        }
        let Some(session) = session.upgrade() else {
            debug!("interrupt received after session was dropped");
            return;
        };
        info!("interrupt received");
        session.shutdown();
        std::process::exit(INTERRUPT_EXIT_CODE);
    });
}

/// Wait for Ctrl-C. Returns false if the session terminates first.
async fn wait_for_interrupt(mut state: watch::Receiver<SessionState>) -> bool {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl-C");
                false
            }
        },
        _ = state.wait_for(|s| *s == SessionState::Terminated) => {
            debug!("session terminated, no longer watching for Ctrl-C");
            false
        }
    }
}
