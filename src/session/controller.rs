//! Session controller
//!
//! The controller owns the [`Session`] and is the only component that
//! opens connections. All of its work happens on one task: commands from
//! [`SessionHandle`], events from the current protocol client and tunnel,
//! and timer/clipboard completions are multiplexed with `tokio::select!`
//! and handled one at a time.
//!
//! Each connection attempt gets a fresh tunnel and protocol client. When an
//! attempt fails, its client is disconnected and its event channels are
//! dropped before the next attempt is scheduled, so a stale client can
//! neither report into a later attempt nor count the same failure twice.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::clipboard::{receive_remote, ClipboardBridge, ClipboardValue, LocalClipboard};
use crate::display::{DisplayHost, DisplaySurfaceHost};
use crate::error::{ClipboardResult, SessionError, SessionResult};
use crate::input::{InputBridge, InputEvent};
use crate::protocol::{
    AudioInput, ProtocolBinding, ProtocolClient, ProtocolEvent, ProtocolFactory,
    AUDIO_INPUT_MIMETYPE,
};
use crate::session::policy::{retry_message, ReconnectDecision};
use crate::session::state::{ConnectionState, SessionStateMachine};
use crate::session::types::{Session, SessionSettings, SessionStatus};
use crate::timer::DelayedTask;
use crate::tunnel::{HandshakeParams, Tunnel, TunnelStatus};

/// Requests sent to a running controller
#[derive(Debug)]
pub enum SessionCommand {
    /// Local input to forward
    Input(InputEvent),
    /// The host window was resized
    Resize,
    /// The host window gained focus
    Focus,
    /// Tear the session down
    Shutdown,
}

/// Completions posted back into the event loop
#[derive(Debug)]
enum InternalEvent {
    ReconnectDue,
    LocalClipboard(ClipboardResult<String>),
    RemoteClipboard(ClipboardResult<ClipboardValue>),
}

/// Cloneable handle to a running session
///
/// Dropping every handle tears the session down.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    fn send(&self, command: SessionCommand) -> SessionResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Forwards local input to the remote end
    pub fn send_input(&self, event: InputEvent) -> SessionResult<()> {
        self.send(SessionCommand::Input(event))
    }

    /// Reports a host window resize
    pub fn notify_resize(&self) -> SessionResult<()> {
        self.send(SessionCommand::Resize)
    }

    /// Reports that the host window gained focus
    pub fn notify_focus(&self) -> SessionResult<()> {
        self.send(SessionCommand::Focus)
    }

    /// Requests teardown
    pub fn shutdown(&self) -> SessionResult<()> {
        self.send(SessionCommand::Shutdown)
    }

    /// Subscribes to status updates
    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Returns the latest status
    pub fn current_status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }
}

/// Drives one remote access session
pub struct SessionController {
    id: Uuid,
    settings: SessionSettings,
    session: Session,
    state: SessionStateMachine,

    factory: Box<dyn ProtocolFactory>,
    client: Option<Box<dyn ProtocolClient>>,
    protocol_events: Option<mpsc::UnboundedReceiver<ProtocolEvent>>,
    tunnel_status: Option<mpsc::UnboundedReceiver<TunnelStatus>>,
    generation: u64,

    display: DisplaySurfaceHost,
    input: InputBridge,
    clipboard: ClipboardBridge,
    local_clipboard: Arc<dyn LocalClipboard>,
    audio: Option<Box<dyn AudioInput>>,

    reconnect_timer: Option<DelayedTask>,
    shutdown: CancellationToken,

    commands: mpsc::UnboundedReceiver<SessionCommand>,
    internal_tx: mpsc::UnboundedSender<InternalEvent>,
    internal_rx: mpsc::UnboundedReceiver<InternalEvent>,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionController {
    /// Creates a controller and the handle used to drive it
    pub fn new(
        settings: SessionSettings,
        factory: Box<dyn ProtocolFactory>,
        display_host: Box<dyn DisplayHost>,
        local_clipboard: Arc<dyn LocalClipboard>,
    ) -> (Self, SessionHandle) {
        let session = Session::new(settings.token.clone(), settings.endpoint_name.clone());
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) =
            watch::channel(SessionStatus::from_session(&session, &settings.brand_title));

        let controller = Self {
            id: Uuid::new_v4(),
            settings,
            session,
            state: SessionStateMachine::new(),
            factory,
            client: None,
            protocol_events: None,
            tunnel_status: None,
            generation: 0,
            display: DisplaySurfaceHost::new(display_host),
            input: InputBridge::new(),
            clipboard: ClipboardBridge::new(),
            local_clipboard,
            audio: None,
            reconnect_timer: None,
            shutdown: CancellationToken::new(),
            commands,
            internal_tx,
            internal_rx,
            status_tx,
        };

        let handle = SessionHandle {
            commands: command_tx,
            status: status_rx,
        };

        (controller, handle)
    }

    /// Sets the local audio source used when audio input is enabled
    pub fn with_audio_input(mut self, audio: Box<dyn AudioInput>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Returns the session id used in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Runs the session until shutdown, returning its final state
    pub async fn run(self) -> Session {
        let span = info_span!("rac_session", id = %self.id);
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) -> Session {
        self.start();
        self.publish();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                event = recv_opt(&mut self.protocol_events) => self.handle_protocol_event(event),
                status = recv_opt(&mut self.tunnel_status) => self.handle_tunnel_status(status),
                Some(event) = self.internal_rx.recv() => self.handle_internal(event),
            }
            self.publish();
        }

        self.teardown();
        self.session
    }

    fn start(&mut self) {
        info!("Starting session ({})", self.session.title(&self.settings.brand_title));

        if self.settings.clipboard_enabled {
            let tx = self.internal_tx.clone();
            self.clipboard.start_polling(
                Arc::clone(&self.local_clipboard),
                self.settings.clipboard_poll_interval,
                &self.shutdown,
                move |result| {
                    let _ = tx.send(InternalEvent::LocalClipboard(result));
                },
            );
        }

        self.connect();
    }

    fn connect(&mut self) {
        self.generation += 1;
        debug!("Connection attempt {}", self.generation);

        let url = match self.settings.gateway.tunnel_url(&self.settings.token) {
            Ok(url) => url,
            Err(e) => {
                self.reconnect(SessionError::Transport(e));
                return;
            }
        };

        let (mut tunnel, tunnel_status) = Tunnel::new(url);
        tunnel.set_receive_timeout(self.settings.receive_timeout);

        // Both channels exist before connect is issued
        let ProtocolBinding { mut client, events } = self.factory.build(tunnel);
        self.protocol_events = Some(events);
        self.tunnel_status = Some(tunnel_status);

        let (width, height) = self.display.viewport_size();
        let params = HandshakeParams::new(width, height);
        self.set_state(ConnectionState::Connecting);

        let result = client.connect(&params.encode());
        self.client = Some(client);

        if let Err(e) = result {
            self.reconnect(SessionError::Client(e));
        }
    }

    fn reconnect(&mut self, cause: SessionError) {
        if self.state.is_failed() {
            return;
        }
        warn!("Connection lost: {}", cause);

        self.drop_connection();
        if let Err(e) = self.state.clear() {
            warn!("{}", e);
            return;
        }

        self.session.connection_attempt += 1;
        let attempt = self.session.connection_attempt;

        match self
            .settings
            .reconnect
            .decide(attempt, self.session.has_connected_once)
        {
            ReconnectDecision::GiveUp { attempts } => {
                if !self.session.has_connected_once {
                    self.session.has_connected_once = true;
                }
                let failure = SessionError::ReconnectExhausted { attempts };
                error!("{}", failure);
                self.session.status_message = Some(failure.to_string());
                self.set_state(ConnectionState::Failed);
                self.reconnect_timer = None;
            }
            ReconnectDecision::Retry { delay } => {
                let message = retry_message(delay);
                info!("Attempt {} failed. {}", attempt, message);
                self.session.status_message = Some(message);

                let tx = self.internal_tx.clone();
                self.reconnect_timer = Some(DelayedTask::spawn(delay, &self.shutdown, move || {
                    let _ = tx.send(InternalEvent::ReconnectDue);
                }));
            }
        }
    }

    fn drop_connection(&mut self) {
        self.protocol_events = None;
        self.tunnel_status = None;
        if let Some(mut client) = self.client.take() {
            client.disconnect();
        }
    }

    fn set_state(&mut self, to: ConnectionState) {
        if let Err(e) = self.state.transition(to) {
            warn!("Ignoring state change: {}", e);
        }
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Input(event) => match self.client.as_mut() {
                Some(client) => {
                    self.input.forward(event, client.as_mut(), &mut self.display);
                }
                None => trace!("Dropping input, no protocol client"),
            },
            SessionCommand::Resize => {
                if let Some(client) = self.client.as_mut() {
                    self.display.resize(client.as_mut());
                }
            }
            SessionCommand::Focus => self.check_clipboard(),
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_protocol_event(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::StateChanged(state) => self.on_protocol_state(state),
            ProtocolEvent::Error(status) => {
                debug!("Protocol error {}: {:?}", status.code, status.message);
                self.session.last_error_message = status.message.clone();
                let message = status
                    .message
                    .unwrap_or_else(|| format!("Error {}", status.code));
                self.reconnect(SessionError::Protocol {
                    code: status.code,
                    message,
                });
            }
            ProtocolEvent::Clipboard { mimetype, stream } => {
                if !self.settings.clipboard_enabled {
                    debug!("Clipboard sync disabled, ignoring {} stream", mimetype);
                    return;
                }

                self.clipboard.begin_remote_write();
                let clipboard = Arc::clone(&self.local_clipboard);
                let tx = self.internal_tx.clone();
                let token = self.shutdown.child_token();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        result = receive_remote(mimetype, stream, clipboard) => {
                            let _ = tx.send(InternalEvent::RemoteClipboard(result));
                        }
                    }
                });
            }
            ProtocolEvent::AudioInputClosed => {
                if self.state.is_connected() {
                    debug!("Audio input stream closed, reopening");
                    self.open_audio_input();
                }
            }
        }
    }

    fn on_protocol_state(&mut self, state: ConnectionState) {
        if self.state.current() == Some(state) {
            return;
        }

        match state {
            ConnectionState::Connected => self.on_connected(),
            ConnectionState::Failed => {
                warn!("Ignoring Failed state reported by the protocol client")
            }
            other => {
                debug!("Protocol state: {}", other);
                self.set_state(other);
            }
        }
    }

    fn on_connected(&mut self) {
        if let Err(e) = self.state.transition(ConnectionState::Connected) {
            warn!("Ignoring state change: {}", e);
            return;
        }
        info!("Connected");

        self.session.has_connected_once = true;
        self.session.connection_attempt = 0;
        self.session.status_message = None;
        self.session.last_error_message = None;

        if let Some(client) = self.client.as_mut() {
            self.display.attach(self.generation, &**client);
            self.input.attach_mouse();
            self.display.resize(client.as_mut());
        }

        self.open_audio_input();
    }

    fn open_audio_input(&mut self) {
        if !self.settings.audio_input_enabled {
            return;
        }
        let (Some(audio), Some(client)) = (self.audio.as_mut(), self.client.as_mut()) else {
            return;
        };

        let stream = client.create_audio_stream(AUDIO_INPUT_MIMETYPE);
        if let Err(mut stream) = audio.attach(stream) {
            debug!("Audio input unavailable, closing stream");
            if let Err(e) = stream.end() {
                debug!("Failed to close audio stream: {}", e);
            }
        }
    }

    fn handle_tunnel_status(&mut self, status: TunnelStatus) {
        match status {
            TunnelStatus::Open => debug!("Tunnel open"),
            TunnelStatus::Error(e) => self.reconnect(SessionError::Transport(e)),
            TunnelStatus::Closed => info!("Tunnel closed"),
        }
    }

    fn handle_internal(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::ReconnectDue => {
                self.reconnect_timer = None;
                if self.state.current().is_none() {
                    self.connect();
                }
            }
            InternalEvent::LocalClipboard(result) => {
                // The remote end only accepts clipboard data while live
                if !self.state.is_connected() {
                    return;
                }
                let Some(value) = self.clipboard.handle_local_read(result) else {
                    return;
                };
                if let Some(client) = self.client.as_mut() {
                    if let Err(e) = ClipboardBridge::send_outbound(client.as_mut(), &value) {
                        warn!("Failed to send clipboard: {}", e);
                    }
                }
            }
            InternalEvent::RemoteClipboard(result) => self.clipboard.finish_remote_write(result),
        }
    }

    fn check_clipboard(&mut self) {
        if !self.settings.clipboard_enabled {
            return;
        }

        let clipboard = Arc::clone(&self.local_clipboard);
        let tx = self.internal_tx.clone();
        let token = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = clipboard.read_text() => {
                    let _ = tx.send(InternalEvent::LocalClipboard(result));
                }
            }
        });
    }

    fn teardown(&mut self) {
        info!("Tearing down session");

        self.shutdown.cancel();
        self.clipboard.stop_polling();
        self.reconnect_timer = None;

        self.state.force_transition(ConnectionState::Disconnecting);
        self.publish();

        self.drop_connection();
        self.display.detach();

        self.state.force_transition(ConnectionState::Disconnected);
        self.publish();
    }

    fn publish(&mut self) {
        self.session.connection_state = self.state.current();
        let status = SessionStatus::from_session(&self.session, &self.settings.brand_title);
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

/// Receives from an optional channel, pending forever once it is gone
async fn recv_opt<T>(rx: &mut Option<mpsc::UnboundedReceiver<T>>) -> T {
    let next = match rx.as_mut() {
        Some(inner) => inner.recv().await,
        None => None,
    };

    match next {
        Some(value) => value,
        None => {
            *rx = None;
            std::future::pending().await
        }
    }
}
