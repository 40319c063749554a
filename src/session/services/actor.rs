//! Single-writer session actor owning one tool server process.

use crate::protocol::{
    IncomingMessage, LineBuffer, RequestId, RpcEnvelope, RpcNotification,
    RpcResponse,
};
use crate::session::domain::{SessionError, SessionSettings, SessionState};
use crate::session::ports::{LaunchedProcess, ProcessStdin, ProcessStdout, SpawnedProcess};
use crate::tool_registry::domain::{NonJsonLinePolicy, ProcessTransportConfig, ToolServerId};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Longest excerpt of a malformed line carried in errors and logs.
const LINE_EXCERPT_CHARS: usize = 200;

type Reply = oneshot::Sender<Result<RpcResponse, SessionError>>;

enum SessionCommand {
    Call {
        envelope: RpcEnvelope,
        reply: Reply,
        enqueued_at: Instant,
    },
    Shutdown,
}

/// Cloneable client of a running session.
#[derive(Debug, Clone)]
pub struct SessionClient {
    server_id: ToolServerId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<SessionState>,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call { envelope, .. } => formatter
                .debug_struct("Call")
                .field("request_id", &envelope.id())
                .field("method", &envelope.method())
                .finish_non_exhaustive(),
            Self::Shutdown => formatter.write_str("Shutdown"),
        }
    }
}

impl SessionClient {
    /// Queues a request and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the call times out, cannot be written,
    /// or the session ends first.
    pub async fn call(&self, envelope: RpcEnvelope) -> Result<RpcResponse, SessionError> {
        let (reply, response) = oneshot::channel();
        let command = SessionCommand::Call {
            envelope,
            reply,
            enqueued_at: Instant::now(),
        };
        if self.commands.send(command).is_err() {
            return Err(self.terminated("session is no longer running"));
        }
        response
            .await
            .unwrap_or_else(|_| Err(self.terminated("session dropped the call")))
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns whether the session still accepts calls.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state().is_live() && !self.commands.is_closed()
    }

    /// Returns the server identity.
    #[must_use]
    pub const fn server_id(&self) -> &ToolServerId {
        &self.server_id
    }

    fn terminated(&self, reason: &str) -> SessionError {
        SessionError::Terminated {
            server_id: self.server_id.clone(),
            reason: reason.to_owned(),
        }
    }
}

/// Owning handle of a session: the client, the configuration it was opened
/// with, and the actor task.
#[derive(Debug)]
pub struct SessionHandle {
    client: SessionClient,
    config: ProcessTransportConfig,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Starts the actor for a launched process.
    ///
    /// The `initialize` handshake is queued ahead of every caller.
    #[must_use]
    pub fn start(
        server_id: ToolServerId,
        config: ProcessTransportConfig,
        launched: LaunchedProcess,
        settings: Arc<SessionSettings>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Initializing);

        if let Some(stderr) = launched.stderr {
            tokio::spawn(drain_stderr(server_id.clone(), stderr));
        }

        let handshake = RpcEnvelope::initialize(&settings.client_name, &settings.client_version);
        let mut queue = VecDeque::new();
        queue.push_back(PendingCall {
            envelope: handshake,
            responder: Responder::Handshake,
            enqueued_at: Instant::now(),
        });

        let actor = SessionActor {
            server_id: server_id.clone(),
            non_json_lines: config.non_json_lines(),
            buffer: LineBuffer::new(settings.max_line_bytes),
            settings,
            stdin: Some(launched.stdin),
            stdout: launched.stdout,
            process: launched.process,
            exited: false,
            commands: commands_rx,
            queue,
            in_flight: None,
            state: state_tx,
        };
        let task = tokio::spawn(actor.run());

        Self {
            client: SessionClient {
                server_id,
                commands: commands_tx,
                state: state_rx,
            },
            config,
            task,
        }
    }

    /// Returns a client for issuing calls.
    #[must_use]
    pub const fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Returns the configuration the session was opened with.
    #[must_use]
    pub const fn config(&self) -> &ProcessTransportConfig {
        &self.config
    }

    /// Tears the session down and waits until the process is gone.
    ///
    /// Queued and in-flight calls are rejected as terminated.
    pub async fn shutdown(self) {
        if self.client.commands.send(SessionCommand::Shutdown).is_err() {
            debug!(server_id = %self.client.server_id, "session already stopped");
        }
        if let Err(err) = self.task.await {
            warn!(server_id = %self.client.server_id, error = %err, "session task failed");
        }
    }
}

enum Responder {
    Handshake,
    Caller(Reply),
}

impl Responder {
    fn is_abandoned(&self) -> bool {
        match self {
            Self::Handshake => false,
            Self::Caller(reply) => reply.is_closed(),
        }
    }
}

struct PendingCall {
    envelope: RpcEnvelope,
    responder: Responder,
    enqueued_at: Instant,
}

struct InFlight {
    request_id: RequestId,
    responder: Responder,
    deadline: Instant,
    timeout: Duration,
}

/// Why the actor loop ended.
enum Termination {
    Shutdown,
    Crashed(String),
    HandshakeFailed(String),
}

struct SessionActor {
    server_id: ToolServerId,
    settings: Arc<SessionSettings>,
    non_json_lines: NonJsonLinePolicy,
    stdin: Option<ProcessStdin>,
    stdout: ProcessStdout,
    process: Box<dyn SpawnedProcess>,
    exited: bool,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    queue: VecDeque<PendingCall>,
    in_flight: Option<InFlight>,
    buffer: LineBuffer,
    state: watch::Sender<SessionState>,
}

impl SessionActor {
    async fn run(mut self) {
        debug!(server_id = %self.server_id, "session started");
        let termination = self.drive().await;
        self.finish(termination).await;
    }

    async fn drive(&mut self) -> Termination {
        let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
        loop {
            if let Some(termination) = self.dispatch_next().await {
                return termination;
            }

            let deadline = self.in_flight.as_ref().map(|in_flight| in_flight.deadline);
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Call { envelope, reply, enqueued_at }) => {
                        self.queue.push_back(PendingCall {
                            envelope,
                            responder: Responder::Caller(reply),
                            enqueued_at,
                        });
                    }
                    Some(SessionCommand::Shutdown) | None => return Termination::Shutdown,
                },
                read = self.stdout.read(&mut chunk) => match read {
                    Ok(0) => return Termination::Crashed("stdout closed".to_owned()),
                    Ok(count) => {
                        let bytes = chunk.get(..count).unwrap_or_default();
                        if let Some(termination) = self.on_bytes(bytes).await {
                            return termination;
                        }
                    }
                    Err(err) => return Termination::Crashed(format!("stdout read failed: {err}")),
                },
                exit = self.process.wait() => {
                    self.exited = true;
                    let reason = match exit {
                        Ok(exit) => format!("process exited with {exit}"),
                        Err(err) => format!("process wait failed: {err}"),
                    };
                    return self.drain_after_exit(reason).await;
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(termination) = self.on_deadline() {
                        return termination;
                    }
                },
            }
        }
    }

    /// Writes queued calls until one is in flight or the queue is empty.
    async fn dispatch_next(&mut self) -> Option<Termination> {
        while self.in_flight.is_none() {
            let call = self.queue.pop_front()?;
            if call.responder.is_abandoned() {
                debug!(
                    server_id = %self.server_id,
                    request_id = %call.envelope.id(),
                    "skipping call abandoned by its caller"
                );
                continue;
            }

            let request_id = call.envelope.id();
            let written = match call.envelope.to_line() {
                Ok(line) => self.write_line(&line).await,
                Err(err) => Err(format!("request could not be encoded: {err}")),
            };

            match (written, call.responder) {
                (Ok(()), responder) => {
                    let limit = match responder {
                        Responder::Handshake => self.settings.handshake_timeout,
                        Responder::Caller(_) => self.settings.call_timeout,
                    };
                    debug!(
                        server_id = %self.server_id,
                        request_id = %request_id,
                        method = call.envelope.method(),
                        queued_for = ?call.enqueued_at.elapsed(),
                        "dispatched request"
                    );
                    self.in_flight = Some(InFlight {
                        request_id,
                        responder,
                        deadline: Instant::now() + limit,
                        timeout: limit,
                    });
                }
                (Err(reason), Responder::Handshake) => {
                    return Some(Termination::HandshakeFailed(reason));
                }
                (Err(message), Responder::Caller(reply)) => {
                    warn!(
                        server_id = %self.server_id,
                        request_id = %request_id,
                        error = %message,
                        "failed to write request"
                    );
                    self.reply(
                        reply,
                        Err(SessionError::Write {
                            server_id: self.server_id.clone(),
                            request_id,
                            message,
                        }),
                    );
                }
            }
        }
        None
    }

    async fn write_line(&mut self, line: &str) -> Result<(), String> {
        let limit = self.settings.call_timeout;
        let Some(stdin) = self.stdin.as_mut() else {
            return Err("stdin is closed".to_owned());
        };
        let write = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        };
        match timeout(limit, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("write timed out after {limit:?}")),
        }
    }

    async fn on_bytes(&mut self, bytes: &[u8]) -> Option<Termination> {
        if let Err(err) = self.buffer.extend(bytes) {
            return Some(Termination::Crashed(err.to_string()));
        }
        while let Some(line) = self.buffer.next_line() {
            if let Some(termination) = self.on_line(&line).await {
                return Some(termination);
            }
        }
        None
    }

    async fn on_line(&mut self, line: &str) -> Option<Termination> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
            return self.on_non_json(trimmed);
        };

        match IncomingMessage::classify(value) {
            IncomingMessage::Response(response) => self.on_response(response).await,
            IncomingMessage::Notification { method } => {
                debug!(server_id = %self.server_id, method, "ignoring server notification");
                None
            }
            IncomingMessage::ServerRequest { id, method } => {
                warn!(
                    server_id = %self.server_id,
                    server_request_id = %id,
                    method,
                    "ignoring server-initiated request"
                );
                None
            }
            IncomingMessage::Unrecognized(value) => {
                warn!(server_id = %self.server_id, message = %value, "discarding unrecognized message");
                None
            }
        }
    }

    fn on_non_json(&mut self, line: &str) -> Option<Termination> {
        let excerpt: String = line.chars().take(LINE_EXCERPT_CHARS).collect();
        match self.non_json_lines {
            NonJsonLinePolicy::Ignore => {
                debug!(server_id = %self.server_id, line = %excerpt, "ignoring non-JSON stdout line");
                None
            }
            NonJsonLinePolicy::Reject => {
                let Some(in_flight) = self.in_flight.take() else {
                    warn!(server_id = %self.server_id, line = %excerpt, "non-JSON stdout line with nothing in flight");
                    return None;
                };
                match in_flight.responder {
                    Responder::Handshake => Some(Termination::HandshakeFailed(format!(
                        "malformed output: {excerpt}"
                    ))),
                    Responder::Caller(reply) => {
                        warn!(
                            server_id = %self.server_id,
                            request_id = %in_flight.request_id,
                            line = %excerpt,
                            "rejecting call after non-JSON stdout line"
                        );
                        self.reply(
                            reply,
                            Err(SessionError::MalformedOutput {
                                server_id: self.server_id.clone(),
                                line: excerpt,
                            }),
                        );
                        None
                    }
                }
            }
        }
    }

    async fn on_response(&mut self, response: RpcResponse) -> Option<Termination> {
        let answers_in_flight = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| response.answers(in_flight.request_id));
        if !answers_in_flight {
            warn!(
                server_id = %self.server_id,
                response_id = %response.id(),
                expected = ?self.in_flight.as_ref().map(|in_flight| in_flight.request_id),
                "discarding unsolicited response"
            );
            return None;
        }

        let in_flight = self.in_flight.take()?;
        match in_flight.responder {
            Responder::Handshake => self.complete_handshake(response).await,
            Responder::Caller(reply) => {
                debug!(
                    server_id = %self.server_id,
                    request_id = %in_flight.request_id,
                    is_error = response.is_error(),
                    "resolved call"
                );
                self.reply(reply, Ok(response));
                None
            }
        }
    }

    async fn complete_handshake(&mut self, response: RpcResponse) -> Option<Termination> {
        if let Err(error) = response.into_result() {
            return Some(Termination::HandshakeFailed(error.to_string()));
        }

        let notification = match RpcNotification::initialized().to_line() {
            Ok(line) => line,
            Err(err) => return Some(Termination::HandshakeFailed(err.to_string())),
        };
        if let Err(reason) = self.write_line(&notification).await {
            return Some(Termination::HandshakeFailed(reason));
        }

        self.state.send_replace(SessionState::Ready);
        info!(server_id = %self.server_id, "session ready");
        None
    }

    fn on_deadline(&mut self) -> Option<Termination> {
        let in_flight = self.in_flight.take()?;
        match in_flight.responder {
            Responder::Handshake => Some(Termination::HandshakeFailed(format!(
                "no initialize response within {:?}",
                in_flight.timeout
            ))),
            Responder::Caller(reply) => {
                warn!(
                    server_id = %self.server_id,
                    request_id = %in_flight.request_id,
                    timeout = ?in_flight.timeout,
                    "call timed out"
                );
                self.reply(
                    reply,
                    Err(SessionError::Timeout {
                        server_id: self.server_id.clone(),
                        request_id: in_flight.request_id,
                        timeout: in_flight.timeout,
                    }),
                );
                None
            }
        }
    }

    /// Reads whatever the process wrote before exiting, bounded by the
    /// settle delay, so a final response is not lost to the exit race.
    async fn drain_after_exit(&mut self, reason: String) -> Termination {
        let limit = self.settings.settle_delay;
        let drain = async {
            let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
            loop {
                match self.stdout.read(&mut chunk).await {
                    Ok(0) | Err(_) => return None,
                    Ok(count) => {
                        let bytes = chunk.get(..count).unwrap_or_default();
                        if let Some(termination) = self.on_bytes(bytes).await {
                            return Some(termination);
                        }
                    }
                }
            }
        };
        match timeout(limit, drain).await {
            Ok(Some(termination)) => termination,
            Ok(None) | Err(_) => Termination::Crashed(reason),
        }
    }

    async fn finish(mut self, termination: Termination) {
        let (state, error) = match &termination {
            Termination::Shutdown => (
                SessionState::Closing,
                self.terminated_error("session shut down"),
            ),
            Termination::Crashed(reason) => (SessionState::Crashed, self.terminated_error(reason)),
            Termination::HandshakeFailed(reason) => (
                SessionState::Crashed,
                SessionError::HandshakeFailed {
                    server_id: self.server_id.clone(),
                    reason: reason.clone(),
                },
            ),
        };
        self.state.send_replace(state);
        match &termination {
            Termination::Shutdown => info!(server_id = %self.server_id, "session shutting down"),
            Termination::Crashed(_) | Termination::HandshakeFailed(_) => {
                warn!(server_id = %self.server_id, error = %error, "session ended");
            }
        }

        self.reject_all(&error);
        self.teardown().await;
    }

    /// Rejects the in-flight call, the queue and commands still in the
    /// channel.
    fn reject_all(&mut self, error: &SessionError) {
        self.commands.close();
        let mut rejected = 0_usize;

        if let Some(InFlight {
            responder: Responder::Caller(reply),
            ..
        }) = self.in_flight.take()
        {
            self.reply(reply, Err(error.clone()));
            rejected += 1;
        }
        while let Some(call) = self.queue.pop_front() {
            if let Responder::Caller(reply) = call.responder {
                self.reply(reply, Err(error.clone()));
                rejected += 1;
            }
        }
        while let Ok(command) = self.commands.try_recv() {
            if let SessionCommand::Call { reply, .. } = command {
                self.reply(reply, Err(error.clone()));
                rejected += 1;
            }
        }

        if rejected > 0 {
            debug!(server_id = %self.server_id, rejected, "rejected pending calls");
        }
    }

    /// Closes stdin, asks the process to terminate, kills it after the grace
    /// period and waits the settle delay.
    async fn teardown(&mut self) {
        drop(self.stdin.take());
        if self.exited {
            return;
        }

        if let Err(err) = self.process.request_termination() {
            debug!(server_id = %self.server_id, error = %err, "termination request failed");
        }
        match timeout(self.settings.termination_grace, self.process.wait()).await {
            Ok(Ok(exit)) => debug!(server_id = %self.server_id, %exit, "process exited"),
            Ok(Err(err)) => warn!(server_id = %self.server_id, error = %err, "waiting for process failed"),
            Err(_) => {
                warn!(
                    server_id = %self.server_id,
                    grace = ?self.settings.termination_grace,
                    "process ignored termination, killing"
                );
                if let Err(err) = self.process.kill().await {
                    warn!(server_id = %self.server_id, error = %err, "failed to kill process");
                }
            }
        }
        tokio::time::sleep(self.settings.settle_delay).await;
    }

    fn reply(&self, reply: Reply, outcome: Result<RpcResponse, SessionError>) {
        if reply.send(outcome).is_err() {
            debug!(server_id = %self.server_id, "caller went away before the reply");
        }
    }

    fn terminated_error(&self, reason: &str) -> SessionError {
        SessionError::Terminated {
            server_id: self.server_id.clone(),
            reason: reason.to_owned(),
        }
    }
}

async fn drain_stderr(server_id: ToolServerId, stderr: ProcessStdout) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(server_id = %server_id, line = %line, "tool server stderr"),
            Ok(None) => break,
            Err(err) => {
                debug!(server_id = %server_id, error = %err, "stopped reading stderr");
                break;
            }
        }
    }
}
