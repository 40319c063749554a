//! In-memory launcher whose "processes" are scripted tasks over duplex pipes.
//!
//! Used to exercise sessions without spawning real executables. Each launch
//! starts a reader task that records every line written to stdin and a worker
//! task that answers requests with the steps returned by the script.

use crate::session::ports::{
    LaunchError, LaunchedProcess, ProcessExit, ProcessLauncher, SpawnedProcess,
};
use crate::tool_registry::domain::{ProcessTransportConfig, ToolServerId};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::{mpsc, watch};

/// Exit code reported when a scripted process honours a termination request.
const TERMINATED_EXIT_CODE: i32 = 143;

const PIPE_CAPACITY: usize = 64 * 1024;

/// One action a scripted process performs in reply to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Writes a raw line (a newline is appended) to stdout.
    Emit(String),
    /// Writes a raw chunk to stdout without a newline.
    EmitPartial(String),
    /// Writes a line to stderr.
    Diagnostic(String),
    /// Pauses before the next step.
    Sleep(Duration),
    /// Exits with a code, closing stdout.
    Exit(i32),
    /// Makes the host's next write to stdin fail with a broken pipe.
    FailNextWrite,
}

impl ScriptStep {
    /// Emits a JSON value as one line.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::Emit(value.to_string())
    }

    /// Emits a successful response to the request.
    #[must_use]
    pub fn result(request: &Value, result: Value) -> Self {
        Self::json(&json!({"jsonrpc": "2.0", "id": request["id"], "result": result}))
    }

    /// Emits an error response to the request.
    #[must_use]
    pub fn error(request: &Value, code: i64, message: &str) -> Self {
        Self::json(&json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": {"code": code, "message": message}
        }))
    }
}

/// Ordered record of traffic seen by a scripted process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    /// Launch number (starting at 1) and a line read from stdin.
    Received(usize, Value),
    /// Launch number and a line written to stdout.
    Emitted(usize, String),
    /// Launch number of a process asked to terminate.
    TerminationRequested(usize),
}

type Script = dyn Fn(&Value) -> Vec<ScriptStep> + Send + Sync;

/// Launcher producing scripted in-memory tool servers.
#[derive(Clone)]
pub struct ScriptedProcessLauncher {
    script: Arc<Script>,
    fail_launch: bool,
    launches: Arc<AtomicUsize>,
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl std::fmt::Debug for ScriptedProcessLauncher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ScriptedProcessLauncher")
            .field("fail_launch", &self.fail_launch)
            .field("launches", &self.launch_count())
            .finish_non_exhaustive()
    }
}

impl ScriptedProcessLauncher {
    /// Creates a launcher answering every request with `script`.
    ///
    /// Notifications reach the script too; return no steps to ignore them.
    pub fn new(script: impl Fn(&Value) -> Vec<ScriptStep> + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            fail_launch: false,
            launches: Arc::new(AtomicUsize::new(0)),
            transcript: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a launcher whose launches always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(|_| Vec::new())
        }
    }

    /// Creates an echo tool server.
    ///
    /// It answers `initialize`, lists a single `echo` tool and echoes the
    /// `arguments` of `tools/call` back as text content.
    #[must_use]
    pub fn echo_server() -> Self {
        Self::new(|request| {
            let method = request.get("method").and_then(Value::as_str);
            if request.get("id").is_none() {
                return Vec::new();
            }
            match method {
                Some("initialize") => vec![ScriptStep::result(
                    request,
                    json!({
                        "protocolVersion": crate::protocol::PROTOCOL_VERSION,
                        "capabilities": {"tools": {}},
                        "serverInfo": {"name": "echo-rpc-server", "version": "1.0.0"}
                    }),
                )],
                Some("tools/list") => vec![ScriptStep::result(
                    request,
                    json!({"tools": [{
                        "name": "echo",
                        "description": "Echo the arguments back",
                        "inputSchema": {"type": "object"}
                    }]}),
                )],
                Some("tools/call") => vec![ScriptStep::result(
                    request,
                    json!({"content": [{
                        "type": "text",
                        "text": request["params"]["arguments"].to_string()
                    }]}),
                )],
                _ => vec![ScriptStep::error(request, -32601, "method not found")],
            }
        })
    }

    /// Returns the number of launches so far.
    #[must_use]
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Returns a snapshot of the traffic transcript.
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the methods received across all launches, in order.
    #[must_use]
    pub fn received_methods(&self) -> Vec<String> {
        self.transcript()
            .into_iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Received(_, value) => value
                    .get("method")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ProcessLauncher for ScriptedProcessLauncher {
    async fn launch(
        &self,
        _server_id: &ToolServerId,
        config: &ProcessTransportConfig,
    ) -> Result<LaunchedProcess, LaunchError> {
        if self.fail_launch {
            return Err(LaunchError::spawn(
                config.command(),
                io::Error::new(io::ErrorKind::NotFound, "scripted launch failure"),
            ));
        }

        let launch = self.launches.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let (host_stdin, process_stdin) = tokio::io::duplex(PIPE_CAPACITY);
        let (process_stdout, host_stdout) = tokio::io::duplex(PIPE_CAPACITY);
        let (process_stderr, host_stderr) = tokio::io::duplex(PIPE_CAPACITY);
        let (exit_tx, exit_rx) = watch::channel(None);
        let (terminate_tx, terminate_rx) = watch::channel(false);
        let fail_next_write = Arc::new(AtomicBool::new(false));

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let recorder = Recorder {
            launch,
            transcript: Arc::clone(&self.transcript),
        };
        tokio::spawn(read_stdin(process_stdin, request_tx, recorder.clone()));
        tokio::spawn(run_script(
            Arc::clone(&self.script),
            ScriptPipes {
                requests: request_rx,
                stdout: process_stdout,
                stderr: process_stderr,
                exit: exit_tx,
                terminate: terminate_rx,
                fail_next_write: Arc::clone(&fail_next_write),
            },
            recorder.clone(),
        ));

        Ok(LaunchedProcess {
            stdin: Box::new(ScriptedStdin {
                inner: host_stdin,
                fail_next_write,
            }),
            stdout: Box::new(host_stdout),
            stderr: Some(Box::new(host_stderr)),
            process: Box::new(ScriptedProcess {
                exit: exit_rx,
                terminate: terminate_tx,
                recorder,
            }),
        })
    }
}

#[derive(Clone)]
struct Recorder {
    launch: usize,
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl Recorder {
    fn record(&self, entry: TranscriptEntry) {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

/// Reads stdin lines as soon as they arrive, so pipelined requests show up in
/// the transcript before earlier requests are answered.
async fn read_stdin(stdin: DuplexStream, requests: mpsc::UnboundedSender<Value>, recorder: Recorder) {
    let mut lines = BufReader::new(stdin).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(value) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        recorder.record(TranscriptEntry::Received(recorder.launch, value.clone()));
        if requests.send(value).is_err() {
            break;
        }
    }
}

struct ScriptPipes {
    requests: mpsc::UnboundedReceiver<Value>,
    stdout: DuplexStream,
    stderr: DuplexStream,
    exit: watch::Sender<Option<ProcessExit>>,
    terminate: watch::Receiver<bool>,
    fail_next_write: Arc<AtomicBool>,
}

async fn run_script(script: Arc<Script>, pipes: ScriptPipes, recorder: Recorder) {
    let ScriptPipes {
        mut requests,
        mut stdout,
        mut stderr,
        exit,
        mut terminate,
        fail_next_write,
    } = pipes;

    let code = loop {
        let request = tokio::select! {
            request = requests.recv() => request,
            () = terminated(&mut terminate) => break TERMINATED_EXIT_CODE,
        };
        let Some(request) = request else {
            break 0;
        };
        let steps = script(&request);
        tokio::select! {
            outcome = perform(&steps, &mut stdout, &mut stderr, &fail_next_write, &recorder) => {
                if let Some(code) = outcome {
                    break code;
                }
            }
            () = terminated(&mut terminate) => break TERMINATED_EXIT_CODE,
        }
    };

    drop(stdout);
    exit.send_replace(Some(ProcessExit { code: Some(code) }));
}

/// Resolves once termination is requested or the control handle is dropped.
async fn terminated(terminate: &mut watch::Receiver<bool>) {
    drop(terminate.wait_for(|requested| *requested).await);
}

async fn perform(
    steps: &[ScriptStep],
    stdout: &mut DuplexStream,
    stderr: &mut DuplexStream,
    fail_next_write: &AtomicBool,
    recorder: &Recorder,
) -> Option<i32> {
    for step in steps {
        match step {
            ScriptStep::Emit(line) => {
                recorder.record(TranscriptEntry::Emitted(recorder.launch, line.clone()));
                let framed = format!("{line}\n");
                if stdout.write_all(framed.as_bytes()).await.is_err() {
                    return Some(1);
                }
            }
            ScriptStep::EmitPartial(chunk) => {
                if stdout.write_all(chunk.as_bytes()).await.is_err() {
                    return Some(1);
                }
            }
            ScriptStep::Diagnostic(line) => {
                let framed = format!("{line}\n");
                if stderr.write_all(framed.as_bytes()).await.is_err() {
                    return Some(1);
                }
            }
            ScriptStep::Sleep(duration) => tokio::time::sleep(*duration).await,
            ScriptStep::Exit(code) => return Some(*code),
            ScriptStep::FailNextWrite => fail_next_write.store(true, Ordering::SeqCst),
        }
    }
    None
}

/// Host end of stdin that can be armed to reject exactly one write.
struct ScriptedStdin {
    inner: DuplexStream,
    fail_next_write: Arc<AtomicBool>,
}

impl AsyncWrite for ScriptedStdin {
    fn poll_write(
        mut self: Pin<&mut Self>,
        context: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted write failure",
            )));
        }
        Pin::new(&mut self.inner).poll_write(context, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(context)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(context)
    }
}

struct ScriptedProcess {
    exit: watch::Receiver<Option<ProcessExit>>,
    terminate: watch::Sender<bool>,
    recorder: Recorder,
}

#[async_trait]
impl SpawnedProcess for ScriptedProcess {
    async fn wait(&mut self) -> io::Result<ProcessExit> {
        let exit = self
            .exit
            .wait_for(Option::is_some)
            .await
            .map_err(|_| io::Error::other("scripted process vanished"))?;
        (*exit).ok_or_else(|| io::Error::other("scripted process vanished"))
    }

    fn request_termination(&mut self) -> io::Result<()> {
        self.recorder
            .record(TranscriptEntry::TerminationRequested(self.recorder.launch));
        self.terminate.send_replace(true);
        Ok(())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.terminate.send_replace(true);
        self.wait().await.map(|_| ())
    }
}
