//! Transport implementation for real debug adapter processes.

use crate::config::{AdapterConfig, TransportMode};
use crate::dap::protocol::{AdapterEvent, DapRequest, DapResponse, Incoming};
use crate::dap::tracer::DapTrace;
use crate::dap::transport::{write_message, MessageReader};
use crate::dap::{EventSink, LaunchRequest, Transport};
use crate::weak_error;
use anyhow::{anyhow, bail, Context};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(50);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const DISCONNECT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct ClientOptions {
    /// Request/response round-trip limit.
    pub request_timeout: Duration,
    /// Trace all DAP traffic into a file.
    pub tracer: Option<DapTrace>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            tracer: None,
        }
    }
}

/// Runs one adapter process at a time and speaks DAP with it.
pub struct DapClient {
    options: ClientOptions,
    conn: Mutex<Option<Arc<Connection>>>,
}

impl DapClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            conn: Mutex::new(None),
        }
    }

    fn spawn(
        &self,
        adapter: &AdapterConfig,
        events: EventSink,
    ) -> anyhow::Result<(Arc<Connection>, Receiver<()>)> {
        let program = which::which(&adapter.command)
            .with_context(|| format!("debug adapter `{}` not found", adapter.command))?;
        let tracer = self.options.tracer.clone();

        match adapter.transport {
            TransportMode::Stdio => {
                let mut child = Command::new(&program)
                    .args(&adapter.args)
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::null())
                    .spawn()
                    .with_context(|| format!("spawn {}", program.display()))?;
                let stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| anyhow!("adapter stdin unavailable"))?;
                let stdout = child
                    .stdout
                    .take()
                    .ok_or_else(|| anyhow!("adapter stdout unavailable"))?;
                info!(target: "dap", "adapter {} started (stdio)", program.display());
                Connection::open(BufReader::new(stdout), stdin, Some(child), tracer, events)
            }
            TransportMode::Tcp => {
                let addr = free_local_addr()?;
                let args = adapter
                    .args
                    .iter()
                    .map(|arg| arg.replace("{port}", &addr.port().to_string()));
                let mut child = Command::new(&program)
                    .args(args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .with_context(|| format!("spawn {}", program.display()))?;
                let stream = match connect(addr, &mut child) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(e);
                    }
                };
                stream.set_nodelay(true)?;
                let reader = BufReader::new(stream.try_clone()?);
                info!(target: "dap", "adapter {} started (tcp {addr})", program.display());
                Connection::open(reader, stream, Some(child), tracer, events)
            }
        }
    }

    /// Run a launch handshake on an already established byte stream.
    pub fn attach_streams<R, W>(
        &self,
        reader: R,
        writer: W,
        request: &LaunchRequest,
        events: EventSink,
    ) -> anyhow::Result<()>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        self.shutdown();
        let (conn, initialized) =
            Connection::open(reader, writer, None, self.options.tracer.clone(), events)?;
        self.install(conn, initialized, request)
    }

    fn install(
        &self,
        conn: Arc<Connection>,
        initialized: Receiver<()>,
        request: &LaunchRequest,
    ) -> anyhow::Result<()> {
        *self.conn.lock().unwrap() = Some(conn.clone());
        if let Err(e) = self.handshake(&conn, initialized, request) {
            self.shutdown();
            return Err(e);
        }
        Ok(())
    }

    fn handshake(
        &self,
        conn: &Connection,
        initialized: Receiver<()>,
        request: &LaunchRequest,
    ) -> anyhow::Result<()> {
        let timeout = self.options.request_timeout;
        conn.request(
            "initialize",
            json!({
                "clientID": "stepback",
                "clientName": "stepback",
                "adapterID": request.config.adapter.adapter_id,
                "linesStartAt1": true,
                "columnsStartAt1": true,
                "pathFormat": "path",
                "supportsRunInTerminalRequest": false,
            }),
            timeout,
        )
        .context("initialize")?;

        // Some adapters answer `launch` only after `configurationDone`, so the response is
        // awaited at the very end.
        let (launch_seq, launch_rx) = conn.send("launch", request.to_arguments())?;

        if initialized.recv_timeout(timeout).is_err() {
            warn!(target: "dap", "no `initialized` event from adapter, configuring anyway");
        }
        for source in &request.breakpoints {
            weak_error!(
                conn.request("setBreakpoints", source.to_arguments(), timeout),
                "setBreakpoints:"
            );
        }
        weak_error!(
            conn.request("configurationDone", json!({}), timeout),
            "configurationDone:"
        );

        conn.wait("launch", launch_seq, launch_rx, timeout)?;
        info!(target: "dap", "program {} launched", request.program.display());
        Ok(())
    }

    fn connection(&self) -> Option<Arc<Connection>> {
        self.conn.lock().unwrap().clone()
    }
}

impl Transport for DapClient {
    fn launch(&self, request: &LaunchRequest, events: EventSink) -> anyhow::Result<()> {
        self.shutdown();
        let (conn, initialized) = self.spawn(&request.config.adapter, events)?;
        self.install(conn, initialized, request)
    }

    fn request(&self, command: &str, arguments: Value) -> anyhow::Result<Value> {
        let conn = self
            .connection()
            .ok_or_else(|| anyhow!("no running debug adapter"))?;
        conn.request(command, arguments, self.options.request_timeout)
    }

    fn is_active(&self) -> bool {
        self.connection()
            .map(|conn| conn.alive.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn shutdown(&self) {
        let Some(conn) = self.conn.lock().unwrap().take() else {
            return;
        };
        conn.closing.store(true, Ordering::SeqCst);
        if conn.alive.load(Ordering::SeqCst) {
            let _ = conn.request(
                "disconnect",
                json!({ "terminateDebuggee": true }),
                DISCONNECT_TIMEOUT,
            );
        }
        if let Some(mut child) = conn.child.lock().unwrap().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        conn.alive.store(false, Ordering::SeqCst);
        debug!(target: "dap", "adapter session closed");
    }
}

impl Drop for DapClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Connection {
    writer: Mutex<Box<dyn Write + Send>>,
    pending: Mutex<HashMap<i64, SyncSender<DapResponse>>>,
    next_seq: AtomicI64,
    alive: AtomicBool,
    closing: AtomicBool,
    child: Mutex<Option<Child>>,
    tracer: Option<DapTrace>,
}

impl Connection {
    /// Start a reader thread over the stream. Return the connection and a receiver
    /// notified on the `initialized` event.
    fn open<R, W>(
        reader: R,
        writer: W,
        child: Option<Child>,
        tracer: Option<DapTrace>,
        events: EventSink,
    ) -> anyhow::Result<(Arc<Self>, Receiver<()>)>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let conn = Arc::new(Self {
            writer: Mutex::new(Box::new(writer)),
            pending: Mutex::default(),
            next_seq: AtomicI64::new(1),
            alive: AtomicBool::new(true),
            closing: AtomicBool::new(false),
            child: Mutex::new(child),
            tracer: tracer.clone(),
        });
        let (init_tx, init_rx) = mpsc::sync_channel(1);

        let reader = MessageReader::new(reader, tracer);
        let thread_conn = Arc::clone(&conn);
        thread::Builder::new()
            .name("dap-reader".into())
            .spawn(move || thread_conn.read_loop(reader, events, init_tx))
            .context("spawn DAP reader thread")?;

        Ok((conn, init_rx))
    }

    fn read_loop<R: BufRead>(
        &self,
        mut reader: MessageReader<R>,
        events: EventSink,
        initialized: SyncSender<()>,
    ) {
        loop {
            let msg = match reader.read_message() {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(target: "dap", "reader stopped: {e:#}");
                    break;
                }
            };
            match Incoming::parse(msg) {
                Ok(Incoming::Response(response)) => {
                    let waiter = self.pending.lock().unwrap().remove(&response.request_seq);
                    match waiter {
                        Some(waiter) => {
                            let _ = waiter.send(response);
                        }
                        None => debug!(
                            target: "dap",
                            "response to unknown request {}", response.request_seq
                        ),
                    }
                }
                Ok(Incoming::Event { event, body }) => {
                    match AdapterEvent::from_dap(&event, &body) {
                        Some(AdapterEvent::Initialized) => {
                            let _ = initialized.try_send(());
                        }
                        Some(event) => events(event),
                        None => debug!(target: "dap", "ignore `{event}` event"),
                    }
                }
                Ok(Incoming::Request { seq, command }) => {
                    weak_error!(self.refuse(seq, &command), "reverse request:");
                }
                Err(e) => warn!(target: "dap", "malformed message: {e:#}"),
            }
        }

        self.alive.store(false, Ordering::SeqCst);
        self.pending.lock().unwrap().clear();
        if !self.closing.load(Ordering::SeqCst) {
            info!(target: "dap", "adapter connection lost");
            events(AdapterEvent::Terminated);
        }
    }

    fn send(&self, command: &str, arguments: Value) -> anyhow::Result<(i64, Receiver<DapResponse>)> {
        if !self.alive.load(Ordering::SeqCst) {
            bail!("debug adapter is not running");
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::sync_channel(1);
        self.pending.lock().unwrap().insert(seq, tx);

        let msg = serde_json::to_value(DapRequest {
            seq,
            r#type: "request",
            command,
            arguments: &arguments,
        })?;
        let mut writer = self.writer.lock().unwrap();
        if let Err(e) = write_message(&mut *writer, &msg, self.tracer.as_ref()) {
            self.pending.lock().unwrap().remove(&seq);
            return Err(e);
        }
        Ok((seq, rx))
    }

    fn wait(
        &self,
        command: &str,
        seq: i64,
        rx: Receiver<DapResponse>,
        timeout: Duration,
    ) -> anyhow::Result<Value> {
        let response = match rx.recv_timeout(timeout) {
            Ok(response) => response,
            Err(RecvTimeoutError::Timeout) => {
                self.pending.lock().unwrap().remove(&seq);
                bail!("`{command}` request timed out after {timeout:?}");
            }
            Err(RecvTimeoutError::Disconnected) => {
                bail!("adapter closed before answering `{command}`")
            }
        };
        if !response.success {
            bail!(
                "`{command}` failed: {}",
                response.message.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(response.body.unwrap_or(Value::Null))
    }

    fn request(&self, command: &str, arguments: Value, timeout: Duration) -> anyhow::Result<Value> {
        let (seq, rx) = self.send(command, arguments)?;
        self.wait(command, seq, rx, timeout)
    }

    fn refuse(&self, request_seq: i64, command: &str) -> anyhow::Result<()> {
        let response = DapResponse {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            r#type: "response".into(),
            request_seq,
            success: false,
            command: command.to_owned(),
            message: Some(format!("`{command}` is not supported")),
            body: None,
        };
        let mut writer = self.writer.lock().unwrap();
        write_message(
            &mut *writer,
            &serde_json::to_value(response)?,
            self.tracer.as_ref(),
        )
    }
}

fn free_local_addr() -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind local TCP port")?;
    Ok(listener.local_addr()?)
}

fn connect(addr: SocketAddr, child: &mut Child) -> anyhow::Result<TcpStream> {
    let start = Instant::now();
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                if let Some(status) = child.try_wait()? {
                    bail!("adapter exited before accepting connections: {status}");
                }
                if start.elapsed() > CONNECT_TIMEOUT {
                    bail!("failed to connect to {addr}: {err}");
                }
                thread::sleep(CONNECT_RETRY_DELAY);
            }
        }
    }
}
