//! The connection manager: acceptor loop, per-connection read tasks, idle
//! reaper, and graceful shutdown.
//!
//! This is the only layer in the crate that touches sockets and spawns
//! tasks. Everything it drives — the wire codec, the auth/dispatch state
//! machine, credential verification — is pure and lives in `rcon-protocol`
//! / `rcon-core`.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use rcon_core::{
    Connection, ConnectionAction, ConnectionError, ConnectionState, CredentialRecord, env::Environment,
};
use rcon_protocol::{DecodeOutcome, Packet, try_decode_one};
use tokio::{
    io::AsyncReadExt,
    net::{TcpStream, tcp::OwnedReadHalf},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig, connection_handle::ConnectionHandle, error::ServerError,
    executor::CommandExecutor, registry::Registry, system_env::SystemEnv, transport::TcpTransport,
};

/// Owns the listening socket, the connection registry, and every task the
/// manager spawns. `run` drives the acceptor and idle reaper until
/// `shutdown_handle` is cancelled or the listener itself fails.
pub struct ConnectionManager {
    config: ServerConfig,
    transport: TcpTransport,
    registry: Arc<Registry>,
    executor: Arc<dyn CommandExecutor>,
    env: SystemEnv,
    next_connection_id: AtomicU64,
    shutdown: CancellationToken,
    clock: std::time::Instant,
}

impl ConnectionManager {
    /// Bind the listening socket and construct a manager ready to `run`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the listener cannot be bound.
    pub async fn bind(
        config: ServerConfig,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self, ServerError> {
        let transport = TcpTransport::bind(&config.host, config.port).await?;
        Ok(Self {
            config,
            transport,
            registry: Arc::new(Registry::new()),
            executor,
            env: SystemEnv::new(),
            next_connection_id: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
            clock: std::time::Instant::now(),
        })
    }

    /// A token that, when cancelled, stops the acceptor and idle reaper and
    /// closes every live connection with reason "server shutdown".
    #[must_use]
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of currently live connections. Exposed for tests and
    /// diagnostics.
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.registry.len()
    }

    /// Address the manager's listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the listener's local address
    /// cannot be queried.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    fn now_ms(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation)]
        let elapsed = self.clock.elapsed().as_millis() as u64;
        elapsed
    }

    /// Run the acceptor loop and idle reaper until `shutdown_handle` is
    /// cancelled. Returns once every spawned read task has exited (within a
    /// small grace period).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the listener itself fails
    /// outside of an expected accept-wait timeout.
    pub async fn run(&self) -> Result<(), ServerError> {
        let reaper = tokio::spawn(Self::reap_idle_connections(
            Arc::clone(&self.registry),
            self.env,
            self.config.read_timeout,
            self.clock,
            self.shutdown.clone(),
        ));

        let mut read_tasks: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                result = tokio::time::timeout(self.config.accept_timeout, self.transport.accept()) => {
                    match result {
                        Err(_elapsed) => continue,
                        Ok(Err(err)) => return Err(err),
                        Ok(Ok((stream, addr))) => {
                            if self.registry.len() >= self.config.max_connections {
                                drop(stream);
                                tracing::warn!(remote_ip = %addr.ip(), "transport.rate_limit");
                                continue;
                            }
                            let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
                            read_tasks.push(self.spawn_connection(stream, addr, connection_id));
                        },
                    }
                },
            }
        }

        // Every connection's close token is a child of `self.shutdown`, so
        // cancelling it above already told each read task to stop; they
        // exit through their own close/log/registry-remove path below.
        let grace = tokio::time::sleep(std::time::Duration::from_secs(2));
        tokio::pin!(grace);
        for task in read_tasks {
            tokio::select! {
                _ = task => {},
                () = &mut grace => break,
            }
        }

        reaper.abort();
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        addr: std::net::SocketAddr,
        connection_id: u64,
    ) -> JoinHandle<()> {
        let (read_half, write_half) = stream.into_split();
        let registry = Arc::clone(&self.registry);
        let executor = Arc::clone(&self.executor);
        let credential = self.config.credential.clone();
        let max_frame_size = self.config.max_frame_size;
        let read_timeout = self.config.read_timeout;
        let clock = self.clock;
        let close_token = self.shutdown.child_token();
        let shutdown = self.shutdown.clone();

        let join = tokio::spawn(run_connection(RunConnectionArgs {
            connection_id,
            read_half,
            registry: Arc::clone(&registry),
            executor,
            credential,
            max_frame_size,
            read_timeout,
            clock,
            close_token: close_token.clone(),
            shutdown,
        }));

        let handle =
            Arc::new(ConnectionHandle::new(connection_id, addr, write_half, close_token, self.now_ms()));
        registry.register(handle);

        tracing::info!(
            connection_id,
            remote_ip = %addr.ip(),
            remote_port = addr.port(),
            "transport.connect"
        );

        join
    }

    async fn reap_idle_connections(
        registry: Arc<Registry>,
        env: SystemEnv,
        read_timeout: std::time::Duration,
        clock: std::time::Instant,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => return,
                () = env.sleep(read_timeout) => {},
            }

            #[allow(clippy::cast_possible_truncation)]
            let now_ms = clock.elapsed().as_millis() as u64;
            #[allow(clippy::cast_possible_truncation)]
            let idle_threshold_ms = read_timeout.as_millis() as u64;

            for handle in registry.snapshot() {
                if now_ms.saturating_sub(handle.last_activity_ms()) >= idle_threshold_ms {
                    // Signal only; the owning read task removes itself from
                    // the registry and logs `transport.disconnect` once it
                    // observes this on its own loop.
                    handle.request_close();
                }
            }
        }
    }
}

struct RunConnectionArgs {
    connection_id: u64,
    read_half: OwnedReadHalf,
    registry: Arc<Registry>,
    executor: Arc<dyn CommandExecutor>,
    credential: Option<CredentialRecord>,
    max_frame_size: i32,
    read_timeout: std::time::Duration,
    clock: std::time::Instant,
    /// Cancelled by the idle reaper (this connection only) or cascaded from
    /// `shutdown` (every connection). Either way this loop exits through its
    /// normal close path rather than being aborted from outside.
    close_token: CancellationToken,
    /// The manager's root token, consulted only to tell the two cancellation
    /// sources apart for the disconnect reason.
    shutdown: CancellationToken,
}

/// Body of one connection's read task: owns the receive buffer and the pure
/// `Connection` state machine, never shared with any other task.
async fn run_connection(args: RunConnectionArgs) {
    let RunConnectionArgs {
        connection_id,
        mut read_half,
        registry,
        executor,
        credential,
        max_frame_size,
        read_timeout,
        clock,
        close_token,
        shutdown,
    } = args;

    let session_start = std::time::Instant::now();
    let mut conn: Connection<std::time::Instant> = Connection::new(session_start);
    let mut buffer: Vec<u8> = Vec::new();
    let mut authenticated_session_started = false;
    #[allow(clippy::cast_sign_loss)]
    let max_buffer = 2 * max_frame_size as usize;

    let close_reason = 'outer: loop {
        let read_outcome = tokio::select! {
            () = close_token.cancelled() => {
                let reason = if shutdown.is_cancelled() { "server shutdown" } else { "idle timeout" };
                break 'outer reason.to_string();
            },
            outcome = read_more(&mut read_half, read_timeout) => outcome,
        };

        match read_outcome {
            ReadOutcome::Closed => break 'outer "peer closed connection".to_string(),
            ReadOutcome::TimedOut => break 'outer "read timeout".to_string(),
            ReadOutcome::Error(err) => break 'outer format!("read error: {err}"),
            ReadOutcome::Data(chunk) => {
                if buffer.len() + chunk.len() > max_buffer {
                    break 'outer "receive buffer exceeded".to_string();
                }
                buffer.extend_from_slice(&chunk);
            },
        }

        #[allow(clippy::cast_possible_truncation)]
        let now_ms = clock.elapsed().as_millis() as u64;
        if let Some(handle) = registry.get(connection_id) {
            handle.touch(now_ms);
        } else {
            // Defensive: nothing else removes this entry while the task
            // owning it is still running, but a registry is shared state.
            break 'outer "closed by manager".to_string();
        }

        loop {
            match try_decode_one(&buffer, max_frame_size) {
                Ok(DecodeOutcome::Need(_)) => break,
                Ok(DecodeOutcome::Invalid(violation)) => {
                    tracing::warn!(connection_id, %violation, "protocol.packet.invalid");
                    break 'outer format!("invalid frame: {violation}");
                },
                Err(err) => {
                    tracing::warn!(connection_id, error = %err, "protocol.packet.invalid");
                    break 'outer format!("codec error: {err}");
                },
                Ok(DecodeOutcome::Frame(packet, consumed)) => {
                    buffer.drain(..consumed);

                    match dispatch(
                        connection_id,
                        &mut conn,
                        &packet,
                        credential.as_ref(),
                        &registry,
                        &executor,
                        max_frame_size,
                        &mut authenticated_session_started,
                    )
                    .await
                    {
                        Ok(()) => {},
                        Err(reason) => break 'outer reason,
                    }
                },
            }
        }
    };

    let commands_executed = conn.commands_executed();
    #[allow(clippy::cast_possible_truncation)]
    let session_duration_ms = session_start.elapsed().as_millis() as u64;

    registry.remove(connection_id);

    tracing::info!(connection_id, reason = %close_reason, session_duration_ms, "transport.disconnect");
    if authenticated_session_started {
        tracing::info!(connection_id, commands_executed, "application.session.end");
    }
}

/// Feed one decoded packet through the state machine and execute the
/// resulting actions. Returns `Err(reason)` when the connection must close.
///
/// Sets `*authenticated_session_started = true` the moment authentication
/// actually succeeds; `conn.state()` alone can't tell the caller this later,
/// since a failed auth or a protocol violation both end in `Closed` too.
#[allow(clippy::too_many_arguments)]
async fn dispatch(
    connection_id: u64,
    conn: &mut Connection<std::time::Instant>,
    packet: &Packet,
    credential: Option<&CredentialRecord>,
    registry: &Registry,
    executor: &Arc<dyn CommandExecutor>,
    max_frame_size: i32,
    authenticated_session_started: &mut bool,
) -> Result<(), String> {
    let was_unauthenticated = conn.state() == ConnectionState::Unauthenticated;
    let is_auth_attempt = was_unauthenticated && packet.type_code == rcon_protocol::TYPE_AUTH;

    let result = conn.handle_packet(packet, credential, std::time::Instant::now());

    if is_auth_attempt {
        let succeeded = conn.state() == ConnectionState::Authenticated;
        tracing::info!(connection_id, result = if succeeded { "success" } else { "failure" }, "protocol.auth");
        if succeeded {
            *authenticated_session_started = true;
            tracing::info!(connection_id, "application.session.start");
        }
    }

    match result {
        Ok(actions) => {
            for action in actions {
                run_action(action, registry, connection_id, executor, max_frame_size).await?;
            }
            Ok(())
        },
        Err(ConnectionError::ReAuthenticationRefused) => Err("re-authentication refused".to_string()),
        Err(err) => {
            tracing::warn!(connection_id, error = %err, "protocol.packet.invalid");
            Err(err.to_string())
        },
    }
}

async fn run_action(
    action: ConnectionAction,
    registry: &Registry,
    connection_id: u64,
    executor: &Arc<dyn CommandExecutor>,
    max_frame_size: i32,
) -> Result<(), String> {
    match action {
        ConnectionAction::SendPacket(packet) => {
            send_packet(registry, connection_id, &packet, max_frame_size).await
        },
        ConnectionAction::SubmitCommand { request_id, command } => {
            let command_name = command.split_whitespace().next().unwrap_or("").to_string();
            let start = std::time::Instant::now();
            let outcome = executor.execute(&command).await;
            #[allow(clippy::cast_possible_truncation)]
            let execution_time_ms = start.elapsed().as_millis() as u64;

            let body = match &outcome {
                Ok(output) => output.clone(),
                Err(err) => format!("ERROR: {err}"),
            };

            tracing::info!(
                connection_id,
                command_name,
                result = if outcome.is_ok() { "ok" } else { "error" },
                execution_time_ms,
                "command.execute"
            );

            let response = Packet::response_value(request_id, body);
            send_packet(registry, connection_id, &response, max_frame_size).await
        },
        ConnectionAction::Close { reason } => Err(reason),
    }
}

async fn send_packet(
    registry: &Registry,
    connection_id: u64,
    packet: &Packet,
    max_frame_size: i32,
) -> Result<(), String> {
    let Some(handle) = registry.get(connection_id) else {
        return Ok(());
    };
    let wire = packet.encode(max_frame_size).map_err(|e| e.to_string())?;
    handle.write_all(&wire).await.map_err(|e| e.to_string())
}

enum ReadOutcome {
    Data(Vec<u8>),
    Closed,
    TimedOut,
    Error(std::io::Error),
}

async fn read_more(read_half: &mut OwnedReadHalf, read_timeout: std::time::Duration) -> ReadOutcome {
    let mut scratch = [0u8; 4096];
    match tokio::time::timeout(read_timeout, read_half.read(&mut scratch)).await {
        Err(_elapsed) => ReadOutcome::TimedOut,
        Ok(Ok(0)) => ReadOutcome::Closed,
        Ok(Ok(n)) => ReadOutcome::Data(scratch[..n].to_vec()),
        Ok(Err(err)) => ReadOutcome::Error(err),
    }
}
