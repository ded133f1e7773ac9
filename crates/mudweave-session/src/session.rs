//! Game session: one connection, two pumps, one event stream.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use mudweave_core::{
    ChannelId, Error, GameConfig, Result, SessionEvent, SessionId, SessionState, MAIN_CHANNEL,
};
use mudweave_map::{CommandResult, MapNotification, Mapper};

use crate::completer::Completer;
use crate::hook::{ChainOutcome, Hook, HookChain};
use crate::queue::LineQueue;
use crate::telnet::{TelnetFilter, Utf8Decoder};

/// Receives every event of a session. Called from both pump threads and
/// from the caller's thread.
pub type EventCallback = Arc<dyn Fn(&Session, SessionEvent) + Send + Sync>;

const READ_BUFFER_SIZE: usize = 4096;
const CYCLE_HINT: &str = "Mapper: Found cycle. 'map nocycle' to disagree";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    config: Arc<GameConfig>,
    input_hooks: Vec<Arc<dyn Hook>>,
    output_hooks: Vec<Arc<dyn Hook>>,
    callback: Option<EventCallback>,
}

impl SessionBuilder {
    /// Append a hook for inbound lines, after the configured ones.
    pub fn input_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.input_hooks.push(Arc::new(hook));
        self
    }

    /// Append a hook for outbound lines, after the configured ones.
    pub fn output_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.output_hooks.push(Arc::new(hook));
        self
    }

    /// Set the event callback.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Session, SessionEvent) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Build the session. Fails if a configured hook does not compile.
    pub fn build(self) -> Result<Arc<Session>> {
        let mut input_hooks = HookChain::from_config(&self.config.input_hooks)?;
        for hook in self.input_hooks {
            input_hooks.push_shared(hook);
        }
        let mut output_hooks = HookChain::from_config(&self.config.output_hooks)?;
        for hook in self.output_hooks {
            output_hooks.push_shared(hook);
        }

        let directions = Arc::new(self.config.directions.clone());
        let mapper = Mapper::new(directions, self.config.map_dir.clone());
        let callback = self.callback.unwrap_or_else(|| Arc::new(|_, _| {}));

        let session = Session {
            id: SessionId::new(),
            config: self.config,
            state: Mutex::new(SessionState::Disconnected),
            stream: Mutex::new(None),
            channels: Mutex::new(BTreeMap::new()),
            input: Arc::new(LineQueue::new()),
            input_hooks,
            output_hooks,
            mapper: Mutex::new(mapper),
            completer: Mutex::new(Completer::new()),
            callback,
            closed_emitted: AtomicBool::new(false),
        };
        debug!(
            "Created session {} for {} ({} input hooks, {} output hooks)",
            session.id,
            session.config.name,
            session.input_hooks.len(),
            session.output_hooks.len()
        );
        Ok(Arc::new(session))
    }
}

/// A game session.
///
/// Text arriving from the game runs through the input hooks into output
/// channel 0. Text queued with [`Session::send`] runs through the output
/// hooks to the game and, unfiltered, into the mapper.
pub struct Session {
    id: SessionId,
    config: Arc<GameConfig>,
    state: Mutex<SessionState>,
    /// Write half of the connection
    stream: Mutex<Option<TcpStream>>,
    channels: Mutex<BTreeMap<ChannelId, Arc<LineQueue>>>,
    /// Lines waiting to be sent to the game
    input: Arc<LineQueue>,
    input_hooks: HookChain,
    output_hooks: HookChain,
    mapper: Mutex<Mapper>,
    completer: Mutex<Completer>,
    callback: EventCallback,
    closed_emitted: AtomicBool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("game", &self.config.name)
            .field("state", &self.state())
            .field("input_hooks", &self.input_hooks)
            .field("output_hooks", &self.output_hooks)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start building a session for `config`.
    pub fn builder(config: Arc<GameConfig>) -> SessionBuilder {
        SessionBuilder {
            config,
            input_hooks: Vec::new(),
            output_hooks: Vec::new(),
            callback: None,
        }
    }

    /// Create a session with the configured hooks and no callback.
    pub fn new(config: Arc<GameConfig>) -> Result<Arc<Self>> {
        Self::builder(config).build()
    }

    /// Get the session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get the game definition.
    pub fn config(&self) -> &Arc<GameConfig> {
        &self.config
    }

    /// Get the lifecycle state.
    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// Whether both pumps are running.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    fn emit(&self, event: SessionEvent) {
        debug!("Session {} event {}", self.id, event.kind());
        (self.callback)(self, event);
    }

    /// Connect to the game and start the pumps.
    ///
    /// The handshake runs on the calling thread. On failure ERROR and CLOSED
    /// are emitted, the session is closed for good and the error returned.
    pub fn connect(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if state.is_terminal() {
                return Err(Error::Connection(format!("session {} is closed", self.id)));
            }
            if *state != SessionState::Disconnected {
                return Err(Error::Connection(format!(
                    "session {} cannot connect from state {:?}",
                    self.id, *state
                )));
            }
            *state = SessionState::Connecting;
        }

        info!(
            "Connecting session {} to {}:{}",
            self.id, self.config.host, self.config.port
        );
        let reader = match self.open_stream() {
            Ok(reader) => reader,
            Err(e) => {
                error!("Connection to {}:{} failed: {}", self.config.host, self.config.port, e);
                self.emit(SessionEvent::Error(e.to_string()));
                self.mark_closed();
                return Err(e);
            }
        };

        *lock(&self.state) = SessionState::Connected;
        self.emit(SessionEvent::Connected);

        let session = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("mudweave-input-{}", self.id))
            .spawn(move || session.input_pump(reader))
            .and_then(|_| {
                let session = Arc::clone(self);
                thread::Builder::new()
                    .name(format!("mudweave-output-{}", self.id))
                    .spawn(move || session.output_pump())
            });
        if let Err(e) = spawned {
            error!("Failed to start pumps for session {}: {}", self.id, e);
            self.emit(SessionEvent::Error(format!("Failed to start pumps: {e}")));
            self.close();
            return Err(e.into());
        }
        Ok(())
    }

    /// Resolve and connect; keeps the write half, returns the read half.
    fn open_stream(&self) -> Result<TcpStream> {
        let addrs = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| Error::Connection(format!("cannot resolve {}: {}", self.config.host, e)))?;

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let mut last_error = None;
        for addr in addrs {
            let attempt = if timeout.is_zero() {
                TcpStream::connect(addr)
            } else {
                TcpStream::connect_timeout(&addr, timeout)
            };
            match attempt {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Cannot disable Nagle on {}: {}", addr, e);
                    }
                    let reader = stream.try_clone()?;
                    *lock(&self.stream) = Some(stream);
                    info!("Session {} connected to {}", self.id, addr);
                    return Ok(reader);
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Connection(match last_error {
            Some(e) => format!("{}:{}: {}", self.config.host, self.config.port, e),
            None => format!("no address for {}", self.config.host),
        }))
    }

    /// Close the session.
    ///
    /// Shuts the socket down, which wakes the input pump, and closes the
    /// send queue, which wakes the output pump. CLOSED is emitted once.
    pub fn close(&self) {
        info!("Closing session {}", self.id);
        if self.input.has_data() {
            debug!("Session {}: unsent input discarded on close", self.id);
        }
        self.shutdown_stream();
        self.input.close();
        self.mark_closed();
    }

    fn shutdown_stream(&self) {
        if let Some(stream) = lock(&self.stream).as_ref() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("Socket shutdown for session {}: {}", self.id, e);
            }
        }
    }

    fn mark_closed(&self) {
        *lock(&self.state) = SessionState::Closed;
        if !self.closed_emitted.swap(true, Ordering::SeqCst) {
            self.emit(SessionEvent::Closed);
        }
    }

    fn input_pump(self: Arc<Self>, mut reader: TcpStream) {
        info!("Input pump started for session {}", self.id);
        let mut filter = TelnetFilter::new();
        let mut decoder = Utf8Decoder::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("Session {}: remote closed the connection", self.id);
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Session {}: read failed: {}", self.id, e);
                    break;
                }
            };

            let filtered = filter.feed(&buf[..n]);
            if !filtered.replies.is_empty() {
                if let Err(e) = self.write_raw(&filtered.replies) {
                    warn!("Session {}: telnet reply failed: {}", self.id, e);
                }
            }
            let text = decoder.decode(&filtered.data);
            if !text.is_empty() {
                self.receive(&text);
            }
        }

        self.input.close();
        self.mark_closed();
        info!("Input pump stopped for session {}", self.id);
    }

    /// Route one batch of inbound text to channel 0.
    fn receive(&self, text: &str) {
        let text = text.replace("\r\n", "\n");
        let special = text.chars().filter(|c| !c.is_ascii()).count();
        if special > 0 {
            debug!("Session {}: {} special characters in batch", self.id, special);
        }

        let main = self.channel(MAIN_CHANNEL);
        for segment in text.split_inclusive('\n') {
            let (line, ending) = match segment.strip_suffix('\n') {
                Some(line) => (line, "\n"),
                None => (segment, ""),
            };
            lock(&self.completer).parse(line);

            match self.input_hooks.apply(self, line.to_string()) {
                ChainOutcome::Pass(line) => main.write(&format!("{line}{ending}")),
                ChainOutcome::Dropped => {}
                ChainOutcome::Failed { line, error } => {
                    error!("Session {}: input hook failed: {}", self.id, error);
                    self.emit(SessionEvent::Error(format!(
                        "Input hook failed on {line:?}: {error}"
                    )));
                    main.write(&format!("{line}{ending}"));
                }
            }
        }
        self.emit(SessionEvent::Stdio(MAIN_CHANNEL));
    }

    fn output_pump(self: Arc<Self>) {
        info!("Output pump started for session {}", self.id);
        loop {
            let data = self.input.read(true);
            if data.is_empty() {
                break;
            }
            for line in data.lines() {
                self.dispatch(line);
            }
        }
        info!("Output pump stopped for session {}", self.id);
    }

    /// Send one outbound line through the output hooks and the mapper.
    fn dispatch(&self, line: &str) {
        match self.output_hooks.apply(self, line.to_string()) {
            ChainOutcome::Pass(out) => self.transmit(&out),
            ChainOutcome::Dropped => {}
            ChainOutcome::Failed { line: out, error } => {
                error!("Session {}: output hook failed: {}", self.id, error);
                self.emit(SessionEvent::Error(format!(
                    "Output hook failed on {out:?}: {error}"
                )));
                self.transmit(&out);
            }
        }
        self.feed_mapper(line);
    }

    fn transmit(&self, line: &str) {
        match self.write_raw(format!("{line}\r\n").as_bytes()) {
            Ok(true) => {}
            Ok(false) => debug!("Session {} not connected, dropped {:?}", self.id, line),
            Err(e) => {
                warn!("Session {}: write failed: {}", self.id, e);
                self.emit(SessionEvent::Error("Connection closed.".to_string()));
                self.shutdown_stream();
            }
        }
    }

    /// Write to the game. `Ok(false)` if there is no connection yet.
    fn write_raw(&self, bytes: &[u8]) -> Result<bool> {
        let mut stream = lock(&self.stream);
        match stream.as_mut() {
            Some(stream) => {
                stream.write_all(bytes)?;
                stream.flush()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Offer an outbound line to the mapper. MAP is emitted for plain moves
    /// as well as for map changes, so front-ends can redraw the current-room
    /// marker.
    fn feed_mapper(&self, line: &str) {
        let result = lock(&self.mapper).handle_input(line.trim());
        match result {
            Ok(Some(MapNotification::NewCycle)) => {
                self.emit(SessionEvent::Info(CYCLE_HINT.to_string()));
                self.emit(SessionEvent::Map);
            }
            Ok(Some(_)) => self.emit(SessionEvent::Map),
            Ok(None) => {}
            Err(e) => debug!("Session {}: mapper ignored {:?}: {}", self.id, line, e),
        }
    }

    /// Queue text for the game. Each call becomes one outbound line; text
    /// sent after close is dropped.
    pub fn send(&self, text: &str) {
        if self.input.is_closed() {
            debug!("Session {} closed, not sending {:?}", self.id, text);
            return;
        }
        self.input.writeln(text);
    }

    /// Take whatever is queued for the game and not yet picked up by the
    /// output pump.
    pub fn pending_input(&self) -> String {
        self.input.read(false)
    }

    /// The queue behind an output channel, created on first use.
    pub fn channel(&self, channel: ChannelId) -> Arc<LineQueue> {
        Arc::clone(
            lock(&self.channels)
                .entry(channel)
                .or_insert_with(|| Arc::new(LineQueue::new())),
        )
    }

    /// Ids of the channels created so far.
    pub fn channels(&self) -> Vec<ChannelId> {
        lock(&self.channels).keys().copied().collect()
    }

    /// Append text to a side channel and announce it.
    pub fn write_to_stream(&self, channel: ChannelId, text: &str) {
        self.channel(channel).write(text);
        self.emit(SessionEvent::Stdio(channel));
    }

    /// Drain a channel without waiting.
    pub fn read_channel(&self, channel: ChannelId) -> String {
        self.channel(channel).read(false)
    }

    /// Drain a channel, waiting up to `timeout` for text.
    pub fn read_channel_timeout(&self, channel: ChannelId, timeout: Duration) -> String {
        self.channel(channel).read_timeout(timeout)
    }

    /// Queue the shortest path to the room named `target` (tag or id).
    pub fn walk(&self, target: &str) -> CommandResult {
        let path = {
            let mapper = lock(&self.mapper);
            let room = mapper
                .map()
                .find_room(target)
                .ok_or_else(|| "Target not found.".to_string())?;
            mapper
                .map()
                .find_shortest_path(room)
                .ok_or_else(|| "No path found.".to_string())?
        };

        if !path.is_empty() {
            self.input.write(&format!("{}\n", path.join("\n")));
        }
        let message = format!("Path is: {}", path.join(" "));
        self.emit(SessionEvent::Info(message.clone()));
        Ok(message)
    }

    /// Run a mapper command. MAP is emitted when it succeeds.
    pub fn map_command(&self, args: &[&str]) -> CommandResult {
        let result = lock(&self.mapper).run_command(args);
        if result.is_ok() {
            self.emit(SessionEvent::Map);
        }
        result
    }

    /// Render the map.
    pub fn render_map(&self, only_current: bool) -> Vec<String> {
        lock(&self.mapper).render(only_current)
    }

    /// Run `f` with exclusive access to the mapper.
    pub fn with_mapper<R>(&self, f: impl FnOnce(&mut Mapper) -> R) -> R {
        f(&mut lock(&self.mapper))
    }

    /// Tab-complete the last word of `text`.
    pub fn complete(&self, text: &str, state: usize) -> Option<String> {
        lock(&self.completer).complete(text, state)
    }
}
