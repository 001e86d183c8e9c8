//! L8 — H2 connection: one multiplexed socket shared by many streams.
//!
//! A single actor task owns the socket and the HPACK encoder/decoder (both
//! are strictly sequential per connection). Callers talk to it through
//! [`ConnCommand`]; each open stream gets a [`StreamHandle`] back and an
//! `Arc<FlowWindow>` it can push DATA frames against without going back
//! through the actor's command queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use super::flow::FlowWindow;
use super::frame::{self, Frame};
use super::hpack::{Decoder as HpackDecoder, Encoder as HpackEncoder};
use super::stream::{StreamCommand, StreamEntry, StreamHandle, StreamState};
use crate::error::{Error, Result};

pub const DEFAULT_INITIAL_WINDOW: u32 = 65_535;
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;
const HEADER_BLOCK_LIMIT: usize = 80 * 1024;
const READ_CHUNK: usize = 16 * 1024;

/// How long a new connection waits for the peer's SETTINGS to arrive and
/// for our own SETTINGS to be acked before a request can open its first
/// stream (spec §4.8).
const SETTINGS_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    /// RFC 7540 §6.5.2's assumed-peer defaults — used as the baseline for
    /// `peer_settings` until a real SETTINGS frame arrives, *not* as this
    /// client's own advertised settings (see [`Settings::advertised`]).
    fn default() -> Self {
        Settings {
            header_table_size: 4096,
            enable_push: false,
            max_concurrent_streams: None,
            initial_window_size: DEFAULT_INITIAL_WINDOW,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_list_size: None,
        }
    }
}

impl Settings {
    /// The settings this client actually advertises to a peer, built from
    /// the engine's performance config (spec: 2 MiB initial stream window,
    /// 64 KiB max frame size) rather than the protocol's conservative
    /// assumed-peer defaults above.
    #[must_use]
    pub fn advertised(perf: &crate::config::PerformanceConfig) -> Self {
        Settings {
            header_table_size: perf.h2_header_table_size,
            enable_push: false,
            max_concurrent_streams: None,
            initial_window_size: perf.h2_initial_stream_window,
            max_frame_size: perf.h2_max_frame_size,
            max_header_list_size: None,
        }
    }
}

fn settings_to_frame(s: &Settings) -> Frame {
    let mut params = vec![
        frame::SettingPair { id: frame::setting_id::ENABLE_PUSH, value: 0 },
        frame::SettingPair {
            id: frame::setting_id::INITIAL_WINDOW_SIZE,
            value: s.initial_window_size,
        },
        frame::SettingPair { id: frame::setting_id::HEADER_TABLE_SIZE, value: s.header_table_size },
    ];
    if let Some(max) = s.max_concurrent_streams {
        params.push(frame::SettingPair { id: frame::setting_id::MAX_CONCURRENT_STREAMS, value: max });
    }
    Frame::Settings { ack: false, params }
}

pub enum ConnCommand {
    Request {
        header_list: Vec<(String, String)>,
        body_known_empty: bool,
        respond_to: oneshot::Sender<Result<StreamHandle>>,
    },
    Shutdown,
}

pub const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Spawn the connection actor over an already-TLS/ALPN-negotiated duplex
/// stream. `conn_window_target` raises the connection-level receive window
/// above RFC 7540's 65535-byte default at handshake time (spec §4.8).
/// Returns a command sender the [`super::client::H2Client`] facade drives.
pub fn spawn<T>(io: T, local_settings: Settings, conn_window_target: u32) -> mpsc::Sender<ConnCommand>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (commands_tx, commands_rx) = mpsc::channel(64);
    let actor = Actor::new(io, local_settings, conn_window_target, commands_rx);
    tokio::spawn(actor.run());
    commands_tx
}

struct PendingHeaderBlock {
    buf: BytesMut,
    end_stream: bool,
}

struct Actor<T> {
    io: T,
    read_buf: BytesMut,
    encoder: HpackEncoder,
    decoder: HpackDecoder,
    streams: HashMap<u32, StreamEntry>,
    stream_send_windows: HashMap<u32, Arc<FlowWindow>>,
    pending_headers: HashMap<u32, PendingHeaderBlock>,
    next_stream_id: u32,
    conn_send_window: Arc<FlowWindow>,
    conn_recv_window: i64,
    conn_window_target: u32,
    local_settings: Settings,
    peer_settings: Settings,
    goaway_received: Option<u32>,
    /// Set once the peer's SETTINGS has been received *and* the peer has
    /// acked ours (spec §4.8). `open_stream` queues requests in
    /// `pending_requests` until this flips true.
    ready: bool,
    peer_settings_received: bool,
    our_settings_acked: bool,
    pending_requests: Vec<(Vec<(String, String)>, bool, oneshot::Sender<Result<StreamHandle>>)>,
    commands_rx: mpsc::Receiver<ConnCommand>,
    write_tx: mpsc::UnboundedSender<Vec<Frame>>,
    write_rx: mpsc::UnboundedReceiver<Vec<Frame>>,
}

impl<T> Actor<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn new(
        io: T,
        local_settings: Settings,
        conn_window_target: u32,
        commands_rx: mpsc::Receiver<ConnCommand>,
    ) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        Actor {
            io,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            encoder: HpackEncoder::new(local_settings.header_table_size as usize),
            decoder: HpackDecoder::new(local_settings.header_table_size as usize),
            streams: HashMap::new(),
            stream_send_windows: HashMap::new(),
            pending_headers: HashMap::new(),
            next_stream_id: 1,
            conn_recv_window: i64::from(DEFAULT_INITIAL_WINDOW),
            conn_window_target,
            conn_send_window: Arc::new(FlowWindow::new(DEFAULT_INITIAL_WINDOW as i64)),
            peer_settings: Settings::default(),
            local_settings,
            goaway_received: None,
            ready: false,
            peer_settings_received: false,
            our_settings_acked: false,
            pending_requests: Vec::new(),
            commands_rx,
            write_tx,
            write_rx,
        }
    }

    async fn run(mut self) {
        if let Err(e) = self.handshake().await {
            tracing::warn!(error = %e, "h2 connection handshake failed");
            return;
        }

        let settings_deadline = tokio::time::sleep(SETTINGS_EXCHANGE_TIMEOUT);
        tokio::pin!(settings_deadline);
        let mut fatal = false;

        let mut read_chunk = vec![0u8; READ_CHUNK];
        loop {
            tokio::select! {
                biased;

                () = &mut settings_deadline, if !self.ready => {
                    tracing::warn!("h2 settings exchange did not complete within 5s, closing connection");
                    fatal = true;
                    break;
                }

                frames = self.write_rx.recv() => {
                    match frames {
                        Some(frames) => {
                            if let Err(e) = self.write_frames(&frames).await {
                                tracing::warn!(error = %e, "h2 write failed, closing connection");
                                break;
                            }
                        }
                        None => break,
                    }
                }

                cmd = self.commands_rx.recv() => {
                    match cmd {
                        Some(ConnCommand::Request { header_list, body_known_empty, respond_to }) => {
                            self.open_stream(header_list, body_known_empty, respond_to);
                        }
                        Some(ConnCommand::Shutdown) => {
                            self.shutdown(frame::error_code::NO_ERROR).await;
                            return;
                        }
                        None => break,
                    }
                }

                n = self.io.read(&mut read_chunk) => {
                    match n {
                        Ok(0) => break,
                        Ok(n) => {
                            self.read_buf.extend_from_slice(&read_chunk[..n]);
                            if let Err(e) = self.process_read_buf().await {
                                tracing::warn!(error = %e, "h2 protocol error, closing connection");
                                fatal = true;
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "h2 socket read failed");
                            break;
                        }
                    }
                }
            }
        }

        let reason = if fatal { "h2 connection closed after a protocol error" } else { "h2 connection closed" };
        for (header_list, body_known_empty, respond_to) in self.pending_requests.drain(..) {
            let _ = (header_list, body_known_empty);
            let _ = respond_to.send(Err(Error::connect(reason)));
        }
        for (_, entry) in self.streams.drain() {
            let mut entry = entry;
            entry.reject_with(Error::connect(reason));
        }
    }

    /// Local shutdown (spec §4.8's `close()`): GOAWAY(NO_ERROR) at the
    /// highest stream id we initiated, then fail every open stream with
    /// CANCEL and cancel the connection send window so any in-flight
    /// `drive_stream_commands` task stops trying to write DATA.
    async fn shutdown(&mut self, error_code: u32) {
        if let Err(e) = self.write_goaway(error_code).await {
            tracing::warn!(error = %e, "failed to write GOAWAY during shutdown");
        }
        self.conn_send_window.cancel();
        for (header_list, body_known_empty, respond_to) in self.pending_requests.drain(..) {
            let _ = (header_list, body_known_empty);
            let _ = respond_to.send(Err(Error::stream_reset("h2 connection shutting down")));
        }
        for (_, entry) in self.streams.drain() {
            let mut entry = entry;
            entry.reject_with(Error::stream_reset("h2 connection shutting down"));
        }
    }

    async fn write_goaway(&mut self, error_code: u32) -> Result<()> {
        let last_stream_id = self.next_stream_id.saturating_sub(2);
        let mut buf = BytesMut::new();
        Frame::GoAway { last_stream_id, error_code, debug_data: Bytes::new() }.encode(&mut buf);
        self.io.write_all(&buf).await?;
        Ok(())
    }

    async fn handshake(&mut self) -> Result<()> {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(PREFACE);
        settings_to_frame(&self.local_settings).encode(&mut buf);
        let target = i64::from(self.conn_window_target);
        if target > i64::from(DEFAULT_INITIAL_WINDOW) {
            let increment = (target - i64::from(DEFAULT_INITIAL_WINDOW)) as u32;
            Frame::WindowUpdate { stream_id: 0, increment }.encode(&mut buf);
            self.conn_recv_window = target;
        }
        self.io.write_all(&buf).await?;
        Ok(())
    }

    async fn write_frames(&mut self, frames: &[Frame]) -> Result<()> {
        let mut buf = BytesMut::new();
        for f in frames {
            f.encode(&mut buf);
        }
        self.io.write_all(&buf).await?;
        Ok(())
    }

    /// Gate on readiness (spec §4.8): a request arriving before the peer's
    /// SETTINGS has been received and acked is queued in `pending_requests`
    /// and drained by [`Self::maybe_become_ready`] once both land.
    fn open_stream(
        &mut self,
        header_list: Vec<(String, String)>,
        body_known_empty: bool,
        respond_to: oneshot::Sender<Result<StreamHandle>>,
    ) {
        if self.goaway_received.is_some() {
            let _ = respond_to.send(Err(Error::connect("h2 connection is draining (GOAWAY received)")));
            return;
        }
        if !self.ready {
            self.pending_requests.push((header_list, body_known_empty, respond_to));
            return;
        }
        let result = self.open_stream_now(header_list, body_known_empty);
        let _ = respond_to.send(result);
    }

    /// Called whenever peer-settings-received or our-settings-acked
    /// changes; flips `ready` once both hold and drains any requests that
    /// arrived before the handshake finished.
    fn maybe_become_ready(&mut self) {
        if !self.ready && self.peer_settings_received && self.our_settings_acked {
            self.ready = true;
            let pending = std::mem::take(&mut self.pending_requests);
            for (header_list, body_known_empty, respond_to) in pending {
                let result = self.open_stream_now(header_list, body_known_empty);
                let _ = respond_to.send(result);
            }
        }
    }

    fn open_stream_now(
        &mut self,
        header_list: Vec<(String, String)>,
        body_known_empty: bool,
    ) -> Result<StreamHandle> {
        let stream_id = self.next_stream_id;
        self.next_stream_id += 2;

        let block = self.encoder.encode_block(&header_list);
        let max_frame = self.peer_settings.max_frame_size.max(DEFAULT_MAX_FRAME_SIZE) as usize;
        let frames = build_headers_frames(stream_id, block, body_known_empty, max_frame)?;

        let (headers_tx, headers_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(32);
        let (commands_tx, mut stream_commands_rx) = mpsc::channel(16);

        let send_window = Arc::new(FlowWindow::new(self.peer_settings.initial_window_size as i64));
        self.stream_send_windows.insert(stream_id, send_window.clone());

        let state = if body_known_empty {
            StreamState::Idle.on_send_headers().on_send_end_stream()
        } else {
            StreamState::Idle.on_send_headers()
        };

        self.streams.insert(
            stream_id,
            StreamEntry {
                state,
                recv_window: self.local_settings.initial_window_size as i64,
                headers_tx: Some(headers_tx),
                body_tx,
                response_headers_sent: false,
            },
        );

        self.write_tx
            .send(frames)
            .map_err(|_| Error::connect("h2 connection actor is gone"))?;

        let write_tx = self.write_tx.clone();
        let conn_send_window = self.conn_send_window.clone();
        tokio::spawn(async move {
            drive_stream_commands(
                stream_id,
                send_window,
                conn_send_window,
                write_tx,
                &mut stream_commands_rx,
                max_frame,
            )
            .await;
        });

        Ok(StreamHandle { stream_id, headers_rx, body_rx, commands_tx })
    }

    async fn process_read_buf(&mut self) -> Result<()> {
        loop {
            let mut cursor = Bytes::copy_from_slice(&self.read_buf);
            let before_len = cursor.len();
            match Frame::decode(&mut cursor, self.local_settings.max_frame_size)? {
                None => break,
                Some(frame) => {
                    let consumed = before_len - cursor.len();
                    let _ = self.read_buf.split_to(consumed);
                    self.handle_frame(frame).await?;
                }
            }
        }
        Ok(())
    }

    async fn handle_frame(&mut self, frame: Frame) -> Result<()> {
        match frame {
            Frame::Settings { ack, params } => {
                if ack {
                    self.our_settings_acked = true;
                    self.maybe_become_ready();
                    return Ok(());
                }
                for p in &params {
                    self.apply_setting(p.id, p.value)?;
                }
                self.peer_settings_received = true;
                self.write_tx
                    .send(vec![Frame::Settings { ack: true, params: Vec::new() }])
                    .map_err(|_| Error::connect("h2 connection actor is gone"))?;
                self.maybe_become_ready();
            }
            Frame::Ping { ack, payload } => {
                if !ack {
                    self.write_tx
                        .send(vec![Frame::Ping { ack: true, payload }])
                        .map_err(|_| Error::connect("h2 connection actor is gone"))?;
                }
            }
            Frame::WindowUpdate { stream_id, increment } => {
                if increment == 0 {
                    if stream_id == 0 {
                        self.write_goaway(frame::error_code::PROTOCOL_ERROR).await?;
                        return Err(Error::protocol("WINDOW_UPDATE with zero increment on connection"));
                    }
                    self.write_tx
                        .send(vec![Frame::RstStream { stream_id, error_code: frame::error_code::PROTOCOL_ERROR }])
                        .map_err(|_| Error::connect("h2 connection actor is gone"))?;
                    if let Some(mut entry) = self.streams.remove(&stream_id) {
                        entry.reject_with(Error::stream_reset("WINDOW_UPDATE with zero increment"));
                    }
                    self.stream_send_windows.remove(&stream_id);
                } else if stream_id == 0 {
                    self.conn_send_window.update(i64::from(increment))?;
                } else if let Some(w) = self.stream_send_windows.get(&stream_id) {
                    w.update(i64::from(increment))?;
                }
            }
            Frame::GoAway { last_stream_id, error_code, .. } => {
                self.goaway_received = Some(last_stream_id);
                for (id, entry) in self.streams.iter_mut() {
                    if *id > last_stream_id {
                        entry.reject_with(Error::connect(format!(
                            "h2 GOAWAY: stream not processed by peer (error {error_code})"
                        )));
                    }
                }
            }
            Frame::RstStream { stream_id, error_code } => {
                if let Some(mut entry) = self.streams.remove(&stream_id) {
                    entry.reject_with(Error::stream_reset(format!(
                        "RST_STREAM received (error code {error_code})"
                    )));
                }
                self.stream_send_windows.remove(&stream_id);
            }
            Frame::Headers { stream_id, end_stream, end_headers, block } => {
                self.begin_header_block(stream_id, end_stream, end_headers, block)?;
            }
            Frame::Continuation { stream_id, end_headers, block } => {
                self.continue_header_block(stream_id, end_headers, block)?;
            }
            Frame::Data { stream_id, end_stream, data } => {
                self.handle_data(stream_id, end_stream, data).await?;
            }
            Frame::PushPromise { stream_id: _ } => {
                // Server push is not supported (spec Non-goals): a pushed
                // stream isn't a per-stream refusal, it's a protocol
                // violation for this client's whole connection.
                self.write_goaway(frame::error_code::PROTOCOL_ERROR).await?;
                return Err(Error::protocol("PUSH_PROMISE received; server push is not supported"));
            }
            Frame::Priority { .. } | Frame::Unknown { .. } => {}
        }
        Ok(())
    }

    fn apply_setting(&mut self, id: u16, value: u32) -> Result<()> {
        use frame::setting_id::*;
        match id {
            HEADER_TABLE_SIZE => {
                self.peer_settings.header_table_size = value;
                self.encoder.set_max_dynamic_table_size(value as usize);
            }
            ENABLE_PUSH => self.peer_settings.enable_push = value != 0,
            MAX_CONCURRENT_STREAMS => self.peer_settings.max_concurrent_streams = Some(value),
            INITIAL_WINDOW_SIZE => {
                let old = self.peer_settings.initial_window_size;
                self.peer_settings.initial_window_size = value;
                for w in self.stream_send_windows.values() {
                    w.reset(i64::from(value), i64::from(old))?;
                }
            }
            MAX_FRAME_SIZE => self.peer_settings.max_frame_size = value,
            MAX_HEADER_LIST_SIZE => self.peer_settings.max_header_list_size = Some(value),
            _ => {}
        }
        Ok(())
    }

    fn begin_header_block(
        &mut self,
        stream_id: u32,
        end_stream: bool,
        end_headers: bool,
        block: Bytes,
    ) -> Result<()> {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&block);
        if end_headers {
            self.finalize_header_block(stream_id, end_stream, buf.freeze())
        } else {
            self.pending_headers.insert(stream_id, PendingHeaderBlock { buf, end_stream });
            Ok(())
        }
    }

    fn continue_header_block(&mut self, stream_id: u32, end_headers: bool, block: Bytes) -> Result<()> {
        let pending = self
            .pending_headers
            .get_mut(&stream_id)
            .ok_or_else(|| Error::protocol("CONTINUATION with no preceding HEADERS"))?;
        pending.buf.extend_from_slice(&block);
        if pending.buf.len() > HEADER_BLOCK_LIMIT {
            return Err(Error::protocol("HEADERS/CONTINUATION block exceeds 80 KiB bound"));
        }
        if end_headers {
            let PendingHeaderBlock { buf, end_stream } =
                self.pending_headers.remove(&stream_id).expect("just matched");
            self.finalize_header_block(stream_id, end_stream, buf.freeze())
        } else {
            Ok(())
        }
    }

    fn finalize_header_block(&mut self, stream_id: u32, end_stream: bool, block: Bytes) -> Result<()> {
        let decoded = self.decoder.decode_block(&block)?;

        let entry = match self.streams.get_mut(&stream_id) {
            Some(e) => e,
            None => return Ok(()), // stream already closed/reset locally
        };

        if !entry.response_headers_sent {
            let mut status = StatusCode::OK;
            let mut headers = HeaderMap::new();
            let mut raw_headers = Vec::new();
            for (name, value) in decoded {
                if name == ":status" {
                    status = StatusCode::from_bytes(value.as_bytes())
                        .map_err(|_| Error::protocol("invalid :status pseudo-header"))?;
                } else if !name.starts_with(':') {
                    if let (Ok(hn), Ok(hv)) = (
                        http::HeaderName::from_bytes(name.as_bytes()),
                        http::HeaderValue::from_str(&value),
                    ) {
                        headers.append(hn, hv);
                    }
                    raw_headers.push((name, value));
                }
            }
            entry.response_headers_sent = true;
            if let Some(tx) = entry.headers_tx.take() {
                let _ = tx.send(Ok((status, headers, raw_headers)));
            }
        }

        if end_stream {
            entry.state = entry.state.on_recv_end_stream();
            if entry.state.is_closed() {
                self.streams.remove(&stream_id);
                self.stream_send_windows.remove(&stream_id);
            }
        }
        Ok(())
    }

    async fn handle_data(&mut self, stream_id: u32, end_stream: bool, data: Bytes) -> Result<()> {
        let len = data.len() as i64;
        self.conn_recv_window -= len;

        let mut remove = false;
        if let Some(entry) = self.streams.get_mut(&stream_id) {
            entry.recv_window -= len;
            if !data.is_empty() {
                let _ = entry.body_tx.send(Ok(data)).await;
            }
            if end_stream {
                entry.state = entry.state.on_recv_end_stream();
                if entry.state.is_closed() {
                    remove = true;
                }
            } else if entry.recv_window < i64::from(self.local_settings.initial_window_size) / 2 {
                let increment = i64::from(self.local_settings.initial_window_size) - entry.recv_window;
                entry.recv_window += increment;
                self.write_tx
                    .send(vec![Frame::WindowUpdate { stream_id, increment: increment as u32 }])
                    .map_err(|_| Error::connect("h2 connection actor is gone"))?;
            }
        }
        if remove {
            self.streams.remove(&stream_id);
            self.stream_send_windows.remove(&stream_id);
        }

        if self.conn_recv_window < i64::from(self.local_settings.initial_window_size) / 2 {
            let increment = i64::from(self.local_settings.initial_window_size) - self.conn_recv_window;
            self.conn_recv_window += increment;
            self.write_tx
                .send(vec![Frame::WindowUpdate { stream_id: 0, increment: increment as u32 }])
                .map_err(|_| Error::connect("h2 connection actor is gone"))?;
        }
        Ok(())
    }
}

fn build_headers_frames(
    stream_id: u32,
    block: Bytes,
    end_stream: bool,
    max_frame_size: usize,
) -> Result<Vec<Frame>> {
    if block.is_empty() {
        return Ok(vec![Frame::Headers { stream_id, end_stream, end_headers: true, block }]);
    }
    let mut frames = Vec::new();
    let mut offset = 0;
    let total = block.len();
    let mut first = true;
    while offset < total {
        let end = (offset + max_frame_size).min(total);
        let chunk = block.slice(offset..end);
        let is_last = end == total;
        if first {
            frames.push(Frame::Headers { stream_id, end_stream, end_headers: is_last, block: chunk });
            first = false;
        } else {
            frames.push(Frame::Continuation { stream_id, end_headers: is_last, block: chunk });
        }
        offset = end;
    }
    Ok(frames)
}

async fn drive_stream_commands(
    stream_id: u32,
    send_window: Arc<FlowWindow>,
    conn_send_window: Arc<FlowWindow>,
    write_tx: mpsc::UnboundedSender<Vec<Frame>>,
    commands_rx: &mut mpsc::Receiver<StreamCommand>,
    max_frame_size: usize,
) {
    while let Some(cmd) = commands_rx.recv().await {
        match cmd {
            StreamCommand::Data(mut data) => {
                while !data.is_empty() {
                    let take = data.len().min(max_frame_size);
                    let chunk = data.split_to(take);
                    if send_window.consume(chunk.len() as i64).await.is_err() {
                        return;
                    }
                    if conn_send_window.consume(chunk.len() as i64).await.is_err() {
                        return;
                    }
                    if write_tx
                        .send(vec![Frame::Data { stream_id, end_stream: false, data: chunk }])
                        .is_err()
                    {
                        return;
                    }
                }
            }
            StreamCommand::EndData => {
                let _ = write_tx.send(vec![Frame::Data {
                    stream_id,
                    end_stream: true,
                    data: Bytes::new(),
                }]);
                return;
            }
            StreamCommand::Cancel(id) => {
                let _ = write_tx.send(vec![Frame::RstStream {
                    stream_id: id,
                    error_code: frame::error_code::CANCEL,
                }]);
                return;
            }
        }
    }
}
