//! Thin async TCP client speaking the same length-prefixed `rkyv` wire
//! protocol as the server (`arena_core::net`). Rendering, input capture,
//! and the render-frame loop are external collaborators; this just gets
//! typed messages on and off the wire.

use arena_core::net::{ClientMessage, InputMsg, MAX_FRAME_SIZE, ServerMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    pub async fn connect(addr: impl ToSocketAddrs) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Sends `Join` and blocks for the server's `Joined`/`JoinDenied` reply.
    pub async fn join(&mut self, room: impl Into<String>) -> anyhow::Result<String> {
        self.send(&ClientMessage::Join { room: room.into() }).await?;
        match self.recv().await? {
            Some(ServerMessage::Joined { session_id }) => Ok(session_id),
            Some(ServerMessage::JoinDenied { reason }) => {
                anyhow::bail!("join denied: {reason}")
            }
            Some(_) => anyhow::bail!("unexpected message before Joined"),
            None => anyhow::bail!("connection closed before Joined"),
        }
    }

    pub async fn send_input(&mut self, input: InputMsg) -> anyhow::Result<()> {
        self.send(&ClientMessage::Input(input)).await
    }

    pub async fn send_shoot(&mut self, angle: f32) -> anyhow::Result<()> {
        self.send(&ClientMessage::Shoot { angle }).await
    }

    pub async fn send_ping(&mut self) -> anyhow::Result<()> {
        self.send(&ClientMessage::Ping).await
    }

    async fn send(&mut self, msg: &ClientMessage) -> anyhow::Result<()> {
        let framed = msg.serialize()?;
        self.stream.write_all(&framed).await?;
        Ok(())
    }

    /// Reads the next server message, or `None` on a clean stream close.
    pub async fn recv(&mut self) -> anyhow::Result<Option<ServerMessage>> {
        let mut len_buf = [0u8; 4];
        match self.stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_SIZE {
            anyhow::bail!("server frame exceeds max size ({len} > {MAX_FRAME_SIZE})");
        }
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await?;
        Ok(Some(ServerMessage::deserialize(&payload)?))
    }
}
