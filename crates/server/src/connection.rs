//! Per-connection TCP I/O. Each accepted stream gets one task here; it owns
//! the socket, decodes/encodes frames, and talks to the simulation task
//! only through channels — it never touches `Room` directly.

use std::net::SocketAddr;

use arena_core::Input;
use arena_core::net::{ClientMessage, MAX_FRAME_SIZE, ServerMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

/// One decoded client input, tagged with the session it came from, carried
/// on the bounded channel feeding the simulation task.
pub struct InputEnvelope {
    pub session_id: String,
    pub input: Input,
}

/// Low-volume, latency-sensitive messages forwarded to the simulation task
/// on an unbounded channel, kept separate from the input stream so a burst
/// of inputs can never delay a shoot or a join.
pub enum ControlMsg {
    Join {
        outbox: mpsc::UnboundedSender<ServerMessage>,
        reply: oneshot::Sender<JoinReply>,
    },
    Shoot {
        session_id: String,
        angle: f32,
    },
    Ping {
        session_id: String,
    },
    Closed {
        session_id: String,
        consented: bool,
    },
}

pub enum JoinReply {
    Joined(String),
    Denied(String),
}

async fn read_frame(reader: &mut ReadHalf<TcpStream>) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "frame exceeds max size",
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

async fn write_message(
    writer: &mut WriteHalf<TcpStream>,
    msg: &ServerMessage,
) -> std::io::Result<()> {
    let framed = msg
        .serialize()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    writer.write_all(&framed).await
}

pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    control_tx: mpsc::UnboundedSender<ControlMsg>,
    input_tx: mpsc::Sender<InputEnvelope>,
) {
    let (mut read_half, mut write_half) = tokio::io::split(stream);

    let first = match read_frame(&mut read_half).await {
        Ok(Some(bytes)) => bytes,
        _ => return,
    };
    let room_name = match ClientMessage::deserialize(&first) {
        Ok(ClientMessage::Join { room }) => room,
        _ => {
            log::debug!("{addr} sent a non-Join first message, dropping");
            return;
        }
    };
    log::debug!("{addr} requesting room {room_name}");

    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (reply_tx, reply_rx) = oneshot::channel();
    if control_tx
        .send(ControlMsg::Join {
            outbox: outbox_tx.clone(),
            reply: reply_tx,
        })
        .is_err()
    {
        return;
    }

    let session_id = match reply_rx.await {
        Ok(JoinReply::Joined(id)) => id,
        Ok(JoinReply::Denied(reason)) => {
            let _ = write_message(&mut write_half, &ServerMessage::JoinDenied { reason }).await;
            return;
        }
        Err(_) => return,
    };

    if write_message(
        &mut write_half,
        &ServerMessage::Joined {
            session_id: session_id.clone(),
        },
    )
    .await
    .is_err()
    {
        let _ = control_tx.send(ControlMsg::Closed {
            session_id,
            consented: false,
        });
        return;
    }

    let write_task = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if write_message(&mut write_half, &msg).await.is_err() {
                break;
            }
        }
    });
    drop(outbox_tx);

    let consented = loop {
        match read_frame(&mut read_half).await {
            Ok(Some(bytes)) => match ClientMessage::deserialize(&bytes) {
                Ok(ClientMessage::Input(input_msg)) => {
                    let input = Input {
                        seq: input_msg.seq,
                        up: input_msg.up,
                        down: input_msg.down,
                        left: input_msg.left,
                        right: input_msg.right,
                        angle: input_msg.angle,
                    };
                    if input_tx
                        .try_send(InputEnvelope {
                            session_id: session_id.clone(),
                            input,
                        })
                        .is_err()
                    {
                        log::debug!("intake channel full, dropping input for {session_id}");
                    }
                }
                Ok(ClientMessage::Shoot { angle }) => {
                    let _ = control_tx.send(ControlMsg::Shoot {
                        session_id: session_id.clone(),
                        angle,
                    });
                }
                Ok(ClientMessage::Ping) => {
                    let _ = control_tx.send(ControlMsg::Ping {
                        session_id: session_id.clone(),
                    });
                }
                Ok(ClientMessage::Join { .. }) => {}
                Err(e) => log::debug!("malformed message from {session_id}: {e}"),
            },
            Ok(None) => break true,
            Err(e) => {
                log::debug!("read error from {session_id}: {e}");
                break false;
            }
        }
    };

    let _ = control_tx.send(ControlMsg::Closed {
        session_id,
        consented,
    });
    let _ = write_task.await;
}
