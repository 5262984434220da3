// core/src/rpc/mod.rs
pub mod message;

use anyhow::{anyhow, Context, Result};
use bincode::config::standard as bincode_config;
use bincode::{decode_from_slice, encode_to_vec};
use message::Message;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame.
pub const MAX_FRAME_LEN: u32 = 10 * 1024 * 1024;

fn encode(message: &Message) -> Result<Vec<u8>> {
    encode_to_vec(message, bincode_config()).context("Failed to encode message")
}

fn decode(buf: &[u8]) -> Result<Message> {
    let (message, _): (Message, usize) =
        decode_from_slice(buf, bincode_config()).context("Failed to decode message")?;
    Ok(message)
}

fn check_len(len: u32) -> Result<()> {
    if len > MAX_FRAME_LEN {
        return Err(anyhow!("Received excessively large frame length: {}", len));
    }
    Ok(())
}

/// Sends a request and waits for the reply.
/// Frames are a little-endian `u32` length followed by the bincode payload.
pub fn request_reply(socket_path: &str, request: &Message) -> Result<Message> {
    let mut stream = UnixStream::connect(socket_path)
        .with_context(|| format!("Failed to connect to socket: {}", socket_path))?;

    let encoded = encode(request)?;
    stream
        .write_all(&(encoded.len() as u32).to_le_bytes())
        .context("Failed to write request length")?;
    stream.write_all(&encoded).context("Failed to write request data")?;
    stream.flush().context("Failed to flush stream for request")?;

    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).context("Failed to read reply length")?;
    let len = u32::from_le_bytes(len_bytes);
    check_len(len)?;

    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).context("Failed to read reply data")?;
    decode(&buf)
}

/// Reads one frame from an async stream.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await.context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_bytes);
    check_len(len)?;

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await.context("Failed to read message data")?;
    decode(&buf)
}

/// Writes one frame to an async stream and flushes it.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Message) -> Result<()> {
    let encoded = encode(message)?;
    writer
        .write_all(&(encoded.len() as u32).to_le_bytes())
        .await
        .context("Failed to write message length")?;
    writer.write_all(&encoded).await.context("Failed to write message data")?;
    writer.flush().await.context("Failed to flush stream")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::models::TaskPriority;
    use message::SubmitAction;

    #[tokio::test]
    async fn frames_survive_a_duplex_pipe() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let request = Message::SubmitCommand(SubmitAction::Command {
            cmd: "echo hi".to_string(),
            task_type: "sample".to_string(),
            priority: TaskPriority::High,
            timeout_secs: Some(5),
        });

        write_frame(&mut client, &request).await.unwrap();
        let received = read_frame(&mut server).await.unwrap();
        assert_eq!(received, request);
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&(MAX_FRAME_LEN + 1).to_le_bytes()).await.unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(err.to_string().contains("excessively large"));
    }
}
