//! Minimal Minecraft Server List Ping: handshake, status request, ping/pong.

use crate::error::{CoreError, Result};
use log::debug;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const PROTOCOL_VERSION: i32 = 765;
const NEXT_STATE_STATUS: i32 = 1;
const MAX_STATUS_LEN: usize = 1 << 20;

pub fn encode_varint(value: i32) -> Vec<u8> {
    let mut value = value as u32;
    let mut bytes = Vec::with_capacity(5);
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
        if value == 0 {
            return bytes;
        }
    }
}

pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32> {
    let mut result: u32 = 0;
    for shift in (0..35).step_by(7) {
        let byte = reader.read_u8().await?;
        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result as i32);
        }
    }
    Err(CoreError::BadPacket("VarInt too big"))
}

fn frame(body: Vec<u8>) -> Vec<u8> {
    let mut framed = encode_varint(body.len() as i32);
    framed.extend(body);
    framed
}

fn handshake(host: &str, port: u16) -> Vec<u8> {
    let mut body = vec![0x00];
    body.extend(encode_varint(PROTOCOL_VERSION));
    body.extend(encode_varint(host.len() as i32));
    body.extend(host.as_bytes());
    body.extend(port.to_be_bytes());
    body.extend(encode_varint(NEXT_STATE_STATUS));
    frame(body)
}

/// Pings `host:port` and returns the ping/pong round trip in milliseconds.
pub async fn ping(host: &str, port: u16) -> Result<u64> {
    let target = format!("{}:{}", host, port);
    let io = |source: std::io::Error| CoreError::Probe {
        target: target.clone(),
        source,
    };

    let mut stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&target))
        .await
        .map_err(|_| CoreError::ProbeTimeout(target.clone()))?
        .map_err(io)?;

    stream.write_all(&handshake(host, port)).await.map_err(io)?;
    stream.write_all(&[0x01, 0x00]).await.map_err(io)?;

    let _len = read_varint(&mut stream).await?;
    if read_varint(&mut stream).await? != 0x00 {
        return Err(CoreError::BadPacket("expected status response"));
    }
    let status_len = read_varint(&mut stream).await?;
    if status_len < 0 || status_len as usize > MAX_STATUS_LEN {
        return Err(CoreError::BadPacket("status length out of range"));
    }
    let mut status = vec![0u8; status_len as usize];
    stream.read_exact(&mut status).await.map_err(io)?;
    debug!("SLP: {} answered status ({} bytes)", target, status.len());

    let start = Instant::now();
    let payload = chrono::Utc::now().timestamp_millis();
    let mut body = encode_varint(0x01);
    body.extend(payload.to_be_bytes());
    stream.write_all(&frame(body)).await.map_err(io)?;

    let _len = read_varint(&mut stream).await?;
    if read_varint(&mut stream).await? != 0x01 {
        return Err(CoreError::BadPacket("expected pong"));
    }
    let mut pong = [0u8; 8];
    stream.read_exact(&mut pong).await.map_err(io)?;

    Ok(start.elapsed().as_millis() as u64)
}

/// [`ping`] bounded by [`PROBE_TIMEOUT`].
pub async fn ping_with_timeout(host: &str, port: u16) -> Result<u64> {
    timeout(PROBE_TIMEOUT, ping(host, port))
        .await
        .map_err(|_| CoreError::ProbeTimeout(format!("{}:{}", host, port)))?
}
