// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing for the queue protocol.
//!
//! Each frame is a 4-byte big-endian length followed by a JSON body.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame body (200 MiB). Artifacts travel inline, so this
/// bounds the biggest uploadable file.
pub const MAX_FRAME_SIZE: usize = 200 * 1024 * 1024;

/// Errors below the request/response layer
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame of {size} bytes exceeds the {MAX_FRAME_SIZE} byte limit")]
    TooLarge { size: usize },
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("timed out waiting for response")]
    Timeout,
}

/// An encoded frame body.
///
/// Requests are encoded once and the same frame is resent on retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn encode<T: Serialize>(msg: &T) -> Result<Self, ProtocolError> {
        let body = serde_json::to_vec(msg)?;
        check_size(body.len())?;
        Ok(Self(body))
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_slice(&self.0)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read one frame. A peer hanging up anywhere inside the frame is
    /// [`ProtocolError::ConnectionClosed`].
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, ProtocolError> {
        let mut prefix = [0u8; 4];
        reader.read_exact(&mut prefix).await.map_err(closed_on_eof)?;
        let size = check_size(u32::from_be_bytes(prefix) as usize)?;

        let mut body = vec![0u8; size];
        reader.read_exact(&mut body).await.map_err(closed_on_eof)?;
        Ok(Self(body))
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        writer
            .write_all(&(self.0.len() as u32).to_be_bytes())
            .await?;
        writer.write_all(&self.0).await?;
        writer.flush().await?;
        Ok(())
    }
}

fn check_size(size: usize) -> Result<usize, ProtocolError> {
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::TooLarge { size });
    }
    Ok(size)
}

fn closed_on_eof(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::ConnectionClosed
    } else {
        ProtocolError::Io(e)
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
