//! Source RCON packet framing.
//!
//! Every packet is `size | id | type | body | 0x00 | 0x00` with little-endian
//! `i32` integers, where `size` counts the bytes that follow it.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{RconError, Result};

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Largest body we are willing to send.
pub const MAX_OUTGOING_BODY: usize = 4096;

/// Largest declared size accepted from the server.
pub const MAX_INCOMING_SIZE: i32 = 1024 * 1024;

/// id + type + two terminators.
const HEADER_AND_PADDING: i32 = 10;

/// id + type + at least one terminator.
const MIN_INCOMING_SIZE: i32 = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
  pub id: i32,
  pub kind: i32,
  pub body: Vec<u8>,
}

impl Packet {
  pub fn new(id: i32, kind: i32, body: impl Into<Vec<u8>>) -> Self {
    Self {
      id,
      kind,
      body: body.into(),
    }
  }

  pub fn login(id: i32, password: &str) -> Self {
    Self::new(id, SERVERDATA_AUTH, password.as_bytes())
  }

  pub fn command(id: i32, command: &str) -> Self {
    Self::new(id, SERVERDATA_EXECCOMMAND, command.as_bytes())
  }

  /// Body decoded as UTF-8, replacing invalid sequences.
  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }

  /// Serialize into a wire frame.
  pub fn encode(&self) -> Result<Vec<u8>> {
    if self.body.len() > MAX_OUTGOING_BODY {
      return Err(RconError::Protocol(format!(
        "request body is {} bytes, limit is {}",
        self.body.len(),
        MAX_OUTGOING_BODY
      )));
    }

    let size = self.body.len() as i32 + HEADER_AND_PADDING;
    let mut frame = Vec::with_capacity(size as usize + 4);
    frame.extend_from_slice(&size.to_le_bytes());
    frame.extend_from_slice(&self.id.to_le_bytes());
    frame.extend_from_slice(&self.kind.to_le_bytes());
    frame.extend_from_slice(&self.body);
    frame.extend_from_slice(&[0, 0]);
    Ok(frame)
  }

  /// Read one frame. Servers differ in how many terminators they append, so
  /// trailing NULs are stripped rather than checked.
  pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
    let size = reader.read_i32_le().await?;
    if !(MIN_INCOMING_SIZE..=MAX_INCOMING_SIZE).contains(&size) {
      return Err(RconError::Protocol(format!(
        "declared packet size {size} is out of range"
      )));
    }

    let mut payload = vec![0u8; size as usize];
    reader.read_exact(&mut payload).await?;

    let id = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let kind = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
    let mut body = payload.split_off(8);
    while body.last() == Some(&0) {
      body.pop();
    }

    Ok(Self { id, kind, body })
  }
}
