mod error;
pub mod packet;

pub use error::{RconError, Result};
pub use packet::Packet;

use std::future::Future;
use std::time::Duration;

use packet::SERVERDATA_AUTH_RESPONSE;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Id the server puts on an auth response when the password is wrong.
const AUTH_FAILED_ID: i32 = -1;

/// A single remote console session over TCP.
///
/// The socket is released when the client is dropped, so early returns and
/// `?` on the caller's side never leak a connection. [`Client::close`] is the
/// graceful path.
pub struct Client {
  stream: TcpStream,
  next_id: i32,
  timeout: Duration,
}

impl Client {
  /// Connect to `host:port` and, when a password is given, authenticate.
  ///
  /// The timeout bounds the TCP connect, the login exchange and every later
  /// command individually.
  pub async fn connect(
    host: &str,
    port: u16,
    password: Option<&str>,
    timeout: Duration,
  ) -> Result<Self> {
    let addr = format!("{host}:{port}");
    let stream = with_timeout("connect", timeout, async {
      TcpStream::connect((host, port))
        .await
        .map_err(|source| RconError::Connect {
          addr: addr.clone(),
          source,
        })
    })
    .await?;
    stream.set_nodelay(true)?;

    let mut client = Self {
      stream,
      next_id: 1,
      timeout,
    };

    if let Some(password) = password {
      with_timeout("login", timeout, client.login(password)).await?;
    }

    debug!(%addr, authenticated = password.is_some(), "rcon session opened");
    Ok(client)
  }

  /// Run `command` with `args` joined by single spaces and return the
  /// response text.
  ///
  /// The response id is not matched against the request id; some servers
  /// answer every command with an unrelated id.
  pub async fn run(&mut self, command: &str, args: &[&str]) -> Result<String> {
    let line = std::iter::once(command)
      .chain(args.iter().copied())
      .collect::<Vec<_>>()
      .join(" ");

    let timeout = self.timeout;
    let response = with_timeout("command", timeout, async {
      let id = self.allocate_id();
      self.send(&Packet::command(id, &line)).await?;
      Packet::read_from(&mut self.stream).await
    })
    .await?;

    trace!(command, bytes = response.body.len(), "rcon response");
    Ok(response.text())
  }

  /// Shut down the write half and drop the connection.
  pub async fn close(mut self) -> Result<()> {
    self.stream.shutdown().await?;
    debug!("rcon session closed");
    Ok(())
  }

  async fn login(&mut self, password: &str) -> Result<()> {
    let id = self.allocate_id();
    self.send(&Packet::login(id, password)).await?;

    // Source servers emit an empty RESPONSE_VALUE before the auth answer.
    let response = loop {
      let packet = Packet::read_from(&mut self.stream).await?;
      if packet.kind == SERVERDATA_AUTH_RESPONSE {
        break packet;
      }
      trace!(kind = packet.kind, "skipping packet while waiting for auth response");
    };

    if response.id == AUTH_FAILED_ID {
      return Err(RconError::Auth);
    }
    Ok(())
  }

  async fn send(&mut self, packet: &Packet) -> Result<()> {
    let frame = packet.encode()?;
    self.stream.write_all(&frame).await?;
    self.stream.flush().await?;
    Ok(())
  }

  fn allocate_id(&mut self) -> i32 {
    let id = self.next_id;
    self.next_id = match self.next_id.checked_add(1) {
      Some(next) => next,
      None => 1,
    };
    id
  }
}

async fn with_timeout<T>(
  operation: &'static str,
  after: Duration,
  fut: impl Future<Output = Result<T>>,
) -> Result<T> {
  tokio::time::timeout(after, fut)
    .await
    .map_err(|_| RconError::Timeout { operation, after })?
}
