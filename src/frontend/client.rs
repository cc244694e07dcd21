use crate::frontend::protocol::{self, FrontEndProtocol, Request, Response};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, UdpSocket};

pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("IO failure talking to server")]
    Io(#[from] io::Error),
    #[error("No response within {:?}", RESPONSE_TIMEOUT)]
    Timeout,
    #[error("Server closed the connection")]
    ServerClosed,
    #[error("Server answered ERROR")]
    ErrorResponse,
}

enum Transport {
    Tcp {
        responses: Lines<BufReader<OwnedReadHalf>>,
        writer: OwnedWriteHalf,
    },
    Udp(UdpSocket),
}

/// KvClient talks the line protocol to one front end.
pub struct KvClient {
    transport: Transport,
}

impl KvClient {
    pub async fn connect(protocol: FrontEndProtocol, host: &str, port: u16) -> Result<Self, ClientError> {
        let transport = match protocol {
            FrontEndProtocol::Tcp => {
                let stream = TcpStream::connect((host, port)).await?;
                let (reader, writer) = stream.into_split();
                Transport::Tcp {
                    responses: BufReader::new(reader).lines(),
                    writer,
                }
            }
            FrontEndProtocol::Udp => {
                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                socket.connect((host, port)).await?;
                Transport::Udp(socket)
            }
        };

        Ok(KvClient { transport })
    }

    /// Send `request` and wait for its response. Lines that answer some other request, such as a
    /// late reply to one that timed out, are skipped. The server's `ERROR` fails the request.
    pub async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        tokio::time::timeout(RESPONSE_TIMEOUT, self.round_trip(request))
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    async fn round_trip(&mut self, request: &Request) -> Result<Response, ClientError> {
        self.write_request(request).await?;

        loop {
            let line = self.read_response_line().await?;
            if let Some(response) = request.parse_response(&line) {
                return Ok(response);
            }
            if line == Response::Error.to_string() {
                return Err(ClientError::ErrorResponse);
            }
        }
    }

    async fn write_request(&mut self, request: &Request) -> Result<(), ClientError> {
        match &mut self.transport {
            Transport::Tcp { writer, .. } => writer.write_all(format!("{}\n", request).as_bytes()).await?,
            Transport::Udp(socket) => {
                socket.send(request.to_string().as_bytes()).await?;
            }
        }
        Ok(())
    }

    async fn read_response_line(&mut self) -> Result<String, ClientError> {
        match &mut self.transport {
            Transport::Tcp { responses, .. } => responses.next_line().await?.ok_or(ClientError::ServerClosed),
            Transport::Udp(socket) => {
                let mut buf = vec![0u8; 1024];
                let len = socket.recv(&mut buf).await?;
                Ok(String::from_utf8_lossy(&buf[..len]).trim().to_string())
            }
        }
    }
}

/// Parse a command typed by a user: `put <key> <value>`, `get <key>` or `del <key>`, any case.
/// Keys and values must be valid protocol tokens.
pub fn parse_command(line: &str) -> Result<Request, ClientError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (instruction, args) = match tokens.split_first() {
        Some((instruction, args)) => (instruction.to_ascii_lowercase(), args),
        None => return Err(ClientError::InvalidCommand("empty command".to_string())),
    };

    if let Some(token) = args.iter().find(|token| !protocol::is_valid_token(token)) {
        return Err(ClientError::InvalidCommand(format!(
            "'{}' is longer than {} characters",
            token,
            protocol::MAX_TOKEN_LENGTH
        )));
    }

    match (instruction.as_str(), args) {
        ("put", [key, value]) => Ok(Request::Put {
            key: key.to_string(),
            value: value.to_string(),
        }),
        ("get", [key]) => Ok(Request::Get { key: key.to_string() }),
        ("del", [key]) => Ok(Request::Delete { key: key.to_string() }),
        ("put", _) => Err(ClientError::InvalidCommand("usage: put <key> <value>".to_string())),
        ("get", _) => Err(ClientError::InvalidCommand("usage: get <key>".to_string())),
        ("del", _) => Err(ClientError::InvalidCommand("usage: del <key>".to_string())),
        (other, _) => Err(ClientError::InvalidCommand(format!("unknown instruction '{}'", other))),
    }
}
