//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使会话层与具体传输实现解耦。
//! 引擎服务使用按行分隔的 JSON 信封文本，编解码由 EventReader/EventWriter
//! 完成。

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::{CONNECT_TIMEOUT, MAX_LINE_SIZE};
use crate::error::{EngineError, Result};
use crate::message::EngineEvent;

/// 连接抽象 trait（核心抽象，供会话层使用）
#[async_trait]
pub trait Connection: Send + Sync {
    /// 发送消息
    async fn send(&mut self, event: &EngineEvent) -> Result<()>;

    /// 接收消息
    async fn recv(&mut self) -> Result<EngineEvent>;

    /// 关闭连接
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

/// 监听器 trait（测试夹具与引擎服务端使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// 引擎连接器
pub struct EngineConnector {
    connect_timeout: Duration,
}

impl EngineConnector {
    /// 使用默认连接超时
    pub fn new() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// 指定连接超时
    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for EngineConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for EngineConnector {
    type Conn = EngineTransport;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| EngineError::ConnectTimeout)?
            .map_err(|source| EngineError::Connect {
                addr: addr.to_string(),
                source,
            })?;

        EngineTransport::from_stream(stream)
    }
}

/// 引擎 TCP 连接
pub struct EngineTransport {
    reader: EventReader<OwnedReadHalf>,
    writer: EventWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl EngineTransport {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: EventReader::new(read_half),
            writer: EventWriter::new(write_half),
            peer_addr,
        })
    }

    /// 分离读写端
    pub fn split(self) -> (EventReader<OwnedReadHalf>, EventWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for EngineTransport {
    async fn send(&mut self, event: &EngineEvent) -> Result<()> {
        self.writer.write_event(event).await
    }

    async fn recv(&mut self) -> Result<EngineEvent> {
        self.reader.read_event().await
    }

    async fn close(&mut self) -> Result<()> {
        // TCP 连接在 drop 时自动关闭
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// 引擎 TCP 监听器
pub struct EngineListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for EngineListener {
    type Conn = EngineTransport;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(EngineError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, _addr) = self.listener.accept().await.map_err(EngineError::Io)?;
        EngineTransport::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 行编解码
// ============================================================================

/// 行读取器
pub struct EventReader<R> {
    reader: BufReader<R>,
    buffer: String,
}

impl<R: AsyncRead + Unpin + Send> EventReader<R> {
    /// 创建新的行读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: String::new(),
        }
    }

    /// 读取并解码一行消息，跳过空行
    pub async fn read_event(&mut self) -> Result<EngineEvent> {
        loop {
            self.buffer.clear();
            let n = self.reader.read_line(&mut self.buffer).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    EngineError::ConnectionClosed
                } else {
                    EngineError::Io(e)
                }
            })?;

            if n == 0 {
                return Err(EngineError::ConnectionClosed);
            }
            if n > MAX_LINE_SIZE {
                return Err(EngineError::LineTooLarge {
                    size: n,
                    max: MAX_LINE_SIZE,
                });
            }

            if self.buffer.trim().is_empty() {
                continue;
            }

            return EngineEvent::decode(&self.buffer);
        }
    }
}

/// 行写入器
pub struct EventWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> EventWriter<W> {
    /// 创建新的行写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 编码并写入一行消息
    pub async fn write_event(&mut self, event: &EngineEvent) -> Result<()> {
        let mut line = event.encode()?;
        line.push('\n');

        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        Ok(())
    }
}
