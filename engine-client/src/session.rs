//! 引擎连接会话
//!
//! 维护到引擎进程的唯一一条长连接，串行化命令与响应的交换。
//! UCI 协议没有请求/响应关联 ID，响应只能按到达顺序归属于当前
//! 等待中的命令，因此同一时刻最多允许一条命令在途；第二条需要
//! 等待响应的命令会被直接拒绝而不是排队。传输非预期中断时，
//! 在途命令立即失败，并按固定延迟在后台重连。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use uci_protocol::{
    Connector, EngineConnector, EngineError, EngineEvent, EventReader, EventWriter,
    PendingCommand, PositionOptions, Result, SearchOptions, COMMAND_TIMEOUT, CONNECT_TIMEOUT,
    DEFAULT_ENGINE_ADDR, RECONNECT_DELAY,
};

/// 会话配置
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// 引擎服务地址
    pub addr: String,
    /// 连接超时
    pub connect_timeout: Duration,
    /// 命令响应超时
    pub command_timeout: Duration,
    /// 断线重连延迟
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ENGINE_ADDR.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            command_timeout: COMMAND_TIMEOUT,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

impl SessionConfig {
    /// 指定引擎地址，其余使用默认值
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }
}

/// 等待完成的命令及其结果通道
struct PendingSlot {
    command: PendingCommand,
    tx: oneshot::Sender<Result<Vec<String>>>,
}

/// 会话共享状态（会话与读取任务共同访问）
struct Shared {
    writer: Option<EventWriter<OwnedWriteHalf>>,
    connected: bool,
    /// 调用方显式断开后置位，抑制自动重连；下次连接成功时复位
    shutdown: bool,
    /// 后台重连循环是否已排定
    reconnect_scheduled: bool,
    pending: Option<PendingSlot>,
    reader_task: Option<JoinHandle<()>>,
}

/// 引擎连接会话
///
/// 会话独占其传输句柄；重连会整体替换句柄，绝不把在途命令
/// 转绑到新连接上。需要并发评估多个局面时应创建多个会话。
pub struct EngineSession {
    config: SessionConfig,
    shared: Arc<Mutex<Shared>>,
    /// 串行化并发的连接尝试
    connect_guard: Mutex<()>,
}

impl EngineSession {
    /// 创建会话（不立即连接，首条命令时按需建立）
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_config(SessionConfig::new(addr))
    }

    /// 使用指定配置创建会话
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Mutex::new(Shared {
                writer: None,
                connected: false,
                shutdown: false,
                reconnect_scheduled: false,
                pending: None,
                reader_task: None,
            })),
            connect_guard: Mutex::new(()),
        }
    }

    /// 会话配置
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 是否已连接
    pub async fn is_connected(&self) -> bool {
        self.shared.lock().await.connected
    }

    /// 建立连接；已连接时为空操作
    pub async fn connect(&self) -> Result<()> {
        self.ensure_connected().await
    }

    /// 发送一条 UCI 命令并等待其响应完整
    ///
    /// 所有协议交互的唯一入口。未连接时先建立连接；
    /// 已有命令在途时立即拒绝。position/stop 发出即完成，
    /// 其余命令按各自的终止标记等待，超时报错。
    pub async fn send_command(&self, command: &str) -> Result<Vec<String>> {
        self.ensure_connected().await?;

        let rx = {
            let mut shared = self.shared.lock().await;
            let event = EngineEvent::command(command);

            // position/stop 即发即完成，不占用命令槽；
            // 搜索中发出的 stop 不会打断在途 go 的等待，
            // go 仍由引擎随后发出的 bestmove 行来完成
            if PendingCommand::is_immediate(command) {
                let writer = shared
                    .writer
                    .as_mut()
                    .ok_or(EngineError::ConnectionClosed)?;
                writer.write_event(&event).await?;
                debug!("Sent fire-and-forget command: {}", command);
                return Ok(Vec::new());
            }

            if let Some(slot) = &shared.pending {
                return Err(EngineError::CommandPending(
                    slot.command.command().to_string(),
                ));
            }

            let writer = shared
                .writer
                .as_mut()
                .ok_or(EngineError::ConnectionClosed)?;

            let (tx, rx) = oneshot::channel();
            if let Err(e) = writer.write_event(&event).await {
                return Err(e);
            }
            shared.pending = Some(PendingSlot {
                command: PendingCommand::new(command),
                tx,
            });
            debug!("Sent command: {}", command);
            rx
        };

        match timeout(self.config.command_timeout, rx).await {
            Ok(Ok(result)) => result,
            // 读取任务在未投递结果的情况下消失
            Ok(Err(_)) => Err(EngineError::ConnectionLost(command.to_string())),
            Err(_) => {
                self.shared.lock().await.pending = None;
                warn!("Command timed out: {}", command);
                Err(EngineError::CommandTimeout(command.to_string()))
            }
        }
    }

    /// 发送 uci 命令，等待 uciok
    pub async fn send_uci(&self) -> Result<Vec<String>> {
        self.send_command("uci").await
    }

    /// 发送 isready 命令，等待 readyok
    pub async fn send_is_ready(&self) -> Result<Vec<String>> {
        self.send_command("isready").await
    }

    /// 发送 stop 命令（不等待响应）
    pub async fn send_stop(&self) -> Result<Vec<String>> {
        self.send_command("stop").await
    }

    /// 设置当前局面（不等待响应）
    pub async fn set_position(&self, options: &PositionOptions) -> Result<()> {
        self.send_command(&options.to_command()).await?;
        Ok(())
    }

    /// 发起搜索，等待 bestmove，返回全部响应行
    pub async fn go(&self, options: &SearchOptions) -> Result<Vec<String>> {
        self.send_command(&options.to_command()).await
    }

    /// 断开连接；幂等，重复调用不报错
    pub async fn disconnect(&self) {
        let mut shared = self.shared.lock().await;
        let was_connected = shared.connected;

        shared.shutdown = true;
        shared.connected = false;
        shared.writer = None;
        if let Some(task) = shared.reader_task.take() {
            task.abort();
        }
        if let Some(slot) = shared.pending.take() {
            let command = slot.command.command().to_string();
            let _ = slot.tx.send(Err(EngineError::ConnectionLost(command)));
        }

        if was_connected {
            info!("Disconnected from engine at {}", self.config.addr);
        }
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.shared.lock().await.connected {
            return Ok(());
        }

        let _guard = self.connect_guard.lock().await;
        if self.shared.lock().await.connected {
            return Ok(());
        }
        open_connection(&self.shared, &self.config).await
    }
}

/// 建立传输并启动读取任务
fn open_connection<'a>(
    shared: &'a Arc<Mutex<Shared>>,
    config: &'a SessionConfig,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let connector = EngineConnector::with_timeout(config.connect_timeout);
        let transport = connector.connect(&config.addr).await?;
        let (reader, writer) = transport.split();

        let mut guard = shared.lock().await;
        guard.writer = Some(writer);
        guard.connected = true;
        guard.shutdown = false;
        guard.reconnect_scheduled = false;
        let task = tokio::spawn(read_loop(Arc::clone(shared), config.clone(), reader));
        if let Some(old) = guard.reader_task.replace(task) {
            old.abort();
        }

        info!("Connected to engine at {}", config.addr);
        Ok(())
    })
}

/// 读取任务：持续接收引擎消息并分发给当前等待中的命令
async fn read_loop(
    shared: Arc<Mutex<Shared>>,
    config: SessionConfig,
    mut reader: EventReader<OwnedReadHalf>,
) {
    loop {
        match reader.read_event().await {
            Ok(EngineEvent::Response(line)) => {
                let mut guard = shared.lock().await;
                let Some(slot) = guard.pending.as_mut() else {
                    debug!("Unsolicited engine line: {}", line);
                    continue;
                };
                if slot.command.push_line(&line) {
                    let slot = guard.pending.take().expect("pending slot present");
                    debug!(
                        "Command '{}' completed in {:?}",
                        slot.command.command(),
                        slot.command.elapsed()
                    );
                    let _ = slot.tx.send(Ok(slot.command.into_lines()));
                }
            }
            Ok(EngineEvent::Unauthenticated(reason)) => {
                warn!("Engine server rejected authentication: {:?}", reason);
                let mut guard = shared.lock().await;
                if let Some(slot) = guard.pending.take() {
                    let _ = slot.tx.send(Err(EngineError::Unauthenticated));
                }
            }
            Ok(EngineEvent::Authenticated(_)) => {
                debug!("Engine server authenticated");
            }
            Ok(EngineEvent::Command(echo)) => {
                debug!("Ignoring command echo: {}", echo);
            }
            Err(EngineError::Json(e)) => {
                // 信封格式错误只影响在途命令，不断开连接
                warn!("Malformed engine envelope: {}", e);
                let mut guard = shared.lock().await;
                if let Some(slot) = guard.pending.take() {
                    let _ = slot.tx.send(Err(EngineError::Json(e)));
                }
            }
            Err(EngineError::ConnectionClosed) => {
                info!("Engine connection closed");
                break;
            }
            Err(e) => {
                warn!("Engine connection error: {}", e);
                break;
            }
        }
    }

    handle_connection_lost(shared, config).await;
}

/// 处理非预期断开：拒绝在途命令并排定重连
async fn handle_connection_lost(shared: Arc<Mutex<Shared>>, config: SessionConfig) {
    let mut guard = shared.lock().await;
    guard.connected = false;
    guard.writer = None;
    guard.reader_task = None;

    if let Some(slot) = guard.pending.take() {
        let command = slot.command.command().to_string();
        // 在途命令必须立即失败，不能悬挂到新连接上
        let _ = slot.tx.send(Err(EngineError::ConnectionLost(command)));
    }

    if guard.shutdown || guard.reconnect_scheduled {
        return;
    }
    guard.reconnect_scheduled = true;
    drop(guard);

    tokio::spawn(reconnect_loop(shared, config));
}

/// 固定延迟重连循环，直到连接恢复或会话被显式断开
async fn reconnect_loop(shared: Arc<Mutex<Shared>>, config: SessionConfig) {
    loop {
        sleep(config.reconnect_delay).await;

        {
            let mut guard = shared.lock().await;
            if guard.shutdown || guard.connected {
                guard.reconnect_scheduled = false;
                return;
            }
        }

        match open_connection(&shared, &config).await {
            Ok(()) => {
                info!("Reconnected to engine at {}", config.addr);
                return;
            }
            Err(e) => {
                warn!("Reconnect attempt failed: {}", e);
            }
        }
    }
}
