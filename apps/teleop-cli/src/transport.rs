//! 意图来源与命令输出
//!
//! - 来源：`stdin`（每行一个标签）或 `udp://<绑定地址>`（每个数据报一个标签）
//! - 输出：`stdout`（JSON 行）或 `udp://<目标地址>`（每个数据报一条 JSON）

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Sender;
use std::fmt;
use std::io::{self, BufRead, ErrorKind, Write};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use teleop_control::{CommandSink, ShutdownSignal, SinkError, VelocityCommand};
use teleop_protocol::wire::encode_command;
use tracing::{debug, info, warn};

/// UDP 来源轮询关闭信号的间隔
const UDP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 单个标签数据报的最大长度（达到即视为被截断）
const MAX_DATAGRAM: usize = 512;

fn parse_udp_addr(rest: &str) -> Result<SocketAddr, String> {
    rest.to_socket_addrs()
        .map_err(|e| format!("invalid UDP address {:?}: {}", rest, e))?
        .next()
        .ok_or_else(|| format!("UDP address {:?} did not resolve", rest))
}

/// 意图来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Stdin,
    Udp(SocketAddr),
}

impl FromStr for SourceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdin" | "-" => Ok(SourceSpec::Stdin),
            _ => match s.strip_prefix("udp://") {
                Some(rest) => parse_udp_addr(rest).map(SourceSpec::Udp),
                None => Err(format!(
                    "unsupported source {:?} (expected \"stdin\" or \"udp://<addr>\")",
                    s
                )),
            },
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Stdin => write!(f, "stdin"),
            SourceSpec::Udp(addr) => write!(f, "udp://{}", addr),
        }
    }
}

/// 命令输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSpec {
    Stdout,
    Udp(SocketAddr),
}

impl FromStr for SinkSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" | "-" => Ok(SinkSpec::Stdout),
            _ => match s.strip_prefix("udp://") {
                Some(rest) => parse_udp_addr(rest).map(SinkSpec::Udp),
                None => Err(format!(
                    "unsupported sink {:?} (expected \"stdout\" or \"udp://<addr>\")",
                    s
                )),
            },
        }
    }
}

impl fmt::Display for SinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkSpec::Stdout => write!(f, "stdout"),
            SinkSpec::Udp(addr) => write!(f, "udp://{}", addr),
        }
    }
}

/// 正在运行的来源线程
pub struct SourceThread {
    handle: JoinHandle<()>,
    /// 线程能否响应关闭信号（stdin 阻塞读无法中断）
    interruptible: bool,
}

impl SourceThread {
    /// 等待可中断的来源线程退出；stdin 线程随进程结束
    pub fn finish(self) {
        if self.interruptible && self.handle.join().is_err() {
            warn!("Intent source thread panicked");
        }
    }
}

/// 启动来源线程，把收到的标签转发到 `messages`
pub fn spawn_source(
    spec: &SourceSpec,
    messages: Sender<String>,
    shutdown: ShutdownSignal,
) -> Result<SourceThread> {
    let builder = thread::Builder::new().name("teleop-source".into());

    match spec {
        SourceSpec::Stdin => {
            info!("Listening for intents on stdin");
            let handle = builder
                .spawn(move || read_lines(io::stdin().lock(), &messages))
                .context("Failed to spawn stdin reader")?;
            Ok(SourceThread {
                handle,
                interruptible: false,
            })
        },
        SourceSpec::Udp(addr) => {
            let socket =
                UdpSocket::bind(addr).with_context(|| format!("Failed to bind UDP {}", addr))?;
            socket
                .set_read_timeout(Some(UDP_POLL_INTERVAL))
                .context("Failed to set UDP read timeout")?;
            info!("Listening for intents on udp://{}", socket.local_addr()?);

            let handle = builder
                .spawn(move || receive_datagrams(&socket, &messages, &shutdown))
                .context("Failed to spawn UDP receiver")?;
            Ok(SourceThread {
                handle,
                interruptible: true,
            })
        },
    }
}

/// 逐行转发标签，空行忽略
fn read_lines<R: BufRead>(reader: R, messages: &Sender<String>) {
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if messages.send(line).is_err() {
                    return;
                }
            },
            Err(e) => {
                warn!("Failed to read intent from stdin: {}", e);
                return;
            },
        }
    }
    info!("Intent source closed (EOF), holding last intent");
}

/// 数据报 → 标签；可能被截断的数据报丢弃
fn datagram_label(payload: &[u8]) -> Option<String> {
    if payload.len() >= MAX_DATAGRAM {
        return None;
    }
    Some(String::from_utf8_lossy(payload).into_owned())
}

fn receive_datagrams(socket: &UdpSocket, messages: &Sender<String>, shutdown: &ShutdownSignal) {
    // 填满缓冲区的数据报无法与截断区分，一律丢弃
    let mut buf = [0u8; MAX_DATAGRAM];
    while !shutdown.is_triggered() {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                let Some(label) = datagram_label(&buf[..len]) else {
                    warn!(
                        "Dropping oversized datagram from {} (>= {} bytes)",
                        from, MAX_DATAGRAM
                    );
                    continue;
                };
                debug!("Datagram from {}: {:?}", from, label);
                if messages.send(label).is_err() {
                    return;
                }
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {},
            Err(e) => warn!("UDP receive error: {}", e),
        }
    }
    debug!("UDP source: shutdown requested, exiting");
}

/// JSON 行输出（每条命令后立即 flush）
pub struct WriterSink<W> {
    writer: W,
    name: &'static str,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, name: &'static str) -> Self {
        Self { writer, name }
    }
}

impl<W: Write + Send> CommandSink for WriterSink<W> {
    fn send(&mut self, command: VelocityCommand) -> Result<(), SinkError> {
        let line = encode_command(&command)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// UDP 数据报输出
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
    name: String,
}

impl UdpSink {
    pub fn connect(target: SocketAddr) -> io::Result<Self> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        Ok(Self {
            socket: UdpSocket::bind(bind)?,
            target,
            name: format!("udp://{}", target),
        })
    }
}

impl CommandSink for UdpSink {
    fn send(&mut self, command: VelocityCommand) -> Result<(), SinkError> {
        let payload = encode_command(&command)?;
        let sent = self.socket.send_to(payload.as_bytes(), self.target)?;
        if sent != payload.len() {
            return Err(SinkError::Other(format!(
                "short datagram: {} of {} bytes",
                sent,
                payload.len()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 按规格创建输出
pub fn open_sink(spec: &SinkSpec) -> Result<Box<dyn CommandSink>> {
    match spec {
        SinkSpec::Stdout => Ok(Box::new(WriterSink::new(io::stdout(), "stdout"))),
        SinkSpec::Udp(target) => {
            let sink = UdpSink::connect(*target)
                .map_err(|e| anyhow!("Failed to open UDP sink to {}: {}", target, e))?;
            Ok(Box::new(sink))
        },
    }
}
