use crate::{hex_bytes, BusInfo, Result, SmbusBus, TransportError};
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Byte stream to the firmware console.
///
/// Implemented for serial ports; anything that can drop unread input works.
pub trait ConsolePort: Read + Write + Send {
    /// Discard input received but not yet read.
    fn clear_input(&mut self) -> io::Result<()>;
}

impl ConsolePort for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// SMBus access through a microcontroller console over serial.
///
/// The remote firmware exposes an `i2c_rw <addr> -w <byte>... -r <n>` shell
/// command, announces the transfer with `Writing N byte(s) [..] to I2C addr
/// 0x.., then reading M byte(s)` and logs either `Read data: 0xNN 0xNN ...`
/// or `Failed to write/read ...`.
///
/// Each [`SmbusBus::write_then_read`] drops stale input, issues one command
/// and only accepts a result once the console has echoed or announced that
/// same request, so a late reply to an earlier request is never taken for
/// the current one. The whole exchange is bounded by the port timeout.
pub struct ConsoleBridgeBus {
    port: Box<dyn ConsolePort>,
    timeout: Duration,
}

/// A transfer as echoed or announced by the console.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BridgeRequest {
    pub address: u8,
    pub write: Vec<u8>,
    pub read_len: usize,
}

/// One classified line of console output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BridgeLine {
    Request(BridgeRequest),
    Data(Vec<u8>),
    Failed,
    Error(String),
    Other,
}

impl ConsoleBridgeBus {
    /// Wrap an already open console with `timeout` as the per-transaction deadline.
    pub fn new(port: Box<dyn ConsolePort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    pub fn open_with(path: &str, baud: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        debug!(port = path, baud, "console bridge opened");
        Ok(Self::new(Box::new(port), timeout))
    }

    pub fn open(path: &str) -> Result<Self> {
        Self::open_with(path, 115_200, Duration::from_millis(500))
    }

    pub fn list() -> Result<Vec<BusInfo>> {
        let mut out = Vec::new();
        for p in serialport::available_ports().map_err(|e| TransportError::Io(e.to_string()))? {
            let driver = match p.port_type {
                SerialPortType::UsbPort(_) => "console-bridge-usb",
                _ => "console-bridge",
            };
            out.push(BusInfo {
                name: p.port_name,
                driver: driver.to_string(),
            });
        }
        Ok(out)
    }

    fn command_line(address: u8, write: &[u8], read_len: usize) -> String {
        let mut line = format!("i2c_rw 0x{address:02X}");
        for b in write {
            line.push_str(&format!(" -w 0x{b:02X}"));
        }
        line.push_str(&format!(" -r {read_len}\r\n"));
        line
    }

    fn read_line(&mut self, acc: &mut Vec<u8>, deadline: Instant) -> Result<String> {
        let mut buf = [0u8; 128];
        loop {
            if let Some(pos) = acc.iter().position(|&b| b == b'\n') {
                let line = acc.drain(..=pos).collect::<Vec<u8>>();
                return Ok(String::from_utf8_lossy(&line).trim().to_string());
            }
            if Instant::now() >= deadline {
                return Err(TransportError::Timeout);
            }
            match self.port.read(&mut buf) {
                Ok(n) if n > 0 => acc.extend_from_slice(&buf[..n]),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut => return Err(TransportError::Timeout),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }
}

/// Classify one line of firmware console output.
pub fn parse_bridge_line(line: &str) -> BridgeLine {
    let line = strip_ansi(line);
    if let Some(idx) = line.find("Read data:") {
        let rest = &line[idx + "Read data:".len()..];
        let mut bytes = Vec::new();
        for token in rest.split_whitespace() {
            match parse_byte(token) {
                Some(b) => bytes.push(b),
                None => break,
            }
        }
        return BridgeLine::Data(bytes);
    }
    if line.contains("Failed to write/read") {
        return BridgeLine::Failed;
    }
    if let Some(req) = parse_announce(&line).or_else(|| parse_echo(&line)) {
        return BridgeLine::Request(req);
    }
    if line.contains("Invalid") || line.contains("required") || line.contains("Bad hex") {
        return BridgeLine::Error(line);
    }
    BridgeLine::Other
}

/// `0xNN` hex or decimal, with trailing punctuation ignored.
fn parse_number(token: &str) -> Option<u32> {
    let t = token.trim_end_matches(|c: char| c == ',' || c == '.');
    match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => t.parse().ok(),
    }
}

fn parse_byte(token: &str) -> Option<u8> {
    parse_number(token).and_then(|v| u8::try_from(v).ok())
}

/// `Writing 1 byte(s) [0x09 ] to I2C addr 0x0B, then reading 2 byte(s)...`
fn parse_announce(line: &str) -> Option<BridgeRequest> {
    let rest = &line[line.find("Writing ")?..];
    let open = rest.find('[')?;
    let close = open + rest[open..].find(']')?;
    let write = rest[open + 1..close]
        .split_whitespace()
        .map(parse_byte)
        .collect::<Option<Vec<u8>>>()?;
    let tail = &rest[close..];
    let addr = &tail[tail.find("addr ")? + "addr ".len()..];
    let address = parse_byte(addr.split_whitespace().next()?)?;
    let reading = &tail[tail.find("then reading ")? + "then reading ".len()..];
    let read_len = parse_number(reading.split_whitespace().next()?)? as usize;
    Some(BridgeRequest {
        address,
        write,
        read_len,
    })
}

/// The console's echo of `i2c_rw 0x0B -w 0x09 -r 2`, possibly after a prompt.
fn parse_echo(line: &str) -> Option<BridgeRequest> {
    let rest = &line[line.find("i2c_rw ")? + "i2c_rw ".len()..];
    let mut tokens = rest.split_whitespace();
    let address = parse_byte(tokens.next()?)?;
    let mut write = Vec::new();
    let mut read_len = None;
    let mut in_write = false;
    while let Some(token) = tokens.next() {
        match token {
            "-w" => in_write = true,
            "-r" => {
                in_write = false;
                read_len = Some(parse_number(tokens.next()?)? as usize);
            }
            value if in_write => write.push(parse_byte(value)?),
            _ => return None,
        }
    }
    Some(BridgeRequest {
        address,
        write,
        read_len: read_len?,
    })
}

/// Drop `ESC [ ... <letter>` colour sequences emitted by the firmware logger.
fn strip_ansi(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

impl SmbusBus for ConsoleBridgeBus {
    fn write_then_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        if write.is_empty() {
            return Err(TransportError::Unsupported(
                "console bridge needs at least one write byte",
            ));
        }
        let expected = BridgeRequest {
            address,
            write: write.to_vec(),
            read_len: read.len(),
        };
        self.port
            .clear_input()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let cmd = Self::command_line(address, write, read.len());
        trace!(line = cmd.trim_end(), "bridge tx");
        self.port
            .write_all(cmd.as_bytes())
            .and_then(|()| self.port.flush())
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let deadline = Instant::now() + self.timeout;
        let mut acc = Vec::with_capacity(256);
        let mut matched = false;
        loop {
            let line = self.read_line(&mut acc, deadline)?;
            if line.is_empty() {
                continue;
            }
            match parse_bridge_line(&line) {
                BridgeLine::Request(req) => {
                    matched = req == expected;
                    if !matched {
                        debug!(line = %line, "console announced another request");
                    }
                }
                BridgeLine::Data(bytes) if matched => {
                    if bytes.len() != read.len() {
                        return Err(TransportError::InvalidResponse(format!(
                            "expected {} bytes, got {}",
                            read.len(),
                            bytes.len()
                        )));
                    }
                    debug!(address, write = %hex_bytes(write), read = %hex_bytes(&bytes), "bridge rx");
                    read.copy_from_slice(&bytes);
                    return Ok(());
                }
                BridgeLine::Failed if matched => return Err(TransportError::Nack),
                BridgeLine::Error(msg) if matched => return Err(TransportError::InvalidResponse(msg)),
                BridgeLine::Data(_) | BridgeLine::Failed | BridgeLine::Error(_) => {
                    debug!(line = %line, "dropping result of an earlier request");
                }
                BridgeLine::Other => {}
            }
        }
    }
}
