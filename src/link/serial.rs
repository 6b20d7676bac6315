//! # Serial Radio Bridge
//!
//! Drives a UART-attached BLE bridge module that exposes the node's
//! telemetry characteristic.
//!
//! Wire protocol with the bridge:
//! - Outbound frames are written as raw 23-byte values
//! - Advertising is requested with `AT+NAME<name>\r\n`
//! - Inbound lines `+CONNECTED` / `+DISCONNECTED` are link events
//! - Any other inbound line is a rename command from the consumer

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Advertiser, Link, LinkEvent};
use crate::error::{MonitorError, Result};
use crate::frame::protocol::FrameBytes;
use crate::identity::DeviceName;

/// Default bridge device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC bridges
    "/dev/ttyS0",   // on-board UART
];

/// Inbound line announcing a connected consumer
pub const CONNECTED_LINE: &[u8] = b"+CONNECTED";

/// Inbound line announcing the consumer left
pub const DISCONNECTED_LINE: &[u8] = b"+DISCONNECTED";

/// Longest inbound line kept; extra bytes of a line are dropped
const MAX_LINE_LEN: usize = 64;

/// Rename commands held between cycles; older ones are dropped first
const MAX_PENDING_COMMANDS: usize = 4;

/// Read timeout for the native port
const PORT_TIMEOUT_MS: u64 = 50;

/// Byte-level port operations, abstracted for testing
pub trait PortIo: Send {
    /// Read whatever is pending without blocking, returns 0 if nothing is
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all data to the port
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    fn flush(&mut self) -> io::Result<()>;
}

/// Wrapper around a native serial port that implements [`PortIo`]
pub struct NativeSerialPort {
    port: Box<dyn tokio_serial::SerialPort>,
}

impl NativeSerialPort {
    pub fn new(port: Box<dyn tokio_serial::SerialPort>) -> Self {
        Self { port }
    }
}

impl PortIo for NativeSerialPort {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pending = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if pending == 0 {
            return Ok(0);
        }
        let len = pending.min(buf.len());
        self.port.read(&mut buf[..len])
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.port, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }
}

/// BLE bridge handler over a serial port
pub struct SerialLink<P> {
    port: P,
    device_path: String,
    line: Vec<u8>,
    events: VecDeque<LinkEvent>,
    commands: VecDeque<Vec<u8>>,
}

impl<P> std::fmt::Debug for SerialLink<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_path", &self.device_path)
            .field("pending_commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

impl SerialLink<NativeSerialPort> {
    /// Open the bridge on the first path that works
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Link`] naming every path tried if none opens
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened radio bridge at {} ({} baud)", path, baud_rate);
                    return Ok(Self::new(NativeSerialPort::new(port), *path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(MonitorError::Link(format!(
            "no radio bridge found at: {}",
            paths.join(", ")
        )))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<Box<dyn tokio_serial::SerialPort>> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(Duration::from_millis(PORT_TIMEOUT_MS))
            .open()
            .map_err(|e| MonitorError::Link(format!("Failed to open {}: {}", path, e)))
    }
}

impl<P: PortIo> SerialLink<P> {
    /// Wrap an already opened port
    pub fn new(port: P, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
            line: Vec::with_capacity(MAX_LINE_LEN),
            events: VecDeque::new(),
            commands: VecDeque::new(),
        }
    }

    /// Device path of the opened port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .map_err(|e| MonitorError::Link(format!("Failed to write to bridge: {}", e)))?;
        self.port
            .flush()
            .map_err(|e| MonitorError::Link(format!("Failed to flush bridge: {}", e)))
    }

    fn drain_port(&mut self) -> Result<()> {
        let mut buf = [0u8; MAX_LINE_LEN];
        loop {
            let n = self
                .port
                .read_available(&mut buf)
                .map_err(|e| MonitorError::Link(format!("Failed to read from bridge: {}", e)))?;
            if n == 0 {
                return Ok(());
            }
            for &byte in &buf[..n] {
                self.push_byte(byte);
            }
        }
    }

    fn push_byte(&mut self, byte: u8) {
        if byte != b'\n' {
            if self.line.len() < MAX_LINE_LEN {
                self.line.push(byte);
            }
            return;
        }

        let mut line = std::mem::take(&mut self.line);
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        match line.as_slice() {
            CONNECTED_LINE => self.events.push_back(LinkEvent::Connected),
            DISCONNECTED_LINE => self.events.push_back(LinkEvent::Disconnected),
            [] => {}
            _ => {
                line.push(b'\n');
                if self.commands.len() == MAX_PENDING_COMMANDS {
                    self.commands.pop_front();
                    debug!("Rename queue full, dropped oldest command");
                }
                self.commands.push_back(line);
            }
        }
    }
}

impl<P: PortIo> Advertiser for SerialLink<P> {
    fn advertise(&mut self, name: &DeviceName) -> Result<()> {
        debug!("Advertising as '{}'", name);
        self.send(format!("AT+NAME{}\r\n", name).as_bytes())
    }
}

impl<P: PortIo> Link for SerialLink<P> {
    fn poll_events(&mut self) -> Result<Vec<LinkEvent>> {
        self.drain_port()?;
        Ok(self.events.drain(..).collect())
    }

    fn read_command(&mut self, buf: &mut [u8]) -> usize {
        let Some(command) = self.commands.pop_front() else {
            return 0;
        };
        let len = command.len().min(buf.len());
        buf[..len].copy_from_slice(&command[..len]);
        if command.len() > len {
            debug!("Dropped {} bytes of over-long command", command.len() - len);
        }
        len
    }

    fn publish(&mut self, frame: &FrameBytes) -> Result<()> {
        self.send(frame)?;
        debug!("Published frame ({} bytes)", frame.len());
        Ok(())
    }
}
