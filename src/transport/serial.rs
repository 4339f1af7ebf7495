//! # Serial-Line Transport
//!
//! Writes ZPL straight to a USB or RS-232 serial device
//! (`/dev/ttyUSB0`, `/dev/ttyACM0`).
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so the document is transmitted without
//! modification:
//!
//! - **No input processing**: Disable IGNBRK, BRKINT, PARMRK, ISTRIP, etc.
//! - **No output processing**: Disable OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8 (8 data bits, no parity)
//! - **No echo**: Disable ECHO, ECHONL
//! - **Non-canonical mode**: Disable ICANON (no line buffering)
//! - **Baud rate**: set from configuration (default 9600)
//!
//! Paths that are not terminals (a plain file, a printer class device) are
//! written as-is.
//!
//! ## Chunked Writes
//!
//! Large documents are written in chunks with a small delay between them.
//! ZPL has no native copy count on this path, so the document is written
//! once per copy. When the send timeout fires the writer stops before its
//! next chunk and the session is closed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{
    bounded, candidates, copy_plan, Endpoint, Session, SessionHandle, SessionSlot, Transport,
    TransportKind, TransportResult,
};
use crate::config::{Config, SerialConfig, TimeoutConfig};
use crate::document::LabelDocument;
use crate::error::EtiquetaError;

/// Device name prefixes probed under `/dev`.
const DEVICE_PREFIXES: [&str; 2] = ["ttyUSB", "ttyACM"];

pub struct SerialTransport {
    settings: SerialConfig,
    timeouts: TimeoutConfig,
    slot: SessionSlot,
}

impl SerialTransport {
    pub fn new(settings: SerialConfig) -> Self {
        Self {
            settings,
            timeouts: TimeoutConfig::default(),
            slot: SessionSlot::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.serial.clone()).with_timeouts(config.timeouts)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    async fn open(&self, device: &str) -> Result<File, EtiquetaError> {
        let path = device.to_string();
        let baud_rate = self.settings.baud_rate;
        let limit = self.timeouts.connect();
        bounded(
            limit,
            async move {
                tokio::task::spawn_blocking(move || open_device(Path::new(&path), baud_rate))
                    .await
                    .map_err(|e| EtiquetaError::Connection(format!("open task failed: {}", e)))?
            },
            || EtiquetaError::Connection(format!("opening {} timed out after {:?}", device, limit)),
        )
        .await
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn supports_copy_count(&self) -> bool {
        false
    }

    async fn discover(&self) -> Vec<Endpoint> {
        let mut found = Vec::new();
        if let Some(device) = &self.settings.device {
            found.push(Endpoint::new(self.kind(), device.clone(), "configured serial device"));
        }
        for path in scan_dir(Path::new("/dev"), &DEVICE_PREFIXES) {
            if !found.iter().any(|e| e.id == path) {
                found.push(Endpoint::new(self.kind(), path, "serial device"));
            }
        }
        debug!(count = found.len(), "serial discovery finished");
        found
    }

    async fn connect(&mut self, endpoint: Option<&str>) -> Result<Session, EtiquetaError> {
        if self.slot.is_occupied() {
            return Err(EtiquetaError::Connection(
                "serial already has an open session".to_string(),
            ));
        }

        let mut last_error = None;
        for device in candidates(&*self, endpoint).await {
            match self.open(&device).await {
                Ok(file) => {
                    self.slot.acquire(self.kind(), &device)?;
                    info!(device = %device, baud = self.settings.baud_rate, "serial device open");
                    return Ok(Session::open(self.kind(), device, SessionHandle::Serial(file)));
                }
                Err(e) => {
                    debug!(device = %device, error = %e, "serial candidate unreachable");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EtiquetaError::Connection("no serial device found".to_string())
        }))
    }

    async fn send(
        &mut self,
        session: &mut Session,
        document: &LabelDocument,
        copies: u32,
    ) -> Result<TransportResult, EtiquetaError> {
        session.ensure_open()?;
        let file = match std::mem::replace(&mut session.handle, SessionHandle::None) {
            SessionHandle::Serial(file) => file,
            _ => {
                return Err(EtiquetaError::Send(
                    "serial session has no open device".to_string(),
                ));
            }
        };

        let (bytes, writes) = copy_plan(document, copies, self.supports_copy_count());
        let chunk_size = self.settings.chunk_size.max(1);
        let chunk_delay = Duration::from_millis(self.settings.chunk_delay_ms);
        let limit = self.timeouts.send();

        let cancel = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&cancel);
        let task = tokio::task::spawn_blocking(move || {
            let mut file = file;
            for _ in 0..writes {
                write_chunked(&mut file, &bytes, chunk_size, chunk_delay, &stop)?;
            }
            Ok::<_, EtiquetaError>(file)
        });

        let outcome = bounded(
            limit,
            async {
                task.await
                    .map_err(|e| EtiquetaError::Send(format!("write task failed: {}", e)))?
            },
            || EtiquetaError::Send(format!("serial write timed out after {:?}", limit)),
        )
        .await;

        let file = match outcome {
            Ok(file) => file,
            Err(e) => {
                // The device handle went with the writer; nothing is left to reuse.
                cancel.store(true, Ordering::SeqCst);
                warn!(device = %session.endpoint, error = %e, "serial write abandoned");
                session.close();
                return Err(e);
            }
        };

        session.handle = SessionHandle::Serial(file);
        Ok(TransportResult::ok(format!(
            "wrote {} cop{} to {}",
            writes,
            if writes == 1 { "y" } else { "ies" },
            session.endpoint()
        )))
    }

    async fn disconnect(&mut self, session: &mut Session) {
        if let SessionHandle::Serial(file) = &mut session.handle {
            if let Err(e) = file.flush() {
                warn!(device = %session.endpoint, error = %e, "flush on close failed");
            }
        }
        session.close();
        self.slot.release();
    }
}

/// Open a device for writing, configuring it as a raw TTY when it is one.
fn open_device(path: &Path, baud_rate: u32) -> Result<File, EtiquetaError> {
    let file = OpenOptions::new().write(true).open(path).map_err(|e| {
        EtiquetaError::Connection(format!("Failed to open {}: {}", path.display(), e))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;

        let fd = file.as_raw_fd();
        if unsafe { libc::isatty(fd) } == 1 {
            configure_tty_raw(fd, baud_rate)?;
        } else {
            debug!(path = %path.display(), "not a terminal, skipping TTY setup");
        }
    }
    #[cfg(not(unix))]
    let _ = baud_rate;

    Ok(file)
}

/// Write `data` in `chunk_size` pieces, pausing between them, then flush.
///
/// Checks `cancel` before every chunk and gives up once it is set.
fn write_chunked(
    file: &mut File,
    data: &[u8],
    chunk_size: usize,
    chunk_delay: Duration,
    cancel: &AtomicBool,
) -> Result<(), EtiquetaError> {
    let chunked = data.len() > chunk_size;
    for chunk in data.chunks(chunk_size) {
        if cancel.load(Ordering::SeqCst) {
            return Err(EtiquetaError::Send("write cancelled".to_string()));
        }
        file.write_all(chunk)
            .map_err(|e| EtiquetaError::Send(format!("Write failed: {}", e)))?;

        if chunked && !chunk_delay.is_zero() {
            thread::sleep(chunk_delay);
        }
    }

    file.flush()
        .map_err(|e| EtiquetaError::Send(format!("Flush failed: {}", e)))
}

/// Entries of `dir` whose names start with one of `prefixes`, sorted.
pub(crate) fn scan_dir(dir: &Path, prefixes: &[&str]) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            prefixes.iter().any(|prefix| name.starts_with(prefix))
        })
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect();
    found.sort();
    found
}

/// Map a numeric baud rate to its termios speed constant.
#[cfg(unix)]
fn baud_constant(rate: u32) -> Option<libc::speed_t> {
    Some(match rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        _ => return None,
    })
}

/// Configure a file descriptor for raw TTY mode at `baud_rate`.
///
/// ## What Gets Disabled
///
/// - **Input flags**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY
/// - **Output flags**: OPOST
/// - **Local flags**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
/// - **Control flags**: CSIZE, PARENB (then CS8 is set)
#[cfg(unix)]
fn configure_tty_raw(fd: i32, baud_rate: u32) -> Result<(), EtiquetaError> {
    use std::mem::MaybeUninit;

    let speed = baud_constant(baud_rate).ok_or_else(|| {
        EtiquetaError::Connection(format!("unsupported baud rate {}", baud_rate))
    })?;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(EtiquetaError::Connection(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8 | libc::CLOCAL;

    unsafe {
        libc::cfsetispeed(&mut termios, speed);
        libc::cfsetospeed(&mut termios, speed);
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(EtiquetaError::Connection(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}
