//! Durable binary capture of a run.
//!
//! A capture file is a sequence of frames `[len:u32 LE][crc32:u32 LE][payload]`
//! where the payload is a bincode-encoded [`CaptureFrame`]. The first frame is
//! a [`CaptureHeader`]; packets follow in snapshot order, then the spans of
//! sequences that could not be recovered.
use crate::gaps::SequenceSpan;
use crate::packet::Packet;
use crate::snapshot::{Origin, Snapshot};
use anyhow::{bail, Context, Result};
use crc32fast::Hasher as Crc32;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const CAPTURE_VERSION: u16 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureHeader {
    pub version: u16,
    pub created_unix_ns: u128,
    pub upstream: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaptureFrame {
    Header(CaptureHeader),
    Packet { origin: Origin, packet: Packet },
    Unrecovered { span: SequenceSpan },
}

pub fn now_unix_ns() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

pub fn write_frame<W: Write>(w: &mut W, frame: &CaptureFrame) -> Result<()> {
    let payload = bincode::serialize(frame)?;
    let mut hasher = Crc32::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let len = payload.len() as u32;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(&crc.to_le_bytes())?;
    w.write_all(&payload)?;
    Ok(())
}

/// Write a whole snapshot as a capture file, replacing any existing file.
pub fn write_capture(path: &Path, upstream: &str, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("open {:?}", path))?;
    let mut w = BufWriter::new(file);
    write_frame(
        &mut w,
        &CaptureFrame::Header(CaptureHeader {
            version: CAPTURE_VERSION,
            created_unix_ns: now_unix_ns(),
            upstream: upstream.to_string(),
        }),
    )?;
    for (origin, packet) in snapshot.entries() {
        write_frame(&mut w, &CaptureFrame::Packet { origin: *origin, packet: packet.clone() })?;
    }
    for &span in &snapshot.unrecovered {
        write_frame(&mut w, &CaptureFrame::Unrecovered { span })?;
    }
    w.flush()?;
    Ok(())
}

fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads frames back, checking every CRC.
pub struct CaptureReader<R> {
    inner: R,
    frames: usize,
}

impl CaptureReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {:?}", path))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> CaptureReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, frames: 0 }
    }

    /// Next frame, or `None` at a clean end of file.
    pub fn next_frame(&mut self) -> Result<Option<CaptureFrame>> {
        let len = match read_u32(&mut self.inner) {
            Ok(v) => v as usize,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let crc_on_file = read_u32(&mut self.inner).context("frame crc")?;
        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload).context("frame payload")?;
        let mut hasher = Crc32::new();
        hasher.update(&payload);
        let crc_calc = hasher.finalize();
        if crc_calc != crc_on_file {
            bail!("CRC mismatch at frame {}: file={:#x}, calc={:#x}", self.frames, crc_on_file, crc_calc);
        }
        self.frames += 1;
        let frame: CaptureFrame = bincode::deserialize(&payload).context("bincode decode")?;
        Ok(Some(frame))
    }

    /// Read the rest of the file back into a header and snapshot.
    pub fn read_snapshot(&mut self) -> Result<(CaptureHeader, Snapshot)> {
        let header = match self.next_frame()? {
            Some(CaptureFrame::Header(h)) => h,
            Some(_) => bail!("capture does not start with a header"),
            None => bail!("empty capture"),
        };
        if header.version != CAPTURE_VERSION {
            bail!("unsupported capture version {}", header.version);
        }
        let mut entries = Vec::new();
        let mut unrecovered = Vec::new();
        while let Some(frame) = self.next_frame()? {
            match frame {
                CaptureFrame::Packet { origin, packet } => entries.push((origin, packet)),
                CaptureFrame::Unrecovered { span } => unrecovered.push(span),
                CaptureFrame::Header(_) => bail!("unexpected header at frame {}", self.frames - 1),
            }
        }
        Ok((header, Snapshot::from_entries(entries, unrecovered)))
    }
}
