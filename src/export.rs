//! JSON export of a snapshot: `{"packetStream": [ ... ]}`.
use crate::packet::Packet;
use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketDocument {
    pub packet_stream: Vec<Packet>,
}

impl From<&Snapshot> for PacketDocument {
    fn from(s: &Snapshot) -> Self {
        Self { packet_stream: s.packets().cloned().collect() }
    }
}

pub fn write_json(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
    }
    let file = File::create(path).with_context(|| format!("create {:?}", path))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, &PacketDocument::from(snapshot))?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}
