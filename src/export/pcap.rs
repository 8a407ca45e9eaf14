use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::*;

/// Writes "interesting" frames (management traffic, SNAP data, decryption
/// products) to a classic little-endian pcap with link type 105, so the
/// result can be replayed straight back through the file source.
///
/// The file is created lazily on the first frame.  A write failure is
/// reported once and the writer goes quiet; losing the pcap must never
/// disturb ingest.
pub struct PcapWriter {
    path: PathBuf,
    out: Option<BufWriter<File>>,
    failed: bool,
}

impl PcapWriter {
    pub fn new(path: PathBuf) -> PcapWriter {
        PcapWriter {
            path,
            out: None,
            failed: false,
        }
    }

    pub fn write_frame(&mut self, time: u32, data: &[u8]) {
        if self.failed {
            return;
        }
        if let Err(e) = self.try_write(time, data) {
            warn!("failed to write {}: {}", self.path.display(), e);
            self.failed = true;
        }
    }

    fn try_write(&mut self, time: u32, data: &[u8]) -> io::Result<()> {
        if self.out.is_none() {
            self.out = Some(Self::create(&self.path)?);
        }
        let out = self.out.as_mut().unwrap();
        out.write_u32::<LittleEndian>(time)?;
        out.write_u32::<LittleEndian>(0)?; // ts_usec
        out.write_u32::<LittleEndian>(data.len() as u32)?;
        out.write_u32::<LittleEndian>(data.len() as u32)?;
        out.write_all(data)?;
        out.flush()
    }

    fn create(path: &Path) -> io::Result<BufWriter<File>> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_u32::<LittleEndian>(0xa1b2_c3d4)?;
        out.write_u16::<LittleEndian>(2)?; // version
        out.write_u16::<LittleEndian>(4)?;
        out.write_i32::<LittleEndian>(0)?; // thiszone
        out.write_u32::<LittleEndian>(0)?; // sigfigs
        out.write_u32::<LittleEndian>(0xffff)?; // snaplen
        out.write_u32::<LittleEndian>(105)?; // ieee 802.11
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CaptureFile;
    use crate::stats::Stats;
    use std::sync::Arc;

    #[test]
    fn output_is_readable_by_the_file_source() {
        let path = std::env::temp_dir().join(format!("airsift-pcap-test-{}.pcap", std::process::id()));
        let mut writer = PcapWriter::new(path.clone());
        writer.write_frame(42, &[0x80, 0, 1, 2, 3, 4]);
        writer.write_frame(43, &[0x08, 1, 2, 3, 4, 5]);
        drop(writer);

        let mut cap = CaptureFile::open(&path, Arc::new(Stats::new())).unwrap();
        let first = cap.next_frame().unwrap().unwrap();
        assert_eq!(first.time, 42);
        assert_eq!(&first.data[..], &[0x80, 0, 1, 2, 3, 4]);
        let second = cap.next_frame().unwrap().unwrap();
        assert_eq!(second.time, 43);
        assert!(cap.next_frame().unwrap().is_none());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_path_fails_quietly() {
        let mut writer = PcapWriter::new(PathBuf::from("/nonexistent-dir/x.pcap"));
        writer.write_frame(1, &[0x80]);
        writer.write_frame(2, &[0x80]);
    }
}
