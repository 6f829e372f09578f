//! Binary branch traces.
//!
//! A trace is a flat sequence of little-endian 24-byte records:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 8    | program counter |
//! | 8      | 8    | target address |
//! | 16     | 4    | [BranchFlags] |
//! | 20     | 4    | padding |

use std::fs::File;
use std::io::{ BufWriter, Read, Write };
use std::path::Path;

use crate::branch::*;
use crate::error::TraceError;

/// A sequence of [BranchRecord]s read from a file.
pub struct BinaryTrace {
    pub name: String,
    records: Vec<BranchRecord>,
}
impl BinaryTrace {
    /// Size of a single record [in bytes].
    pub const RECORD_SIZE: usize = 24;

    pub fn from_records(name: impl ToString, records: Vec<BranchRecord>)
        -> Self
    {
        Self { name: name.to_string(), records }
    }

    /// Create a [BinaryTrace] from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        let name = path.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_bytes(name, &data)
    }

    /// Decode a [BinaryTrace] from raw bytes.
    pub fn from_bytes(name: impl ToString, data: &[u8])
        -> Result<Self, TraceError>
    {
        if data.len() % Self::RECORD_SIZE != 0 {
            return Err(TraceError::Truncated {
                len: data.len(),
                record_size: Self::RECORD_SIZE,
            });
        }
        let records = data.chunks_exact(Self::RECORD_SIZE)
            .map(decode_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_records(name, records))
    }

    /// Write all records to 'w'.
    pub fn write_to(&self, mut w: impl Write) -> Result<(), TraceError> {
        for record in self.records.iter() {
            w.write_all(&encode_record(record))?;
        }
        w.flush()?;
        Ok(())
    }

    /// Write all records to a file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let f = File::create(path)?;
        self.write_to(BufWriter::new(f))
    }

    /// Return the number of records
    pub fn num_entries(&self) -> usize { self.records.len() }

    pub fn name(&self) -> &str { &self.name }

    /// Return a slice of records.
    pub fn as_slice(&self) -> &[BranchRecord] { &self.records }

    /// Return a truncated slice of records
    pub fn as_slice_trunc(&self, limit: usize) -> &[BranchRecord] {
        &self.records[..limit.min(self.records.len())]
    }
}

/// Encode a single record.
pub fn encode_record(record: &BranchRecord) -> [u8; BinaryTrace::RECORD_SIZE] {
    let mut res = [0u8; BinaryTrace::RECORD_SIZE];
    res[0..8].copy_from_slice(&record.pc.to_le_bytes());
    res[8..16].copy_from_slice(&record.tgt.to_le_bytes());
    res[16..20].copy_from_slice(&record.flags().0.to_le_bytes());
    res
}

/// Decode a single record. 'buf' must hold exactly one record.
pub fn decode_record(buf: &[u8]) -> Result<BranchRecord, TraceError> {
    let mut pc = [0u8; 8];
    let mut tgt = [0u8; 8];
    let mut flags = [0u8; 4];
    pc.copy_from_slice(&buf[0..8]);
    tgt.copy_from_slice(&buf[8..16]);
    flags.copy_from_slice(&buf[16..20]);

    let flags = BranchFlags(u32::from_le_bytes(flags));
    Ok(BranchRecord {
        pc: u64::from_le_bytes(pc),
        tgt: u64::from_le_bytes(tgt),
        kind: flags.kind()?,
        outcome: Outcome::from_bool(flags.is_taken()),
    })
}


#[cfg(test)]
mod test {
    use super::*;

    fn records() -> Vec<BranchRecord> {
        vec![
            BranchRecord::new(0x1000, 0x0f00, OpType::JmpDirectCond, Outcome::T),
            BranchRecord::new(0x1004, 0x2000, OpType::CallIndirect, Outcome::T),
            BranchRecord::new(0x2010, 0x1008, OpType::Return, Outcome::T),
            BranchRecord::new(0x1008, 0x0f00, OpType::JmpDirectCond, Outcome::N),
        ]
    }

    #[test]
    fn record_layout() {
        let r = BranchRecord::new(0x0102, 0x0304, OpType::JmpDirectCond,
            Outcome::T);
        let buf = encode_record(&r);
        assert_eq!(&buf[0..2], &[0x02, 0x01]);
        assert_eq!(&buf[8..10], &[0x04, 0x03]);
        assert_eq!(buf[16], 0b10_0001);
        assert_eq!(&buf[20..24], &[0, 0, 0, 0]);
        assert_eq!(decode_record(&buf).unwrap(), r);
    }

    #[test]
    fn file_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("mtage-trace-{}.bin", std::process::id()));
        let trace = BinaryTrace::from_records("t", records());
        trace.to_file(&path).unwrap();

        let read = BinaryTrace::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read.num_entries(), 4);
        assert_eq!(read.as_slice(), trace.as_slice());
        assert_eq!(read.as_slice_trunc(2).len(), 2);
        assert_eq!(read.as_slice_trunc(10).len(), 4);
    }

    #[test]
    fn malformed_traces_are_rejected() {
        let mut buf = Vec::new();
        BinaryTrace::from_records("t", records()).write_to(&mut buf).unwrap();

        let res = BinaryTrace::from_bytes("t", &buf[..30]);
        assert!(matches!(res, Err(TraceError::Truncated { len: 30, .. })));

        buf[16] = 0b0000_0011;
        let res = BinaryTrace::from_bytes("t", &buf);
        assert!(matches!(res, Err(TraceError::InvalidFlags { flags: 3 })));

        let res = BinaryTrace::from_file("/nonexistent/trace.bin");
        assert!(matches!(res, Err(TraceError::Io(_))));
    }
}
