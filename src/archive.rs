use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use crate::{bytes_ext::ReadBytesExt, error::Error};

/// Byte offset of the root directory pointer inside the reserved header.
pub const ROOT_DIR_PTR_LOC: u32 = 0x148;

/// The high bit of a next-sector pointer is a reserved flag, not part of
/// the offset.
pub const NEXT_PTR_MASK: u32 = 0x7FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Dialect {
    /// PORTAL-class archive, 1024-byte sectors
    Portal,
    /// CELL-class archive, 256-byte sectors
    Cell,
}

impl Dialect {
    pub fn sector_size(self) -> usize {
        match self {
            Dialect::Portal => 1024,
            Dialect::Cell => 256,
        }
    }
}

pub struct Archive {
    reader: BufReader<File>,
    dialect: Dialect,
    root_dir: u32,
}

impl Archive {
    pub fn open(path: &Path, dialect: Dialect) -> Result<Archive, Error> {
        let file = File::open(path).map_err(|e| Error::ArchiveOpen(path.to_path_buf(), e))?;
        let reader = BufReader::new(file);

        let mut archive = Archive {
            reader,
            dialect,
            root_dir: 0,
        };
        archive.root_dir = archive.read_word(ROOT_DIR_PTR_LOC)?;

        Ok(archive)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn sector_size(&self) -> usize {
        self.dialect.sector_size()
    }

    pub fn root_dir(&self) -> u32 {
        self.root_dir
    }

    pub fn read_word(&mut self, offset: u32) -> Result<u32, Error> {
        self.reader
            .seek(SeekFrom::Start(offset as u64))
            .map_err(|e| Error::Seek(offset, e))?;
        self.reader.read_le_u32().map_err(|_| Error::ShortRead(offset))
    }

    pub fn read_sector(&mut self, offset: u32) -> Result<Vec<u8>, Error> {
        if offset == 0 {
            return Err(Error::NullPointer(0));
        }

        self.reader
            .seek(SeekFrom::Start(offset as u64))
            .map_err(|e| Error::Seek(offset, e))?;

        let mut sec = vec![0u8; self.sector_size()];
        self.reader
            .read_exact(sec.as_mut_slice())
            .map_err(|_| Error::ShortRead(offset))?;

        Ok(sec)
    }

    /// Reassemble a record of `len` bytes from the sector chain starting at
    /// `start`. Each sector contributes bytes [4, sector_size); the last
    /// contribution is truncated to fill `len` exactly.
    pub fn read_record(&mut self, start: u32, len: usize) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::with_capacity(len);
        let mut pos = start;

        while buf.len() < len {
            let sec = self.read_sector(pos)?;
            let next = u32::from_le_bytes(sec[0..4].try_into().unwrap()) & NEXT_PTR_MASK;

            let take = (len - buf.len()).min(self.sector_size() - 4);
            buf.extend_from_slice(&sec[4..4 + take]);

            if buf.len() == len {
                break;
            }
            if next == 0 {
                return Err(Error::NullPointer(pos));
            }
            pos = next;
        }

        Ok(buf)
    }
}
