use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    ArchiveOpen(PathBuf, std::io::Error),
    Seek(u32, std::io::Error),
    ShortRead(u32),
    NullPointer(u32),
    CorruptDirectory(u32, &'static str),
    NotFound(u32),
    InvalidRecord(u32, &'static str),
    InvalidKey(String),
    MapFileSize(u64),
    IOError(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ArchiveOpen(path, e) => {
                write!(f, "archive `{}` failed to open: {}", path.display(), e)
            }
            Error::Seek(offset, e) => write!(f, "seek to {:08X} failed: {}", offset, e),
            Error::ShortRead(offset) => write!(f, "short read at {:08X}", offset),
            Error::NullPointer(offset) => {
                write!(f, "null sector pointer found at {:08X}", offset)
            }
            Error::CorruptDirectory(offset, what) => {
                write!(f, "corrupt directory at {:08X}: {}", offset, what)
            }
            Error::NotFound(key) => write!(f, "file {:08X} does not exist", key),
            Error::InvalidRecord(key, what) => write!(f, "invalid record {:08X}: {}", key, what),
            Error::InvalidKey(s) => write!(f, "invalid hex key `{}`", s),
            Error::MapFileSize(size) => write!(f, "map file has wrong size ({} bytes)", size),
            Error::IOError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}
