use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use itertools::Itertools;

use crate::{
    bytes_ext::{ReadBytesExt, WriteBytesExt},
    dir::DirEntry,
    error::Error,
};

/// The world is a 2041 x 2041 grid of sample points (255 x 255 landblocks
/// of 8 x 8 squares, sharing their edges).
pub const LAND_SIZE: usize = 2041;

/// A landblock record is always exactly this long.
pub const LANDBLOCK_LEN: u32 = 252;

const MAP_FILE_LEN: u64 = (LAND_SIZE * LAND_SIZE * 4) as u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandCell {
    pub terrain: u16,
    pub z: u8,
    pub used: bool,
}

/// A cell that already held different data before a landblock was written
/// over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overwrite {
    pub x: usize,
    pub y: usize,
    pub old: LandCell,
    pub new: LandCell,
}

/// The aggregated world map, row-major with row 0 at the north edge.
pub struct LandMap {
    cells: Vec<LandCell>,
}

/// Landblock keys are of the form xxyyFFFF, with xx the east-west block
/// index and yy the north-south block index.
pub fn is_landblock(entry: &DirEntry) -> bool {
    entry.key & 0xFFFF == 0xFFFF
        && entry.len == LANDBLOCK_LEN
        && entry.key >> 24 < 0xFF
        && (entry.key >> 16) & 0xFF < 0xFF
}

impl LandMap {
    pub fn new() -> LandMap {
        LandMap {
            cells: vec![LandCell::default(); LAND_SIZE * LAND_SIZE],
        }
    }

    pub fn cell(&self, x: usize, y: usize) -> LandCell {
        self.cells[y * LAND_SIZE + x]
    }

    pub fn load(path: &Path) -> Result<LandMap, Error> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len != MAP_FILE_LEN {
            return Err(Error::MapFileSize(len));
        }

        let mut reader = BufReader::new(file);
        let mut cells = Vec::with_capacity(LAND_SIZE * LAND_SIZE);
        for _ in 0..LAND_SIZE * LAND_SIZE {
            let terrain = reader.read_le_u16()?;
            let z = reader.read_u8()?;
            let used = reader.read_u8()? != 0;
            cells.push(LandCell { terrain, z, used });
        }

        Ok(LandMap { cells })
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        for cell in &self.cells {
            writer.write_le_u16(cell.terrain)?;
            writer.write_u8(cell.z)?;
            writer.write_u8(cell.used as u8)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Overlay one landblock onto the map. Returns the cells that held
    /// different data already; edge samples of adjacent landblocks are
    /// redundant, so identical overwrites are normal.
    pub fn apply_landblock(&mut self, key: u32, data: &[u8]) -> Result<Vec<Overwrite>, Error> {
        if data.len() != LANDBLOCK_LEN as usize {
            return Err(Error::InvalidRecord(key, "landblock is not 252 bytes"));
        }

        let block_x = (key >> 24) as usize;
        let block_y = ((key >> 16) & 0xFF) as usize;
        if block_x >= 0xFF || block_y >= 0xFF {
            return Err(Error::InvalidRecord(key, "landblock indices out of range"));
        }

        let start_x = 8 * block_x;
        let start_y = LAND_SIZE - 8 * block_y - 1;

        // After the id and object-block words come 81 terrain codes and 81
        // height bytes, both column-major.
        let mut overwrites = Vec::new();
        for x in 0..9 {
            for y in 0..9 {
                let i = x * 9 + y;
                let terrain =
                    u16::from_le_bytes(data[8 + 2 * i..8 + 2 * i + 2].try_into().unwrap());
                let z = data[170 + i];
                let new = LandCell {
                    terrain,
                    z,
                    used: true,
                };

                let col = start_x + x;
                let row = start_y - y;
                let cell = &mut self.cells[row * LAND_SIZE + col];
                if cell.used && (cell.terrain != new.terrain || cell.z != new.z) {
                    overwrites.push(Overwrite {
                        x: col,
                        y: row,
                        old: *cell,
                        new,
                    });
                }
                *cell = new;
            }
        }

        Ok(overwrites)
    }

    /// Used-cell count per low terrain byte, ascending.
    pub fn terrain_counts(&self) -> Vec<(u8, usize)> {
        self.cells
            .iter()
            .filter(|c| c.used)
            .map(|c| (c.terrain & 0xFF) as u8)
            .counts()
            .into_iter()
            .sorted()
            .collect()
    }
}
