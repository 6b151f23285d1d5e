//! Synthetic archive construction for tests.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::archive::{Archive, Dialect};

const HEADER_LEN: usize = 1024;
const HIGH_BIT: u32 = 0x8000_0000;

/// A 252-byte landblock record: id word, object-block word, 81 terrain
/// codes and 81 height bytes in column-major order, one pad byte.
pub fn landblock_record(id: u32, terrain: &[u16; 81], z: &[u8; 81]) -> Vec<u8> {
    let mut v = Vec::with_capacity(252);
    v.extend(id.to_le_bytes());
    v.extend(0u32.to_le_bytes());
    for t in terrain {
        v.extend(t.to_le_bytes());
    }
    v.extend(z);
    v.push(0);
    assert_eq!(v.len(), 252);
    v
}

pub struct ArchiveBuilder {
    dialect: Dialect,
    data: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new(dialect: Dialect) -> ArchiveBuilder {
        ArchiveBuilder {
            dialect,
            data: vec![0u8; HEADER_LEN],
        }
    }

    fn alloc_sector(&mut self) -> u32 {
        let offset = self.data.len();
        self.data.resize(offset + self.dialect.sector_size(), 0);
        offset as u32
    }

    pub fn put_word(&mut self, offset: u32, value: u32) {
        let offset = offset as usize;
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_bytes(&mut self, offset: u32, bytes: &[u8]) {
        let offset = offset as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn set_root(&mut self, offset: u32) {
        self.put_word(crate::archive::ROOT_DIR_PTR_LOC, offset);
    }

    /// Lay out `payload` as a chain of sectors and return the start offset.
    pub fn add_record(&mut self, payload: &[u8]) -> u32 {
        self.add_record_flagged(payload, false)
    }

    /// Same, optionally setting the reserved high bit on every non-null
    /// next pointer.
    pub fn add_record_flagged(&mut self, payload: &[u8], flag_pointers: bool) -> u32 {
        let per_sector = self.dialect.sector_size() - 4;
        let num_sectors = payload.len().div_ceil(per_sector).max(1);

        let offsets: Vec<u32> = (0..num_sectors).map(|_| self.alloc_sector()).collect();

        for (i, &offset) in offsets.iter().enumerate() {
            let next = if i + 1 < num_sectors {
                offsets[i + 1] | if flag_pointers { HIGH_BIT } else { 0 }
            } else {
                0
            };
            self.put_word(offset, next);

            let chunk = &payload[i * per_sector..payload.len().min((i + 1) * per_sector)];
            self.put_bytes(offset + 4, chunk);
        }

        offsets[0]
    }

    /// Write a directory node from child pointers and entry triples,
    /// using as many sectors as the content needs.
    pub fn add_dir_node(&mut self, children: &[u32], entries: &[(u32, u32, u32)]) -> u32 {
        assert!(entries.len() < 63);

        let mut words = [0u32; 256];
        for (i, &child) in children.iter().enumerate() {
            words[1 + i] = child;
        }
        words[0x3F] = entries.len() as u32;
        for (i, &(key, offset, len)) in entries.iter().enumerate() {
            words[0x40 + 3 * i] = key;
            words[0x40 + 3 * i + 1] = offset;
            words[0x40 + 3 * i + 2] = len;
        }

        let top = if entries.is_empty() {
            0x3F
        } else {
            0x40 + 3 * entries.len() - 1
        };
        let sectors = if top <= 63 {
            1
        } else {
            1 + (top - 63).div_ceil(63)
        };

        self.add_node_words(&words, sectors)
    }

    /// Write a node's logical word array across an explicit number of
    /// sectors (CELL dialect; the PORTAL dialect always uses one).
    ///
    /// For CELL, word 0 of the first sector is the continuation pointer,
    /// which the builder owns; continuation pointers carry the reserved
    /// high bit so readers must mask it.
    pub fn add_node_words(&mut self, words: &[u32; 256], sectors: usize) -> u32 {
        match self.dialect {
            Dialect::Portal => {
                let offset = self.alloc_sector();
                for (i, &w) in words.iter().enumerate() {
                    self.put_word(offset + 4 * i as u32, w);
                }
                offset
            }
            Dialect::Cell => {
                assert!((1..=4).contains(&sectors));
                let offsets: Vec<u32> = (0..sectors).map(|_| self.alloc_sector()).collect();

                // Word ranges carried by each sector's payload.
                let ranges = [1usize..64, 64..127, 127..190, 190..253];
                for (i, &offset) in offsets.iter().enumerate() {
                    let next = if i + 1 < sectors {
                        offsets[i + 1] | HIGH_BIT
                    } else {
                        0
                    };
                    self.put_word(offset, next);
                    for (j, w) in ranges[i].clone().enumerate() {
                        self.put_word(offset + 4 + 4 * j as u32, words[w]);
                    }
                }

                offsets[0]
            }
        }
    }

    pub fn build(self) -> (NamedTempFile, Archive) {
        let dialect = self.dialect;
        let tmp = self.into_file();
        let archive = Archive::open(tmp.path(), dialect).unwrap();
        (tmp, archive)
    }

    pub fn into_file(self) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&self.data).unwrap();
        tmp.flush().unwrap();
        tmp
    }
}
