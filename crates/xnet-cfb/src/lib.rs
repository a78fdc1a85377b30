//! Reader for the Microsoft Compound File Binary (MS-CFB) container format.
//!
//! Altium schematic documents (`.SchDoc`) are OLE compound files: a FAT-like
//! filesystem of named streams packed into a single file. This crate decodes
//! the container far enough to pull out individual streams by name (the
//! schematic payload lives in a stream called `FileHeader`).
//!
//! The whole file is loaded into memory up front; streams are materialised
//! on demand by following FAT (or mini-FAT) sector chains.

use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

/// The 8-byte signature every compound file starts with.
pub const MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Any sector id at or above this value is a special marker
/// (DIFSECT/FATSECT/ENDOFCHAIN/FREESECT) and terminates a chain.
const FIRST_SPECIAL_SECTOR: u32 = 0xFFFF_FFFC;

/// Safety cap on sector chains so corrupt or malicious files cannot spin
/// the reader indefinitely.
const MAX_CHAIN_LEN: usize = 1_000_000;

const HEADER_LEN: usize = 512;
const HEADER_DIFAT_ENTRIES: usize = 109;
const DIR_ENTRY_LEN: usize = 128;

const DIR_TYPE_STREAM: u8 = 2;
const DIR_TYPE_ROOT: u8 = 5;

#[derive(Debug, Error)]
pub enum CfbError {
    #[error("not a compound file (bad OLE magic)")]
    BadMagic,
    #[error("not a compound file (byte-order mark {0:#06x}, expected 0xfffe)")]
    BadByteOrder(u16),
    #[error("compound file truncated ({0})")]
    Truncated(&'static str),
    #[error("sector chain exceeds {MAX_CHAIN_LEN} sectors (corrupt file?)")]
    ChainTooLong,
    #[error("stream not found: {0}")]
    StreamNotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
struct DirEntry {
    name: String,
    entry_type: u8,
    start_sector: u32,
    size: u64,
}

/// An opened compound file, with its FAT, mini-FAT and directory decoded.
pub struct CompoundFile {
    data: Vec<u8>,
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u64,
    fat: Vec<u32>,
    mini_fat: Vec<u32>,
    entries: Vec<DirEntry>,
    /// Contents of the root entry's stream, which backs all mini-FAT streams.
    mini_stream: Vec<u8>,
}

impl CompoundFile {
    /// Open and fully index a compound file on disk.
    pub fn open(path: &Path) -> Result<Self, CfbError> {
        let data = fs::read(path)?;
        Self::open_bytes(data)
    }

    /// Decode a compound file already held in memory.
    pub fn open_bytes(data: Vec<u8>) -> Result<Self, CfbError> {
        if data.len() < HEADER_LEN {
            return Err(CfbError::Truncated("header"));
        }
        if data[..8] != MAGIC {
            return Err(CfbError::BadMagic);
        }
        let byte_order = read_u16(&data, 28)?;
        if byte_order != 0xFFFE {
            return Err(CfbError::BadByteOrder(byte_order));
        }

        let major_version = read_u16(&data, 26)?;
        let sector_size = 1usize << read_u16(&data, 30)?;
        let mini_sector_size = 1usize << read_u16(&data, 32)?;
        let first_dir_sector = read_u32(&data, 48)?;
        let mini_stream_cutoff = read_u32(&data, 56)? as u64;
        let first_mini_fat_sector = read_u32(&data, 60)?;
        let first_difat_sector = read_u32(&data, 68)?;
        let difat_sector_count = read_u32(&data, 72)?;

        debug!(
            "cfb header: v{major_version}, sector {sector_size}, mini {mini_sector_size}, \
             cutoff {mini_stream_cutoff}"
        );

        let mut file = CompoundFile {
            data,
            sector_size,
            mini_sector_size,
            mini_stream_cutoff,
            fat: Vec::new(),
            mini_fat: Vec::new(),
            entries: Vec::new(),
            mini_stream: Vec::new(),
        };

        let fat_sectors = file.collect_fat_sectors(first_difat_sector, difat_sector_count)?;
        file.fat = file.read_sector_table(&fat_sectors)?;
        file.mini_fat = {
            let chain = file.follow_chain(first_mini_fat_sector)?;
            file.read_sector_table(&chain)?
        };
        file.read_directory(first_dir_sector, major_version)?;
        file.load_mini_stream()?;

        Ok(file)
    }

    /// Names of all stream entries in the directory.
    pub fn stream_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == DIR_TYPE_STREAM)
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Read the contents of a named stream. Name comparison is
    /// case-insensitive, matching how OLE consumers address streams.
    pub fn read_stream(&self, name: &str) -> Result<Vec<u8>, CfbError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.entry_type == DIR_TYPE_STREAM && e.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CfbError::StreamNotFound(name.to_string()))?;

        if entry.size < self.mini_stream_cutoff {
            self.read_mini_chain(entry.start_sector, entry.size)
        } else {
            self.read_fat_chain(entry.start_sector, entry.size)
        }
    }

    /// Sector ids holding FAT data: the 109 embedded DIFAT slots, then the
    /// DIFAT sector chain (each DIFAT sector ends with a next-pointer).
    fn collect_fat_sectors(&self, first_difat: u32, difat_count: u32) -> Result<Vec<u32>, CfbError> {
        let mut fat_sectors = Vec::new();
        for i in 0..HEADER_DIFAT_ENTRIES {
            let sector = read_u32(&self.data, 76 + i * 4)?;
            if sector < FIRST_SPECIAL_SECTOR {
                fat_sectors.push(sector);
            }
        }

        let refs_per_difat = self.sector_size / 4 - 1;
        let mut difat_sector = first_difat;
        let mut walked = 0usize;
        while difat_sector < FIRST_SPECIAL_SECTOR {
            if walked >= MAX_CHAIN_LEN || walked > difat_count as usize {
                return Err(CfbError::ChainTooLong);
            }
            let base = self.sector_offset(difat_sector);
            for i in 0..refs_per_difat {
                let sector = read_u32(&self.data, base + i * 4)?;
                if sector < FIRST_SPECIAL_SECTOR {
                    fat_sectors.push(sector);
                }
            }
            difat_sector = read_u32(&self.data, base + refs_per_difat * 4)?;
            walked += 1;
        }

        Ok(fat_sectors)
    }

    /// Concatenate the given sectors and reinterpret them as a table of
    /// little-endian u32 entries (used for both the FAT and the mini-FAT).
    fn read_sector_table(&self, sectors: &[u32]) -> Result<Vec<u32>, CfbError> {
        let entries_per_sector = self.sector_size / 4;
        let mut table = Vec::with_capacity(sectors.len() * entries_per_sector);
        for &sector in sectors {
            let base = self.sector_offset(sector);
            for i in 0..entries_per_sector {
                table.push(read_u32(&self.data, base + i * 4)?);
            }
        }
        Ok(table)
    }

    /// Follow a FAT chain from `start`, returning the sector ids in order.
    fn follow_chain(&self, start: u32) -> Result<Vec<u32>, CfbError> {
        let mut chain = Vec::new();
        let mut sector = start;
        while sector < FIRST_SPECIAL_SECTOR {
            if chain.len() >= MAX_CHAIN_LEN {
                return Err(CfbError::ChainTooLong);
            }
            chain.push(sector);
            sector = *self
                .fat
                .get(sector as usize)
                .ok_or(CfbError::Truncated("FAT entry"))?;
        }
        Ok(chain)
    }

    fn read_directory(&mut self, first_dir_sector: u32, major_version: u16) -> Result<(), CfbError> {
        let chain = self.follow_chain(first_dir_sector)?;
        let entries_per_sector = self.sector_size / DIR_ENTRY_LEN;
        let mut entries = Vec::new();

        for sector in chain {
            let base = self.sector_offset(sector);
            for i in 0..entries_per_sector {
                let off = base + i * DIR_ENTRY_LEN;
                let name_len = read_u16(&self.data, off + 64)? as usize;
                let entry_type = *self
                    .data
                    .get(off + 66)
                    .ok_or(CfbError::Truncated("directory entry"))?;
                if name_len < 2 || entry_type == 0 {
                    continue;
                }

                // Name is UTF-16LE; name_len counts bytes including the NUL.
                let name_bytes = self
                    .data
                    .get(off..off + name_len.min(64) - 2)
                    .ok_or(CfbError::Truncated("directory entry name"))?;
                let units: Vec<u16> = name_bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                let name = String::from_utf16_lossy(&units);

                let start_sector = read_u32(&self.data, off + 116)?;
                let mut size = read_u64(&self.data, off + 120)?;
                if major_version == 3 {
                    // Version-3 writers only maintain the low 32 bits.
                    size &= 0xFFFF_FFFF;
                }

                entries.push(DirEntry {
                    name,
                    entry_type,
                    start_sector,
                    size,
                });
            }
        }

        self.entries = entries;
        Ok(())
    }

    /// The mini stream (backing store for small streams) is the root
    /// directory entry's own stream, addressed through the main FAT.
    fn load_mini_stream(&mut self) -> Result<(), CfbError> {
        let Some(root) = self
            .entries
            .iter()
            .find(|e| e.entry_type == DIR_TYPE_ROOT)
        else {
            return Ok(());
        };
        if root.start_sector >= FIRST_SPECIAL_SECTOR || root.size == 0 {
            return Ok(());
        }
        self.mini_stream = self.read_fat_chain(root.start_sector, root.size)?;
        Ok(())
    }

    fn read_fat_chain(&self, start: u32, size: u64) -> Result<Vec<u8>, CfbError> {
        let chain = self.follow_chain(start)?;
        let mut out = Vec::with_capacity(size as usize);
        for sector in chain {
            let base = self.sector_offset(sector);
            let bytes = self
                .data
                .get(base..base + self.sector_size)
                .ok_or(CfbError::Truncated("sector data"))?;
            out.extend_from_slice(bytes);
            if out.len() as u64 >= size {
                break;
            }
        }
        if (out.len() as u64) < size {
            return Err(CfbError::Truncated("stream data"));
        }
        out.truncate(size as usize);
        Ok(out)
    }

    fn read_mini_chain(&self, start: u32, size: u64) -> Result<Vec<u8>, CfbError> {
        let mut out = Vec::with_capacity(size as usize);
        let mut sector = start;
        let mut walked = 0usize;
        while sector < FIRST_SPECIAL_SECTOR {
            if walked >= MAX_CHAIN_LEN {
                return Err(CfbError::ChainTooLong);
            }
            let base = sector as usize * self.mini_sector_size;
            let bytes = self
                .mini_stream
                .get(base..base + self.mini_sector_size)
                .ok_or(CfbError::Truncated("mini stream sector"))?;
            out.extend_from_slice(bytes);
            if out.len() as u64 >= size {
                break;
            }
            sector = *self
                .mini_fat
                .get(sector as usize)
                .ok_or(CfbError::Truncated("mini-FAT entry"))?;
            walked += 1;
        }
        if (out.len() as u64) < size {
            return Err(CfbError::Truncated("mini stream data"));
        }
        out.truncate(size as usize);
        Ok(out)
    }

    /// Byte offset of a sector. Sector 0 starts right after the header
    /// region, which occupies one full sector (512 bytes in v3 files,
    /// padded to 4096 in v4 files).
    fn sector_offset(&self, sector: u32) -> usize {
        (sector as usize + 1) * self.sector_size
    }
}

fn read_u16(data: &[u8], off: usize) -> Result<u16, CfbError> {
    data.get(off..off + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(CfbError::Truncated("u16 field"))
}

fn read_u32(data: &[u8], off: usize) -> Result<u32, CfbError> {
    data.get(off..off + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(CfbError::Truncated("u32 field"))
}

fn read_u64(data: &[u8], off: usize) -> Result<u64, CfbError> {
    data.get(off..off + 8)
        .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .ok_or(CfbError::Truncated("u64 field"))
}
