#![allow(clippy::identity_op)]

mod archive;
mod bitmap;
mod bytes_ext;
mod dir;
mod error;
mod landmap;
#[cfg(test)]
mod testutil;

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};

use crate::{
    archive::{Archive, Dialect},
    bitmap::{Bitmap, Clut, PalImage, RgbImage},
    dir::DirEntry,
    error::Error,
    landmap::LandMap,
};

#[derive(Debug, Parser)]
#[command(name = "ac-extract")]
struct Cli {
    /// Directory that extracted records and bitmaps are written to
    #[arg(long, default_value = "dump")]
    out_path: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract the record with the given hex id to a file named after it
    Extract {
        archive: PathBuf,
        id: String,
        /// Which archive dialect to read
        #[arg(long, value_enum, default_value_t = Dialect::Portal)]
        dialect: Dialect,
    },
    /// Export every texture and UI graphic in a portal archive as 24-bit
    /// BMP files, with an index on stdout
    ExportBitmaps { archive: PathBuf },
    /// Merge all landblocks from a cell archive into a map file; the
    /// archive argument NEWMAP instead creates a blank map file
    Map { archive: String, map_file: PathBuf },
}

fn extract(out_path: &Path, archive_path: &Path, dialect: Dialect, id: &str) -> Result<(), Error> {
    let key = u32::from_str_radix(id, 16).map_err(|_| Error::InvalidKey(id.to_string()))?;

    let mut archive = Archive::open(archive_path, dialect)?;
    let root = archive.root_dir();
    let entry = dir::locate(&mut archive, root, key)?;
    let data = archive.read_record(entry.offset, entry.len as usize)?;

    fs::create_dir_all(out_path)?;
    let mut f = File::create(out_path.join(format!("{:08X}", key)))?;
    f.write_all(&data)?;

    println!("Extracted {:08X} ({} bytes)", key, data.len());

    Ok(())
}

fn write_bitmap_file(out_path: &Path, file_num: u32, bitmap: &Bitmap) -> Result<(), Error> {
    let file = File::create(out_path.join(format!("gr{:04}.bmp", file_num)))?;
    let mut w = BufWriter::new(file);
    bitmap.write_bmp(&mut w)?;
    w.flush()?;
    Ok(())
}

fn export_texture(
    archive: &mut Archive,
    root: u32,
    entry: &DirEntry,
    out_path: &Path,
    file_num: u32,
) -> Result<bool, Error> {
    let data = archive.read_record(entry.offset, entry.len as usize)?;
    let Some(image) = PalImage::parse(entry.key, &data)? else {
        return Ok(false);
    };

    let pal_entry = dir::locate(archive, root, image.palette_key)?;
    let pal_data = archive.read_record(pal_entry.offset, pal_entry.len as usize)?;

    let bitmap = image.decode(&Clut::new(image.palette_key, &pal_data))?;
    write_bitmap_file(out_path, file_num, &bitmap)?;

    println!(
        "{:4} {:08X} {:08X} {:3} {:3}",
        file_num, image.id, image.palette_key, image.width, image.height
    );

    Ok(true)
}

fn export_ui_graphic(
    archive: &mut Archive,
    entry: &DirEntry,
    out_path: &Path,
    file_num: u32,
) -> Result<(), Error> {
    let data = archive.read_record(entry.offset, entry.len as usize)?;
    let image = RgbImage::parse(entry.key, &data)?;

    let bitmap = image.decode();
    write_bitmap_file(out_path, file_num, &bitmap)?;

    println!(
        "{:4} {:08X} {:08X} {:3} {:3}",
        file_num, image.id, 0, image.width, image.height
    );

    Ok(())
}

/// Export all palettized textures (ids 05......), then all direct-color UI
/// graphics (ids 06......), numbering the output files with one shared
/// counter. A bad record skips that record, not the run.
fn export_bitmaps(out_path: &Path, archive_path: &Path) -> Result<(), Error> {
    let mut archive = Archive::open(archive_path, Dialect::Portal)?;
    let root = archive.root_dir();
    fs::create_dir_all(out_path)?;

    let mut file_num = 0;

    for entry in dir::enumerate(&mut archive, root, |key| key >> 24 == 0x05)? {
        match export_texture(&mut archive, root, &entry, out_path, file_num) {
            Ok(true) => file_num += 1,
            Ok(false) => {}
            Err(e) => eprintln!("graphic {:08X}: {}", entry.key, e),
        }
    }

    for entry in dir::enumerate(&mut archive, root, |key| key >> 24 == 0x06)? {
        match export_ui_graphic(&mut archive, &entry, out_path, file_num) {
            Ok(()) => file_num += 1,
            Err(e) => eprintln!("graphic {:08X}: {}", entry.key, e),
        }
    }

    Ok(())
}

fn merge_landblocks(archive: &mut Archive, map: &mut LandMap) -> Result<usize, Error> {
    let root = archive.root_dir();
    let entries = dir::enumerate(archive, root, |key| key & 0xFFFF == 0xFFFF)?;

    let mut found = 0;
    for entry in entries.iter().filter(|e| landmap::is_landblock(e)) {
        let result = archive
            .read_record(entry.offset, entry.len as usize)
            .and_then(|data| map.apply_landblock(entry.key, &data));
        match result {
            Ok(overwrites) => {
                for o in &overwrites {
                    println!(
                        "({:4}, {:4}) was {:04X}, {:3}.  Now {:04X}, {:3}.",
                        o.x, o.y, o.old.terrain, o.old.z, o.new.terrain, o.new.z
                    );
                }
                found += 1;
            }
            Err(e) => eprintln!("landblock {:08X}: {}", entry.key, e),
        }
    }

    Ok(found)
}

fn map_new(map_file: &Path) -> Result<(), Error> {
    println!("Writing new map");
    LandMap::new().save(map_file)
}

fn map_merge(cell_path: &Path, map_file: &Path) -> Result<(), Error> {
    let mut map = LandMap::load(map_file)?;
    let mut archive = Archive::open(cell_path, Dialect::Cell)?;

    let found = merge_landblocks(&mut archive, &mut map)?;
    println!("Total land blocks found: {}", found);

    for (terrain, count) in map.terrain_counts() {
        println!("{:02X} {:7}", terrain, count);
    }

    map.save(map_file)
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Extract {
            archive,
            id,
            dialect,
        } => extract(&cli.out_path, archive, *dialect, id),
        Commands::ExportBitmaps { archive } => export_bitmaps(&cli.out_path, archive),
        Commands::Map { archive, map_file } => {
            if archive == "NEWMAP" {
                map_new(map_file)
            } else {
                map_merge(Path::new(archive), map_file)
            }
        }
    }
}
