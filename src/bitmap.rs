use std::io::Write;

use crate::{bytes_ext::WriteBytesExt, error::Error};

pub const IMAGE_TYPE_PALETTIZED: u32 = 2;

/// A palettized texture record: header words id, image_type, width,
/// height; then width*height index bytes; then a list of palette keys, of
/// which only the first is used.
pub struct PalImage<'a> {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    indices: &'a [u8],
    pub palette_key: u32,
}

impl<'a> PalImage<'a> {
    /// Returns `Ok(None)` for image types this tool does not decode
    /// (including type 4, whose format is unknown).
    pub fn parse(key: u32, data: &'a [u8]) -> Result<Option<PalImage<'a>>, Error> {
        if data.len() < 16 {
            return Err(Error::InvalidRecord(key, "graphic header truncated"));
        }
        let word = |i: usize| u32::from_le_bytes(data[4 * i..4 * i + 4].try_into().unwrap());

        if word(1) != IMAGE_TYPE_PALETTIZED {
            return Ok(None);
        }

        let width = word(2);
        let height = word(3);
        let num_pixels = width as usize * height as usize;
        if data.len() < 16 + num_pixels {
            return Err(Error::InvalidRecord(key, "index data truncated"));
        }

        // The index plane is padded out to a whole number of words before
        // the palette reference list.
        let palette_loc = 16 + 4 * num_pixels.div_ceil(4);
        if data.len() < palette_loc + 4 {
            return Err(Error::InvalidRecord(key, "palette reference list missing"));
        }
        let palette_key =
            u32::from_le_bytes(data[palette_loc..palette_loc + 4].try_into().unwrap());

        Ok(Some(PalImage {
            id: word(0),
            width,
            height,
            indices: &data[16..16 + num_pixels],
            palette_key,
        }))
    }

    pub fn decode(&self, clut: &Clut) -> Result<Bitmap, Error> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut bitmap = Bitmap::new(self.width, self.height);

        for y in 0..h {
            for x in 0..w {
                let index = self.indices[y * w + x] as usize;
                bitmap.put_pixel(x, y, clut.get(index)?);
            }
        }

        Ok(bitmap)
    }
}

/// A direct-color UI graphic record: header words id, width, height; then
/// width*height pixels of three bytes each.
pub struct RgbImage<'a> {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pixels: &'a [u8],
}

impl<'a> RgbImage<'a> {
    pub fn parse(key: u32, data: &'a [u8]) -> Result<RgbImage<'a>, Error> {
        if data.len() < 12 {
            return Err(Error::InvalidRecord(key, "graphic header truncated"));
        }
        let word = |i: usize| u32::from_le_bytes(data[4 * i..4 * i + 4].try_into().unwrap());

        let width = word(1);
        let height = word(2);
        let num_pixels = width as usize * height as usize;
        if data.len() < 12 + 3 * num_pixels {
            return Err(Error::InvalidRecord(key, "pixel data truncated"));
        }

        Ok(RgbImage {
            id: word(0),
            width,
            height,
            pixels: &data[12..12 + 3 * num_pixels],
        })
    }

    pub fn decode(&self) -> Bitmap {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut bitmap = Bitmap::new(self.width, self.height);

        for y in 0..h {
            for x in 0..w {
                let src = &self.pixels[3 * (y * w + x)..];
                bitmap.put_pixel(x, y, (src[2], src[1], src[0]));
            }
        }

        bitmap
    }
}

/// A palette record. Entry i holds its B, G, R channels at bytes
/// 8 + 4*i + {0,1,2}; the fourth byte is ignored.
pub struct Clut<'a> {
    key: u32,
    data: &'a [u8],
}

impl<'a> Clut<'a> {
    pub fn new(key: u32, data: &'a [u8]) -> Clut<'a> {
        Clut { key, data }
    }

    pub fn get(&self, i: usize) -> Result<(u8, u8, u8), Error> {
        let base = 8 + 4 * i;
        if base + 3 > self.data.len() {
            return Err(Error::InvalidRecord(self.key, "palette entry out of range"));
        }
        Ok((
            self.data[base + 0],
            self.data[base + 1],
            self.data[base + 2],
        ))
    }
}

/// A decoded image: B,G,R triples, top row first.
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Bitmap {
        let data = vec![0u8; 3 * width as usize * height as usize];
        Bitmap {
            width,
            height,
            data,
        }
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, bgr: (u8, u8, u8)) {
        let base = 3 * (y * self.width as usize + x);
        self.data[base + 0] = bgr.0;
        self.data[base + 1] = bgr.1;
        self.data[base + 2] = bgr.2;
    }

    pub fn pixel(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let base = 3 * (y * self.width as usize + x);
        (self.data[base + 0], self.data[base + 1], self.data[base + 2])
    }

    /// Write an uncompressed 24-bit Windows BMP: rows bottom-up, each row
    /// padded with `width mod 4` zero bytes.
    pub fn write_bmp<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let pad = (self.width % 4) as usize;
        let data_size = 3 * self.width * self.height + self.width % 4 * self.height;

        w.write_le_u16(0x4D42)?;
        w.write_le_u32(data_size + 54)?;
        w.write_le_u16(0)?;
        w.write_le_u16(0)?;
        w.write_le_u32(54)?;
        w.write_le_u32(40)?;
        w.write_le_u32(self.width)?;
        w.write_le_u32(self.height)?;
        w.write_le_u16(1)?;
        w.write_le_u16(24)?;
        w.write_le_u32(0)?;
        w.write_le_u32(data_size)?;
        w.write_le_u32(0)?;
        w.write_le_u32(0)?;
        w.write_le_u32(0)?;
        w.write_le_u32(0)?;

        for y in (0..self.height as usize).rev() {
            let row = &self.data[3 * y * self.width as usize..][..3 * self.width as usize];
            w.write_all(row)?;
            for _ in 0..pad {
                w.write_u8(0)?;
            }
        }

        Ok(())
    }
}
