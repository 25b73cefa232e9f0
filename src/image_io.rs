//! # Raw Image I/O
//!
//! Single-byte grayscale rasters in the firmware's file format:
//!
//! ```text
//! offset 0   u32 LE   width
//! offset 4   u32 LE   height
//! offset 8   u8 * width * height, row-major
//! ```
//!
//! Inputs are read through a read-only memory map. Results are written next to
//! their input with the extension replaced by `.out`, optionally with a PNG preview.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;
use sg_scale::geometry::{Rect, ScaleRequest, Size};

use crate::error::CommandError;

/// Bytes before the first sample.
pub const HEADER_LEN: usize = 8;

/// Extension of scaled outputs.
pub const OUTPUT_EXTENSION: &str = "out";

/// Owned grayscale raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub size: Size,
    pub data: Vec<u8>,
}

impl Image {
    /// Wraps `data`, `None` if its length is not `size.area()`.
    pub fn new(size: Size, data: Vec<u8>) -> Option<Self> {
        (data.len() == size.area()).then_some(Self { size, data })
    }

    /// Raster whose sample at `(x, y)` is `f(x, y)`.
    pub fn from_fn(size: Size, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut data = Vec::with_capacity(size.area());
        for y in 0..size.h {
            for x in 0..size.w {
                data.push(f(x, y));
            }
        }
        Self { size, data }
    }

    pub fn width(&self) -> u32 {
        self.size.w
    }

    pub fn height(&self) -> u32 {
        self.size.h
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

/// Loads a raw image.
///
/// # Errors
///
/// Each failure maps onto the load statuses of the command protocol:
/// unopenable file, missing width, missing height, unaddressable size and
/// truncated sample data.
pub fn load_raw(path: &Path) -> Result<Image, CommandError> {
    let file = File::open(path).map_err(|source| CommandError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let len = file
        .metadata()
        .map_err(|source| CommandError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if len < 4 {
        return Err(CommandError::MissingWidth {
            path: path.to_path_buf(),
        });
    }
    if len < HEADER_LEN as u64 {
        return Err(CommandError::MissingHeight {
            path: path.to_path_buf(),
        });
    }

    // SAFETY: the map is read-only and dropped before this function returns; a
    // concurrent truncation by another process is outside what we guard against.
    let map = unsafe { MmapOptions::new().map(&file) }.map_err(|source| CommandError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let size = Size {
        w: read_u32(&map[0..4]),
        h: read_u32(&map[4..8]),
    };
    let expected = (size.w as usize)
        .checked_mul(size.h as usize)
        .ok_or(CommandError::ImageTooLarge {
            width: size.w,
            height: size.h,
        })?;
    let actual = map.len() - HEADER_LEN;
    if actual < expected {
        return Err(CommandError::Truncated {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }

    let mut data = Vec::new();
    data.try_reserve_exact(expected)
        .map_err(|_| CommandError::ImageTooLarge {
            width: size.w,
            height: size.h,
        })?;
    data.extend_from_slice(&map[HEADER_LEN..HEADER_LEN + expected]);
    log::debug!("loaded {}x{} from {}", size.w, size.h, path.display());
    Ok(Image { size, data })
}

/// Writes a raw image, replacing any existing file.
pub fn save_raw(path: &Path, image: &Image) -> Result<(), CommandError> {
    let file = File::create(path).map_err(|source| CommandError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    out.write_all(&image.size.w.to_le_bytes())
        .map_err(|source| CommandError::WriteWidth {
            path: path.to_path_buf(),
            source,
        })?;
    out.write_all(&image.size.h.to_le_bytes())
        .map_err(|source| CommandError::WriteHeight {
            path: path.to_path_buf(),
            source,
        })?;
    out.write_all(&image.data)
        .and_then(|()| out.flush())
        .map_err(|source| CommandError::WriteData {
            path: path.to_path_buf(),
            source,
        })?;
    log::debug!(
        "saved {}x{} to {}",
        image.size.w,
        image.size.h,
        path.display()
    );
    Ok(())
}

/// `lena.bin` → `lena.out`. A name without an extension gains one.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension(OUTPUT_EXTENSION)
}

/// Per-case benchmark dump: `<stem>_<x>_<y>_<w>_<h>_<xs>_<ys>.out` beside `input`.
pub fn result_path(input: &Path, request: &ScaleRequest) -> PathBuf {
    case_path(input, request, "")
}

/// Hardware output of a case that disagreed with the reference:
/// `<stem>_<x>_<y>_<w>_<h>_<xs>_<ys>_hw.out` beside `input`.
pub fn mismatch_path(input: &Path, request: &ScaleRequest) -> PathBuf {
    case_path(input, request, "_hw")
}

fn case_path(input: &Path, request: &ScaleRequest, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Rect { x, y, w, h } = request.rect;
    input.with_file_name(format!(
        "{}_{}_{}_{}_{}_{}_{}{}.{}",
        stem, x, y, w, h, request.x_scale, request.y_scale, suffix, OUTPUT_EXTENSION
    ))
}

/// Writes a grayscale PNG preview of `image`.
pub fn export_png(path: &Path, image: &Image) -> anyhow::Result<()> {
    let buffer = image::GrayImage::from_raw(image.size.w, image.size.h, image.data.clone())
        .ok_or_else(|| anyhow::anyhow!("raster length does not match {}x{}", image.size.w, image.size.h))?;
    buffer.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Reads any format the `image` crate decodes and converts it to grayscale.
pub fn import_image(path: &Path) -> anyhow::Result<Image> {
    let gray = image::open(path)?.to_luma8();
    let size = Size {
        w: gray.width(),
        h: gray.height(),
    };
    Ok(Image {
        size,
        data: gray.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_scale::geometry::ScaleFactor;
    use std::fs;
    use tempfile::tempdir;

    fn ramp() -> Image {
        Image::from_fn(Size { w: 5, h: 3 }, |x, y| (y * 5 + x) as u8)
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ramp.bin");
        let image = ramp();
        save_raw(&path, &image).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], &[5, 0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(bytes.len(), HEADER_LEN + 15);
        assert_eq!(load_raw(&path).unwrap(), image);
    }

    #[test]
    fn test_load_statuses() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.bin");
        assert_eq!(load_raw(&missing).unwrap_err().status(), 1);

        let cases: [(&[u8], u8); 4] = [
            (&[], 2),
            (&[4, 0], 2),
            (&[4, 0, 0, 0, 2, 0], 3),
            (&[4, 0, 0, 0, 2, 0, 0, 0, 1, 2, 3], 5),
        ];
        for (i, (bytes, status)) in cases.iter().enumerate() {
            let path = dir.path().join(format!("case{}.bin", i));
            fs::write(&path, bytes).unwrap();
            assert_eq!(load_raw(&path).unwrap_err().status(), *status, "case {}", i);
        }
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.bin");
        fs::write(&path, [2, 0, 0, 0, 1, 0, 0, 0, 9, 8, 7]).unwrap();
        assert_eq!(load_raw(&path).unwrap().data, vec![9, 8]);
    }

    #[test]
    fn test_output_names() {
        assert_eq!(output_path(Path::new("/mnt/lena.bin")), PathBuf::from("/mnt/lena.out"));
        assert_eq!(output_path(Path::new("lena")), PathBuf::from("lena.out"));

        let request = ScaleRequest::new(
            Size { w: 64, h: 64 },
            Rect { x: 3, y: 4, w: 10, h: 20 },
            ScaleFactor::new(-2).unwrap(),
            ScaleFactor::new(4).unwrap(),
        )
        .unwrap();
        assert_eq!(
            result_path(Path::new("/data/lena.bin"), &request),
            PathBuf::from("/data/lena_3_4_10_20_-2_4.out")
        );
        assert_eq!(
            mismatch_path(Path::new("/data/lena.bin"), &request),
            PathBuf::from("/data/lena_3_4_10_20_-2_4_hw.out")
        );
    }

    #[test]
    fn test_png_preview_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ramp.png");
        let image = ramp();
        export_png(&path, &image).unwrap();
        assert_eq!(import_image(&path).unwrap(), image);
    }

    #[test]
    fn test_image_new_checks_length() {
        assert!(Image::new(Size { w: 2, h: 2 }, vec![0; 3]).is_none());
        assert!(Image::new(Size { w: 2, h: 2 }, vec![0; 4]).is_some());
    }
}
