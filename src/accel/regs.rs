//! Scaler register map.
//!
//! ```text
//! CR (offset 0)   bit 0-1  |x| - 1     bit 2  x upscale
//!                 bit 3-4  |y| - 1     bit 5  y upscale
//! WH (offset 4)   bit 0-15 width       bit 16-31 height
//! ```

use sg_scale::geometry::ScaleFactor;

use super::{BUFFER_SIZE, RegisterBus};
use crate::error::HwError;

/// Control register (scale factors).
pub const CR_ADDR: usize = 0;
/// Geometry register (rectangle width and height).
pub const WH_ADDR: usize = 4;

pub const X_SCALE_OFFSET: u32 = 0;
pub const X_UPSCALE_OFFSET: u32 = 2;
pub const Y_SCALE_OFFSET: u32 = 3;
pub const Y_UPSCALE_OFFSET: u32 = 5;
pub const WIDTH_OFFSET: u32 = 0;
pub const HEIGHT_OFFSET: u32 = 16;

const SCALE_MASK: u32 = 0b11;
const DIMENSION_MASK: u32 = 0xffff;

/// The two register words programmed for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalerRegisters {
    pub control: u32,
    pub geometry: u32,
}

impl ScalerRegisters {
    pub fn encode(x_scale: ScaleFactor, y_scale: ScaleFactor, width: u32, height: u32) -> Self {
        Self {
            control: encode_control(x_scale, y_scale),
            geometry: encode_geometry(width, height),
        }
    }

    /// Factors and geometry encoded in the words.
    pub fn decode(&self) -> (ScaleFactor, ScaleFactor, u32, u32) {
        let (x, y) = decode_control(self.control);
        let (w, h) = decode_geometry(self.geometry);
        (x, y, w, h)
    }

    /// Programs both registers, control word first.
    pub fn write_to<B: RegisterBus + ?Sized>(&self, bus: &mut B) {
        bus.write32(CR_ADDR, self.control);
        bus.write32(WH_ADDR, self.geometry);
    }

    pub fn read_from<B: RegisterBus + ?Sized>(bus: &B) -> Self {
        Self {
            control: bus.read32(CR_ADDR),
            geometry: bus.read32(WH_ADDR),
        }
    }
}

fn encode_axis(factor: ScaleFactor, scale_offset: u32, upscale_offset: u32) -> u32 {
    let up = u32::from(factor.is_upscale());
    ((factor.magnitude() - 1) & SCALE_MASK) << scale_offset | up << upscale_offset
}

fn decode_axis(word: u32, scale_offset: u32, upscale_offset: u32) -> ScaleFactor {
    let magnitude = ((word >> scale_offset) & SCALE_MASK) + 1;
    let factor = if (word >> upscale_offset) & 1 == 1 {
        ScaleFactor::up(magnitude)
    } else {
        ScaleFactor::down(magnitude)
    };
    // Two bits always decode to a magnitude in 1..=4.
    factor.unwrap_or(ScaleFactor::IDENTITY)
}

pub fn encode_control(x_scale: ScaleFactor, y_scale: ScaleFactor) -> u32 {
    encode_axis(x_scale, X_SCALE_OFFSET, X_UPSCALE_OFFSET)
        | encode_axis(y_scale, Y_SCALE_OFFSET, Y_UPSCALE_OFFSET)
}

pub fn decode_control(word: u32) -> (ScaleFactor, ScaleFactor) {
    (
        decode_axis(word, X_SCALE_OFFSET, X_UPSCALE_OFFSET),
        decode_axis(word, Y_SCALE_OFFSET, Y_UPSCALE_OFFSET),
    )
}

pub fn encode_geometry(width: u32, height: u32) -> u32 {
    (width & DIMENSION_MASK) << WIDTH_OFFSET | (height & DIMENSION_MASK) << HEIGHT_OFFSET
}

pub fn decode_geometry(word: u32) -> (u32, u32) {
    (
        (word >> WIDTH_OFFSET) & DIMENSION_MASK,
        (word >> HEIGHT_OFFSET) & DIMENSION_MASK,
    )
}

/// Rejects rectangles the scaler line buffer cannot hold.
pub fn check_geometry(width: u32, height: u32) -> Result<(), HwError> {
    if width > BUFFER_SIZE {
        return Err(HwError::WidthTooLarge {
            width,
            limit: BUFFER_SIZE,
        });
    }
    if height > BUFFER_SIZE {
        return Err(HwError::HeightTooLarge {
            height,
            limit: BUFFER_SIZE,
        });
    }
    Ok(())
}
