use half::f16;

use super::ConvertOptions;
use crate::image_format::ImageFormat;

#[derive(Clone, Copy)]
struct Channel {
    shift: u8,
    bits: u8,
}

const fn ch(shift: u8, bits: u8) -> Option<Channel> {
    Some(Channel { shift, bits })
}

enum Layout {
    /// Up to 32 bits per pixel, channels addressed by shift into a little-endian word.
    Packed {
        bytes: usize,
        /// red, green, blue, alpha
        channels: [Option<Channel>; 4],
        /// Bits that are always set when encoding (the X of the padded formats).
        fill: u32,
        color_key: bool,
    },
    Luminance {
        alpha: bool,
    },
    Unorm16,
    Half,
    Float {
        channels: usize,
    },
}

fn layout(format: ImageFormat) -> Option<Layout> {
    use ImageFormat::*;
    let packed = |bytes, channels, fill| Layout::Packed {
        bytes,
        channels,
        fill,
        color_key: false,
    };
    let layout = match format {
        RGBA8888 | UVWQ8888 | UVLX8888 => packed(4, [ch(0, 8), ch(8, 8), ch(16, 8), ch(24, 8)], 0),
        ABGR8888 => packed(4, [ch(24, 8), ch(16, 8), ch(8, 8), ch(0, 8)], 0),
        ARGB8888 => packed(4, [ch(8, 8), ch(16, 8), ch(24, 8), ch(0, 8)], 0),
        BGRA8888 => packed(4, [ch(16, 8), ch(8, 8), ch(0, 8), ch(24, 8)], 0),
        BGRX8888 => packed(4, [ch(16, 8), ch(8, 8), ch(0, 8), None], 0xff00_0000),
        RGB888 => packed(3, [ch(0, 8), ch(8, 8), ch(16, 8), None], 0),
        BGR888 => packed(3, [ch(16, 8), ch(8, 8), ch(0, 8), None], 0),
        RGB565 => packed(2, [ch(0, 5), ch(5, 6), ch(11, 5), None], 0),
        BGR565 => packed(2, [ch(11, 5), ch(5, 6), ch(0, 5), None], 0),
        BGRX5551 => packed(2, [ch(10, 5), ch(5, 5), ch(0, 5), None], 0x8000),
        BGRA5551 => packed(2, [ch(10, 5), ch(5, 5), ch(0, 5), ch(15, 1)], 0),
        BGRA4444 => packed(2, [ch(8, 4), ch(4, 4), ch(0, 4), ch(12, 4)], 0),
        UV88 => packed(2, [ch(0, 8), ch(8, 8), None, None], 0),
        A8 => packed(1, [None, None, None, ch(0, 8)], 0),
        RGB888Bluescreen => Layout::Packed {
            bytes: 3,
            channels: [ch(0, 8), ch(8, 8), ch(16, 8), None],
            fill: 0,
            color_key: true,
        },
        BGR888Bluescreen => Layout::Packed {
            bytes: 3,
            channels: [ch(16, 8), ch(8, 8), ch(0, 8), None],
            fill: 0,
            color_key: true,
        },
        I8 => Layout::Luminance { alpha: false },
        IA88 => Layout::Luminance { alpha: true },
        RGBA16161616 => Layout::Unorm16,
        RGBA16161616F => Layout::Half,
        R32F => Layout::Float { channels: 1 },
        RGB323232F => Layout::Float { channels: 3 },
        RGBA32323232F => Layout::Float { channels: 4 },
        _ => return None,
    };
    Some(layout)
}

/// Widens an n-bit value to 8 bits by repeating its bit pattern.
pub(crate) fn expand_bits(value: u32, bits: u8) -> u8 {
    if bits >= 8 {
        return (value >> (bits - 8)) as u8;
    }
    let mut expanded = value << (8 - bits);
    let mut filled = bits as u32;
    while filled < 8 {
        expanded |= expanded >> filled;
        filled *= 2;
    }
    (expanded & 0xff) as u8
}

/// Narrows an 8-bit value to n bits, rounding to nearest.
pub(crate) fn quantize_bits(value: u8, bits: u8) -> u32 {
    let max = (1u32 << bits) - 1;
    (value as u32 * max + 127) / 255
}

fn unit_to_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn read_word(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .enumerate()
        .fold(0u32, |word, (index, byte)| word | (*byte as u32) << (index * 8))
}

fn write_word(bytes: &mut [u8], word: u32) {
    for (index, byte) in bytes.iter_mut().enumerate() {
        *byte = (word >> (index * 8)) as u8;
    }
}

fn hdr_scale(options: &ConvertOptions) -> f32 {
    options.fp16_hdr_key * options.fp16_hdr_shift.exp2()
}

/// Decodes `src` into `dst` (RGBA8888). Returns false when the format has no decoder.
pub(super) fn decode(src: &[u8], dst: &mut [u8], format: ImageFormat, options: &ConvertOptions) -> bool {
    let layout = match layout(format) {
        Some(layout) => layout,
        None => return false,
    };

    match layout {
        Layout::Packed {
            bytes,
            channels,
            color_key,
            ..
        } => {
            for (pixel, out) in src.chunks_exact(bytes).zip(dst.chunks_exact_mut(4)) {
                let word = read_word(pixel);
                for (index, channel) in channels.iter().enumerate() {
                    out[index] = match channel {
                        Some(channel) => {
                            let mask = (1u32 << channel.bits) - 1;
                            expand_bits((word >> channel.shift) & mask, channel.bits)
                        }
                        None if index == 3 => 255,
                        None => 0,
                    };
                }
                if color_key && out[..3] == options.bluescreen_mask {
                    out[..3].copy_from_slice(&options.bluescreen_clear);
                    out[3] = 0;
                }
            }
        }
        Layout::Luminance { alpha } => {
            let stride = if alpha { 2 } else { 1 };
            for (pixel, out) in src.chunks_exact(stride).zip(dst.chunks_exact_mut(4)) {
                out[..3].fill(pixel[0]);
                out[3] = if alpha { pixel[1] } else { 255 };
            }
        }
        Layout::Unorm16 => {
            for (pixel, out) in src.chunks_exact(8).zip(dst.chunks_exact_mut(4)) {
                for (channel, value) in pixel.chunks_exact(2).zip(out.iter_mut()) {
                    let wide = u16::from_le_bytes([channel[0], channel[1]]) as u32;
                    *value = ((wide * 255 + 32767) / 65535) as u8;
                }
            }
        }
        Layout::Half => {
            let scale = hdr_scale(options);
            let inverse_gamma = 1.0 / options.fp16_hdr_gamma;
            for (pixel, out) in src.chunks_exact(8).zip(dst.chunks_exact_mut(4)) {
                for (index, channel) in pixel.chunks_exact(2).enumerate() {
                    let value = f16::from_le_bytes([channel[0], channel[1]]).to_f32();
                    out[index] = if index == 3 {
                        unit_to_u8(value)
                    } else {
                        unit_to_u8((value.max(0.0) * scale).powf(inverse_gamma))
                    };
                }
            }
        }
        Layout::Float { channels } => {
            for (pixel, out) in src.chunks_exact(channels * 4).zip(dst.chunks_exact_mut(4)) {
                out.copy_from_slice(&[0, 0, 0, 255]);
                for (index, channel) in pixel.chunks_exact(4).enumerate() {
                    let value = f32::from_le_bytes([channel[0], channel[1], channel[2], channel[3]]);
                    out[index] = unit_to_u8(value);
                }
            }
        }
    }
    true
}

/// Encodes RGBA8888 `src` into `dst`. Returns false when the format has no encoder.
pub(super) fn encode(src: &[u8], dst: &mut [u8], format: ImageFormat, options: &ConvertOptions) -> bool {
    let layout = match layout(format) {
        Some(layout) => layout,
        None => return false,
    };

    match layout {
        Layout::Packed {
            bytes,
            channels,
            fill,
            color_key,
        } => {
            for (pixel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(bytes)) {
                let keyed = color_key && pixel[3] == 0;
                let mut word = fill;
                for (index, channel) in channels.iter().enumerate() {
                    if let Some(channel) = channel {
                        let value = if keyed { options.bluescreen_mask[index] } else { pixel[index] };
                        word |= quantize_bits(value, channel.bits) << channel.shift;
                    }
                }
                write_word(out, word);
            }
        }
        Layout::Luminance { alpha } => {
            let stride = if alpha { 2 } else { 1 };
            let [r, g, b] = options.luminance_weights;
            for (pixel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(stride)) {
                let luminance = pixel[0] as f32 * r + pixel[1] as f32 * g + pixel[2] as f32 * b;
                out[0] = luminance.round().clamp(0.0, 255.0) as u8;
                if alpha {
                    out[1] = pixel[3];
                }
            }
        }
        Layout::Unorm16 => {
            for (pixel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(8)) {
                for (value, channel) in pixel.iter().zip(out.chunks_exact_mut(2)) {
                    channel.copy_from_slice(&(*value as u16 * 257).to_le_bytes());
                }
            }
        }
        Layout::Half => {
            let scale = hdr_scale(options);
            for (pixel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(8)) {
                for (index, channel) in out.chunks_exact_mut(2).enumerate() {
                    let unit = pixel[index] as f32 / 255.0;
                    let value = if index == 3 {
                        unit
                    } else {
                        unit.powf(options.fp16_hdr_gamma) / scale
                    };
                    channel.copy_from_slice(&f16::from_f32(value).to_le_bytes());
                }
            }
        }
        Layout::Float { channels } => {
            for (pixel, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(channels * 4)) {
                for (index, channel) in out.chunks_exact_mut(4).enumerate() {
                    channel.copy_from_slice(&(pixel[index] as f32 / 255.0).to_le_bytes());
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_replication() {
        assert_eq!(expand_bits(0b11111, 5), 255);
        assert_eq!(expand_bits(0b10000, 5), 0b1000_0100);
        assert_eq!(expand_bits(1, 1), 255);
        assert_eq!(expand_bits(0, 1), 0);
        assert_eq!(expand_bits(0b111111, 6), 255);
        assert_eq!(expand_bits(0xa, 4), 0xaa);
        assert_eq!(expand_bits(0xab, 8), 0xab);
    }

    #[test]
    fn rounding_is_to_nearest() {
        assert_eq!(quantize_bits(255, 5), 31);
        assert_eq!(quantize_bits(0, 5), 0);
        // 132/255 * 31 = 16.05
        assert_eq!(quantize_bits(132, 5), 16);
        // 128/255 * 15 = 7.53, truncation would give 7
        assert_eq!(quantize_bits(128, 4), 8);
        for value in 0..=255u8 {
            assert_eq!(quantize_bits(value, 8), value as u32);
        }
    }
}
