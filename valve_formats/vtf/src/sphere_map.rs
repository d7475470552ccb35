//! The seventh cubemap face: an orthographic view of a mirrored sphere
//! reflecting the other six faces.

use crate::error::{check_len, VtfResult};

/// Cubemap face order as stored in the file.
pub const FACE_RIGHT: usize = 0;
pub const FACE_LEFT: usize = 1;
pub const FACE_BACK: usize = 2;
pub const FACE_FRONT: usize = 3;
pub const FACE_UP: usize = 4;
pub const FACE_DOWN: usize = 5;

/// Picks the face a y-up direction points at and the face coordinates in 0..1.
fn cube_lookup(direction: [f32; 3]) -> (usize, f32, f32) {
    let [x, y, z] = direction;
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
    let (face, major, sc, tc) = if ax >= ay && ax >= az {
        if x > 0.0 {
            (FACE_RIGHT, ax, -z, -y)
        } else {
            (FACE_LEFT, ax, z, -y)
        }
    } else if ay >= az {
        if y > 0.0 {
            (FACE_UP, ay, x, z)
        } else {
            (FACE_DOWN, ay, x, -z)
        }
    } else if z > 0.0 {
        (FACE_BACK, az, x, -y)
    } else {
        (FACE_FRONT, az, -x, -y)
    };
    (face, (sc / major + 1.0) * 0.5, (tc / major + 1.0) * 0.5)
}

fn sample(face: &[u8], width: usize, height: usize, s: f32, t: f32) -> [f32; 4] {
    let x = (s * width as f32 - 0.5).clamp(0.0, (width - 1) as f32);
    let y = (t * height as f32 - 0.5).clamp(0.0, (height - 1) as f32);
    let (x0, y0) = (x.floor() as usize, y.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let mut result = [0f32; 4];
    for (channel, value) in result.iter_mut().enumerate() {
        let at = |x: usize, y: usize| face[(y * width + x) * 4 + channel] as f32;
        let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
        let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
        *value = top * (1.0 - fy) + bottom * fy;
    }
    result
}

/// Renders the sphere map from six RGBA8888 faces of `width` x `height`, in file face order.
pub fn generate_sphere_map(faces: [&[u8]; 6], width: u32, height: u32) -> VtfResult<Vec<u8>> {
    let (width, height) = (width as usize, height as usize);
    for face in faces {
        check_len(face, width * height * 4)?;
    }

    let mut sphere = vec![0u8; width * height * 4];
    for y in 0..height {
        for x in 0..width {
            let mut u = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
            let mut v = 1.0 - (y as f32 + 0.5) / height as f32 * 2.0;
            let radius = (u * u + v * v).sqrt();
            if radius > 1.0 {
                u /= radius;
                v /= radius;
            }

            // reflect the view vector (0, 0, 1) about the sphere normal
            let nz = (1.0 - u * u - v * v).max(0.0).sqrt();
            let reflected = [2.0 * nz * u, 2.0 * nz * v, 2.0 * nz * nz - 1.0];
            // sphere space to z-up world space, looking at the front face
            let world = [reflected[0], -reflected[2], reflected[1]];
            // z-up world space to the y-up cube convention
            let (face, s, t) = cube_lookup([world[0], world[2], world[1]]);

            let color = sample(faces[face], width, height, s, t);
            let offset = (y * width + x) * 4;
            for (out, value) in sphere[offset..offset + 4].iter_mut().zip(color) {
                *out = value_to_u8(value);
            }
        }
    }
    Ok(sphere)
}

fn value_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(color: [u8; 4], size: usize) -> Vec<u8> {
        color.iter().copied().cycle().take(size * size * 4).collect()
    }

    #[test]
    fn lookup_axes() {
        assert_eq!(cube_lookup([1.0, 0.0, 0.0]).0, FACE_RIGHT);
        assert_eq!(cube_lookup([-1.0, 0.0, 0.0]).0, FACE_LEFT);
        assert_eq!(cube_lookup([0.0, 1.0, 0.0]).0, FACE_UP);
        assert_eq!(cube_lookup([0.0, -1.0, 0.0]).0, FACE_DOWN);
        assert_eq!(cube_lookup([0.0, 0.0, 1.0]).0, FACE_BACK);
        assert_eq!(cube_lookup([0.0, 0.0, -1.0]).0, FACE_FRONT);
        let (_, s, t) = cube_lookup([0.0, 0.0, -1.0]);
        assert_eq!((s, t), (0.5, 0.5));
    }

    #[test]
    fn centre_shows_front_and_rim_shows_back() {
        let colors: Vec<Vec<u8>> = (0..6u8).map(|face| solid([face * 40, 0, 0, 255], 16)).collect();
        let faces = [
            colors[0].as_slice(),
            colors[1].as_slice(),
            colors[2].as_slice(),
            colors[3].as_slice(),
            colors[4].as_slice(),
            colors[5].as_slice(),
        ];
        let sphere = generate_sphere_map(faces, 16, 16).unwrap();
        let at = |x: usize, y: usize| sphere[(y * 16 + x) * 4];
        assert_eq!(at(8, 8), FACE_FRONT as u8 * 40);
        assert_eq!(at(15, 8), FACE_BACK as u8 * 40);
        assert_eq!(at(0, 0), FACE_BACK as u8 * 40);
    }
}
