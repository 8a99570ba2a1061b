#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma};
use tilestitch_core::coords::raw_coordinates_path;

pub const RAW_HEADER: &str = "region,i,j,z_level,x (mm),y (mm),z (um),time";

/// Create `<root>/<name>/0` and return `<root>/<name>`.
pub fn acquisition_dir(root: &Path, name: &str) -> PathBuf {
    let input = root.join(name);
    fs::create_dir_all(input.join("0")).unwrap();
    input
}

/// Write `<input>/0/coordinates.csv`.
pub fn write_coordinates(input: &Path, contents: &str) {
    let path = raw_coordinates_path(input);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Raw CSV for a `rows` x `cols` grid per region, one z-level, tiles `step_mm` apart.
pub fn grid_coordinates(regions: &[&str], rows: u32, cols: u32, step_mm: f64) -> String {
    let mut csv = format!("{RAW_HEADER}\n");
    for region in regions {
        for i in 0..rows {
            for j in 0..cols {
                csv.push_str(&format!(
                    "{region},{i},{j},0,{},{},1.5,0.0\n",
                    f64::from(j) * step_mm,
                    f64::from(i) * step_mm
                ));
            }
        }
    }
    csv
}

/// Write `acquisition parameters.json` with an explicit pixel size.
pub fn write_pixel_size(input: &Path, pixel_size_um: f64) {
    let json = format!("{{\"pixel_size_um\": {pixel_size_um}}}");
    fs::write(input.join("acquisition parameters.json"), json).unwrap();
}

/// Write a 16-bit grayscale tile `<input>/<timepoint>/<region>_<fov>_<z>_<channel>.tiff`.
pub fn write_tile<F>(
    input: &Path,
    timepoint: u32,
    region: &str,
    fov: u64,
    channel: &str,
    size: u32,
    pixel: F,
) where
    F: Fn(u32, u32) -> u16,
{
    let dir = input.join(timepoint.to_string());
    fs::create_dir_all(&dir).unwrap();
    let img: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(size, size, |x, y| Luma([pixel(x, y)]));
    img.save(dir.join(format!("{region}_{fov}_0_{channel}.tiff")))
        .unwrap();
}

/// Constant-valued tiles for every FOV of a grid; FOV `n` holds `(n + 1) * 1000`.
pub fn write_constant_grid(
    input: &Path,
    timepoint: u32,
    region: &str,
    fovs: u64,
    channel: &str,
    size: u32,
) {
    for fov in 0..fovs {
        let value = tile_value(fov);
        write_tile(input, timepoint, region, fov, channel, size, |_, _| value);
    }
}

pub fn tile_value(fov: u64) -> u16 {
    ((fov + 1) * 1000) as u16
}

/// Deterministic pseudo-random texture over the whole stage, in pixels.
pub fn texture(y: i64, x: i64) -> u16 {
    let mut v = (y.wrapping_mul(73_856_093) ^ x.wrapping_mul(19_349_663)) as u64;
    v = v.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    1000 + (v >> 48) as u16 % 60_000
}

/// Read every page of a TIFF as `(width, height, samples)`.
pub fn read_tiff_pages(path: &Path) -> Vec<(u32, u32, Vec<u16>)> {
    use tiff::decoder::{Decoder, DecodingResult};

    let mut decoder = Decoder::new(fs::File::open(path).unwrap()).unwrap();
    let mut pages = Vec::new();
    loop {
        let (w, h) = decoder.dimensions().unwrap();
        match decoder.read_image().unwrap() {
            DecodingResult::U16(data) => pages.push((w, h, data)),
            _ => panic!("expected 16-bit samples"),
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().unwrap();
    }
    pages
}
