//! Writers for the two output containers.
//!
//! Both write every `(t, c, z)` plane at each resolution level produced by
//! [`build_levels`]. Samples are 16-bit unsigned.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ndarray::{s, Array2};
use rayon::prelude::*;
use serde_json::json;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

use crate::consts::ZARR_CHUNK_SIZE;
use crate::error::Result;
use crate::params::OutputFormat;

use super::mosaic::Mosaic;
use super::pyramid::{build_levels, level_count};
use super::tile::to_u16_samples;

/// Write `mosaic` to `path` in `format`. Returns the number of resolution levels written.
pub fn write_mosaic(mosaic: &Mosaic, format: OutputFormat, path: &Path) -> Result<usize> {
    match format {
        OutputFormat::OmeTiff => write_ome_tiff(mosaic, path),
        OutputFormat::OmeZarr => write_ome_zarr(mosaic, path),
    }
}

/// Resolution levels of every plane, `pyramids[plane][level]`.
fn plane_pyramids(mosaic: &Mosaic) -> (usize, Vec<Vec<Array2<f32>>>) {
    let (h, w) = mosaic.plane_dim();
    let levels = level_count(h, w);
    let pyramids = mosaic
        .planes
        .par_iter()
        .map(|plane| build_levels(plane, levels))
        .collect();
    (levels, pyramids)
}

/// Multi-page TIFF. Full-resolution pages come first in OME `XYZCT` order
/// (z fastest, then channel, then time), followed by the same sequence for
/// each lower resolution level. The first page carries the OME-XML description.
pub fn write_ome_tiff(mosaic: &Mosaic, path: &Path) -> Result<usize> {
    let (levels, pyramids) = plane_pyramids(mosaic);
    let file = BufWriter::new(File::create(path)?);
    let mut tiff = TiffEncoder::new(file)?;
    let description = ome_xml(mosaic);

    for level in 0..levels {
        for (idx, plane_levels) in pyramids.iter().enumerate() {
            let plane = &plane_levels[level];
            let (h, w) = plane.dim();
            let samples = to_u16_samples(plane);
            let mut image = tiff.new_image::<colortype::Gray16>(w as u32, h as u32)?;
            if level == 0 && idx == 0 {
                image
                    .encoder()
                    .write_tag(Tag::ImageDescription, description.as_str())?;
            }
            image.write_data(&samples)?;
        }
    }

    debug!(path = %path.display(), levels, "Wrote OME-TIFF");
    Ok(levels)
}

fn ome_xml(mosaic: &Mosaic) -> String {
    let [size_t, size_c, size_z, size_y, size_x] = mosaic.shape();
    let physical = mosaic
        .pixel_size_um
        .map(|p| format!(" PhysicalSizeX=\"{p}\" PhysicalSizeY=\"{p}\""))
        .unwrap_or_default();
    let channels: String = mosaic
        .channels
        .iter()
        .enumerate()
        .map(|(i, name)| format!("<Channel ID=\"Channel:0:{i}\" Name=\"{}\"/>", xml_escape(name)))
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <OME xmlns=\"http://www.openmicroscopy.org/Schemas/OME/2016-06\">\
         <Image ID=\"Image:0\" Name=\"{name}\">\
         <Pixels ID=\"Pixels:0\" DimensionOrder=\"XYZCT\" Type=\"uint16\" \
         SizeX=\"{size_x}\" SizeY=\"{size_y}\" SizeZ=\"{size_z}\" SizeC=\"{size_c}\" SizeT=\"{size_t}\"{physical}>\
         {channels}<TiffData PlaneCount=\"{planes}\"/>\
         </Pixels></Image></OME>",
        name = xml_escape(&mosaic.name),
        planes = mosaic.planes.len(),
    )
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Zarr v2 store laid out as an OME-NGFF 0.4 multiscale image: one array per
/// level (`0`, `1`, ...), axes `t, c, z, y, x`, uncompressed little-endian
/// `u16` chunks of one plane by up to [`ZARR_CHUNK_SIZE`] square.
pub fn write_ome_zarr(mosaic: &Mosaic, path: &Path) -> Result<usize> {
    let (levels, pyramids) = plane_pyramids(mosaic);
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)?;

    let pixel_size = mosaic.pixel_size_um.unwrap_or(1.0);
    let datasets: Vec<_> = (0..levels)
        .map(|level| {
            let scale = pixel_size * f64::from(1u32 << level);
            json!({
                "path": level.to_string(),
                "coordinateTransformations": [
                    { "type": "scale", "scale": [1.0, 1.0, 1.0, scale, scale] }
                ]
            })
        })
        .collect();
    let channels: Vec<_> = mosaic
        .channels
        .iter()
        .map(|name| json!({ "label": name, "active": true }))
        .collect();
    let attrs = json!({
        "multiscales": [{
            "version": "0.4",
            "name": mosaic.name,
            "axes": [
                { "name": "t", "type": "time" },
                { "name": "c", "type": "channel" },
                { "name": "z", "type": "space" },
                { "name": "y", "type": "space", "unit": "micrometer" },
                { "name": "x", "type": "space", "unit": "micrometer" }
            ],
            "datasets": datasets
        }],
        "omero": { "channels": channels }
    });
    std::fs::write(path.join(".zgroup"), serde_json::to_vec_pretty(&json!({ "zarr_format": 2 }))?)?;
    std::fs::write(path.join(".zattrs"), serde_json::to_vec_pretty(&attrs)?)?;

    let [size_t, size_c, size_z, _, _] = mosaic.shape();
    for level in 0..levels {
        let level_dir = path.join(level.to_string());
        std::fs::create_dir_all(&level_dir)?;

        let (h, w) = pyramids.first().map_or((0, 0), |p| p[level].dim());
        let chunk_h = h.clamp(1, ZARR_CHUNK_SIZE);
        let chunk_w = w.clamp(1, ZARR_CHUNK_SIZE);
        let zarray = json!({
            "zarr_format": 2,
            "shape": [size_t, size_c, size_z, h, w],
            "chunks": [1, 1, 1, chunk_h, chunk_w],
            "dtype": "<u2",
            "compressor": null,
            "fill_value": 0,
            "order": "C",
            "filters": null,
            "dimension_separator": "/"
        });
        std::fs::write(level_dir.join(".zarray"), serde_json::to_vec_pretty(&zarray)?)?;

        for t in 0..size_t {
            for c in 0..size_c {
                for z in 0..size_z {
                    let plane = &pyramids[mosaic.plane_index(t, c, z)][level];
                    let plane_dir = level_dir
                        .join(t.to_string())
                        .join(c.to_string())
                        .join(z.to_string());
                    write_plane_chunks(plane, &plane_dir, chunk_h, chunk_w)?;
                }
            }
        }
    }

    debug!(path = %path.display(), levels, "Wrote OME-Zarr");
    Ok(levels)
}

/// Write `<dir>/<chunk_y>/<chunk_x>` files; edge chunks are zero-padded to full size.
fn write_plane_chunks(plane: &Array2<f32>, dir: &Path, chunk_h: usize, chunk_w: usize) -> Result<()> {
    let (h, w) = plane.dim();
    for cy in 0..h.div_ceil(chunk_h) {
        let row_dir = dir.join(cy.to_string());
        std::fs::create_dir_all(&row_dir)?;
        for cx in 0..w.div_ceil(chunk_w) {
            let y0 = cy * chunk_h;
            let x0 = cx * chunk_w;
            let y1 = (y0 + chunk_h).min(h);
            let x1 = (x0 + chunk_w).min(w);

            let mut chunk = Array2::<f32>::zeros((chunk_h, chunk_w));
            chunk
                .slice_mut(s![..y1 - y0, ..x1 - x0])
                .assign(&plane.slice(s![y0..y1, x0..x1]));
            let bytes: Vec<u8> = to_u16_samples(&chunk)
                .into_iter()
                .flat_map(u16::to_le_bytes)
                .collect();
            std::fs::write(row_dir.join(cx.to_string()), bytes)?;
        }
    }
    Ok(())
}
