use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Result, anyhow};
use image::{Rgb, RgbImage};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::preview::Preview;
use crate::project::FileNode;
use crate::transform;

pub const ARCHIVE_NAME: &str = "maqueta-site.zip";
pub const SNAPSHOT_NAME: &str = "maqueta-preview.png";

/// Pixels per terminal cell when rasterizing the wireframe.
const CELL_W: u32 = 8;
const CELL_H: u32 = 16;
const BORDER_PX: i64 = 2;

/// Writes the project files into a zip archive, names and contents as-is.
pub fn write_archive(files: &[FileNode], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut archive = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for node in files {
        archive.start_file(node.name.as_str(), options)?;
        archive.write_all(node.content.as_bytes())?;
    }
    archive.finish()?;
    Ok(())
}

/// Rasterizes the current wireframe layout to a PNG, full content height
/// regardless of scroll. Drag translations are baked in.
pub fn write_snapshot(preview: &Preview, path: &Path) -> Result<()> {
    let width_cells = preview
        .boxes
        .iter()
        .map(|b| b.rect.x + b.rect.width)
        .max()
        .unwrap_or(0);
    let height_cells = preview.total_rows();
    if width_cells == 0 || height_cells == 0 {
        return Err(anyhow!("the preview has nothing to capture yet"));
    }

    let width = u32::from(width_cells) * CELL_W;
    let height = u32::from(height_cells) * CELL_H;
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    // Paint order matches the layout order, parents underneath children.
    for preview_box in &preview.boxes {
        let (dx, dy) = match preview.overrides.get(&preview_box.node) {
            Some(value) => transform::decode_translation(value),
            None => (0.0, 0.0),
        };
        let x0 = ((f64::from(preview_box.rect.x) + dx) * f64::from(CELL_W)).round() as i64;
        let y0 = ((f64::from(preview_box.rect.y) + dy) * f64::from(CELL_H)).round() as i64;
        let x1 = x0 + i64::from(preview_box.rect.width) * i64::from(CELL_W);
        let y1 = y0 + i64::from(preview_box.rect.height) * i64::from(CELL_H);
        let shade = 250u8.saturating_sub(preview_box.depth as u8 * 6);
        fill_rect(&mut canvas, x0, y0, x1, y1, Rgb([64, 64, 64]));
        fill_rect(
            &mut canvas,
            x0 + BORDER_PX,
            y0 + BORDER_PX,
            x1 - BORDER_PX,
            y1 - BORDER_PX,
            Rgb([shade, shade, shade]),
        );
    }

    canvas.save(path)?;
    Ok(())
}

fn fill_rect(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (width, height) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for y in y0.max(0)..y1.min(height) {
        for x in x0.max(0)..x1.min(width) {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}
