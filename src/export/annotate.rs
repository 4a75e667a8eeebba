use std::path::{Path, PathBuf};

use image::{ImageReader, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::models::ImageAggregate;

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([230, 25, 75]),
    Rgb([60, 180, 75]),
    Rgb([0, 130, 200]),
    Rgb([245, 130, 48]),
    Rgb([145, 30, 180]),
    Rgb([255, 225, 25]),
];

/// Draw every detection box onto a copy of the source image.
/// Each team gets its own colour, in first-seen order.
pub fn annotate(aggregate: &ImageAggregate) -> anyhow::Result<RgbImage> {
    let mut img = ImageReader::open(aggregate.image_path())?
        .with_guessed_format()?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?
        .to_rgb8();

    for (team_index, (_, records)) in aggregate.teams().enumerate() {
        let color = PALETTE[team_index % PALETTE.len()];
        for record in records {
            let Some(b) = record.bbox().clamp_to(img.width(), img.height()) else {
                continue;
            };
            let width = b.width().round().max(1.0) as u32;
            let height = b.height().round().max(1.0) as u32;
            let rect = Rect::at(b.x1 as i32, b.y1 as i32).of_size(width, height);
            // Two pixel outline
            draw_hollow_rect_mut(&mut img, rect, color);
            if width > 2 && height > 2 {
                let inner = Rect::at(b.x1 as i32 + 1, b.y1 as i32 + 1).of_size(width - 2, height - 2);
                draw_hollow_rect_mut(&mut img, inner, color);
            }
        }
    }

    Ok(img)
}

/// Save an annotated copy of the image into `output_dir`, same file name.
///
/// Refuses to write when that would replace the source photo itself.
pub fn save_annotated(aggregate: &ImageAggregate, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let file_name = aggregate
        .image_path()
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Image path has no file name: {}", aggregate.image_path().display()))?;
    let out = output_dir.join(file_name);
    if is_same_file(&out, aggregate.image_path()) {
        anyhow::bail!(
            "Refusing to overwrite source image {} with its annotated copy",
            aggregate.image_path().display()
        );
    }

    annotate(aggregate)?
        .save(&out)
        .map_err(|e| anyhow::anyhow!("Failed to save annotated image {}: {}", out.display(), e))?;
    Ok(out)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    #[test]
    fn boxes_are_drawn_in_team_colours() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let photo = dir.path().join("photo.png");
        RgbImage::from_pixel(50, 50, Rgb([0, 0, 0])).save(&photo)?;

        let mut aggregate = ImageAggregate::new(&photo);
        aggregate.add_label("Lions-Home", 0.9, BoundingBox::new(10.0, 10.0, 30.0, 30.0)?)?;
        aggregate.add_label("Bears-Away", 0.9, BoundingBox::new(35.0, 35.0, 45.0, 45.0)?)?;

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir)?;
        let out = save_annotated(&aggregate, &out_dir)?;
        assert_eq!(out, out_dir.join("photo.png"));

        let img = image::open(&out)?.to_rgb8();
        assert_eq!(img.get_pixel(10, 10), &PALETTE[0]);
        assert_eq!(img.get_pixel(11, 20), &PALETTE[0]);
        assert_eq!(img.get_pixel(35, 40), &PALETTE[1]);
        assert_eq!(img.get_pixel(20, 20), &Rgb([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn annotating_into_the_source_dir_keeps_the_photo() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let photo = dir.path().join("photo.png");
        RgbImage::from_pixel(20, 20, Rgb([0, 0, 0])).save(&photo)?;
        let before = std::fs::read(&photo)?;

        let mut aggregate = ImageAggregate::new(&photo);
        aggregate.add_label("Lions-Home", 0.9, BoundingBox::new(2.0, 2.0, 18.0, 18.0)?)?;

        let err = save_annotated(&aggregate, dir.path()).unwrap_err();
        assert!(err.to_string().contains("Refusing to overwrite"));
        assert_eq!(std::fs::read(&photo)?, before);
        Ok(())
    }
}
