use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Local, TimeZone};
use eframe::egui::{self, ColorImage, Context, Event, Key, ViewportCommand};
use log::{error, info};

/// File name of a saved frame, e.g. `ORCA - 2024-03-05 at 14.02.09.png`.
pub(super) fn screenshot_file_name<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("ORCA - {}.png", time.format("%Y-%m-%d at %H.%M.%S"))
}

pub(super) fn save_png(image: &ColorImage, path: &Path) -> Result<()> {
    let [width, height] = image.size;
    let buffer = image::RgbaImage::from_raw(width as u32, height as u32, image.as_raw().to_vec())
        .context("screenshot buffer does not match its size")?;
    buffer
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn screenshot_event(ctx: &Context) -> Option<Arc<ColorImage>> {
    ctx.input(|input| {
        input.raw.events.iter().find_map(|event| match event {
            Event::Screenshot { image, .. } => Some(image.clone()),
            _ => None,
        })
    })
}

/// Saves the window as a PNG when `s` is pressed outside a text field.
#[derive(Debug)]
pub(super) struct ScreenshotExporter {
    dir: PathBuf,
    status: Option<String>,
}

impl ScreenshotExporter {
    pub(super) fn new(dir: PathBuf) -> Self {
        Self { dir, status: None }
    }

    pub(super) fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub(super) fn update(&mut self, ctx: &Context) {
        let requested = !ctx.wants_keyboard_input()
            && ctx.input(|input| input.modifiers.is_none() && input.key_pressed(Key::S));
        if requested {
            ctx.send_viewport_cmd(ViewportCommand::Screenshot(egui::UserData::default()));
        }

        let Some(image) = screenshot_event(ctx) else {
            return;
        };
        let path = self.dir.join(screenshot_file_name(&Local::now()));
        self.status = Some(match save_png(&image, &path) {
            Ok(()) => {
                info!("saved screenshot to {}", path.display());
                format!("Saved {}", path.display())
            }
            Err(error) => {
                error!("{error:#}");
                format!("{error:#}")
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate};
    use eframe::egui::Color32;

    use super::*;

    #[test]
    fn file_name_carries_a_padded_timestamp() {
        let time = FixedOffset::east_opt(3600)
            .unwrap()
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2024, 3, 5)
                    .unwrap()
                    .and_hms_opt(4, 2, 9)
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(screenshot_file_name(&time), "ORCA - 2024-03-05 at 04.02.09.png");
    }

    #[test]
    fn saved_png_keeps_size_and_pixels() {
        let mut frame = ColorImage::filled([3, 2], Color32::from_rgb(0xf7, 0xf7, 0xf7));
        frame.pixels[4] = Color32::from_rgb(0x78, 0x3c, 0xe6);
        let path = std::env::temp_dir().join(format!("repo-orbits-{}.png", std::process::id()));

        save_png(&frame, &path).unwrap();
        let saved = image::open(&path).unwrap().to_rgba8();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(saved.dimensions(), (3, 2));
        assert_eq!(saved.get_pixel(1, 1).0, [0x78, 0x3c, 0xe6, 0xff]);
        assert_eq!(saved.get_pixel(0, 0).0, [0xf7, 0xf7, 0xf7, 0xff]);
    }

    #[test]
    fn mismatched_buffer_is_an_error() {
        let mut frame = ColorImage::filled([2, 2], Color32::WHITE);
        frame.pixels.pop();
        let path = std::env::temp_dir().join("repo-orbits-short.png");
        assert!(save_png(&frame, &path).is_err());
    }
}
