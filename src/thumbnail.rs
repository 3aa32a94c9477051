use eframe::egui::ColorImage;

/// Downloads and decodes the thumbnail the probe pointed us at.
///
/// Blocking; run it on the runtime's blocking pool. Failures are logged and
/// yield `None`, the preview is purely cosmetic.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    match try_fetch(url) {
        Ok(img) => Some(img),
        Err(e) => {
            log::warn!("thumbnail {} unavailable: {}", url, e);
            None
        }
    }
}

fn try_fetch(url: &str) -> Result<ColorImage, Box<dyn std::error::Error + Send + Sync>> {
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    let img = image::load_from_memory(&bytes)?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, img.as_raw()))
}
