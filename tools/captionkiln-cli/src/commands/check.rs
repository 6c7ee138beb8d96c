//! Check system capabilities.

use captionkiln_common::config::AppConfig;
use captionkiln_export::encoder::ffmpeg_available;
use captionkiln_render::raster::locate_font;

pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load();

    println!("CaptionKiln system check");
    println!("========================");

    if ffmpeg_available() {
        println!("ffmpeg:      found");
    } else {
        println!("ffmpeg:      MISSING (renders require ffmpeg in PATH)");
    }

    match locate_font(config.export.font_file.as_deref()) {
        Ok(path) => println!("render font: {}", path.display()),
        Err(_) => {
            println!("render font: MISSING (set export.font_file in the configuration)");
        }
    }

    println!("exports dir: {}", config.exports_dir.display());
    println!("default fps: {}", config.export.fps);

    Ok(())
}
