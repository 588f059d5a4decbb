use std::time::Duration;

use billetes::config::ClientConfig;
use billetes::stream::{SessionEvent, SessionEvents};
use futures::StreamExt;
use image::{ImageBuffer, Rgb};
use serde_json::{Value, json};
use tempfile::NamedTempFile;

/// Encodes a solid-color PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([255u8, 0u8, 0u8]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode test image");
    out.into_inner()
}

/// Creates a 100x100 red test image and returns the temp file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image() -> NamedTempFile {
    let img = ImageBuffer::from_fn(100, 100, |_, _| Rgb([255u8, 0u8, 0u8]));
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// A tiny valid JPEG as a data URL, for `annotated_image` fields.
pub fn annotated_data_url() -> String {
    let frame = image::RgbImage::from_pixel(4, 4, Rgb([0, 128, 0]));
    billetes::codec::encode_jpeg_data_url(&frame, 80).expect("Failed to encode annotated image")
}

/// Predict response with one Colombian and one foreign note.
pub fn two_note_result() -> Value {
    json!({
        "success": true,
        "total_detected": 2,
        "total_value": 100000,
        "inference_time": 42.5,
        "annotated_image": annotated_data_url(),
        "detections": [
            {
                "class": "50000",
                "confidence": 92,
                "is_colombian": true,
                "message": "Billete colombiano de $50000 COP"
            },
            {
                "class": "USD20",
                "confidence": 81,
                "is_colombian": false,
                "message": "Billete no colombiano o desconocido: USD20"
            }
        ]
    })
}

/// Streaming frame payload as the server pushes it.
pub fn live_result(total_value: u64, fps: f64) -> Value {
    json!({
        "success": true,
        "total_detected": 1,
        "total_value": total_value,
        "fps": fps,
        "annotated_image": annotated_data_url(),
        "detections": [
            { "class": "20000", "confidence": 88, "is_colombian": true }
        ]
    })
}

/// Config pointing at `base_url` with a fast capture loop and small frames.
pub fn test_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(base_url).expect("Invalid test base URL");
    config.camera.width = 64;
    config.camera.height = 48;
    config.stream.frame_interval = Duration::from_millis(20);
    config.stream.bind_timeout = Duration::from_millis(300);
    config
}

/// Next session event, failing the test if none arrives within two seconds.
pub async fn next_event(events: &mut SessionEvents) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(2), events.next())
        .await
        .expect("Timed out waiting for a session event")
        .expect("Session event stream ended")
}
