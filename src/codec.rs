use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;

use crate::error::ClientError;

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Encode a frame as JPEG and wrap it in a `data:` URL, the wire format of the
/// streaming endpoint.
pub fn encode_jpeg_data_url(frame: &RgbImage, quality: u8) -> Result<String, ClientError> {
    let mut jpeg = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    encoder.encode_image(frame)?;

    let mut url = String::with_capacity(JPEG_DATA_URL_PREFIX.len() + jpeg.get_ref().len() * 4 / 3 + 4);
    url.push_str(JPEG_DATA_URL_PREFIX);
    STANDARD.encode_string(jpeg.get_ref(), &mut url);
    Ok(url)
}

/// Extract the bytes of a base64 `data:` URL. Bare base64 is accepted too.
pub fn decode_data_url(data: &str) -> Result<Vec<u8>, ClientError> {
    let payload = match data.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| ClientError::Validation("malformed data url".to_string()))?,
        None => data,
    };
    Ok(STANDARD.decode(payload.trim())?)
}
