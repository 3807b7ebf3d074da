/// QR rendering for URIs shown on desktop screens
use base64::{engine::general_purpose, Engine as _};
use qrcode::render::{svg, unicode};
use qrcode::QrCode;

use crate::error::{BridgeError, Result};

pub const QR_FOREGROUND: &str = "#EB2558";
pub const QR_BACKGROUND: &str = "#FFFFFF";
pub const QR_SIZE: u32 = 500;

fn encode(data: &str) -> Result<QrCode> {
    QrCode::new(data.as_bytes()).map_err(|e| BridgeError::Display(e.to_string()))
}

/// Render `data` as an SVG QR code wrapped in a base64 `data:` URL.
pub fn generate_qr_image_data(data: &str) -> Result<String> {
    let code = encode(data)?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(QR_SIZE, QR_SIZE)
        .dark_color(svg::Color(QR_FOREGROUND))
        .light_color(svg::Color(QR_BACKGROUND))
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        general_purpose::STANDARD.encode(image)
    ))
}

/// Render `data` as a block-character QR code for terminals.
pub fn render_terminal(data: &str) -> Result<String> {
    let code = encode(data)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}
