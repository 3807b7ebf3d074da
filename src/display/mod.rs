//! Presentation of `ethereum:` URIs to the user.
//!
//! On phones the URI is opened as a deep link so the signing app takes over.
//! Everywhere else it is rendered as a QR code to scan.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::bridge::uri::append_param;
use crate::error::Result;

pub mod qr;

pub use qr::generate_qr_image_data;

/// Receives URIs produced by the signing bridge
pub trait UriHandler: Send + Sync {
    fn handle_uri(&self, uri: &str) -> Result<()>;
}

impl<F> UriHandler for F
where
    F: Fn(&str) -> Result<()> + Send + Sync,
{
    fn handle_uri(&self, uri: &str) -> Result<()> {
        self(uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    DeepLink,
    QrCode,
}

const MOBILE_TOKENS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
    "windows phone",
    "mobile",
];

impl DisplayMode {
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        match user_agent {
            Some(ua) if is_mobile(ua) => DisplayMode::DeepLink,
            _ => DisplayMode::QrCode,
        }
    }
}

pub fn is_mobile(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_TOKENS.iter().any(|token| ua.contains(token))
}

/// What the user should be shown
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    /// Navigate to the URI
    DeepLink { uri: String },
    /// Show a scannable code; `image_data` is a `data:` URL
    QrCode { uri: String, image_data: String },
}

impl Presentation {
    pub fn uri(&self) -> &str {
        match self {
            Presentation::DeepLink { uri } | Presentation::QrCode { uri, .. } => uri,
        }
    }
}

/// Platform hook that actually navigates or draws
pub trait UriPresenter: Send + Sync {
    fn present(&self, presentation: Presentation) -> Result<()>;
}

/// Labels URIs with the app name and routes them to a presenter
pub struct UriDisplay {
    label: String,
    mode: DisplayMode,
    presenter: Arc<dyn UriPresenter>,
}

impl UriDisplay {
    pub fn new(app_name: &str, mode: DisplayMode, presenter: Arc<dyn UriPresenter>) -> Self {
        Self {
            label: urlencoding::encode(app_name).into_owned(),
            mode,
            presenter,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }
}

impl UriHandler for UriDisplay {
    fn handle_uri(&self, uri: &str) -> Result<()> {
        let mut uri = uri.to_string();
        append_param(&mut uri, "label", &self.label);

        let presentation = match self.mode {
            DisplayMode::DeepLink => Presentation::DeepLink { uri },
            DisplayMode::QrCode => {
                let image_data = generate_qr_image_data(&uri)?;
                Presentation::QrCode { uri, image_data }
            }
        };

        log::debug!("Presenting {:?} URI {}", self.mode, presentation.uri());
        self.presenter.present(presentation)
    }
}

/// Prints deep links and draws QR codes on stdout
pub struct TerminalPresenter;

impl UriPresenter for TerminalPresenter {
    fn present(&self, presentation: Presentation) -> Result<()> {
        match presentation {
            Presentation::DeepLink { uri } => {
                println!("Open this link on your phone:\n{}", uri);
            }
            Presentation::QrCode { uri, .. } => {
                let code = qr::render_terminal(&uri)?;
                println!("Scan with your signing app:\n{}\n{}", code, uri);
            }
        }
        Ok(())
    }
}

impl<F> UriPresenter for F
where
    F: Fn(Presentation) -> Result<()> + Send + Sync,
{
    fn present(&self, presentation: Presentation) -> Result<()> {
        self(presentation)
    }
}
