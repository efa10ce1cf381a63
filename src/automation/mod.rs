//! The automation facade.
//!
//! Every operation formats one `;`-delimited command line, sends it on the
//! session's command channel and converts the single response line. Window
//! activation and click-drag are fire-and-forget and wait for nothing.

pub mod keyboard;
pub mod mouse;
pub mod screen;
pub mod system;
pub mod window;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::geometry::{Geometry, Point};
use crate::session::Session;

pub use keyboard::{escape_text, KeyDelay, SendText};
pub use mouse::{ButtonState, Click, ClickDrag, MouseButton, MouseMove};
pub use screen::{Color, ColorMode, ImageSearch, PixelColor, PixelSearch};
pub use system::MsgBox;

/// High-level operations on a running [`Session`].
#[derive(Debug, Clone)]
pub struct Automation {
    session: Arc<Session>,
}

impl Automation {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Open a session and wrap it.
    pub async fn open(config: Config) -> Result<Self> {
        Ok(Self::new(Session::open(config).await?))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn geometry(&self) -> Geometry {
        self.session.geometry()
    }

    pub fn to_px(&self, point: Point) -> Point {
        self.geometry().to_px(point)
    }

    pub fn to_percent(&self, point: Point) -> Point {
        self.geometry().to_percent(point)
    }

    pub(crate) fn default_color_variation(&self) -> u8 {
        self.session.config().default_color_variation
    }

    pub(crate) async fn request(&self, command: &str) -> Result<String> {
        self.session.commands().request(command).await
    }

    pub(crate) async fn notify(&self, command: &str) -> Result<()> {
        self.session.commands().notify(command).await
    }
}
