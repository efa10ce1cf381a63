//! Window queries and activation.

use super::Automation;
use crate::error::Result;
use crate::geometry::{Point, Positioning};
use crate::response;

impl Automation {
    /// Top-left corner of the window's client area, if the window exists.
    pub async fn win_get_client_pos(
        &self,
        title: &str,
        positioning: Positioning,
    ) -> Result<Option<Point>> {
        let command = format!("winGetClientPos;{};", title);
        let reply = self.request(&command).await?;
        let position = response::point(&command, &reply)?;
        Ok(position.map(|p| self.geometry().present(p, positioning)))
    }

    pub async fn win_exist(&self, title: &str) -> Result<bool> {
        let command = format!("winExist;{};", title);
        let reply = self.request(&command).await?;
        response::flag(&command, &reply)
    }

    /// Bring a window to the foreground. Does not wait for the engine.
    pub async fn win_activate(&self, title: &str) -> Result<()> {
        self.notify(&format!("winActivate;{};", title)).await
    }
}
