//! Mouse movement, clicks and cursor queries.

use tracing::debug;

use super::Automation;
use crate::error::Result;
use crate::geometry::{Geometry, Point, Positioning};
use crate::response;

const DEFAULT_MOVE_SPEED: u32 = 2;
const DEFAULT_DRAG_SPEED: u32 = 10;
const DEFAULT_CLICK_DELAY: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn code(self) -> &'static str {
        match self {
            MouseButton::Left => "L",
            MouseButton::Middle => "M",
            MouseButton::Right => "R",
        }
    }
}

/// Press or release only, instead of a full click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Down,
    Up,
}

impl ButtonState {
    pub fn code(self) -> &'static str {
        match self {
            ButtonState::Down => "D",
            ButtonState::Up => "U",
        }
    }
}

/// A cursor movement to an absolute or relative position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseMove {
    pub target: Point,
    pub speed: Option<u32>,
    pub positioning: Positioning,
    /// Offset from the current cursor position instead of an absolute target.
    pub relative: bool,
}

impl MouseMove {
    pub fn to(target: impl Into<Point>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn by(offset: impl Into<Point>) -> Self {
        Self {
            target: offset.into(),
            relative: true,
            ..Self::default()
        }
    }

    pub fn speed(mut self, speed: u32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn percent(mut self) -> Self {
        self.positioning = Positioning::Percent;
        self
    }
}

/// Press a button at `from`, move to `to` and release.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClickDrag {
    pub from: Point,
    pub to: Point,
    pub button: Option<MouseButton>,
    pub speed: Option<u32>,
    pub positioning: Positioning,
    /// Both endpoints are offsets from the current cursor position.
    pub relative: bool,
}

impl ClickDrag {
    pub fn new(from: impl Into<Point>, to: impl Into<Point>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Self::default()
        }
    }

    pub fn speed(mut self, speed: u32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }

    fn command(&self, geometry: &Geometry, origin: (i64, i64)) -> String {
        let (x1, y1) = geometry.resolve(self.from, self.positioning);
        let (x2, y2) = geometry.resolve(self.to, self.positioning);
        format!(
            "mouseClickDrag;{};{};{};{};{};{}",
            self.button.unwrap_or_default().code(),
            x1 + origin.0,
            y1 + origin.1,
            x2 + origin.0,
            y2 + origin.1,
            self.speed.unwrap_or(DEFAULT_DRAG_SPEED)
        )
    }
}

/// A click, optionally at a position. Without a position the engine clicks
/// wherever the cursor is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Click {
    pub position: Option<Point>,
    pub positioning: Positioning,
    pub button: Option<MouseButton>,
    pub state: Option<ButtonState>,
    pub count: Option<u32>,
    /// Delay after the click in milliseconds. Ignored by `click_play`.
    pub delay: Option<u32>,
}

impl Click {
    pub fn at(position: impl Into<Point>) -> Self {
        Self {
            position: Some(position.into()),
            ..Self::default()
        }
    }

    pub fn button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }

    pub fn state(mut self, state: ButtonState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn delay(mut self, delay: u32) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn percent(mut self) -> Self {
        self.positioning = Positioning::Percent;
        self
    }

    /// The space-separated click options shared by `click` and `clickPlay`.
    fn options(&self, geometry: &Geometry) -> String {
        let (x, y) = match self.position {
            Some(point) => {
                let (x, y) = geometry.resolve(point, self.positioning);
                (x.to_string(), y.to_string())
            }
            None => (String::new(), String::new()),
        };
        format!(
            "{} {} {} {} {}",
            x,
            y,
            self.button.map(MouseButton::code).unwrap_or_default(),
            self.state.map(ButtonState::code).unwrap_or_default(),
            self.count.map(|c| c.to_string()).unwrap_or_default()
        )
    }

    fn command(&self, geometry: &Geometry) -> String {
        format!(
            "click;{};{}",
            self.options(geometry),
            self.delay.unwrap_or(DEFAULT_CLICK_DELAY)
        )
    }

    fn play_command(&self, geometry: &Geometry) -> String {
        format!("clickPlay;{}", self.options(geometry))
    }
}

impl Automation {
    pub async fn set_mouse_speed(&self, speed: u32) -> Result<()> {
        self.request(&format!("setMouseSpeed;{}", speed)).await?;
        Ok(())
    }

    pub async fn mouse_move(&self, movement: MouseMove) -> Result<()> {
        let (mut x, mut y) = self
            .geometry()
            .resolve(movement.target, movement.positioning);
        if movement.relative {
            let (cx, cy) = self.cursor_origin().await?;
            x += cx;
            y += cy;
        }
        let speed = movement.speed.unwrap_or(DEFAULT_MOVE_SPEED);
        self.request(&format!("mouseMove;{};{};{}", x, y, speed))
            .await?;
        Ok(())
    }

    /// Drag without waiting for the engine to finish.
    pub async fn mouse_click_drag(&self, drag: ClickDrag) -> Result<()> {
        let origin = if drag.relative {
            self.cursor_origin().await?
        } else {
            (0, 0)
        };
        self.notify(&drag.command(&self.geometry(), origin)).await
    }

    pub async fn click(&self, click: Click) -> Result<()> {
        self.request(&click.command(&self.geometry())).await?;
        Ok(())
    }

    /// Click using the engine's journal playback method.
    pub async fn click_play(&self, click: Click) -> Result<()> {
        self.request(&click.play_command(&self.geometry())).await?;
        Ok(())
    }

    pub async fn get_mouse_pos(&self, positioning: Positioning) -> Result<Option<Point>> {
        let command = "getMousePos";
        let reply = self.request(command).await?;
        let position = response::point(command, &reply)?;
        Ok(position.map(|p| self.geometry().present(p, positioning)))
    }

    async fn cursor_origin(&self) -> Result<(i64, i64)> {
        let current = self
            .get_mouse_pos(Positioning::Pixels)
            .await?
            .unwrap_or_default();
        debug!(x = current.x, y = current.y, "resolved relative movement origin");
        Ok((current.x.floor() as i64, current.y.floor() as i64))
    }
}
