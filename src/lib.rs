//! # AHK Bridge
//!
//! Drive an AutoHotkey engine from async Rust over a line-oriented stdio
//! protocol.
//!
//! ## Features
//!
//! - One request/response round trip per automation command, rejected loudly
//!   instead of misrouted when a response is still outstanding
//! - Mouse, keyboard, window, screen, clipboard and message box operations
//! - Percent or pixel positioning against the screen size reported at startup
//! - Hotkeys declared up front or registered live, dispatched either
//!   instantly or through a strictly ordered action queue
//! - Explicit session lifecycle with shutdown on engine loss or Ctrl-C
//!
//! ## Example
//!
//! ```no_run
//! use ahk_bridge::{Automation, Click, Config, HotkeyAction};
//!
//! # async fn run() -> ahk_bridge::Result<()> {
//! let config = Config::new("AutoHotkey64.exe").with_hotkeys(vec!["F1".into()]);
//! let ahk = Automation::open(config).await?;
//!
//! let clicker = ahk.clone();
//! ahk.session().set_hotkey_action(
//!     "F1",
//!     HotkeyAction::new(move || {
//!         let ahk = clicker.clone();
//!         async move {
//!             ahk.click(Click::at((100, 100))).await?;
//!             anyhow::Ok(())
//!         }
//!     }),
//!     false,
//! )?;
//!
//! ahk.session().terminated().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Configuration can be provided via JSON files:
//!
//! ```json
//! {
//!   "executable": "C:\\Program Files\\AutoHotkey\\v2\\AutoHotkey64.exe",
//!   "script_dir": "scripts",
//!   "default_color_variation": 10,
//!   "hotkeys": ["F1", {"keys": ["a", "b"]}, {"modifiers": ["control"], "key": "q"}]
//! }
//! ```

pub mod action;
pub mod automation;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod hotkey;
pub mod notification;
pub mod patterns;
pub mod process;
pub mod queue;
pub mod registry;
pub mod response;
pub mod session;

pub use action::HotkeyAction;
pub use automation::{
    Automation, ButtonState, Click, ClickDrag, Color, ColorMode, ImageSearch, KeyDelay,
    MouseButton, MouseMove, MsgBox, PixelColor, PixelSearch, SendText,
};
pub use channel::{ChannelKind, CommandChannel};
pub use config::Config;
pub use dispatch::{Dispatch, HotkeyDispatcher};
pub use error::{AhkError, Result};
pub use geometry::{Geometry, Point, Positioning, Region};
pub use hotkey::{HotkeyDescriptor, Modifier};
pub use session::{Session, SessionState};
