//! Browser Shell
//!
//! A thin desktop shell around an embedded browser engine: it parses a few
//! command-line switches, opens a top-level window hosting a web view, keeps
//! window titles in sync with page titles and quits once the last browser has
//! closed.
//!
//! Notes for the host binary:
//!  - Everything in [`core`], [`handler`], [`views`] and [`app`] is confined to
//!    the UI thread. Engine objects are `Rc`-shared and deliberately `!Send`.
//!  - The only cross-thread entry point is [`handler::ShellProxy`], which
//!    posts work onto the [`core::thread::UiTaskRunner`].
//!  - The concrete engine binding lives in `backend` behind the `webview`
//!    feature.

use thiserror::Error;

pub mod app;
pub mod config;
pub mod core;
pub mod handler;
pub mod platform;
pub mod views;

#[cfg(feature = "webview")]
pub mod backend;

pub use crate::app::SimpleApp;
pub use crate::config::{CommandLine, RuntimeStyle, ShellConfig, ShowState};
pub use crate::handler::{ShellProxy, SimpleHandler};

#[derive(Error, Debug, Clone)]
pub enum ShellError {
    #[error("Callback handler already created for this process")]
    HandlerAlreadyCreated,
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Web view error: {0}")]
    WebView(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
    #[error("Platform error: {0}")]
    Platform(String),
}

impl From<platform::PlatformError> for ShellError {
    fn from(e: platform::PlatformError) -> Self {
        ShellError::Platform(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
