//! Native window helpers used when browsers are hosted in plain platform windows.
//!
//! Only two operations are needed: setting the window title and bringing the
//! window to the front. Each supported OS provides its own implementation;
//! everything else gets [`UnsupportedWindowOps`].

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::Win32WindowOps;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::X11WindowOps;

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use tracing::debug;

/// Raw handles of a top-level native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindow {
    pub window: RawWindowHandle,
    pub display: RawDisplayHandle,
}

impl NativeWindow {
    pub fn new(window: RawWindowHandle, display: RawDisplayHandle) -> Self {
        Self { window, display }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Unsupported window handle: {0}")]
    UnsupportedHandle(String),
    #[error("Native library unavailable: {0}")]
    LibraryUnavailable(String),
    #[error("Native call failed: {0}")]
    CallFailed(String),
}

pub trait NativeWindowOps {
    fn set_title(&self, window: NativeWindow, title: &str) -> Result<(), PlatformError>;

    /// Shows the window, restoring it if needed, and gives it input focus.
    fn show_and_focus(&self, window: NativeWindow) -> Result<(), PlatformError>;
}

/// Fallback for platforms without native-window support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedWindowOps;

impl NativeWindowOps for UnsupportedWindowOps {
    fn set_title(&self, _window: NativeWindow, title: &str) -> Result<(), PlatformError> {
        debug!("Native title change not implemented on this platform: {}", title);
        Ok(())
    }

    fn show_and_focus(&self, _window: NativeWindow) -> Result<(), PlatformError> {
        debug!("Native show window not implemented on this platform");
        Ok(())
    }
}

/// Native helpers for the platform this binary was built for.
pub fn native_window_ops() -> Box<dyn NativeWindowOps> {
    #[cfg(target_os = "windows")]
    {
        Box::new(Win32WindowOps::new())
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(X11WindowOps::new())
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        Box::new(UnsupportedWindowOps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{WebDisplayHandle, WebWindowHandle};

    fn web_window() -> NativeWindow {
        NativeWindow::new(
            RawWindowHandle::Web(WebWindowHandle::new(1)),
            RawDisplayHandle::Web(WebDisplayHandle::new()),
        )
    }

    #[test]
    fn test_unsupported_ops_are_noops() {
        let ops = UnsupportedWindowOps;
        assert!(ops.set_title(web_window(), "Title").is_ok());
        assert!(ops.show_and_focus(web_window()).is_ok());
    }

    #[test]
    fn test_platform_ops_reject_foreign_handles() {
        let ops = native_window_ops();
        let result = ops.set_title(web_window(), "Title");
        if cfg!(any(target_os = "windows", target_os = "linux")) {
            assert!(result.is_err());
        } else {
            assert!(result.is_ok());
        }
    }
}
