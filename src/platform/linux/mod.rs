use std::ffi::CString;
use std::os::raw::{c_int, c_uchar};

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use tracing::warn;
use x11_dl::xlib::{self, Xlib};

use super::{NativeWindow, NativeWindowOps, PlatformError};

/// X11 implementation. libX11 is loaded at runtime, so a missing library only
/// disables the helpers instead of failing startup.
pub struct X11WindowOps {
    xlib: Option<Xlib>,
}

impl X11WindowOps {
    pub fn new() -> Self {
        let xlib = match Xlib::open() {
            Ok(xlib) => Some(xlib),
            Err(e) => {
                warn!("Failed to load libX11, native window helpers disabled: {}", e);
                None
            }
        };
        Self { xlib }
    }

    fn target(
        &self,
        window: NativeWindow,
    ) -> Result<(&Xlib, *mut xlib::Display, xlib::Window), PlatformError> {
        let (RawWindowHandle::Xlib(window_handle), RawDisplayHandle::Xlib(display_handle)) =
            (window.window, window.display)
        else {
            return Err(PlatformError::UnsupportedHandle(format!(
                "{:?}",
                window.window
            )));
        };

        let display = display_handle
            .display
            .ok_or_else(|| PlatformError::UnsupportedHandle("missing X11 display".to_string()))?
            .cast::<xlib::Display>()
            .as_ptr();

        let xlib = self
            .xlib
            .as_ref()
            .ok_or_else(|| PlatformError::LibraryUnavailable("libX11".to_string()))?;

        Ok((xlib, display, window_handle.window))
    }
}

impl NativeWindowOps for X11WindowOps {
    fn set_title(&self, window: NativeWindow, title: &str) -> Result<(), PlatformError> {
        let (xlib, display, window) = self.target(window)?;
        let title = CString::new(title.replace('\0', ""))
            .map_err(|e| PlatformError::CallFailed(e.to_string()))?;
        let length = c_int::try_from(title.as_bytes().len())
            .map_err(|e| PlatformError::CallFailed(e.to_string()))?;

        unsafe {
            let net_wm_name = (xlib.XInternAtom)(display, c"_NET_WM_NAME".as_ptr(), xlib::False);
            let utf8_string = (xlib.XInternAtom)(display, c"UTF8_STRING".as_ptr(), xlib::False);
            (xlib.XChangeProperty)(
                display,
                window,
                net_wm_name,
                utf8_string,
                8,
                xlib::PropModeReplace,
                title.as_ptr() as *const c_uchar,
                length,
            );
            // Legacy WM_NAME for window managers without EWMH support.
            (xlib.XStoreName)(display, window, title.as_ptr());
            (xlib.XFlush)(display);
        }
        Ok(())
    }

    fn show_and_focus(&self, window: NativeWindow) -> Result<(), PlatformError> {
        let (xlib, display, window) = self.target(window)?;
        unsafe {
            (xlib.XMapRaised)(display, window);
            (xlib.XFlush)(display);
        }
        Ok(())
    }
}

impl Default for X11WindowOps {
    fn default() -> Self {
        Self::new()
    }
}
