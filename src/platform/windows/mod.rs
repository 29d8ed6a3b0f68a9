use ::windows::core::HSTRING;
use ::windows::Win32::Foundation::HWND;
use ::windows::Win32::UI::WindowsAndMessaging::{
    SetForegroundWindow, SetWindowTextW, ShowWindow, SW_SHOWNORMAL,
};
use raw_window_handle::RawWindowHandle;

use super::{NativeWindow, NativeWindowOps, PlatformError};

pub struct Win32WindowOps;

impl Win32WindowOps {
    pub fn new() -> Self {
        Self
    }

    fn hwnd(window: NativeWindow) -> Result<HWND, PlatformError> {
        match window.window {
            RawWindowHandle::Win32(handle) => Ok(HWND(handle.hwnd.get())),
            other => Err(PlatformError::UnsupportedHandle(format!("{:?}", other))),
        }
    }
}

impl NativeWindowOps for Win32WindowOps {
    fn set_title(&self, window: NativeWindow, title: &str) -> Result<(), PlatformError> {
        let hwnd = Self::hwnd(window)?;
        unsafe { SetWindowTextW(hwnd, &HSTRING::from(title)) }
            .map_err(|e| PlatformError::CallFailed(format!("SetWindowTextW: {}", e)))
    }

    fn show_and_focus(&self, window: NativeWindow) -> Result<(), PlatformError> {
        let hwnd = Self::hwnd(window)?;
        unsafe {
            // Both return the previous state rather than an error.
            let _ = ShowWindow(hwnd, SW_SHOWNORMAL);
            let _ = SetForegroundWindow(hwnd);
        }
        Ok(())
    }
}

impl Default for Win32WindowOps {
    fn default() -> Self {
        Self::new()
    }
}
