//! Interface to the embedded browser engine.
//!
//! The shell never reaches into the engine directly; it talks to these traits.
//! Every object here lives on the UI thread and is shared with `Rc`.

pub mod close;
pub mod thread;

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use winit::dpi::LogicalSize;

use crate::config::{RuntimeStyle, ShowState};
use crate::platform::NativeWindow;

pub use self::close::{CloseState, CloseTracker};

/// Engine-assigned browser identity, unique for the lifetime of the process.
pub type BrowserId = i32;

/// Network error code reported by the engine for a failed navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// The navigation was aborted, usually by the user.
    pub const ABORTED: ErrorCode = ErrorCode(-3);
    pub const FAILED: ErrorCode = ErrorCode(-2);
    pub const FILE_NOT_FOUND: ErrorCode = ErrorCode(-6);
    pub const TIMED_OUT: ErrorCode = ErrorCode(-7);
    pub const CONNECTION_REFUSED: ErrorCode = ErrorCode(-102);
    pub const NAME_NOT_RESOLVED: ErrorCode = ErrorCode(-105);
    pub const UNKNOWN_URL_SCHEME: ErrorCode = ErrorCode(-301);

    pub fn is_aborted(self) -> bool {
        self == Self::ABORTED
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait Frame {
    fn load_url(&self, url: &str);
}

pub trait Browser {
    fn identifier(&self) -> BrowserId;

    fn is_same(&self, other: &dyn Browser) -> bool {
        self.identifier() == other.identifier()
    }

    fn main_frame(&self) -> Rc<dyn Frame>;

    /// Starts the close sequence. `force_close` skips unload handlers.
    fn close_browser(&self, force_close: bool);

    /// Returns `true` once the browser has finished closing and its host may
    /// go away. The first call starts the close sequence and returns `false`.
    fn try_close_browser(&self) -> bool;

    /// Top-level native window hosting this browser, if it has one.
    fn window_handle(&self) -> Option<NativeWindow>;

    /// Browser view hosting this browser when it was created through the
    /// toolkit layer.
    fn browser_view(&self) -> Option<Rc<dyn BrowserView>>;
}

pub trait BrowserView {
    fn browser(&self) -> Option<Rc<dyn Browser>>;
    fn window(&self) -> Option<Rc<dyn Window>>;
    fn as_any(&self) -> &dyn Any;
}

pub trait Window {
    fn set_title(&self, title: &str);
    fn show(&self);
    fn close(&self);
    fn add_child_view(&self, view: Rc<dyn BrowserView>);
}

pub trait DisplayHandler {
    fn on_title_change(&self, _browser: &Rc<dyn Browser>, _title: &str) {}
}

pub trait LifeSpanHandler {
    fn on_after_created(&self, _browser: Rc<dyn Browser>) {}

    /// Returning `false` lets the engine continue its own close sequence.
    fn do_close(&self, _browser: &Rc<dyn Browser>) -> bool {
        false
    }

    fn on_before_close(&self, _browser: &Rc<dyn Browser>) {}
}

pub trait LoadHandler {
    fn on_load_error(
        &self,
        _browser: &Rc<dyn Browser>,
        _frame: &dyn Frame,
        _error_code: ErrorCode,
        _error_text: &str,
        _failed_url: &str,
    ) {
    }
}

/// Receiver of browser-originated notifications, grouped by concern.
pub trait Client {
    fn display_handler(&self) -> Option<&dyn DisplayHandler> {
        None
    }

    fn life_span_handler(&self) -> Option<&dyn LifeSpanHandler> {
        None
    }

    fn load_handler(&self) -> Option<&dyn LoadHandler> {
        None
    }
}

pub trait WindowDelegate {
    fn on_window_created(&self, window: &Rc<dyn Window>);
    fn on_window_destroyed(&self, window: &Rc<dyn Window>);
    fn can_close(&self, window: &Rc<dyn Window>) -> bool;
    fn preferred_size(&self) -> LogicalSize<u32>;
    fn initial_show_state(&self) -> ShowState;
    fn window_runtime_style(&self) -> RuntimeStyle;
}

pub trait BrowserViewDelegate {
    /// Called when content in `browser_view` opens a popup. Returning `false`
    /// lets the engine host the popup in a default native window.
    fn on_popup_browser_view_created(
        &self,
        engine: &dyn Engine,
        browser_view: &Rc<dyn BrowserView>,
        popup_browser_view: Rc<dyn BrowserView>,
        is_devtools: bool,
    ) -> bool;

    fn browser_runtime_style(&self) -> RuntimeStyle;
}

/// Placement hints for a natively hosted browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowInfo {
    pub title: String,
    pub size: Option<LogicalSize<u32>>,
    /// Create the window as an unparented popup.
    pub as_popup: bool,
}

/// Browser and window factories exposed by the engine.
pub trait Engine {
    fn create_browser_view(
        &self,
        client: Rc<dyn Client>,
        url: &str,
        delegate: Rc<dyn BrowserViewDelegate>,
    ) -> crate::Result<Rc<dyn BrowserView>>;

    fn create_top_level_window(
        &self,
        delegate: Box<dyn WindowDelegate>,
    ) -> crate::Result<Rc<dyn Window>>;

    fn create_browser(
        &self,
        window_info: WindowInfo,
        client: Rc<dyn Client>,
        url: &str,
    ) -> crate::Result<()>;
}

/// Delivers a failed main-frame navigation of `browser` to `client`.
pub fn report_load_error(
    client: &dyn Client,
    browser: &Rc<dyn Browser>,
    error_code: ErrorCode,
    error_text: &str,
    failed_url: &str,
) {
    if let Some(load) = client.load_handler() {
        load.on_load_error(
            browser,
            browser.main_frame().as_ref(),
            error_code,
            error_text,
            failed_url,
        );
    }
}

/// The engine's UI message loop.
pub trait MessageLoop {
    fn quit(&self);
}
