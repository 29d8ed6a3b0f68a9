//! Delegates for toolkit-managed windows and browser views.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, error};
use winit::dpi::LogicalSize;

use crate::config::{RuntimeStyle, ShowState};
use crate::core::{BrowserView, BrowserViewDelegate, Engine, Window, WindowDelegate};

pub const PREFERRED_WIDTH: u32 = 1024;
pub const PREFERRED_HEIGHT: u32 = 720;

/// Hosts a single browser view in a top-level window.
pub struct SimpleWindowDelegate {
    browser_view: RefCell<Option<Rc<dyn BrowserView>>>,
    runtime_style: RuntimeStyle,
    initial_show_state: ShowState,
}

impl SimpleWindowDelegate {
    pub fn new(
        browser_view: Rc<dyn BrowserView>,
        runtime_style: RuntimeStyle,
        initial_show_state: ShowState,
    ) -> Self {
        Self {
            browser_view: RefCell::new(Some(browser_view)),
            runtime_style,
            initial_show_state,
        }
    }

    pub fn browser_view(&self) -> Option<Rc<dyn BrowserView>> {
        self.browser_view.borrow().clone()
    }
}

impl WindowDelegate for SimpleWindowDelegate {
    fn on_window_created(&self, window: &Rc<dyn Window>) {
        // Add the browser view and show the window.
        if let Some(view) = self.browser_view() {
            window.add_child_view(view);
        }
        window.show();
    }

    fn on_window_destroyed(&self, _window: &Rc<dyn Window>) {
        self.browser_view.borrow_mut().take();
    }

    fn can_close(&self, _window: &Rc<dyn Window>) -> bool {
        // Allow the window to close if the browser says it's OK.
        match self.browser_view().and_then(|view| view.browser()) {
            Some(browser) => browser.try_close_browser(),
            None => true,
        }
    }

    fn preferred_size(&self) -> LogicalSize<u32> {
        LogicalSize::new(PREFERRED_WIDTH, PREFERRED_HEIGHT)
    }

    fn initial_show_state(&self) -> ShowState {
        self.initial_show_state
    }

    fn window_runtime_style(&self) -> RuntimeStyle {
        self.runtime_style
    }
}

/// Opens popups in their own top-level windows.
pub struct SimpleBrowserViewDelegate {
    runtime_style: RuntimeStyle,
}

impl SimpleBrowserViewDelegate {
    pub fn new(runtime_style: RuntimeStyle) -> Self {
        Self { runtime_style }
    }
}

impl BrowserViewDelegate for SimpleBrowserViewDelegate {
    fn on_popup_browser_view_created(
        &self,
        engine: &dyn Engine,
        _browser_view: &Rc<dyn BrowserView>,
        popup_browser_view: Rc<dyn BrowserView>,
        is_devtools: bool,
    ) -> bool {
        debug!("Opening popup window (devtools: {})", is_devtools);
        let delegate =
            SimpleWindowDelegate::new(popup_browser_view, self.runtime_style, ShowState::Normal);

        match engine.create_top_level_window(Box::new(delegate)) {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to create popup window: {}", e);
                false
            }
        }
    }

    fn browser_runtime_style(&self) -> RuntimeStyle {
        self.runtime_style
    }
}
