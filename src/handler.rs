//! Default client for every browser the shell creates.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use base64::Engine as _;
use tracing::{debug, info, warn};

use crate::core::thread::UiTaskRunner;
use crate::core::{
    Browser, Client, DisplayHandler, ErrorCode, Frame, LifeSpanHandler, LoadHandler, MessageLoop,
};
use crate::platform::NativeWindowOps;

/// Tracks open browsers, mirrors page titles onto their windows and stops the
/// message loop once the last browser has closed.
pub struct SimpleHandler {
    use_views: bool,
    browsers: RefCell<Vec<Rc<dyn Browser>>>,
    closing: Cell<bool>,
    native: Box<dyn NativeWindowOps>,
    message_loop: Rc<dyn MessageLoop>,
    runner: UiTaskRunner<SimpleHandler>,
}

impl SimpleHandler {
    pub fn new(
        use_views: bool,
        native: Box<dyn NativeWindowOps>,
        message_loop: Rc<dyn MessageLoop>,
        runner: UiTaskRunner<SimpleHandler>,
    ) -> Self {
        debug_assert!(runner.belongs_to_current_thread());
        Self {
            use_views,
            browsers: RefCell::new(Vec::new()),
            closing: Cell::new(false),
            native,
            message_loop,
            runner,
        }
    }

    pub fn is_closing(&self) -> bool {
        self.closing.get()
    }

    pub fn browser_count(&self) -> usize {
        self.browsers.borrow().len()
    }

    pub fn uses_views(&self) -> bool {
        self.use_views
    }

    /// Handle for other threads; see [`ShellProxy`].
    pub fn proxy(&self) -> ShellProxy {
        ShellProxy::new(self.runner.clone())
    }

    /// Brings the window of the first open browser to the front.
    pub fn show_main_window(&self) {
        debug_assert!(self.runner.belongs_to_current_thread());

        let Some(browser) = self.browsers.borrow().first().cloned() else {
            return;
        };

        if let Some(window) = browser.browser_view().and_then(|view| view.window()) {
            window.show();
        } else if !self.use_views {
            match browser.window_handle() {
                Some(handle) => {
                    if let Err(e) = self.native.show_and_focus(handle) {
                        warn!("Failed to show browser {} window: {}", browser.identifier(), e);
                    }
                }
                None => debug!("Browser {} has no native window", browser.identifier()),
            }
        }
    }

    /// Asks every open browser to close.
    pub fn close_all_browsers(&self, force_close: bool) {
        debug_assert!(self.runner.belongs_to_current_thread());

        // The engine may report close completion synchronously, which
        // mutates the list; iterate over a snapshot.
        let browsers = self.browsers.borrow().clone();
        if browsers.is_empty() {
            return;
        }

        info!(
            "Closing {} browser(s){}",
            browsers.len(),
            if force_close { " (forced)" } else { "" }
        );
        for browser in browsers {
            browser.close_browser(force_close);
        }
    }
}

impl Client for SimpleHandler {
    fn display_handler(&self) -> Option<&dyn DisplayHandler> {
        Some(self)
    }

    fn life_span_handler(&self) -> Option<&dyn LifeSpanHandler> {
        Some(self)
    }

    fn load_handler(&self) -> Option<&dyn LoadHandler> {
        Some(self)
    }
}

impl DisplayHandler for SimpleHandler {
    fn on_title_change(&self, browser: &Rc<dyn Browser>, title: &str) {
        debug_assert!(self.runner.belongs_to_current_thread());

        if let Some(view) = browser.browser_view() {
            if let Some(window) = view.window() {
                window.set_title(title);
            }
        } else if !self.use_views {
            let Some(handle) = browser.window_handle() else {
                return;
            };
            if let Err(e) = self.native.set_title(handle, title) {
                warn!("Failed to set title for browser {}: {}", browser.identifier(), e);
            }
        }
    }
}

impl LifeSpanHandler for SimpleHandler {
    fn on_after_created(&self, browser: Rc<dyn Browser>) {
        debug_assert!(self.runner.belongs_to_current_thread());

        debug!("Browser {} created", browser.identifier());
        self.browsers.borrow_mut().push(browser);
    }

    fn do_close(&self, _browser: &Rc<dyn Browser>) -> bool {
        debug_assert!(self.runner.belongs_to_current_thread());

        // Closing the last browser closes the application.
        if self.browsers.borrow().len() == 1 {
            self.closing.set(true);
        }

        false
    }

    fn on_before_close(&self, browser: &Rc<dyn Browser>) {
        debug_assert!(self.runner.belongs_to_current_thread());

        let now_empty = {
            let mut browsers = self.browsers.borrow_mut();
            if let Some(index) = browsers
                .iter()
                .position(|tracked| tracked.is_same(browser.as_ref()))
            {
                browsers.remove(index);
            }
            browsers.is_empty()
        };
        debug!("Browser {} closed", browser.identifier());

        if now_empty {
            info!("All browsers closed, quitting message loop");
            self.message_loop.quit();
        }
    }
}

impl LoadHandler for SimpleHandler {
    fn on_load_error(
        &self,
        browser: &Rc<dyn Browser>,
        frame: &dyn Frame,
        error_code: ErrorCode,
        error_text: &str,
        failed_url: &str,
    ) {
        debug_assert!(self.runner.belongs_to_current_thread());

        if self.use_views {
            return;
        }

        // Don't display an error for downloaded files or user cancellation.
        if error_code.is_aborted() {
            return;
        }

        warn!(
            "Browser {} failed to load {}: {} ({})",
            browser.identifier(),
            failed_url,
            error_text,
            error_code
        );
        frame.load_url(&data_uri(
            &load_error_html(failed_url, error_text, error_code),
            "text/html",
        ));
    }
}

/// Thread-safe entry points into the handler.
///
/// Calls are posted to the UI thread and return immediately; the effect
/// happens when the UI thread drains its task queue. This holds on the UI
/// thread too, since the proxy has no access to the handler itself. Code
/// already on the UI thread calls [`SimpleHandler::show_main_window`] and
/// [`SimpleHandler::close_all_browsers`] directly to act inline.
#[derive(Clone)]
pub struct ShellProxy {
    runner: UiTaskRunner<SimpleHandler>,
}

impl ShellProxy {
    pub fn new(runner: UiTaskRunner<SimpleHandler>) -> Self {
        Self { runner }
    }

    pub fn show_main_window(&self) {
        self.runner.post_task(|handler: &SimpleHandler| handler.show_main_window());
    }

    pub fn close_all_browsers(&self, force_close: bool) {
        self.runner
            .post_task(move |handler: &SimpleHandler| handler.close_all_browsers(force_close));
    }
}

pub fn load_error_html(failed_url: &str, error_text: &str, error_code: ErrorCode) -> String {
    format!(
        "<html><body bgcolor=\"white\"><h2>Failed to load URL {} with error {} ({}).</h2></body></html>",
        escape_html(failed_url),
        escape_html(error_text),
        error_code
    )
}

pub fn data_uri(data: &str, mime_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
