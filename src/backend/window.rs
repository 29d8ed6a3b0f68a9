use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, error};
use winit::dpi::LogicalSize;
use winit::event_loop::EventLoopWindowTarget;
use winit::window::WindowBuilder;

use super::browser::{send_or_log, WebBrowser, WebBrowserView};
use super::{Runtime, ShellEvent};
use crate::app::APP_TITLE;
use crate::config::ShowState;
use crate::core::{
    Browser, BrowserView, BrowserViewDelegate, Client, Engine, Window, WindowDelegate, WindowInfo,
};
use crate::views::{PREFERRED_HEIGHT, PREFERRED_WIDTH};
use crate::{Result, ShellError};

/// A top-level winit window hosting at most one browser.
pub struct WebWindow {
    window: Rc<winit::window::Window>,
    delegate: Option<Box<dyn WindowDelegate>>,
    browser: RefCell<Option<Rc<WebBrowser>>>,
    runtime: Weak<Runtime>,
    self_ref: Weak<WebWindow>,
}

impl WebWindow {
    fn new(
        window: winit::window::Window,
        delegate: Option<Box<dyn WindowDelegate>>,
        runtime: Weak<Runtime>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            window: Rc::new(window),
            delegate,
            browser: RefCell::new(None),
            runtime,
            self_ref: self_ref.clone(),
        })
    }

    pub(super) fn id(&self) -> winit::window::WindowId {
        self.window.id()
    }

    pub(super) fn delegate(&self) -> Option<&dyn WindowDelegate> {
        self.delegate.as_deref()
    }

    pub(super) fn browser(&self) -> Option<Rc<WebBrowser>> {
        self.browser.borrow().clone()
    }

    pub(super) fn release_browser(&self) {
        self.browser.borrow_mut().take();
    }

    fn as_dyn(self: &Rc<Self>) -> Rc<dyn Window> {
        Rc::clone(self) as Rc<dyn Window>
    }

    /// Creates the browser for this window and reports it to `client`.
    fn attach_browser(
        self: &Rc<Self>,
        client: Rc<dyn Client>,
        url: &str,
        view: Weak<WebBrowserView>,
    ) -> Result<Rc<WebBrowser>> {
        let runtime = self
            .runtime
            .upgrade()
            .ok_or_else(|| ShellError::EventLoop("runtime dropped".to_string()))?;

        let id = runtime.allocate_browser_id();
        let browser = WebBrowser::create(
            id,
            Rc::clone(&self.window),
            Rc::clone(&client),
            url,
            view,
            runtime.proxy().clone(),
        )?;
        browser.fit_to_window();
        *self.browser.borrow_mut() = Some(Rc::clone(&browser));
        runtime.register_browser(Rc::clone(&browser));

        if let Some(life_span) = client.life_span_handler() {
            life_span.on_after_created(Rc::clone(&browser) as Rc<dyn Browser>);
        }
        Ok(browser)
    }
}

impl Window for WebWindow {
    fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    fn show(&self) {
        self.window.set_visible(true);
        if self.window.is_minimized() == Some(true) {
            self.window.set_minimized(false);
        }
        self.window.focus_window();
    }

    fn close(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            send_or_log(runtime.proxy(), ShellEvent::CloseWindow(self.id()));
        }
    }

    fn add_child_view(&self, view: Rc<dyn BrowserView>) {
        let Some(view) = view.as_any().downcast_ref::<WebBrowserView>() else {
            error!("Only browser views created by this engine can be hosted");
            return;
        };
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };

        match this.attach_browser(Rc::clone(view.client()), view.url(), view.self_ref()) {
            Ok(browser) => view.attach(&this, browser),
            Err(e) => error!("Failed to create browser for {}: {}", view.url(), e),
        }
    }
}

/// Engine entry points, usable while the event loop hands out its target.
pub struct EngineContext<'a> {
    pub(super) runtime: &'a Rc<Runtime>,
    pub(super) target: &'a EventLoopWindowTarget<ShellEvent>,
}

impl EngineContext<'_> {
    fn build_window(
        &self,
        builder: WindowBuilder,
        delegate: Option<Box<dyn WindowDelegate>>,
    ) -> Result<Rc<WebWindow>> {
        let window = builder
            .build(self.target)
            .map_err(|e| ShellError::WindowCreation(e.to_string()))?;
        let host = WebWindow::new(window, delegate, Rc::downgrade(self.runtime));
        self.runtime.register_window(Rc::clone(&host));
        Ok(host)
    }
}

impl Engine for EngineContext<'_> {
    fn create_browser_view(
        &self,
        client: Rc<dyn Client>,
        url: &str,
        delegate: Rc<dyn BrowserViewDelegate>,
    ) -> Result<Rc<dyn BrowserView>> {
        debug!(
            "Creating browser view for {} ({:?} style)",
            url,
            delegate.browser_runtime_style()
        );
        Ok(WebBrowserView::new(client, url, delegate) as Rc<dyn BrowserView>)
    }

    fn create_top_level_window(&self, delegate: Box<dyn WindowDelegate>) -> Result<Rc<dyn Window>> {
        let show_state = delegate.initial_show_state();
        debug!(
            "Creating top-level window ({:?}, {:?} style)",
            show_state,
            delegate.window_runtime_style()
        );

        let builder = WindowBuilder::new()
            .with_title(APP_TITLE)
            .with_inner_size(delegate.preferred_size())
            .with_visible(false)
            .with_maximized(show_state == ShowState::Maximized);
        let host = self.build_window(builder, Some(delegate))?;

        let window = host.as_dyn();
        if let Some(delegate) = host.delegate() {
            delegate.on_window_created(&window);
        }
        if show_state == ShowState::Minimized {
            host.window.set_minimized(true);
        }
        Ok(window)
    }

    fn create_browser(
        &self,
        window_info: WindowInfo,
        client: Rc<dyn Client>,
        url: &str,
    ) -> Result<()> {
        let size = window_info
            .size
            .unwrap_or(LogicalSize::new(PREFERRED_WIDTH, PREFERRED_HEIGHT));
        debug!(
            "Creating native browser window \"{}\" (popup: {})",
            window_info.title, window_info.as_popup
        );

        let builder = WindowBuilder::new()
            .with_title(window_info.title)
            .with_inner_size(size);
        let host = self.build_window(builder, None)?;
        host.attach_browser(client, url, Weak::new())?;
        Ok(())
    }
}
