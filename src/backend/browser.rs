use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, error};
use winit::event_loop::EventLoopProxy;
use wry::{WebView, WebViewBuilder};

use super::window::WebWindow;
use super::ShellEvent;
use crate::core::{
    Browser, BrowserId, BrowserView, BrowserViewDelegate, Client, CloseState, CloseTracker, Frame,
    Window,
};
use crate::platform::NativeWindow;
use crate::{Result, ShellError};

/// A wry web view living inside a winit window.
pub struct WebBrowser {
    id: BrowserId,
    webview: RefCell<Option<WebView>>,
    window: Rc<winit::window::Window>,
    view: Weak<WebBrowserView>,
    client: Rc<dyn Client>,
    close: CloseTracker,
    frame: Rc<WebFrame>,
    proxy: EventLoopProxy<ShellEvent>,
}

impl WebBrowser {
    pub(super) fn create(
        id: BrowserId,
        window: Rc<winit::window::Window>,
        client: Rc<dyn Client>,
        url: &str,
        view: Weak<WebBrowserView>,
        proxy: EventLoopProxy<ShellEvent>,
    ) -> Result<Rc<Self>> {
        let webview = build_webview(&window, id, url, &proxy)
            .map_err(|e| ShellError::WebView(e.to_string()))?;

        Ok(Rc::new_cyclic(|browser| Self {
            id,
            webview: RefCell::new(Some(webview)),
            window,
            view,
            client,
            close: CloseTracker::new(),
            frame: Rc::new(WebFrame {
                browser: browser.clone(),
            }),
            proxy,
        }))
    }

    pub(super) fn client(&self) -> &Rc<dyn Client> {
        &self.client
    }

    pub(super) fn view(&self) -> Option<Rc<WebBrowserView>> {
        self.view.upgrade()
    }

    pub(super) fn state(&self) -> CloseState {
        self.close.state()
    }

    pub(super) fn window_id(&self) -> winit::window::WindowId {
        self.window.id()
    }

    /// Tears down the web view; the browser can no longer navigate.
    pub(super) fn mark_closed(&self) {
        self.close.finish();
        self.webview.borrow_mut().take();
    }

    pub(super) fn fit_to_window(&self) {
        let size = self.window.inner_size();
        if let Some(webview) = self.webview.borrow().as_ref() {
            let bounds = wry::Rect {
                position: wry::dpi::LogicalPosition::new(0, 0).into(),
                size: wry::dpi::PhysicalSize::new(size.width, size.height).into(),
            };
            if let Err(e) = webview.set_bounds(bounds) {
                error!("Failed to resize web view of browser {}: {}", self.id, e);
            }
        }
    }

    fn load_url(&self, url: &str) {
        match self.webview.borrow().as_ref() {
            Some(webview) => {
                if let Err(e) = webview.load_url(url) {
                    error!("Browser {} failed to load {}: {}", self.id, url, e);
                }
            }
            None => debug!("Browser {} is closed, ignoring navigation", self.id),
        }
    }

    fn post(&self, event: ShellEvent) {
        if self.proxy.send_event(event).is_err() {
            debug!("Event loop gone, dropping event for browser {}", self.id);
        }
    }
}

impl Browser for WebBrowser {
    fn identifier(&self) -> BrowserId {
        self.id
    }

    fn main_frame(&self) -> Rc<dyn Frame> {
        Rc::clone(&self.frame) as Rc<dyn Frame>
    }

    fn close_browser(&self, force_close: bool) {
        if !self.close.begin() {
            return;
        }
        self.post(ShellEvent::CloseBrowser {
            browser: self.id,
            force_close,
        });
    }

    fn try_close_browser(&self) -> bool {
        self.close.try_close(|| self.close_browser(false))
    }

    fn window_handle(&self) -> Option<NativeWindow> {
        let window = self.window.window_handle().ok()?.as_raw();
        let display = self.window.display_handle().ok()?.as_raw();
        Some(NativeWindow::new(window, display))
    }

    fn browser_view(&self) -> Option<Rc<dyn BrowserView>> {
        self.view
            .upgrade()
            .map(|view| view as Rc<dyn BrowserView>)
    }
}

pub struct WebFrame {
    browser: Weak<WebBrowser>,
}

impl Frame for WebFrame {
    fn load_url(&self, url: &str) {
        if let Some(browser) = self.browser.upgrade() {
            browser.load_url(url);
        }
    }
}

/// Toolkit view whose browser is created once the view is added to a window.
pub struct WebBrowserView {
    client: Rc<dyn Client>,
    url: String,
    delegate: Rc<dyn BrowserViewDelegate>,
    browser: RefCell<Option<Rc<WebBrowser>>>,
    window: RefCell<Weak<WebWindow>>,
    self_ref: Weak<WebBrowserView>,
}

impl WebBrowserView {
    pub(super) fn new(
        client: Rc<dyn Client>,
        url: &str,
        delegate: Rc<dyn BrowserViewDelegate>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            client,
            url: url.to_string(),
            delegate,
            browser: RefCell::new(None),
            window: RefCell::new(Weak::new()),
            self_ref: self_ref.clone(),
        })
    }

    pub(super) fn client(&self) -> &Rc<dyn Client> {
        &self.client
    }

    pub(super) fn url(&self) -> &str {
        &self.url
    }

    pub(super) fn delegate(&self) -> &Rc<dyn BrowserViewDelegate> {
        &self.delegate
    }

    pub(super) fn self_ref(&self) -> Weak<WebBrowserView> {
        self.self_ref.clone()
    }

    pub(super) fn attach(&self, window: &Rc<WebWindow>, browser: Rc<WebBrowser>) {
        *self.window.borrow_mut() = Rc::downgrade(window);
        *self.browser.borrow_mut() = Some(browser);
    }
}

impl BrowserView for WebBrowserView {
    fn browser(&self) -> Option<Rc<dyn Browser>> {
        self.browser
            .borrow()
            .clone()
            .map(|browser| browser as Rc<dyn Browser>)
    }

    fn window(&self) -> Option<Rc<dyn Window>> {
        self.window
            .borrow()
            .upgrade()
            .map(|window| window as Rc<dyn Window>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn build_webview(
    window: &winit::window::Window,
    id: BrowserId,
    url: &str,
    proxy: &EventLoopProxy<ShellEvent>,
) -> wry::Result<WebView> {
    let title_proxy = proxy.clone();
    let popup_proxy = proxy.clone();

    let webview = WebViewBuilder::new()
        .with_url(url)
        .with_document_title_changed_handler(move |title| {
            send_or_log(&title_proxy, ShellEvent::TitleChanged { browser: id, title });
        })
        .with_new_window_req_handler(move |url| {
            // Popups are opened by the shell in their own windows.
            send_or_log(&popup_proxy, ShellEvent::PopupRequested { opener: id, url });
            false
        })
        .build(window)?;

    #[cfg(target_os = "linux")]
    load_errors::connect(&webview, id, proxy.clone());

    Ok(webview)
}

pub(super) fn send_or_log(proxy: &EventLoopProxy<ShellEvent>, event: ShellEvent) {
    if let Err(e) = proxy.send_event(event) {
        debug!("Event loop gone, dropping {:?}", e.0);
    }
}

/// WebKitGTK reports failed navigations through its `load-failed` signal,
/// which wry does not surface.
#[cfg(target_os = "linux")]
mod load_errors {
    use gtk::{gio, glib};
    use webkit2gtk::{NetworkError, PolicyError, WebViewExt};
    use winit::event_loop::EventLoopProxy;
    use wry::{WebView, WebViewExtUnix};

    use super::{send_or_log, ShellEvent};
    use crate::core::{BrowserId, ErrorCode};

    pub(super) fn connect(webview: &WebView, id: BrowserId, proxy: EventLoopProxy<ShellEvent>) {
        webview
            .webview()
            .connect_load_failed(move |_, _, failing_uri, error| {
                send_or_log(
                    &proxy,
                    ShellEvent::LoadFailed {
                        browser: id,
                        error_code: error_code(error),
                        error_text: error.message().to_string(),
                        failed_url: failing_uri.to_string(),
                    },
                );
                // Keep the engine's own page until the handler replaces it.
                false
            });
    }

    fn error_code(error: &glib::Error) -> ErrorCode {
        if let Some(network) = error.kind::<NetworkError>() {
            return match network {
                NetworkError::Cancelled => ErrorCode::ABORTED,
                NetworkError::FileDoesNotExist => ErrorCode::FILE_NOT_FOUND,
                NetworkError::UnknownProtocol => ErrorCode::UNKNOWN_URL_SCHEME,
                _ => ErrorCode::FAILED,
            };
        }
        // Downloads stop the navigation through a policy change.
        if let Some(PolicyError::FrameLoadInterruptedByPolicyChange) = error.kind::<PolicyError>() {
            return ErrorCode::ABORTED;
        }
        if let Some(gio::ResolverError::NotFound | gio::ResolverError::TemporaryFailure) =
            error.kind::<gio::ResolverError>()
        {
            return ErrorCode::NAME_NOT_RESOLVED;
        }
        match error.kind::<gio::IOErrorEnum>() {
            Some(gio::IOErrorEnum::TimedOut) => ErrorCode::TIMED_OUT,
            Some(gio::IOErrorEnum::ConnectionRefused) => ErrorCode::CONNECTION_REFUSED,
            Some(gio::IOErrorEnum::Cancelled) => ErrorCode::ABORTED,
            _ => ErrorCode::FAILED,
        }
    }
}
