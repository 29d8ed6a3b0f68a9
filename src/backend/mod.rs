//! Desktop engine binding: winit windows hosting wry web views.
//!
//! Everything here runs on the thread that owns the event loop. Engine
//! callbacks that wry raises from its own handlers are turned into
//! [`ShellEvent`]s and dispatched from the loop, so client code never runs
//! re-entrantly inside a web view callback.

mod browser;
mod window;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
#[cfg(target_os = "linux")]
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use winit::event::{Event, StartCause, WindowEvent};
#[cfg(target_os = "linux")]
use winit::event_loop::ControlFlow;
use winit::event_loop::{EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget};
use winit::window::WindowId;

use self::browser::{send_or_log, WebBrowser};
pub use self::browser::{WebBrowserView, WebFrame};
pub use self::window::{EngineContext, WebWindow};
use crate::app::{SimpleApp, APP_TITLE};
use crate::core::thread::UiTaskRunner;
use crate::core::{
    report_load_error, Browser, BrowserId, BrowserView, CloseState, Engine, ErrorCode, MessageLoop,
    Window, WindowInfo,
};
use crate::handler::SimpleHandler;
use crate::{Result, ShellError};

/// Work delivered to the UI thread through the event loop.
#[derive(Debug, Clone)]
pub enum ShellEvent {
    /// Tasks are waiting in the UI task queue.
    RunTasks,
    TitleChanged { browser: BrowserId, title: String },
    LoadFailed {
        browser: BrowserId,
        error_code: ErrorCode,
        error_text: String,
        failed_url: String,
    },
    PopupRequested { opener: BrowserId, url: String },
    CloseBrowser { browser: BrowserId, force_close: bool },
    CloseWindow(WindowId),
    Quit,
}

/// Stops the winit event loop.
pub struct WinitMessageLoop {
    proxy: EventLoopProxy<ShellEvent>,
}

impl MessageLoop for WinitMessageLoop {
    fn quit(&self) {
        if self.proxy.send_event(ShellEvent::Quit).is_err() {
            debug!("Event loop already stopped");
        }
    }
}

/// Registry of live windows and browsers.
pub struct Runtime {
    proxy: EventLoopProxy<ShellEvent>,
    windows: RefCell<HashMap<WindowId, Rc<WebWindow>>>,
    browsers: RefCell<HashMap<BrowserId, Rc<WebBrowser>>>,
    next_browser_id: Cell<BrowserId>,
}

impl Runtime {
    fn new(proxy: EventLoopProxy<ShellEvent>) -> Rc<Self> {
        Rc::new(Self {
            proxy,
            windows: RefCell::new(HashMap::new()),
            browsers: RefCell::new(HashMap::new()),
            next_browser_id: Cell::new(1),
        })
    }

    pub(crate) fn proxy(&self) -> &EventLoopProxy<ShellEvent> {
        &self.proxy
    }

    pub(crate) fn allocate_browser_id(&self) -> BrowserId {
        let id = self.next_browser_id.get();
        self.next_browser_id.set(id + 1);
        id
    }

    pub(crate) fn register_window(&self, window: Rc<WebWindow>) {
        self.windows.borrow_mut().insert(window.id(), window);
    }

    pub(crate) fn register_browser(&self, browser: Rc<WebBrowser>) {
        self.browsers.borrow_mut().insert(browser.identifier(), browser);
    }

    fn window(&self, id: WindowId) -> Option<Rc<WebWindow>> {
        self.windows.borrow().get(&id).cloned()
    }

    fn browser(&self, id: BrowserId) -> Option<Rc<WebBrowser>> {
        self.browsers.borrow().get(&id).cloned()
    }

    fn handle_event(self: &Rc<Self>, event: ShellEvent, target: &EventLoopWindowTarget<ShellEvent>) {
        match event {
            ShellEvent::TitleChanged { browser, title } => self.dispatch_title(browser, &title),
            ShellEvent::LoadFailed {
                browser,
                error_code,
                error_text,
                failed_url,
            } => self.dispatch_load_error(browser, error_code, &error_text, &failed_url),
            ShellEvent::PopupRequested { opener, url } => self.open_popup(opener, &url, target),
            ShellEvent::CloseBrowser {
                browser,
                force_close,
            } => self.close_browser(browser, force_close),
            ShellEvent::CloseWindow(id) => self.request_window_close(id),
            // Handled by the event loop itself.
            ShellEvent::RunTasks | ShellEvent::Quit => {}
        }
    }

    fn dispatch_title(&self, id: BrowserId, title: &str) {
        let Some(browser) = self.browser(id) else {
            return;
        };
        if let Some(display) = browser.client().display_handler() {
            display.on_title_change(&(browser.clone() as Rc<dyn Browser>), title);
        }
    }

    fn dispatch_load_error(
        &self,
        id: BrowserId,
        error_code: ErrorCode,
        error_text: &str,
        failed_url: &str,
    ) {
        let Some(browser) = self.browser(id) else {
            return;
        };
        debug!("Browser {} failed to load {} ({})", id, failed_url, error_code);
        report_load_error(
            browser.client().as_ref(),
            &(browser.clone() as Rc<dyn Browser>),
            error_code,
            error_text,
            failed_url,
        );
    }

    fn open_popup(
        self: &Rc<Self>,
        opener_id: BrowserId,
        url: &str,
        target: &EventLoopWindowTarget<ShellEvent>,
    ) {
        let Some(opener) = self.browser(opener_id) else {
            return;
        };
        let engine = EngineContext {
            runtime: self,
            target,
        };
        let client = Rc::clone(opener.client());
        debug!("Browser {} opened popup {}", opener_id, url);

        if let Some(opener_view) = opener.view() {
            let delegate = Rc::clone(opener_view.delegate());
            match engine.create_browser_view(Rc::clone(&client), url, Rc::clone(&delegate)) {
                Ok(popup) => {
                    let opener_view = opener_view as Rc<dyn BrowserView>;
                    if delegate.on_popup_browser_view_created(&engine, &opener_view, popup, false) {
                        return;
                    }
                }
                Err(e) => error!("Failed to create popup view: {}", e),
            }
        }

        let window_info = WindowInfo {
            title: APP_TITLE.to_string(),
            size: None,
            as_popup: true,
        };
        if let Err(e) = engine.create_browser(window_info, client, url) {
            error!("Failed to open popup {}: {}", url, e);
        }
    }

    fn close_browser(&self, id: BrowserId, force_close: bool) {
        let Some(browser) = self.browser(id) else {
            return;
        };
        if browser.state() == CloseState::Closed {
            return;
        }
        debug!("Closing browser {} (force: {})", id, force_close);

        let handled = browser
            .client()
            .life_span_handler()
            .is_some_and(|life_span| life_span.do_close(&(browser.clone() as Rc<dyn Browser>)));

        if !handled {
            // The host window closes now that the browser is gone.
            if let Err(e) = self.proxy.send_event(ShellEvent::CloseWindow(browser.window_id())) {
                warn!("Failed to request window close: {}", e);
            }
        }
        self.finish_browser(&browser);
    }

    fn finish_browser(&self, browser: &Rc<WebBrowser>) {
        browser.mark_closed();
        self.browsers.borrow_mut().remove(&browser.identifier());
        if let Some(life_span) = browser.client().life_span_handler() {
            life_span.on_before_close(&(Rc::clone(browser) as Rc<dyn Browser>));
        }
    }

    fn request_window_close(&self, id: WindowId) {
        let Some(host) = self.window(id) else {
            return;
        };
        let window = Rc::clone(&host) as Rc<dyn Window>;

        let can_close = match host.delegate() {
            Some(delegate) => delegate.can_close(&window),
            None => host
                .browser()
                .map_or(true, |browser| browser.try_close_browser()),
        };
        if can_close {
            self.destroy_window(id);
        }
    }

    fn destroy_window(&self, id: WindowId) {
        let Some(host) = self.windows.borrow_mut().remove(&id) else {
            return;
        };
        if let Some(browser) = host.browser() {
            if browser.state() != CloseState::Closed {
                self.finish_browser(&browser);
            }
        }
        if let Some(delegate) = host.delegate() {
            delegate.on_window_destroyed(&(Rc::clone(&host) as Rc<dyn Window>));
        }
        host.release_browser();
        debug!("Window {:?} destroyed", id);
    }

    fn fit_browser(&self, id: WindowId) {
        if let Some(browser) = self.window(id).and_then(|host| host.browser()) {
            browser.fit_to_window();
        }
    }
}

/// Runs the shell until the last browser closes.
pub fn run(app: SimpleApp, runner: UiTaskRunner<SimpleHandler>) -> Result<()> {
    #[cfg(target_os = "linux")]
    gtk::init().map_err(|e| ShellError::EventLoop(e.to_string()))?;

    let event_loop = EventLoopBuilder::<ShellEvent>::with_user_event()
        .build()
        .map_err(|e| ShellError::EventLoop(e.to_string()))?;
    let runtime = Runtime::new(event_loop.create_proxy());

    let waker = Mutex::new(event_loop.create_proxy());
    runner.set_waker(move || {
        send_or_log(&waker.lock(), ShellEvent::RunTasks);
    });

    let startup_error: Rc<RefCell<Option<ShellError>>> = Rc::new(RefCell::new(None));
    let startup_result = Rc::clone(&startup_error);

    event_loop
        .run(move |event, target| match event {
            Event::NewEvents(StartCause::Init) => {
                let engine = EngineContext {
                    runtime: &runtime,
                    target,
                };
                let message_loop: Rc<dyn MessageLoop> = Rc::new(WinitMessageLoop {
                    proxy: runtime.proxy().clone(),
                });
                if let Err(e) = app.on_context_initialized(&engine, message_loop, runner.clone()) {
                    error!("Startup failed: {}", e);
                    *startup_error.borrow_mut() = Some(e);
                    target.exit();
                    return;
                }
                if let Some(handler) = app.handler() {
                    runner.run_pending(handler);
                }
            }
            Event::UserEvent(ShellEvent::RunTasks) => {
                if let Some(handler) = app.handler() {
                    runner.run_pending(handler);
                }
            }
            Event::UserEvent(ShellEvent::Quit) => {
                info!("Message loop quit requested");
                target.exit();
            }
            Event::UserEvent(event) => runtime.handle_event(event, target),
            Event::WindowEvent { window_id, event } => match event {
                WindowEvent::CloseRequested => runtime.request_window_close(window_id),
                WindowEvent::Resized(_) => runtime.fit_browser(window_id),
                _ => {}
            },
            #[cfg(target_os = "linux")]
            Event::AboutToWait => {
                while gtk::events_pending() {
                    gtk::main_iteration_do(false);
                }
                target.set_control_flow(ControlFlow::WaitUntil(
                    Instant::now() + Duration::from_millis(16),
                ));
            }
            _ => {}
        })
        .map_err(|e| ShellError::EventLoop(e.to_string()))?;

    let startup_error = startup_result.borrow_mut().take();
    match startup_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
