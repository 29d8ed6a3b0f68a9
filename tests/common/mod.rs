#![allow(dead_code)]

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use browser_shell::core::thread::UiTaskRunner;
use browser_shell::core::{
    Browser, BrowserId, BrowserView, BrowserViewDelegate, Client, CloseTracker, Engine, Frame,
    MessageLoop, Window, WindowDelegate, WindowInfo,
};
use browser_shell::platform::{NativeWindow, NativeWindowOps, PlatformError};
use browser_shell::{Result, SimpleHandler};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle};

pub fn native_window(id: u32) -> NativeWindow {
    NativeWindow::new(
        RawWindowHandle::Web(WebWindowHandle::new(id)),
        RawDisplayHandle::Web(WebDisplayHandle::new()),
    )
}

#[derive(Default)]
pub struct FakeFrame {
    pub loaded: RefCell<Vec<String>>,
}

impl Frame for FakeFrame {
    fn load_url(&self, url: &str) {
        self.loaded.borrow_mut().push(url.to_string());
    }
}

pub struct FakeBrowser {
    pub id: BrowserId,
    pub frame: Rc<FakeFrame>,
    pub handle: Option<NativeWindow>,
    pub view: RefCell<Weak<FakeBrowserView>>,
    pub close_requests: RefCell<Vec<bool>>,
    pub try_close_result: Cell<bool>,
    pub try_close_calls: Cell<usize>,
    /// Client notified synchronously when `close_browser` is called.
    pub client: RefCell<Option<Rc<dyn Client>>>,
    /// When set, closing follows the engine's two-phase negotiation and
    /// completes only through `complete_close`.
    pub negotiated: Option<CloseTracker>,
    pub self_ref: Weak<FakeBrowser>,
}

impl FakeBrowser {
    pub fn new(id: BrowserId) -> Rc<Self> {
        Self::build(id, None, None)
    }

    pub fn native(id: BrowserId) -> Rc<Self> {
        Self::build(id, Some(native_window(id as u32)), None)
    }

    /// Browser whose close is negotiated and reported to `client`.
    pub fn negotiated(id: BrowserId, client: Rc<dyn Client>) -> Rc<Self> {
        let browser = Self::build(id, None, Some(CloseTracker::new()));
        *browser.client.borrow_mut() = Some(client);
        browser
    }

    fn build(
        id: BrowserId,
        handle: Option<NativeWindow>,
        negotiated: Option<CloseTracker>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            id,
            frame: Rc::new(FakeFrame::default()),
            handle,
            view: RefCell::new(Weak::new()),
            close_requests: RefCell::new(Vec::new()),
            try_close_result: Cell::new(false),
            try_close_calls: Cell::new(0),
            client: RefCell::new(None),
            negotiated,
            self_ref: self_ref.clone(),
        })
    }

    pub fn as_dyn(self: &Rc<Self>) -> Rc<dyn Browser> {
        Rc::clone(self) as Rc<dyn Browser>
    }

    /// Makes `close_browser` run the full close sequence immediately.
    pub fn close_synchronously_via(&self, client: Rc<dyn Client>) {
        *self.client.borrow_mut() = Some(client);
    }

    /// Engine side of a negotiated close: asks the client, then reports the
    /// browser gone.
    pub fn complete_close(&self) {
        let (Some(tracker), Some(this)) = (self.negotiated.as_ref(), self.self_ref.upgrade()) else {
            return;
        };
        let client = self.client.borrow().clone();
        let browser: Rc<dyn Browser> = this;
        let life_span = client.as_ref().and_then(|client| client.life_span_handler());
        if let Some(life_span) = life_span {
            life_span.do_close(&browser);
        }
        tracker.finish();
        if let Some(life_span) = life_span {
            life_span.on_before_close(&browser);
        }
    }
}

impl Browser for FakeBrowser {
    fn identifier(&self) -> BrowserId {
        self.id
    }

    fn main_frame(&self) -> Rc<dyn Frame> {
        Rc::clone(&self.frame) as Rc<dyn Frame>
    }

    fn close_browser(&self, force_close: bool) {
        if let Some(tracker) = &self.negotiated {
            if tracker.begin() {
                self.close_requests.borrow_mut().push(force_close);
            }
            return;
        }
        self.close_requests.borrow_mut().push(force_close);

        let client = self.client.borrow().clone();
        let this = self.self_ref.upgrade();
        if let (Some(client), Some(this)) = (client, this) {
            let browser: Rc<dyn Browser> = this;
            if let Some(life_span) = client.life_span_handler() {
                if !life_span.do_close(&browser) {
                    life_span.on_before_close(&browser);
                }
            }
        }
    }

    fn try_close_browser(&self) -> bool {
        self.try_close_calls.set(self.try_close_calls.get() + 1);
        match &self.negotiated {
            Some(tracker) => tracker.try_close(|| self.close_browser(false)),
            None => self.try_close_result.get(),
        }
    }

    fn window_handle(&self) -> Option<NativeWindow> {
        self.handle
    }

    fn browser_view(&self) -> Option<Rc<dyn BrowserView>> {
        self.view
            .borrow()
            .upgrade()
            .map(|view| view as Rc<dyn BrowserView>)
    }
}

pub struct FakeBrowserView {
    pub browser: RefCell<Option<Rc<FakeBrowser>>>,
    pub window: RefCell<Weak<FakeWindow>>,
    pub client: Option<Rc<dyn Client>>,
    pub url: String,
    pub delegate: Option<Rc<dyn BrowserViewDelegate>>,
}

impl FakeBrowserView {
    pub fn with_browser(browser: &Rc<FakeBrowser>) -> Rc<Self> {
        let view = Rc::new(Self {
            browser: RefCell::new(Some(Rc::clone(browser))),
            window: RefCell::new(Weak::new()),
            client: None,
            url: String::new(),
            delegate: None,
        });
        *browser.view.borrow_mut() = Rc::downgrade(&view);
        view
    }

    pub fn empty() -> Rc<Self> {
        Rc::new(Self {
            browser: RefCell::new(None),
            window: RefCell::new(Weak::new()),
            client: None,
            url: String::new(),
            delegate: None,
        })
    }

    pub fn as_dyn(self: &Rc<Self>) -> Rc<dyn BrowserView> {
        Rc::clone(self) as Rc<dyn BrowserView>
    }
}

impl BrowserView for FakeBrowserView {
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

#[derive(Default)]
pub struct FakeWindow {
    pub title: RefCell<String>,
    pub show_calls: Cell<usize>,
    pub closed: Cell<bool>,
    pub children: RefCell<Vec<Rc<dyn BrowserView>>>,
    pub self_ref: RefCell<Weak<FakeWindow>>,
}

impl FakeWindow {
    pub fn new() -> Rc<Self> {
        let window = Rc::new(Self::default());
        *window.self_ref.borrow_mut() = Rc::downgrade(&window);
        window
    }

    pub fn as_dyn(self: &Rc<Self>) -> Rc<dyn Window> {
        Rc::clone(self) as Rc<dyn Window>
    }
}

impl Window for FakeWindow {
    fn set_title(&self, title: &str) {
        *self.title.borrow_mut() = title.to_string();
    }

    fn show(&self) {
        self.show_calls.set(self.show_calls.get() + 1);
    }

    fn close(&self) {
        self.closed.set(true);
    }

    fn add_child_view(&self, view: Rc<dyn BrowserView>) {
        if let Some(fake) = view.as_any().downcast_ref::<FakeBrowserView>() {
            *fake.window.borrow_mut() = self.self_ref.borrow().clone();
        }
        self.children.borrow_mut().push(view);
    }
}

pub struct CreatedWindow {
    pub window: Rc<FakeWindow>,
    pub delegate: Box<dyn WindowDelegate>,
}

pub struct CreatedNativeBrowser {
    pub window_info: WindowInfo,
    pub url: String,
    pub browser: Rc<FakeBrowser>,
}

/// Engine double: records what the shell asks for and reports browser
/// creation to the client the way a real engine would.
#[derive(Default)]
pub struct FakeEngine {
    pub next_id: Cell<BrowserId>,
    pub views: RefCell<Vec<Rc<FakeBrowserView>>>,
    pub windows: RefCell<Vec<CreatedWindow>>,
    pub native_browsers: RefCell<Vec<CreatedNativeBrowser>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            ..Self::default()
        }
    }

    fn allocate_id(&self) -> BrowserId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl Engine for FakeEngine {
    fn create_browser_view(
        &self,
        client: Rc<dyn Client>,
        url: &str,
        delegate: Rc<dyn BrowserViewDelegate>,
    ) -> Result<Rc<dyn BrowserView>> {
        let browser = FakeBrowser::new(self.allocate_id());
        let view = Rc::new(FakeBrowserView {
            browser: RefCell::new(Some(Rc::clone(&browser))),
            window: RefCell::new(Weak::new()),
            client: Some(Rc::clone(&client)),
            url: url.to_string(),
            delegate: Some(delegate),
        });
        *browser.view.borrow_mut() = Rc::downgrade(&view);

        if let Some(life_span) = client.life_span_handler() {
            life_span.on_after_created(browser.as_dyn());
        }

        self.views.borrow_mut().push(Rc::clone(&view));
        Ok(view.as_dyn())
    }

    fn create_top_level_window(&self, delegate: Box<dyn WindowDelegate>) -> Result<Rc<dyn Window>> {
        let window = FakeWindow::new();
        let window_dyn = window.as_dyn();
        delegate.on_window_created(&window_dyn);
        self.windows.borrow_mut().push(CreatedWindow { window, delegate });
        Ok(window_dyn)
    }

    fn create_browser(
        &self,
        window_info: WindowInfo,
        client: Rc<dyn Client>,
        url: &str,
    ) -> Result<()> {
        let id = self.allocate_id();
        let browser = FakeBrowser::native(id);
        if let Some(life_span) = client.life_span_handler() {
            life_span.on_after_created(browser.as_dyn());
        }
        self.native_browsers.borrow_mut().push(CreatedNativeBrowser {
            window_info,
            url: url.to_string(),
            browser,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingLoop {
    pub quits: Cell<usize>,
}

impl MessageLoop for CountingLoop {
    fn quit(&self) {
        self.quits.set(self.quits.get() + 1);
    }
}

/// Native helpers that only record what they were asked to do.
#[derive(Clone, Default)]
pub struct RecordingOps {
    pub calls: Rc<RefCell<Vec<String>>>,
}

impl NativeWindowOps for RecordingOps {
    fn set_title(&self, window: NativeWindow, title: &str) -> std::result::Result<(), PlatformError> {
        self.calls
            .borrow_mut()
            .push(format!("title {:?} {}", window.window, title));
        Ok(())
    }

    fn show_and_focus(&self, window: NativeWindow) -> std::result::Result<(), PlatformError> {
        self.calls.borrow_mut().push(format!("show {:?}", window.window));
        Ok(())
    }
}

pub struct Harness {
    pub handler: Rc<SimpleHandler>,
    pub message_loop: Rc<CountingLoop>,
    pub ops: RecordingOps,
    pub runner: UiTaskRunner<SimpleHandler>,
}

impl Harness {
    pub fn new(use_views: bool) -> Self {
        let message_loop = Rc::new(CountingLoop::default());
        let ops = RecordingOps::default();
        let runner = UiTaskRunner::new();
        let handler = Rc::new(SimpleHandler::new(
            use_views,
            Box::new(ops.clone()),
            Rc::clone(&message_loop) as Rc<dyn MessageLoop>,
            runner.clone(),
        ));
        Self {
            handler,
            message_loop,
            ops,
            runner,
        }
    }

    pub fn client(&self) -> Rc<dyn Client> {
        Rc::clone(&self.handler) as Rc<dyn Client>
    }

    pub fn quits(&self) -> usize {
        self.message_loop.quits.get()
    }
}
