//! Application-level startup: decides how the first browser is hosted.

use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tracing::info;

use crate::config::ShellConfig;
use crate::core::thread::UiTaskRunner;
use crate::core::{Client, Engine, MessageLoop, WindowInfo};
use crate::handler::SimpleHandler;
use crate::platform::{self, NativeWindowOps};
use crate::views::{SimpleBrowserViewDelegate, SimpleWindowDelegate};
use crate::{Result, ShellError};

pub const APP_TITLE: &str = "Browser Shell";

pub struct SimpleApp {
    config: ShellConfig,
    handler: OnceCell<Rc<SimpleHandler>>,
}

impl SimpleApp {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            handler: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Called once on the UI thread after the engine is ready. Creates the
    /// process-wide handler and the first browser.
    pub fn on_context_initialized(
        &self,
        engine: &dyn Engine,
        message_loop: Rc<dyn MessageLoop>,
        runner: UiTaskRunner<SimpleHandler>,
    ) -> Result<()> {
        self.initialize_with(engine, message_loop, runner, platform::native_window_ops())
    }

    /// Same as [`SimpleApp::on_context_initialized`] with explicit native
    /// window helpers.
    pub fn initialize_with(
        &self,
        engine: &dyn Engine,
        message_loop: Rc<dyn MessageLoop>,
        runner: UiTaskRunner<SimpleHandler>,
        native: Box<dyn NativeWindowOps>,
    ) -> Result<()> {
        if self.handler.get().is_some() {
            return Err(ShellError::HandlerAlreadyCreated);
        }

        let config = &self.config;
        let use_views = config.use_views();
        let handler = Rc::new(SimpleHandler::new(use_views, native, message_loop, runner));
        self.handler
            .set(Rc::clone(&handler))
            .map_err(|_| ShellError::HandlerAlreadyCreated)?;

        info!(
            "Opening {} ({}, {:?} style)",
            config.url,
            if use_views { "views" } else { "native window" },
            config.runtime_style
        );

        let client: Rc<dyn Client> = handler;
        if use_views {
            let view = engine.create_browser_view(
                client,
                &config.url,
                Rc::new(SimpleBrowserViewDelegate::new(config.runtime_style)),
            )?;
            engine.create_top_level_window(Box::new(SimpleWindowDelegate::new(
                view,
                config.runtime_style,
                config.initial_show_state,
            )))?;
        } else {
            let window_info = WindowInfo {
                title: APP_TITLE.to_string(),
                size: None,
                as_popup: cfg!(target_os = "windows"),
            };
            engine.create_browser(window_info, client, &config.url)?;
        }

        Ok(())
    }

    /// The process-wide handler, once the context has been initialized.
    pub fn handler(&self) -> Option<&Rc<SimpleHandler>> {
        self.handler.get()
    }

    /// Client used for browsers the engine creates on its own.
    pub fn default_client(&self) -> Option<Rc<dyn Client>> {
        self.handler
            .get()
            .map(|handler| Rc::clone(handler) as Rc<dyn Client>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use crate::config::CommandLine;
    use crate::core::{BrowserView, BrowserViewDelegate, Window, WindowDelegate};
    use crate::platform::UnsupportedWindowOps;
    use pretty_assertions::assert_eq;

    /// Hosts native browsers only; toolkit requests fail.
    #[derive(Default)]
    struct NativeOnlyEngine {
        view_requests: Cell<usize>,
        native: RefCell<Vec<(WindowInfo, String)>>,
    }

    impl Engine for NativeOnlyEngine {
        fn create_browser_view(
            &self,
            _client: Rc<dyn Client>,
            _url: &str,
            _delegate: Rc<dyn BrowserViewDelegate>,
        ) -> Result<Rc<dyn BrowserView>> {
            self.view_requests.set(self.view_requests.get() + 1);
            Err(ShellError::WindowCreation("no toolkit".to_string()))
        }

        fn create_top_level_window(
            &self,
            _delegate: Box<dyn WindowDelegate>,
        ) -> Result<Rc<dyn Window>> {
            Err(ShellError::WindowCreation("no toolkit".to_string()))
        }

        fn create_browser(
            &self,
            window_info: WindowInfo,
            _client: Rc<dyn Client>,
            url: &str,
        ) -> Result<()> {
            self.native.borrow_mut().push((window_info, url.to_string()));
            Ok(())
        }
    }

    struct IdleLoop;

    impl MessageLoop for IdleLoop {
        fn quit(&self) {}
    }

    fn app(args: &[&str]) -> SimpleApp {
        let mut argv = vec!["browser_shell"];
        argv.extend_from_slice(args);
        SimpleApp::new(ShellConfig::from_command_line(&CommandLine::from_args(argv)))
    }

    fn initialize(app: &SimpleApp, engine: &NativeOnlyEngine) -> Result<()> {
        app.initialize_with(
            engine,
            Rc::new(IdleLoop),
            UiTaskRunner::new(),
            Box::new(UnsupportedWindowOps),
        )
    }

    #[test]
    fn test_native_startup_runs_once() {
        let app = app(&["--use-native", "--url=https://example.com/"]);
        let engine = NativeOnlyEngine::default();

        initialize(&app, &engine).unwrap();
        assert!(matches!(
            initialize(&app, &engine),
            Err(ShellError::HandlerAlreadyCreated)
        ));

        let native = engine.native.borrow();
        assert_eq!(native.len(), 1);
        assert_eq!(native[0].0.title, APP_TITLE);
        assert_eq!(native[0].1, "https://example.com/");
        assert_eq!(engine.view_requests.get(), 0);
    }

    #[test]
    fn test_toolkit_failure_is_reported_after_handler_exists() {
        let app = app(&[]);
        let engine = NativeOnlyEngine::default();

        let result = initialize(&app, &engine);
        assert!(matches!(result, Err(ShellError::WindowCreation(_))));
        assert!(app.default_client().is_some());
        assert_eq!(engine.view_requests.get(), 1);
        assert!(engine.native.borrow().is_empty());
    }
}
