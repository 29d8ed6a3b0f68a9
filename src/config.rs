//! Command-line switches and the immutable shell configuration derived from them.
//!
//! Switch syntax follows the engine's conventions: `--name` or `--name=value`
//! (a single leading dash is accepted too). Names are case-insensitive.
//! Everything after a bare `--` is treated as a positional argument.

use std::collections::HashMap;
use std::env;

use tracing::Level;

pub const SWITCH_USE_NATIVE: &str = "use-native";
pub const SWITCH_USE_ALLOY_STYLE: &str = "use-alloy-style";
pub const SWITCH_URL: &str = "url";
pub const SWITCH_INITIAL_SHOW_STATE: &str = "initial-show-state";
pub const SWITCH_DEBUG: &str = "debug";
pub const SWITCH_TRACE: &str = "trace";

pub const DEFAULT_URL: &str = "about:blank";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    program: Option<String>,
    switches: HashMap<String, String>,
    arguments: Vec<String>,
}

impl CommandLine {
    pub fn from_env() -> Self {
        Self::from_args(env::args())
    }

    /// Parses a full argument vector; the first element is the program name.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let mut command_line = Self {
            program: args.next(),
            ..Self::default()
        };

        let mut switches_done = false;
        for arg in args {
            if switches_done {
                command_line.arguments.push(arg);
                continue;
            }
            if arg == "--" {
                switches_done = true;
                continue;
            }

            let switch = arg
                .strip_prefix("--")
                .or_else(|| arg.strip_prefix('-'))
                .filter(|switch| !switch.is_empty());
            let Some(switch) = switch else {
                command_line.arguments.push(arg);
                continue;
            };

            let (name, value) = switch.split_once('=').unwrap_or((switch, ""));
            command_line
                .switches
                .insert(name.to_ascii_lowercase(), value.to_string());
        }

        command_line
    }

    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switches.contains_key(&name.to_ascii_lowercase())
    }

    /// Value of a switch, or an empty string when absent or valueless.
    pub fn switch_value(&self, name: &str) -> &str {
        self.switches
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

/// Initial display state of a toolkit window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

impl ShowState {
    /// Anything other than `minimized` or `maximized` means normal.
    pub fn from_switch(value: &str) -> Self {
        match value {
            "minimized" => ShowState::Minimized,
            "maximized" => ShowState::Maximized,
            _ => ShowState::Normal,
        }
    }
}

/// Rendering style requested for windows and browser views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RuntimeStyle {
    #[default]
    Chrome,
    Alloy,
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub use_native: bool,
    pub runtime_style: RuntimeStyle,
    pub initial_show_state: ShowState,
    pub url: String,
    pub log_level: Level,
}

impl ShellConfig {
    pub fn from_args() -> Self {
        Self::from_command_line(&CommandLine::from_env())
    }

    pub fn from_command_line(command_line: &CommandLine) -> Self {
        let runtime_style = if command_line.has_switch(SWITCH_USE_ALLOY_STYLE) {
            RuntimeStyle::Alloy
        } else {
            RuntimeStyle::Chrome
        };

        let url = match command_line.switch_value(SWITCH_URL) {
            "" => DEFAULT_URL.to_string(),
            url => url.to_string(),
        };

        let log_level = if command_line.has_switch(SWITCH_TRACE) {
            Level::TRACE
        } else if command_line.has_switch(SWITCH_DEBUG) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            use_native: command_line.has_switch(SWITCH_USE_NATIVE),
            runtime_style,
            initial_show_state: ShowState::from_switch(
                command_line.switch_value(SWITCH_INITIAL_SHOW_STATE),
            ),
            url,
            log_level,
        }
    }

    /// Toolkit-managed windows are used unless native mode was requested.
    pub fn use_views(&self) -> bool {
        !self.use_native
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            use_native: false,
            runtime_style: RuntimeStyle::Chrome,
            initial_show_state: ShowState::Normal,
            url: DEFAULT_URL.to_string(),
            log_level: Level::INFO,
        }
    }
}
