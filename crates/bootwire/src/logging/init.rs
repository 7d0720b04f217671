use std::sync::{Mutex, Once, OnceLock, PoisonError};

use thiserror::Error;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

use crate::logging::config::{LogFormat, LoggingConfiguration};

type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type FormatLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Errors raised while installing or reconfiguring logging
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{directives}': {message}")]
    InvalidFilter { directives: String, message: String },

    #[error("A global logging subscriber is already installed: {message}")]
    AlreadyInstalled { message: String },

    #[error("Failed to reconfigure logging: {message}")]
    Reload { message: String },
}

static LOGGING: OnceLock<Logging> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());
static PANIC_HOOK: Once = Once::new();

/// Handle to the process-wide logging subscriber
pub struct Logging {
    filter: reload::Handle<EnvFilter, Registry>,
    format: reload::Handle<FormatLayer, FilteredRegistry>,
}

impl std::fmt::Debug for Logging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logging").finish_non_exhaustive()
    }
}

impl Logging {
    /// Install the global subscriber. Later calls return the same handle.
    ///
    /// Until [`Logging::configure`] runs, the filter comes from `RUST_LOG`,
    /// falling back to `info`.
    pub fn initialize() -> Result<&'static Logging, LoggingError> {
        let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(logging) = LOGGING.get() {
            return Ok(logging);
        }

        let logging = Self::install()?;
        Ok(LOGGING.get_or_init(|| logging))
    }

    fn install() -> Result<Logging, LoggingError> {
        let initial = LoggingConfiguration::default();
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => parse_filter(&initial.directives())?,
        };

        let (filter_layer, filter) = reload::Layer::new(filter);
        let (format_layer, format) = reload::Layer::new(format_layer(&initial));

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(format_layer)
            .try_init()
            .map_err(|error| LoggingError::AlreadyInstalled {
                message: error.to_string(),
            })?;

        tracing::debug!(target: "bootwire::logging", "Logging initialized");
        Ok(Logging { filter, format })
    }

    /// Apply `config`: replaces the level filter and the output format
    pub fn configure(&self, config: &LoggingConfiguration) -> Result<(), LoggingError> {
        let filter = parse_filter(&config.directives())?;
        self.filter.reload(filter).map_err(|error| LoggingError::Reload {
            message: error.to_string(),
        })?;
        self.format
            .reload(format_layer(config))
            .map_err(|error| LoggingError::Reload {
                message: error.to_string(),
            })?;

        tracing::debug!(
            target: "bootwire::logging",
            "Logging configured (filter: {}, format: {:?})",
            config.directives(),
            config.format
        );
        Ok(())
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|error| LoggingError::InvalidFilter {
        directives: directives.to_string(),
        message: error.to_string(),
    })
}

fn format_layer(config: &LoggingConfiguration) -> FormatLayer {
    let layer = fmt::layer()
        .with_file(config.include_location)
        .with_line_number(config.include_location);
    match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Log every panic, with the name of the panicking thread, before the
/// previously installed hook runs. Installed at most once per process.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let name = thread.name().unwrap_or("<unnamed>");
            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "Box<dyn Any>".to_string());
            let location = info
                .location()
                .map(|location| format!(" at {}:{}", location.file(), location.line()))
                .unwrap_or_default();

            tracing::error!(thread = name, "Uncaught panic in thread {}: {}{}", name, message, location);
            previous(info);
        }));
    });
}
