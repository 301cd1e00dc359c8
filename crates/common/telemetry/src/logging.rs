// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    env,
    io::IsTerminal,
    sync::{Mutex, Once, PoisonError},
};

use bon::Builder;
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Deserializer, Serialize, de};
use smart_default::SmartDefault;
use snafu::{ResultExt, Snafu};
use tracing::Subscriber;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter, layer::SubscriberExt, registry::LookupSpan,
};

/// Deserializes a string value, using `Default::default()` if the string is
/// empty.
///
/// # Errors
/// Returns an error if the non-empty string does not name a valid `T`.
pub fn empty_string_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Ok(T::default());
    }
    T::deserialize(de::value::StrDeserializer::new(&s))
        .map_err(|e: de::value::Error| de::Error::custom(format!("invalid value {s:?}: {e}")))
}

/// Log directory used when file logging is wanted but no directory is given.
pub const DEFAULT_LOGGING_DIR: &str = "logs";

const DEFAULT_LOG_TARGETS: &str = "info";

/// Handle for changing the level filter after initialisation.
///
/// Only set once [`init_global_logging`] has succeeded.
pub static RELOAD_HANDLE: OnceCell<tracing_subscriber::reload::Handle<filter::Targets, Registry>> =
    OnceCell::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Snafu)]
pub enum LoggingError {
    #[snafu(display("Failed to create rolling log file in {dir}"))]
    CreateAppender {
        dir:    String,
        source: tracing_appender::rolling::InitError,
    },

    #[snafu(display("Invalid log level filter {level:?}"))]
    ParseLevel {
        level:  String,
        source: filter::ParseError,
    },

    #[snafu(display("Failed to bridge `log` records: {message}"))]
    LogBridge { message: String },

    #[snafu(display("A global tracing subscriber is already installed"))]
    SetGlobal {
        source: tracing::subscriber::SetGlobalDefaultError,
    },
}

/// Where and how log records are written.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault, Builder)]
#[serde(default)]
pub struct LoggingOptions {
    /// Directory for hourly rolling log files. Empty disables file logging.
    #[default = ""]
    #[builder(into, default)]
    pub dir: String,

    /// Level filter such as `"info"` or `"info,diskq_queue=debug"`. Falls
    /// back to `RUST_LOG`, then `"info"`.
    #[builder(into)]
    pub level: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_default")]
    #[builder(default)]
    pub log_format: LogFormat,

    /// Rotated files kept per log stream.
    #[default = 720]
    #[builder(default = 720)]
    pub max_log_files: usize,

    #[default = true]
    #[builder(default = true)]
    pub append_stdout: bool,
}

#[derive(
    Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, Default, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per record, with the current span attached.
    Json,
    #[default]
    Text,
}

/// Boxes a fmt layer writing to `writer` in the configured format.
fn fmt_layer<S>(writer: NonBlocking, format: LogFormat, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    match format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Text => layer.boxed(),
    }
}

fn rolling_writer(
    opts: &LoggingOptions,
    prefix: &str,
    guards: &mut Vec<WorkerGuard>,
) -> Result<NonBlocking, LoggingError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(prefix)
        .max_log_files(opts.max_log_files)
        .build(&opts.dir)
        .context(CreateAppenderSnafu {
            dir: opts.dir.clone(),
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);
    Ok(writer)
}

/// Installs the global subscriber described by `opts`.
///
/// Layers, each behind one reloadable level filter:
/// - stdout, when `append_stdout` is set
/// - `<app_name>.*` hourly rolling files, when `dir` is set
/// - `<app_name>-err.*` rolling files holding `ERROR` records only
///
/// Records emitted through the `log` crate are bridged in. Only the first
/// call installs anything; later calls return no guards.
///
/// The returned guards flush the non-blocking writers on drop and must live
/// as long as logging is needed.
pub fn init_global_logging(
    app_name: &str,
    opts: &LoggingOptions,
) -> Result<Vec<WorkerGuard>, LoggingError> {
    static START: Once = Once::new();
    let mut result = Ok(Vec::new());
    START.call_once(|| result = install(app_name, opts));
    result
}

fn install(app_name: &str, opts: &LoggingOptions) -> Result<Vec<WorkerGuard>, LoggingError> {
    let mut guards = Vec::new();

    let stdout_layer = if opts.append_stdout {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);
        Some(fmt_layer(
            writer,
            opts.log_format,
            std::io::stdout().is_terminal(),
        ))
    } else {
        None
    };

    let (file_layer, err_file_layer) = if opts.dir.is_empty() {
        (None, None)
    } else {
        let writer = rolling_writer(opts, app_name, &mut guards)?;
        let err_writer = rolling_writer(opts, &format!("{app_name}-err"), &mut guards)?;
        (
            Some(fmt_layer(writer, opts.log_format, false)),
            Some(
                fmt_layer(err_writer, opts.log_format, false)
                    .with_filter(filter::LevelFilter::ERROR),
            ),
        )
    };

    let level = opts
        .level
        .clone()
        .or_else(|| env::var(EnvFilter::DEFAULT_ENV).ok())
        .unwrap_or_else(|| DEFAULT_LOG_TARGETS.to_string());
    let targets = level
        .parse::<filter::Targets>()
        .context(ParseLevelSnafu { level })?;
    let (dyn_filter, reload_handle) = tracing_subscriber::reload::Layer::new(targets);

    let subscriber = Registry::default()
        .with(dyn_filter)
        .with(stdout_layer)
        .with(file_layer)
        .with(err_file_layer);
    tracing::subscriber::set_global_default(subscriber).context(SetGlobalSnafu)?;

    LogTracer::init().map_err(|e| {
        LogBridgeSnafu {
            message: e.to_string(),
        }
        .build()
    })?;
    let _ = RELOAD_HANDLE.set(reload_handle);

    Ok(guards)
}

static GLOBAL_UT_LOG_GUARD: Lazy<Mutex<Option<Vec<WorkerGuard>>>> = Lazy::new(|| Mutex::new(None));

/// Logging for tests: debug level into `UNITTEST_LOG_DIR`
/// (`/tmp/__unittest_logs` by default), filter overridable through
/// `UNITTEST_LOG_LEVEL`. Safe to call from every test.
#[allow(clippy::print_stderr)]
pub fn init_default_ut_logging() {
    static START: Once = Once::new();

    START.call_once(|| {
        let dir =
            env::var("UNITTEST_LOG_DIR").unwrap_or_else(|_| "/tmp/__unittest_logs".to_string());
        let level = env::var("UNITTEST_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());

        let opts = LoggingOptions::builder()
            .dir(dir.clone())
            .level(level)
            .build();
        match init_global_logging("unittest", &opts) {
            Ok(guards) => {
                *GLOBAL_UT_LOG_GUARD
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(guards);
                tracing::info!("logs dir = {}", dir);
            }
            Err(e) => eprintln!("unit test logging disabled: {e}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = LoggingOptions::default();
        assert!(opts.dir.is_empty());
        assert_eq!(opts.level, None);
        assert_eq!(opts.log_format, LogFormat::Text);
        assert_eq!(opts.max_log_files, 720);
        assert!(opts.append_stdout);
    }

    #[test]
    fn test_builder_matches_default() {
        assert_eq!(LoggingOptions::builder().build(), LoggingOptions::default());
    }

    #[test]
    fn test_deserialize_empty_format_as_default() {
        let opts: LoggingOptions =
            serde_json::from_str(r#"{"dir":"/var/log/diskq","log_format":""}"#).unwrap();
        assert_eq!(opts.dir, "/var/log/diskq");
        assert_eq!(opts.log_format, LogFormat::Text);

        let opts: LoggingOptions = serde_json::from_str(r#"{"log_format":"json"}"#).unwrap();
        assert_eq!(opts.log_format, LogFormat::Json);
    }
}
