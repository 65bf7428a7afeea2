use crate::scheduler::decoration_pool::WORKER_THREAD_PREFIX;
use color_eyre::owo_colors::{OwoColorize, Style};
use env_logger::Env;
use log::{Level, LevelFilter, Record};
use std::io::Write;
use std::path::Path;

fn filename_maybe(path: impl AsRef<Path>) -> Option<String> {
  path
    .as_ref()
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
}

fn get_file_line(record: &Record) -> String {
  let file = record.file().and_then(filename_maybe);
  match (file, record.line()) {
    (Some(file), None) => format!("{file}:",),
    (Some(file), Some(line)) => format!("{file}:{line:}:"),
    _ => String::new(),
  }
  .dimmed()
  .to_string()
}

fn log_level_str(record: &Record) -> String {
  let mut level_str = record.level().to_string();
  level_str.truncate(1);
  level_str
}

fn color_log_level(record: &Record) -> String {
  let level_str = match record.level() {
    Level::Error => log_level_str(record).red().to_string(),
    Level::Warn => log_level_str(record).yellow().to_string(),
    Level::Info => log_level_str(record).cyan().dimmed().to_string(),
    Level::Debug => log_level_str(record).green().dimmed().to_string(),
    Level::Trace => log_level_str(record).dimmed().to_string(),
  };
  format!("{:}{level_str}{:}", "[".dimmed(), "]".dimmed())
}

/// Environment variable with `env_logger` filter directives, e.g. `POGTREE_LOG=pogtree::indel=debug`. Directives
/// given there take precedence over the level passed to `setup_logger()`.
pub const LOG_ENV_VAR: &str = "POGTREE_LOG";

/// Short tag of the thread emitting a log record: `w<i>` for decoration pool workers, the thread name otherwise
fn thread_tag(name: Option<&str>) -> String {
  match name {
    Some(name) => match name.strip_prefix(WORKER_THREAD_PREFIX) {
      Some(index) => format!("w{index}"),
      None => name.to_owned(),
    },
    None => "?".to_owned(),
  }
}

/// Installs the console logger. Records are tagged with the emitting thread, so that messages of concurrent
/// decoration tasks can be told apart.
pub fn setup_logger(filter_level: LevelFilter) {
  env_logger::Builder::new()
    .filter_level(filter_level)
    .parse_env(Env::new().filter(LOG_ENV_VAR))
    .format(|buf, record| {
      let level = color_log_level(record);
      let thread = thread_tag(std::thread::current().name()).dimmed().to_string();
      let file_line = get_file_line(record);
      let args = record.args();
      writeln!(buf, "{level:} {thread} {file_line:} {args}")?;
      Ok(())
    })
    .try_init()
    .ok();
}

pub fn global_init() {
  color_eyre::config::HookBuilder::default()
    .theme(
      color_eyre::config::Theme::dark()
        .dependency_code(Style::new().dimmed())
        .file(Style::new().green())
        .line_number(Style::new().yellow())
        .panic_file(Style::new().green())
        .panic_line_number(Style::new().yellow())
        .panic_message(Style::new().bright_red().bold())
        .active_line(Style::new().cyan())
        .hidden_frames(Style::new().dimmed())
        .code_hash(Style::new().hidden()),
    )
    .panic_section(format!(
      "pogtree {} panicked. If you think it's a bug, consider reporting at: '{}/issues'",
      env!("CARGO_PKG_VERSION"),
      env!("CARGO_PKG_REPOSITORY"),
    ))
    .add_frame_filter(Box::new(|frames| {
      frames.retain(|frame| {
        let should_show_name = frame.name.as_ref().map_or(false, |name| {
          !HIDDEN_CRATE_NAME_PREFIXES
            .iter()
            .any(|&prefix| name.starts_with(prefix) || name.starts_with(&format!("<{prefix}")))
        });

        let should_show_file = !frame.filename.as_ref().map_or(false, |filename| {
          HIDDEN_CRATE_PATH_PREFIXES
            .iter()
            .any(|&prefix| filename.starts_with(prefix))
        });

        should_show_file && should_show_name
      });
    }))
    .install()
    .ok();
}

const HIDDEN_CRATE_NAME_PREFIXES: &[&str] = &[
  "__rust_try",
  "alloc::",
  "color_eyre::",
  "core::",
  "crossbeam::",
  "crossbeam_deque::",
  "eyre::",
  "rayon::",
  "rayon_core::",
  "rustc::",
  "std::",
];

const HIDDEN_CRATE_PATH_PREFIXES: &[&str] = &["/rustc/"];

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  #[rstest]
  #[case(Some("pogtree-worker-3"), "w3")]
  #[case(Some("pogtree-worker-12"), "w12")]
  #[case(Some("main"), "main")]
  #[case(None, "?")]
  fn test_thread_tag(#[case] name: Option<&str>, #[case] expected: &str) {
    assert_eq!(expected, thread_tag(name));
  }

  #[test]
  fn test_log_level_is_abbreviated() {
    let record = Record::builder().level(Level::Debug).build();
    assert_eq!("D", log_level_str(&record));
  }
}
