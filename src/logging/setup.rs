//! One-shot wiring of configuration into active sinks.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use logroller::{Compression, LogRoller, LogRollerBuilder, Rotation, RotationSize, TimeZone};

use super::config::LogConfig;
use super::level::Level;
use super::logger::Logger;
use super::retention::{self, RetentionManager, RETENTION_INTERVAL};
use super::sink::{Output, Sink, SinkFormat};
use crate::fields;

/// The process logging system: root logger plus the optional retention
/// manager. Owned by the composition root; every logger derived from the
/// root keeps the sink alive.
pub struct LogSystem {
    root: Logger,
    retention: Option<Arc<RetentionManager>>,
}

impl LogSystem {
    /// The root logger; derive children from it with [`Logger::child`].
    pub fn root(&self) -> &Logger {
        &self.root
    }

    /// The running retention manager, when a size cap was configured.
    pub fn retention(&self) -> Option<&Arc<RetentionManager>> {
        self.retention.as_ref()
    }

    /// Stop the retention manager, if one is running, and flush the sink.
    pub async fn shutdown(&self) {
        if let Some(retention) = &self.retention {
            retention.stop().await;
        }
        self.root.flush();
    }
}

/// Wire `config` into an active logging system rooted at `data_dir`.
///
/// This operation never fails: validation errors and filesystem errors
/// degrade to the console-only default with one line on stderr. Must be
/// called within a tokio runtime when a size cap is configured.
pub fn init(data_dir: &Path, config: &LogConfig) -> LogSystem {
    if let Err(err) = config.validate() {
        eprintln!("invalid logging configuration, continuing with defaults: {err}");
    }
    let level = config.level.parse().unwrap_or(Level::Info);

    if config.log_file.is_empty() {
        return console_only(level);
    }

    let log_dir = data_dir.join("log");
    if let Err(err) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "failed to create log directory {}: {err}",
            log_dir.display()
        );
        return console_only(level);
    }

    let roller = match build_roller(&log_dir, config) {
        Ok(roller) => roller,
        Err(err) => {
            eprintln!(
                "failed to open rotating log file {}: {err}",
                log_dir.join(&config.log_file).display()
            );
            return console_only(level);
        }
    };

    let file_format = if config.json_format {
        SinkFormat::Json
    } else {
        SinkFormat::Plain
    };
    let mut outputs = vec![Output::new(file_format, Box::new(roller))];
    if config.console {
        outputs.push(Output::new(SinkFormat::Terminal, Box::new(io::stdout())));
    }
    let root = Logger::new(Arc::new(Sink::new(outputs)), level);

    if config.max_age > 0 {
        let pruned = retention::prune_expired(&log_dir, config.max_age);
        if pruned > 0 {
            root.info("Pruned expired log files", &fields! { "count" => pruned });
        }
    }

    let mut manager = None;
    if config.total_size_cap > 0 {
        let retention = Arc::new(RetentionManager::new(
            log_dir.clone(),
            config.total_size_cap,
            RETENTION_INTERVAL,
            root.child(fields! { "component" => "retention" }),
        ));
        retention.start();
        manager = Some(retention);
    }

    root.info(
        "Logging configured",
        &fields! {
            "file" => log_dir.join(&config.log_file).display().to_string(),
            "level" => level.as_str(),
            "format" => if config.json_format { "json" } else { "text" },
            "rotate_mb" => config.max_size,
            "backups" => config.max_backups,
            "compress" => config.compress,
            "size_cap" => config.total_size_cap,
        },
    );

    LogSystem {
        root,
        retention: manager,
    }
}

fn console_only(level: Level) -> LogSystem {
    LogSystem {
        root: Logger::new(Arc::new(Sink::console()), level),
        retention: None,
    }
}

fn build_roller(log_dir: &Path, config: &LogConfig) -> anyhow::Result<LogRoller> {
    // Best-effort default when validation already flagged a zero size.
    let size_mb = if config.max_size > 0 {
        config.max_size
    } else {
        super::config::default_max_size()
    };
    let mut builder = LogRollerBuilder::new(log_dir, Path::new(&config.log_file))
        .rotation(Rotation::SizeBased(RotationSize::MB(size_mb)));
    if config.max_backups > 0 {
        builder = builder.max_keep_files(config.max_backups);
    }
    if config.compress {
        builder = builder.compression(Compression::Gzip);
    }
    if config.local_time {
        builder = builder.time_zone(TimeZone::Local);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn file_config(name: &str) -> LogConfig {
        LogConfig {
            log_file: name.to_string(),
            console: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn test_no_log_file_yields_console_only() {
        let data_dir = TempDir::new().unwrap();
        let system = init(data_dir.path(), &LogConfig::default());

        assert!(system.retention().is_none());
        assert_eq!(system.root().level(), Level::Info);
        // Branch A never touches the data directory.
        assert!(!data_dir.path().join("log").exists());
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let data_dir = TempDir::new().unwrap();
        let config = LogConfig {
            level: "loud".to_string(),
            ..LogConfig::default()
        };
        let system = init(data_dir.path(), &config);
        assert_eq!(system.root().level(), Level::Info);
    }

    #[test]
    fn test_level_is_resolved_from_config() {
        let data_dir = TempDir::new().unwrap();
        let config = LogConfig {
            level: "debug".to_string(),
            ..LogConfig::default()
        };
        let system = init(data_dir.path(), &config);
        assert_eq!(system.root().level(), Level::Debug);
    }

    #[test]
    fn test_file_branch_writes_to_live_file() {
        let data_dir = TempDir::new().unwrap();
        let system = init(data_dir.path(), &file_config("node.log"));

        system.root().info("file branch online", &fields! { "n" => 1 });

        let live = data_dir.path().join("log").join("node.log");
        let content = fs::read_to_string(&live).unwrap();
        assert!(content.contains("msg=\"Logging configured\""));
        assert!(content.contains("msg=\"file branch online\""));
        assert!(content.contains("n=1"));
    }

    #[test]
    fn test_json_format_flag_switches_file_formatter() {
        let data_dir = TempDir::new().unwrap();
        let mut config = file_config("node.log");
        config.json_format = true;
        let system = init(data_dir.path(), &config);

        system.root().info("structured", &[]);

        let live = data_dir.path().join("log").join("node.log");
        let content = fs::read_to_string(&live).unwrap();
        let line = content.lines().last().unwrap();
        assert!(line.starts_with('{'));
        assert!(line.contains("\"msg\":\"structured\""));
    }

    #[test]
    fn test_unwritable_log_dir_falls_back_to_console() {
        let data_dir = TempDir::new().unwrap();
        // A file where the log directory should go makes create_dir_all fail.
        File::create(data_dir.path().join("log")).unwrap();

        let system = init(data_dir.path(), &file_config("node.log"));
        assert!(system.retention().is_none());
    }

    #[tokio::test]
    async fn test_size_cap_starts_retention() {
        let data_dir = TempDir::new().unwrap();
        let mut config = file_config("node.log");
        config.total_size_cap = 1 << 20;

        let system = init(data_dir.path(), &config);
        let retention = system.retention().expect("retention manager configured");
        assert!(retention.is_running());

        system.shutdown().await;
        assert!(!retention.is_running());
    }

    #[test]
    fn test_zero_cap_does_not_start_retention() {
        let data_dir = TempDir::new().unwrap();
        let system = init(data_dir.path(), &file_config("node.log"));
        assert!(system.retention().is_none());
    }

    #[test]
    fn test_max_age_prunes_at_init() {
        let data_dir = TempDir::new().unwrap();
        let log_dir = data_dir.path().join("log");
        fs::create_dir_all(&log_dir).unwrap();
        let stale = log_dir.join("node-2020-01-01.log");
        let mut file = File::create(&stale).unwrap();
        file.write_all(b"stale").unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(30 * 24 * 60 * 60))
            .unwrap();
        drop(file);

        let mut config = file_config("node.log");
        config.max_age = 7;
        let _system = init(data_dir.path(), &config);

        assert!(!stale.exists());
    }
}
