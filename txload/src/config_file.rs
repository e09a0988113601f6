use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use txload_core::runner::{RunConfig, WaitTime};
use txload_core::transactions::{DriverOptions, ScriptVariant, TaskWeights};

use crate::cli::RunArgs;

/// Run settings read from `--config`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub host: Option<String>,
    pub variant: Option<ScriptVariant>,
    pub users: Option<u64>,
    pub spawn_rate: Option<f64>,
    pub duration: Option<YamlDuration>,
    pub iterations: Option<u64>,
    pub wait_min: Option<YamlDuration>,
    pub wait_max: Option<YamlDuration>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub bootstrap_below: Option<usize>,
    pub weights: Option<TaskWeights>,
    pub seed: Option<u64>,
    pub timeout: Option<YamlDuration>,
    pub max_failure_ratio: Option<f64>,
}

/// Humantime string such as `30s` or `1m 30s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(s.trim())
            .map(Self)
            .map_err(|err| serde::de::Error::custom(format!("invalid duration '{s}': {err}")))
    }
}

impl FileConfig {
    pub(crate) async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }

    pub(crate) fn parse(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Everything a run needs, after merging flags over file over defaults.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedRun {
    pub run: RunConfig,
    pub driver: DriverOptions,
    pub max_failure_ratio: Option<f64>,
}

pub(crate) fn resolve(args: &RunArgs, file: FileConfig) -> anyhow::Result<ResolvedRun> {
    let host = args
        .host
        .clone()
        .or(file.host)
        .context("missing --host (or `host` in the config file)")?;

    let variant = args.variant.or(file.variant).unwrap_or_default();
    let mut driver = DriverOptions::for_variant(variant);
    if let Some(page) = args.page.or(file.page) {
        driver.page = page;
    }
    if let Some(size) = args.size.or(file.size) {
        driver.size = size;
    }
    if let Some(n) = args.bootstrap_below.or(file.bootstrap_below) {
        driver.bootstrap_below = n;
    }
    driver.weights = merge_weights(args, file.weights.unwrap_or_default());

    let defaults = RunConfig::default();
    let wait_time = match (
        args.wait_min.or(file.wait_min.map(YamlDuration::into_inner)),
        args.wait_max.or(file.wait_max.map(YamlDuration::into_inner)),
    ) {
        (None, None) => defaults.wait_time,
        (min, max) => {
            let (default_min, default_max) = match defaults.wait_time {
                WaitTime::Between { min, max } => (min, max),
                WaitTime::Constant(d) => (d, d),
            };
            let min = min.unwrap_or(default_min);
            // A lone `wait_min` above the default max means a fixed pause.
            let max = max.unwrap_or(default_max.max(min));
            WaitTime::between(min, max).context("invalid wait time")?
        }
    };

    let run = RunConfig {
        host,
        users: args.users.or(file.users).unwrap_or(defaults.users),
        spawn_rate: args.spawn_rate.or(file.spawn_rate),
        duration: args
            .duration
            .or(file.duration.map(YamlDuration::into_inner)),
        iterations: args.iterations.or(file.iterations),
        wait_time,
        timeout: args.timeout.or(file.timeout.map(YamlDuration::into_inner)),
        seed: args.seed.or(file.seed),
    };

    let max_failure_ratio = args.max_failure_ratio.or(file.max_failure_ratio);
    if let Some(ratio) = max_failure_ratio
        && !(0.0..=1.0).contains(&ratio)
    {
        anyhow::bail!("max_failure_ratio must be within 0..=1 (got {ratio})");
    }

    Ok(ResolvedRun {
        run,
        driver,
        max_failure_ratio,
    })
}

fn merge_weights(args: &RunArgs, base: TaskWeights) -> TaskWeights {
    TaskWeights {
        list: args.weight_list.unwrap_or(base.list),
        create: args.weight_create.unwrap_or(base.create),
        update: args.weight_update.unwrap_or(base.update),
        delete: args.weight_delete.unwrap_or(base.delete),
        get: args.weight_get.unwrap_or(base.get),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn args_with_host() -> RunArgs {
        RunArgs {
            host: Some("http://127.0.0.1:8080".to_string()),
            ..RunArgs::default()
        }
    }

    #[test]
    fn defaults_apply_without_file() -> anyhow::Result<()> {
        let r = resolve(&args_with_host(), FileConfig::default())?;
        assert_eq!(r.driver, DriverOptions::default());
        assert_eq!(r.run.users, 1);
        assert_eq!(r.run.iterations, None);
        assert_eq!(r.run.duration, None);
        assert_eq!(r.max_failure_ratio, None);
        assert!(matches!(r.run.wait_time, WaitTime::Between { .. }));
        Ok(())
    }

    #[test]
    fn cli_beats_file_beats_default() -> anyhow::Result<()> {
        let file = FileConfig::parse(
            "host: http://file:9000\nvariant: v1\nusers: 8\nduration: 1m\nsize: 25\nweights:\n  create: 9\n  get: 0\n",
        )?;
        let args = RunArgs {
            users: Some(3),
            weight_get: Some(4),
            ..args_with_host()
        };

        let r = resolve(&args, file)?;
        assert_eq!(r.run.host, "http://127.0.0.1:8080");
        assert_eq!(r.run.users, 3);
        assert_eq!(r.run.duration, Some(Duration::from_secs(60)));
        assert_eq!(r.driver.variant, ScriptVariant::Basic);
        assert_eq!(r.driver.page, 0);
        assert_eq!(r.driver.size, 25);
        assert_eq!(r.driver.weights.create, 9);
        assert_eq!(r.driver.weights.get, 4);
        assert_eq!(r.driver.weights.list, 2);
        Ok(())
    }

    #[test]
    fn host_may_come_from_file_only() -> anyhow::Result<()> {
        let file = FileConfig::parse("host: http://file:9000\n")?;
        let r = resolve(&RunArgs::default(), file)?;
        assert_eq!(r.run.host, "http://file:9000");
        Ok(())
    }

    #[test]
    fn missing_host_is_an_error() {
        assert!(resolve(&RunArgs::default(), FileConfig::default()).is_err());
    }

    #[test]
    fn wait_bounds_merge_with_defaults() -> anyhow::Result<()> {
        let args = RunArgs {
            wait_min: Some(Duration::ZERO),
            wait_max: Some(Duration::ZERO),
            ..args_with_host()
        };
        let r = resolve(&args, FileConfig::default())?;
        assert_eq!(
            r.run.wait_time,
            WaitTime::Between {
                min: Duration::ZERO,
                max: Duration::ZERO
            }
        );

        let args = RunArgs {
            wait_min: Some(Duration::from_secs(10)),
            ..args_with_host()
        };
        let r = resolve(&args, FileConfig::default())?;
        assert_eq!(
            r.run.wait_time,
            WaitTime::Between {
                min: Duration::from_secs(10),
                max: Duration::from_secs(10)
            }
        );

        let args = RunArgs {
            wait_min: Some(Duration::from_secs(3)),
            wait_max: Some(Duration::from_secs(1)),
            ..args_with_host()
        };
        assert!(resolve(&args, FileConfig::default()).is_err());
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse("hosts: http://x\n").is_err());
        assert!(FileConfig::parse("weights:\n  lists: 1\n").is_err());
        assert!(FileConfig::parse("duration: soon\n").is_err());
    }

    #[tokio::test]
    async fn load_reads_yaml_file() -> anyhow::Result<()> {
        let mut f = tempfile::NamedTempFile::new()?;
        writeln!(
            f,
            "host: http://127.0.0.1:1\niterations: 50\nwait_min: 0s\nwait_max: 250ms\ntimeout: 2s\nmax_failure_ratio: 0.5"
        )?;

        let cfg = FileConfig::load(f.path()).await?;
        assert_eq!(cfg.iterations, Some(50));
        assert_eq!(cfg.timeout, Some(YamlDuration(Duration::from_secs(2))));
        assert_eq!(cfg.max_failure_ratio, Some(0.5));

        let missing = FileConfig::load(Path::new("/definitely/not/here.yaml")).await;
        assert!(missing.is_err());
        Ok(())
    }
}
