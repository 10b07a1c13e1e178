//! 配置加载器。
//!
//! 只获取一次可选的配置文档，将其合并到
//! [`ModelConfig::default`] 之上，获取结束后置位就绪标志。
//! 任何失败都保留默认值。

use log::{debug, info, warn};
use serde_yaml::Value;

use crate::config::ModelConfig;
use crate::error::ConfigError;
use crate::fetch::Location;
use crate::merge::deep_merge;
use crate::pending::{Pending, Settled};

pub const DEFAULT_CONFIG_LOCATION: &str = "models/metabot.yaml";

/// 解析 `document` 并合并到默认值之上
pub fn resolve(document: &str) -> Result<ModelConfig, ConfigError> {
    let overlay: Value = serde_yaml::from_str(document)?;
    let mut merged = serde_yaml::to_value(ModelConfig::default())?;
    deep_merge(&mut merged, &overlay);
    Ok(serde_yaml::from_value(merged)?)
}

fn fetch_and_resolve(location: &Location) -> Result<ModelConfig, ConfigError> {
    let text = location.fetch_text()?;
    resolve(&text)
}

fn settle(location: &Location, outcome: Result<ModelConfig, ConfigError>) -> ModelConfig {
    match outcome {
        Ok(config) => {
            info!("loaded configuration from {location}");
            config
        }
        Err(ConfigError::Fetch(err)) => {
            info!("no configuration document ({err}); using defaults");
            ModelConfig::default()
        }
        Err(err) => {
            warn!("ignoring configuration at {location}: {err}");
            ModelConfig::default()
        }
    }
}

/// 阻塞版本的加载器，不会失败
pub fn load_config(location: &Location) -> ModelConfig {
    settle(location, fetch_and_resolve(location))
}

/// 异步加载器，在一次挂载期间由场景宿主持有
pub struct ConfigLoader {
    location: Location,
    config: ModelConfig,
    ready: bool,
    pending: Option<Pending<Result<ModelConfig, ConfigError>>>,
}

impl ConfigLoader {
    /// 在工作线程上发起唯一一次获取
    pub fn spawn(location: Location) -> Self {
        let target = location.clone();
        let pending = Pending::spawn("config-loader", move || fetch_and_resolve(&target));
        let mut loader = Self {
            location,
            config: ModelConfig::default(),
            ready: false,
            pending: None,
        };
        match pending {
            Ok(pending) => loader.pending = Some(pending),
            Err(err) => {
                warn!("could not start configuration fetch: {err}");
                loader.ready = true;
            }
        }
        loader
    }

    /// 已就绪且结果为 `config` 的加载器
    pub fn resolved(config: ModelConfig) -> Self {
        Self {
            location: Location::file(DEFAULT_CONFIG_LOCATION),
            config,
            ready: true,
            pending: None,
        }
    }

    /// 检查进行中的获取，返回就绪标志
    pub fn poll(&mut self) -> bool {
        if self.ready {
            return true;
        }
        let Some(pending) = self.pending.as_mut() else {
            return self.ready;
        };
        if let Some(settled) = pending.try_take() {
            self.finish(settled);
        }
        self.ready
    }

    /// 阻塞直到获取结束
    pub fn wait(&mut self) -> bool {
        if let Some(pending) = self.pending.take() {
            let settled = pending.wait();
            self.finish(settled);
        }
        self.ready
    }

    fn finish(&mut self, settled: Settled<Result<ModelConfig, ConfigError>>) {
        let outcome = match settled {
            Settled::Done(outcome) => outcome,
            Settled::Lost => Err(ConfigError::WorkerLost),
        };
        self.config = settle(&self.location, outcome);
        self.pending = None;
        self.ready = true;
        debug!("configuration ready");
    }

    /// 当前配置以及是否已是最终结果
    pub fn load(&self) -> (&ModelConfig, bool) {
        (&self.config, self.ready)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}
