use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::models::stage::StageKind;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处于活跃阶段的条目上限
    pub max_concurrent_entries: usize,
    /// 抓取阶段超时（秒）
    pub scrape_timeout_secs: u64,
    /// 路演材料解析阶段超时（秒）
    pub parse_timeout_secs: u64,
    /// 竞品分析阶段超时（秒）
    pub analyze_timeout_secs: u64,
    /// 失败条目重新提交的轮数（0 表示不重提）
    pub retry_failed_rounds: usize,
    /// 输入 TOML 文件存放目录
    pub input_folder: String,
    /// 报告输出目录
    pub report_folder: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 失败条目记录文件
    pub failure_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 外部服务配置 ---
    pub scrape_api_url: String,
    pub deck_parser_api_url: String,
    pub competitor_api_url: String,
    pub service_api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_entries: 3,
            scrape_timeout_secs: 30,
            parse_timeout_secs: 30,
            analyze_timeout_secs: 60,
            retry_failed_rounds: 0,
            input_folder: "input_toml".to_string(),
            report_folder: "reports".to_string(),
            output_log_file: "output.txt".to_string(),
            failure_file: "failures.txt".to_string(),
            verbose_logging: false,
            scrape_api_url: "http://localhost:8787/api/scrape".to_string(),
            deck_parser_api_url: "http://localhost:8787/api/parse-deck".to_string(),
            competitor_api_url: "http://localhost:8787/api/analyze-competitors".to_string(),
            service_api_key: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_entries: env_parse("MAX_CONCURRENT_ENTRIES", default.max_concurrent_entries),
            scrape_timeout_secs: env_parse("SCRAPE_TIMEOUT_SECS", default.scrape_timeout_secs),
            parse_timeout_secs: env_parse("PARSE_TIMEOUT_SECS", default.parse_timeout_secs),
            analyze_timeout_secs: env_parse("ANALYZE_TIMEOUT_SECS", default.analyze_timeout_secs),
            retry_failed_rounds: env_parse("RETRY_FAILED_ROUNDS", default.retry_failed_rounds),
            input_folder: std::env::var("INPUT_FOLDER").unwrap_or(default.input_folder),
            report_folder: std::env::var("REPORT_FOLDER").unwrap_or(default.report_folder),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            failure_file: std::env::var("FAILURE_FILE").unwrap_or(default.failure_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
            scrape_api_url: std::env::var("SCRAPE_API_URL").unwrap_or(default.scrape_api_url),
            deck_parser_api_url: std::env::var("DECK_PARSER_API_URL").unwrap_or(default.deck_parser_api_url),
            competitor_api_url: std::env::var("COMPETITOR_API_URL").unwrap_or(default.competitor_api_url),
            service_api_key: std::env::var("SERVICE_API_KEY").unwrap_or(default.service_api_key),
        }
    }

    /// 各阶段超时设置
    pub fn stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts {
            scrape: Duration::from_secs(self.scrape_timeout_secs),
            parse_deck: Duration::from_secs(self.parse_timeout_secs),
            analyze: Duration::from_secs(self.analyze_timeout_secs),
        }
    }
}

/// 每个阶段独立的超时时间
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTimeouts {
    pub scrape: Duration,
    pub parse_deck: Duration,
    pub analyze: Duration,
}

impl StageTimeouts {
    /// 取某个阶段的超时
    pub fn for_stage(&self, stage: StageKind) -> Duration {
        match stage {
            StageKind::Scrape => self.scrape,
            StageKind::ParseDeck => self.parse_deck,
            StageKind::Analyze => self.analyze,
        }
    }

    /// 所有阶段使用同一个超时
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            scrape: timeout,
            parse_deck: timeout,
            analyze: timeout,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Config::default().stage_timeouts()
    }
}

/// 读取并解析环境变量；未设置时使用默认值，解析失败时警告后使用默认值
fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    let Ok(raw) = std::env::var(name) else {
        return default;
    };
    match parse_env_value(name, &raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ {}，使用默认值", e);
            default
        }
    }
}

fn parse_env_value<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: name.to_string(),
            value: raw.to_string(),
            expected_type: std::any::type_name::<T>().to_string(),
        })
}
