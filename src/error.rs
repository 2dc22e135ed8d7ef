use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 输入校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 程序不变量被破坏（属于缺陷，不是业务失败）
    #[error("不变量被破坏: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务拒绝了请求（4xx）
    #[error("API拒绝请求 ({endpoint}): status={status}, message={message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status:?}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: Option<u16>,
        message: Option<String>,
    },
    /// 请求超时
    #[error("API请求超时: {endpoint}")]
    Timeout { endpoint: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 输入校验错误
///
/// 在条目创建之前就被拒绝，永远不会进入状态机
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 提交列表为空
    #[error("提交的创业公司列表为空")]
    EmptyBatch,
    /// 缺少名称
    #[error("第 {index} 个输入缺少名称")]
    MissingName { index: usize },
    /// URL 无法解析
    #[error("第 {index} 个输入的 {field} 无效: {value}")]
    InvalidUrl {
        index: usize,
        field: &'static str,
        value: String,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 并发数非法
    #[error("并发数必须大于 0")]
    ZeroConcurrency,
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 程序不变量被破坏
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// 非法的状态迁移
    #[error("条目 {entry_id} 非法迁移: {from} -> {to}")]
    IllegalTransition {
        entry_id: String,
        from: String,
        to: String,
    },
    /// 条目被重复接纳
    #[error("条目 {entry_id} 被重复接纳")]
    AdmittedTwice { entry_id: String },
    /// 事件与编排器记录的状态不一致
    #[error("条目 {entry_id} 事件不一致: 记录状态 {recorded}, 事件起始状态 {reported}")]
    StaleEvent {
        entry_id: String,
        recorded: String,
        reported: String,
    },
    /// 运行结束时仍有未到达终态的条目
    #[error("运行结束但仍有 {pending} 个待处理、{active} 个进行中的条目")]
    UnfinishedEntries { pending: usize, active: usize },
    /// 条目任务异常退出
    #[error("条目任务异常退出: {0}")]
    TaskPanicked(String),
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建API超时错误
    pub fn api_timeout(endpoint: impl Into<String>) -> Self {
        AppError::Api(ApiError::Timeout {
            endpoint: endpoint.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
