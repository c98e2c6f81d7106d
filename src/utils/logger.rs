//! 日志模块
//!
//! 初始化时安装rat_logger终端输出，`dissector_*!` 宏再按本库的级别过滤转发。
//! 未初始化全局日志器时，所有日志宏都不输出。

use once_cell::sync::OnceCell;
use rat_logger::handler::term::TermConfig;
use rat_logger::LevelFilter;

#[doc(hidden)]
pub use rat_logger;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// 错误
    Error,
    /// 警告
    Warn,
    /// 信息
    Info,
    /// 调试
    Debug,
    /// 跟踪
    Trace,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// rat_logger 终端处理器
    Terminal,
    /// 不安装处理器，宏全部静默
    None,
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 是否启用日志
    pub enabled: bool,
    /// 最低输出级别
    pub level: LogLevel,
    /// 终端输出是否带颜色
    pub color: bool,
    /// 输出目标
    pub target: LogTarget,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            color: true,
            target: LogTarget::Terminal,
        }
    }
}

impl LoggerConfig {
    /// 完全静默
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            target: LogTarget::None,
            ..Default::default()
        }
    }

    /// 开发环境：输出到调试级别
    pub fn development() -> Self {
        Self::default().with_level(LogLevel::Debug)
    }

    /// 生产环境：信息级别，无颜色
    pub fn production() -> Self {
        Self {
            color: false,
            ..Default::default()
        }
    }

    /// 设置级别
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// 设置输出目标
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// 是否需要安装输出处理器
    pub fn is_active(&self) -> bool {
        self.enabled && self.target != LogTarget::None
    }
}

/// 日志器
#[derive(Debug)]
pub struct Logger {
    config: LoggerConfig,
}

impl Logger {
    /// 创建新的日志器
    pub fn new(config: LoggerConfig) -> Self {
        Self { config }
    }

    /// 获取配置
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// 检查是否启用了指定级别的日志
    pub fn is_enabled(&self, level: &LogLevel) -> bool {
        self.config.is_active() && *level <= self.config.level
    }
}

static GLOBAL_LOGGER: OnceCell<Logger> = OnceCell::new();

/// 初始化全局日志器
///
/// 启用的配置会先安装rat_logger终端处理器，安装失败则不记录配置。
/// 只有第一次成功的调用生效，返回是否由本次调用完成初始化。
pub fn init_logger(config: LoggerConfig) -> bool {
    if GLOBAL_LOGGER.get().is_some() {
        return false;
    }
    if config.is_active() {
        let installed = rat_logger::LoggerBuilder::new()
            .with_level(config.level.filter())
            .add_terminal_with_config(TermConfig {
                enable_color: config.color,
                ..TermConfig::default()
            })
            .init_global_logger();
        if installed.is_err() {
            return false;
        }
    }
    GLOBAL_LOGGER.set(Logger::new(config)).is_ok()
}

/// 获取全局日志器
pub fn get_logger() -> Option<&'static Logger> {
    GLOBAL_LOGGER.get()
}

/// 按级别过滤后转发到rat_logger
#[doc(hidden)]
#[macro_export]
macro_rules! __dissector_log {
    ($level:ident, $emit:ident, $($arg:tt)*) => {
        if let Some(logger) = $crate::utils::logger::get_logger() {
            if logger.is_enabled(&$crate::utils::logger::LogLevel::$level) {
                $crate::utils::logger::rat_logger::$emit!($($arg)*);
            }
        }
    };
}

/// 错误日志
#[macro_export]
macro_rules! dissector_error {
    ($($arg:tt)*) => { $crate::__dissector_log!(Error, error, $($arg)*) };
}

/// 警告日志
#[macro_export]
macro_rules! dissector_warn {
    ($($arg:tt)*) => { $crate::__dissector_log!(Warn, warn, $($arg)*) };
}

/// 信息日志
#[macro_export]
macro_rules! dissector_info {
    ($($arg:tt)*) => { $crate::__dissector_log!(Info, info, $($arg)*) };
}

/// 调试日志
#[macro_export]
macro_rules! dissector_debug {
    ($($arg:tt)*) => { $crate::__dissector_log!(Debug, debug, $($arg)*) };
}

/// 跟踪日志
#[macro_export]
macro_rules! dissector_trace {
    ($($arg:tt)*) => { $crate::__dissector_log!(Trace, trace, $($arg)*) };
}
