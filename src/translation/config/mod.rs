//! 翻译配置管理模块
//!
//! 提供引擎配置（文件、环境变量、默认值）和用户设置存储

pub mod manager;
pub mod settings;

// 重新导出主要类型
pub use manager::{ConfigManager, ProviderSettings, TranslatorConfig, TranslatorSettings};
pub use settings::{FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 批次处理相关
    pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;
    pub const DEFAULT_MIN_TEXT_LENGTH: usize = 1;
    pub const DEFAULT_TARGET_LANG: &str = "ja";

    // 可翻译属性
    pub const TRANSLATABLE_ATTRS: &[&str] = &["alt", "title", "aria-label"];

    // 不承载正文的元素
    pub const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "meta", "link"];

    // 分组使用的块级元素
    pub const BLOCK_LEVEL_TAGS: &[&str] = &[
        "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "dt", "dd", "td", "th", "caption",
        "blockquote", "figcaption", "div", "section", "article", "aside", "header", "footer",
        "nav", "main", "address", "pre", "legend", "summary", "label", "button", "option",
        "body",
    ];

    // 标记属性
    pub const ATTR_TRANSLATED: &str = "data-translated";
    pub const ATTR_TRANSLATING: &str = "data-translating";
    pub const ATTR_HANDLER_ADDED: &str = "data-tooltip-handler-added";
    pub const ATTR_ORIGINAL_TITLE: &str = "data-original-title";
    pub const ATTR_ORIGINAL_PREFIX: &str = "data-original-";

    // 浮层与提示条
    pub const CLASS_ORIGINAL_DISPLAY: &str = "translator-original-display";
    pub const CLASS_ORIGINAL_HEADER: &str = "translator-original-header";
    pub const CLASS_ORIGINAL_CONTENT: &str = "translator-original-content";
    pub const CLASS_PIN_ICON: &str = "translator-pin-icon";
    pub const CLASS_PINNED: &str = "pinned";
    pub const CLASS_POSITION_TOP: &str = "position-top";
    pub const CLASS_POSITION_BOTTOM: &str = "position-bottom";
    pub const INDICATOR_ID: &str = "translator-loading-indicator";
    pub const CLASS_INDICATOR: &str = "translator-loading-indicator";
    pub const CLASS_SPINNER: &str = "translator-loading-spinner";
    pub const CLASS_ERROR_MESSAGE: &str = "translator-error-message";
    pub const CLASS_ERROR: &str = "error";
    pub const LOADING_STYLES_ID: &str = "translator-loading-styles";
    pub const TOOLTIP_STYLES_ID: &str = "translator-tooltip-styles";

    // 计时
    pub const HOST_LEAVE_DELAY: Duration = Duration::from_millis(150);
    pub const OVERLAY_LEAVE_DELAY: Duration = Duration::from_millis(100);
    pub const ERROR_DISMISS_DELAY: Duration = Duration::from_secs(3);

    // 浮层定位
    pub const OVERLAY_MARGIN: f64 = 4.0;
    pub const OVERLAY_EDGE_PADDING: f64 = 20.0;
    pub const OVERLAY_MIN_HEIGHT: f64 = 100.0;

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "translator.toml",
        ".translator.toml",
        "translator.json",
        "~/.config/inline-translator/config.toml",
        "/etc/inline-translator/config.toml",
    ];

    // 设置文件默认位置
    pub const SETTINGS_PATH: &str = "~/.config/inline-translator/settings.json";
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}
