//! 命令行入口
//!
//! 读取 HTML 文件，整页翻译后输出；可选在翻译后立即还原，用于检查还原是否完整。

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::Parser;
use encoding_rs::Encoding;
use tracing_subscriber::EnvFilter;

use inline_translator::env::{self as translator_env, EnvVar};
use inline_translator::parsers::html::NoLayout;
use inline_translator::translation::{
    create_provider, generate_example_config, ConfigManager, FileSettingsStore,
    MemorySettingsStore, ProviderKind, Settings, SettingsStore, TranslationError,
    TranslationResult, TranslatorConfig, TranslatorSession,
};
use inline_translator::Document;

#[derive(Parser, Debug)]
#[command(
    name = "inline-translator",
    version,
    about = "Translate an HTML page in place and keep the original text on hover"
)]
struct Cli {
    /// HTML file to translate ("-" reads stdin)
    #[arg(required_unless_present_any = ["init_config", "env_docs"])]
    input: Option<String>,

    /// Target language [default: from configuration]
    #[arg(short, long)]
    lang: Option<String>,

    /// Translation backend: stub, claude, libre
    #[arg(short, long)]
    provider: Option<ProviderKind>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User settings file (credential, model, show original)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Do not attach original-text overlays
    #[arg(long)]
    no_original: bool,

    /// Restore the original text after translating
    #[arg(short, long)]
    restore: bool,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,

    /// Print the supported environment variables and exit
    #[arg(long)]
    env_docs: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}

fn init_logging() {
    let level = translator_env::core::LogLevel::get().unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> TranslationResult<()> {
    if cli.env_docs {
        print!("{}", translator_env::generate_env_docs());
        return Ok(());
    }
    if let Some(path) = &cli.init_config {
        return generate_example_config(path);
    }

    let mut translator_settings = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?.into_settings(),
        None => ConfigManager::new()?.into_settings(),
    };
    if let Some(kind) = cli.provider {
        translator_settings.provider.kind = kind;
    }

    let user_settings = load_user_settings(&cli).await;
    if translator_settings.provider.model.is_none() {
        translator_settings.provider.model = user_settings.model_name.clone();
    }
    let credential = translator_env::provider::ApiKey::get()
        .ok()
        .or_else(|| user_settings.credential.clone());

    let provider = create_provider(&translator_settings.provider, credential)?;
    let lang = cli
        .lang
        .clone()
        .unwrap_or_else(|| translator_settings.default_target_lang.clone());

    let (document, encoding) = read_document(cli.input.as_deref().unwrap_or("-"))?;
    let config = TranslatorConfig::new(provider, translator_settings);
    let session = TranslatorSession::with_environment(
        document,
        config,
        Rc::new(MemorySettingsStore::new(user_settings)),
        Rc::new(NoLayout),
    );
    session.reload_config().await?;

    let report = session.translate_page(&lang).await?;
    tracing::info!("{}", report.summary());
    if report.failed_batches > 0 {
        tracing::warn!("{} 个批次翻译失败", report.failed_batches);
    }

    if cli.restore {
        session.restore_original();
    }

    // 输出前执行所有待处理的延时任务（例如错误提示的自动消失）
    session.run_due_timers(Instant::now() + Duration::from_secs(60));

    let output = session.document().serialize_with_encoding(&encoding);
    match &cli.output {
        Some(path) => fs::write(path, output)?,
        None => io::stdout().write_all(&output)?,
    }
    Ok(())
}

async fn load_user_settings(cli: &Cli) -> Settings {
    let store = match &cli.settings {
        Some(path) => FileSettingsStore::new(path),
        None => FileSettingsStore::default_location(),
    };
    let mut settings = match store.load().await {
        Ok(settings) => settings,
        Err(error) => {
            tracing::warn!("读取用户设置失败，使用默认设置: {}", error);
            Settings::default()
        }
    };

    if translator_env::translation::ShowOriginal::is_set() {
        match translator_env::translation::ShowOriginal::get() {
            Ok(show_original) => settings.show_original = show_original,
            Err(error) => tracing::warn!("忽略无效的环境变量: {}", error),
        }
    }
    if cli.no_original {
        settings.show_original = false;
    }
    settings
}

/// 读取并解码输入；页面声明了其他字符集时按该字符集重新解析
fn read_document(input: &str) -> TranslationResult<(Document, String)> {
    let data = if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(input).map_err(|e| {
            TranslationError::InvalidInput(format!("cannot read {}: {}", input, e))
        })?
    };

    let mut encoding = "utf-8".to_string();
    let mut document = Document::parse_bytes(&data, &encoding)?;
    if let Some(charset) = document.charset() {
        if let Some(declared) = Encoding::for_label_no_replacement(charset.as_bytes()) {
            if declared != encoding_rs::UTF_8 {
                tracing::debug!("按页面声明的字符集重新解析: {}", declared.name());
                encoding = declared.name().to_string();
                document = Document::parse_bytes(&data, &encoding)?;
            }
        }
    }
    Ok((document, encoding))
}
