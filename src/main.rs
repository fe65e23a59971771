use anyhow::{bail, Context, Result};
use env_logger::Env;
use segment_editor::api_client::HttpBackend;
use segment_editor::audio_decode::DefaultDecoder;
use segment_editor::backend::SegmentBackend;
use segment_editor::config::{Config, OutputConfig};
use segment_editor::editor::{EditorAction, SegmentEditor};
use segment_editor::playback::open_output;
use segment_editor::tui::TuiApp;
use segment_editor::types::FileId;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "segment-editor.toml";

fn print_usage() {
    println!("使い方:");
    println!("  segment-editor <file_id> [config]              エディタを起動");
    println!("  segment-editor --segments <file_id> [config]   グループをJSON Linesで出力");
    println!("  segment-editor --diarize <file_id> [config]    話者分離を実行");
    println!("  segment-editor --generate-config [path]        設定ファイルを生成");
}

/// ロガーを初期化（TUI表示中はファイルに出力）
fn init_logger(output: &OutputConfig, to_file: bool) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(output.log_level.as_str()));
    builder
        .format_timestamp(None)
        .filter_module("hyper", log::LevelFilter::Warn)
        .filter_module("hyper_util", log::LevelFilter::Warn)
        .filter_module("reqwest", log::LevelFilter::Warn);

    if to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&output.log_file)
            .with_context(|| format!("ログファイルを開けません: {}", output.log_file))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn parse_file_id(arg: Option<&String>) -> Result<FileId> {
    let Some(arg) = arg else {
        bail!("ファイルIDを指定してください");
    };
    arg.parse()
        .with_context(|| format!("ファイルIDが不正です: {}", arg))
}

/// 1回だけ実行（続く操作は実行しない）
async fn run_once(editor: &mut SegmentEditor, action: EditorAction) -> Result<()> {
    let call = editor.start(action)?;
    let completion = editor.complete(call.execute().await)?;
    for notice in completion.notices {
        log::info!("{}", notice.message);
    }
    Ok(())
}

fn print_groups(editor: &SegmentEditor) -> Result<()> {
    for group in editor.export_snapshot() {
        let json = serde_json::to_string(&group).context("グループのシリアライズに失敗")?;
        println!("{}", json);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return Ok(());
    }

    // 設定ファイル生成モード
    if args[1] == "--generate-config" {
        let config_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    let (mode, file_arg, config_arg) = if args[1].starts_with("--") {
        (Some(args[1].as_str()), args.get(2), args.get(3))
    } else {
        (None, args.get(1), args.get(2))
    };

    let file_id = parse_file_id(file_arg)?;
    let config_path = config_arg.map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);

    // 設定を読み込み
    let config = Config::load_or_default(config_path)?;
    init_logger(&config.output, mode.is_none())?;

    if !Path::new(config_path).exists() {
        log::warn!("設定ファイルが見つかりません。デフォルト設定を使用します: {}", config_path);
    }
    log::info!("segment-editor を起動します");
    log::debug!("設定: {:?}", config);

    let backend: Arc<dyn SegmentBackend> = Arc::new(
        HttpBackend::new(&config.backend, &config.diarize)
            .context("HTTPクライアントの初期化に失敗")?,
    );
    let decoder = Arc::new(DefaultDecoder);

    match mode {
        Some("--segments") => {
            let mut editor = SegmentEditor::new(file_id, &config, backend, decoder);
            run_once(&mut editor, EditorAction::LoadSegments).await?;
            print_groups(&editor)?;
        }
        Some("--diarize") => {
            let mut editor = SegmentEditor::new(file_id, &config, backend, decoder);
            run_once(&mut editor, EditorAction::Diarize).await?;
            run_once(&mut editor, EditorAction::LoadSegments).await?;
            print_groups(&editor)?;
        }
        Some(other) => {
            print_usage();
            bail!("不明なオプションです: {}", other);
        }
        None => {
            let output = open_output(&config.playback);
            let mut app = TuiApp::new(file_id, config, backend, decoder, output);
            app.run().await?;
        }
    }

    log::info!("segment-editor を終了しました");

    Ok(())
}
