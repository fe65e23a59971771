use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub diarize: DiarizeConfig,
    #[serde(default)]
    pub waveform: WaveformConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// バックエンドAPI設定
///
/// # デフォルト値
///
/// - `base_url`: "http://localhost:8080"
/// - `timeout_seconds`: なし（タイムアウトしない）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

/// 話者分離リクエストの設定
///
/// 省略時は話者数をバックエンドに推定させる。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiarizeConfig {
    pub min_speakers: Option<u32>,
    pub max_speakers: Option<u32>,
}

/// 波形表示の設定
///
/// # デフォルト値
///
/// - `width`: 700 px
/// - `height`: 100 px
/// - `handle_tolerance_px`: 8 px（ハンドルのヒット判定幅）
/// - `handle_width_px`: 6 px
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaveformConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_handle_tolerance_px")]
    pub handle_tolerance_px: f32,
    #[serde(default = "default_handle_width_px")]
    pub handle_width_px: f32,
}

/// 境界編集の設定
///
/// # デフォルト値
///
/// - `min_gap_seconds`: 0.1 秒（開始と終了の最小間隔）
/// - `fine_nudge_seconds`: 0.1 秒
/// - `coarse_nudge_seconds`: 0.5 秒
/// - `boundary_precision`: 0.01 秒（境界の丸め単位）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorConfig {
    #[serde(default = "default_min_gap_seconds")]
    pub min_gap_seconds: f64,
    #[serde(default = "default_fine_nudge_seconds")]
    pub fine_nudge_seconds: f64,
    #[serde(default = "default_coarse_nudge_seconds")]
    pub coarse_nudge_seconds: f64,
    #[serde(default = "default_boundary_precision")]
    pub boundary_precision: f64,
}

/// グループ再生の設定
///
/// `device` を省略するとシステムのデフォルト出力デバイスを使う。
/// 再生は `playback` フィーチャーを有効にしたビルドでのみ使える。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlaybackConfig {
    pub device: Option<String>,
}

/// 出力設定
///
/// # デフォルト値
///
/// - `log_level`: "info"
/// - `log_file`: "segment-editor.log"（TUI表示中のログ出力先）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_width() -> u32 {
    700
}

fn default_height() -> u32 {
    100
}

fn default_handle_tolerance_px() -> f32 {
    8.0
}

fn default_handle_width_px() -> f32 {
    6.0
}

fn default_min_gap_seconds() -> f64 {
    0.1
}

fn default_fine_nudge_seconds() -> f64 {
    0.1
}

fn default_coarse_nudge_seconds() -> f64 {
    0.5
}

fn default_boundary_precision() -> f64 {
    0.01 // センチ秒単位
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "segment-editor.log".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
        }
    }
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            handle_tolerance_px: default_handle_tolerance_px(),
            handle_width_px: default_handle_width_px(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_gap_seconds: default_min_gap_seconds(),
            fine_nudge_seconds: default_fine_nudge_seconds(),
            coarse_nudge_seconds: default_coarse_nudge_seconds(),
            boundary_precision: default_boundary_precision(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use segment_editor::config::Config;
    /// let config = Config::from_file("segment-editor.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    /// ファイルがない場合の警告はロガー初期化後に呼び出し側で出す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://localhost:8080");
        assert!(config.backend.timeout_seconds.is_none());
        assert_eq!(config.waveform.width, 700);
        assert_eq!(config.waveform.height, 100);
        assert_eq!(config.waveform.handle_tolerance_px, 8.0);
        assert_eq!(config.editor.min_gap_seconds, 0.1);
        assert_eq!(config.editor.coarse_nudge_seconds, 0.5);
        assert!(config.diarize.min_speakers.is_none());
    }

    #[test]
    fn test_write_and_read_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        Config::write_default(path).unwrap();

        let config = Config::from_file(path).unwrap();
        assert_eq!(config.waveform.width, 700);
        assert_eq!(config.output.log_level, "info");
    }

    #[test]
    fn test_custom_config() {
        let toml_content = r#"
[backend]
base_url = "http://labeler.local:9000"
timeout_seconds = 30

[diarize]
min_speakers = 1
max_speakers = 3

[waveform]
width = 1200
height = 160
handle_tolerance_px = 10.0

[editor]
min_gap_seconds = 0.2
fine_nudge_seconds = 0.05

[playback]
device = "USB Audio"

[output]
log_level = "debug"
log_file = "/tmp/editor.log"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.backend.base_url, "http://labeler.local:9000");
        assert_eq!(config.backend.timeout_seconds, Some(30));
        assert_eq!(config.diarize.min_speakers, Some(1));
        assert_eq!(config.diarize.max_speakers, Some(3));
        assert_eq!(config.waveform.width, 1200);
        assert_eq!(config.waveform.height, 160);
        assert_eq!(config.waveform.handle_tolerance_px, 10.0);
        assert_eq!(config.waveform.handle_width_px, 6.0);
        assert_eq!(config.editor.min_gap_seconds, 0.2);
        assert_eq!(config.editor.fine_nudge_seconds, 0.05);
        assert_eq!(config.editor.coarse_nudge_seconds, 0.5);
        assert_eq!(config.playback.device.as_deref(), Some("USB Audio"));
        assert_eq!(config.output.log_file, "/tmp/editor.log");
    }

    #[test]
    fn test_load_or_default_nonexistent() {
        let config = Config::load_or_default("nonexistent_file.toml").unwrap();
        assert_eq!(config.waveform.width, 700);
        assert!(config.playback.device.is_none());
    }

    #[test]
    fn test_partial_config() {
        // 一部の設定のみ記述した場合、残りはデフォルト値が使われる
        let toml_content = r#"
[waveform]
height = 80
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.waveform.height, 80);
        assert_eq!(config.waveform.width, 700);
        assert_eq!(config.backend.base_url, "http://localhost:8080");
        assert_eq!(config.editor.boundary_precision, 0.01);
    }
}
