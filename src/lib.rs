//! segment-editor - 話者分離済み音声クリップのセグメント境界エディタ
//!
//! 文字起こしデータセット作成のレビュー用ツール。
//! クリップを話者ごとのセグメントに分け、波形上で境界を調整し、
//! グループ単位で新しい音声ファイルとして書き出す。
//!
//! # 主な機能
//!
//! - **話者分離**: バックエンドの話者分離を実行してセグメントを読み込み
//! - **境界調整**: 波形上のドラッグ、または 0.1秒 / 0.5秒 単位の微調整
//! - **結合・分割**: 連続するセグメントをグループにまとめる
//! - **エクスポート・トリム**: グループごとの音声書き出し、元ファイルの切り詰め
//! - **文字起こし**: グループ単位で入力し、セグメント単位で保存
//! - **再生**: 調整後の区間でグループを試聴（`playback` フィーチャー）
//!
//! # アーキテクチャ
//!
//! ```text
//! [Backend API] ←→ [HttpBackend] ←→ [SegmentEditor] ←→ [TuiApp]
//!                                         │
//!                        ┌────────────────┼────────────────┐
//!                        ↓                ↓                ↓
//!                  [Group Model]  [BoundaryController]  [WaveformRenderer]
//!                        │                                 │
//!                        ↓                                 ↓
//!                  [EditorView]                      [WaveformFrame]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use segment_editor::api_client::HttpBackend;
//! use segment_editor::audio_decode::DefaultDecoder;
//! use segment_editor::config::Config;
//! use segment_editor::editor::{EditorAction, SegmentEditor};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load_or_default("segment-editor.toml")?;
//! let backend = Arc::new(HttpBackend::new(&config.backend, &config.diarize)?);
//! let mut editor = SegmentEditor::new(42, &config, backend, Arc::new(DefaultDecoder));
//!
//! editor.run(EditorAction::LoadSegments).await?;
//! editor.merge_with_next(0)?;
//! editor.set_transcript(0, "こんにちは")?;
//! editor.run(EditorAction::SaveTranscripts).await?;
//! # Ok(())
//! # }
//! ```

pub mod api_client;
pub mod audio_decode;
pub mod backend;
pub mod boundary;
pub mod config;
pub mod editor;
pub mod error;
pub mod group;
pub mod playback;
pub mod tui;
pub mod types;
pub mod view_model;
pub mod waveform;
