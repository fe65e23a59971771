use crate::error::EditorError;
use crate::types::{AtomicSegment, DiarizeSummary, ExportGroup, ExportSummary, FileId, SegmentId, TrimSummary};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// セグメントIDごとの文字起こし
pub type TranscriptMap = BTreeMap<SegmentId, String>;

/// エディタが利用するバックエンドAPIの共通トレイト
///
/// 永続化・話者分離・音声の切り出しはすべてバックエンドの責務。
/// 呼び出しはタイムアウトもリトライもせず、失敗はそのまま返す。
#[async_trait]
pub trait SegmentBackend: Send + Sync {
    /// 話者分離を実行（既存のセグメントは置き換えられる）
    async fn diarize(&self, file_id: FileId) -> Result<DiarizeSummary, EditorError>;

    /// セグメント一覧を時刻順で取得
    async fn load_segments(&self, file_id: FileId) -> Result<Vec<AtomicSegment>, EditorError>;

    /// グループごとに新しい音声ファイルを作成
    async fn export_groups(
        &self,
        file_id: FileId,
        groups: &[ExportGroup],
    ) -> Result<ExportSummary, EditorError>;

    /// 元の音声ファイルを指定区間で置き換える（元に戻せない）
    async fn trim(&self, file_id: FileId, start: f64, end: f64) -> Result<TrimSummary, EditorError>;

    /// セグメント単位の文字起こしを保存
    async fn save_transcripts(
        &self,
        file_id: FileId,
        transcripts: &TranscriptMap,
    ) -> Result<(), EditorError>;

    /// セグメントの文字起こしを元ファイルの文字起こしにまとめる
    async fn apply_to_original(&self, file_id: FileId) -> Result<(), EditorError>;

    /// 音声ファイルの生データを取得
    async fn fetch_audio(&self, file_id: FileId) -> Result<Vec<u8>, EditorError>;

    /// 音声のキャッシュを無効化（次回の取得で必ず再ダウンロードさせる）
    fn invalidate_audio(&self, file_id: FileId);
}
