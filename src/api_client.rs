use crate::backend::{SegmentBackend, TranscriptMap};
use crate::config::{BackendConfig, DiarizeConfig};
use crate::error::EditorError;
use crate::types::{AtomicSegment, DiarizeSummary, ExportGroup, ExportSummary, FileId, TrimSummary};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// バックエンドの共通レスポンス形式
///
/// ```json
/// { "success": true, "data": { ... } }
/// { "success": false, "error": "file not found" }
/// ```
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Serialize)]
struct ExportRequest<'a> {
    groups: &'a [ExportGroup],
}

#[derive(Serialize)]
struct TrimRequest {
    start: f64,
    end: f64,
}

#[derive(Serialize)]
struct TranscriptsRequest<'a> {
    transcripts: &'a TranscriptMap,
}

/// レスポンス本文をエンベロープとして解釈
///
/// エラーステータスでも本文がエンベロープならその内容に従う。
/// エンベロープでない場合、エラーステータスなら拒否、成功ステータスなら形式不正とする。
pub fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, EditorError> {
    match serde_json::from_str::<ApiEnvelope<T>>(body) {
        Ok(envelope) if envelope.success => Ok(envelope.data),
        Ok(envelope) => Err(EditorError::Rejected(
            envelope
                .error
                .unwrap_or_else(|| format!("HTTP {}", status)),
        )),
        Err(_) if !(200..300).contains(&status) => Err(EditorError::Rejected(format!(
            "HTTP {}: {}",
            status,
            body.trim()
        ))),
        Err(e) => Err(EditorError::InvalidResponse(e.to_string())),
    }
}

fn require<T>(data: Option<T>, what: &str) -> Result<T, EditorError> {
    data.ok_or_else(|| EditorError::InvalidResponse(format!("{} のレスポンスに data がありません", what)))
}

/// HTTP経由のバックエンドクライアント
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    diarize: DiarizeConfig,
    /// ファイルIDごとのキャッシュ回避トークン
    cache_bust: Mutex<HashMap<FileId, i64>>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, diarize: &DiarizeConfig) -> Result<Self, EditorError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            diarize: diarize.clone(),
            cache_bust: Mutex::new(HashMap::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 話者分離のURL（話者数の指定があればクエリに付ける）
    pub fn diarize_url(&self, file_id: FileId) -> String {
        let mut url = self.url(&format!("/api/files/{}/diarize", file_id));
        let params: Vec<String> = [
            ("min_speakers", self.diarize.min_speakers),
            ("max_speakers", self.diarize.max_speakers),
        ]
        .iter()
        .filter_map(|(name, value)| value.map(|v| format!("{}={}", name, v)))
        .collect();
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    /// 音声のURL（トリム後はトークンを付けてキャッシュを回避する）
    pub fn audio_url(&self, file_id: FileId) -> String {
        let url = self.url(&format!("/api/audio/{}", file_id));
        let token = self
            .cache_bust
            .lock()
            .ok()
            .and_then(|map| map.get(&file_id).copied());
        match token {
            Some(t) => format!("{}?t={}", url, t),
            None => url,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, EditorError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_envelope(status, &body)
    }
}

#[async_trait]
impl SegmentBackend for HttpBackend {
    async fn diarize(&self, file_id: FileId) -> Result<DiarizeSummary, EditorError> {
        log::info!("話者分離を要求: ファイル {}", file_id);
        let data = self.send(self.client.post(self.diarize_url(file_id))).await?;
        require(data, "diarize")
    }

    async fn load_segments(&self, file_id: FileId) -> Result<Vec<AtomicSegment>, EditorError> {
        let url = self.url(&format!("/api/files/{}/segments", file_id));
        let data: Option<Vec<AtomicSegment>> = self.send(self.client.get(url)).await?;
        Ok(data.unwrap_or_default())
    }

    async fn export_groups(
        &self,
        file_id: FileId,
        groups: &[ExportGroup],
    ) -> Result<ExportSummary, EditorError> {
        log::info!("エクスポートを要求: ファイル {}, {} グループ", file_id, groups.len());
        let url = self.url(&format!("/api/files/{}/segments/export", file_id));
        let data = self
            .send(self.client.post(url).json(&ExportRequest { groups }))
            .await?;
        require(data, "export")
    }

    async fn trim(&self, file_id: FileId, start: f64, end: f64) -> Result<TrimSummary, EditorError> {
        log::info!("トリムを要求: ファイル {}, {:.3}〜{:.3}秒", file_id, start, end);
        let url = self.url(&format!("/api/files/{}/trim", file_id));
        let data = self
            .send(self.client.post(url).json(&TrimRequest { start, end }))
            .await?;
        require(data, "trim")
    }

    async fn save_transcripts(
        &self,
        file_id: FileId,
        transcripts: &TranscriptMap,
    ) -> Result<(), EditorError> {
        let url = self.url(&format!("/api/files/{}/segments/transcripts", file_id));
        let _: Option<serde_json::Value> = self
            .send(self.client.put(url).json(&TranscriptsRequest { transcripts }))
            .await?;
        Ok(())
    }

    async fn apply_to_original(&self, file_id: FileId) -> Result<(), EditorError> {
        let url = self.url(&format!("/api/files/{}/segments/apply", file_id));
        let _: Option<serde_json::Value> = self.send(self.client.post(url)).await?;
        Ok(())
    }

    async fn fetch_audio(&self, file_id: FileId) -> Result<Vec<u8>, EditorError> {
        let url = self.audio_url(file_id);
        log::debug!("音声を取得: {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(EditorError::Rejected(format!(
                "音声の取得に失敗: HTTP {}",
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    fn invalidate_audio(&self, file_id: FileId) {
        let token = chrono::Utc::now().timestamp_millis();
        if let Ok(mut map) = self.cache_bust.lock() {
            // 同一ミリ秒内の連続無効化でもURLが変わるようにする
            let next = match map.get(&file_id) {
                Some(&prev) if prev >= token => prev + 1,
                _ => token,
            };
            map.insert(file_id, next);
        }
    }
}
