use crate::audio_decode::{AudioDecoder, DecodedAudio};
use crate::backend::{SegmentBackend, TranscriptMap};
use crate::boundary::{BoundaryController, RenderRequest};
use crate::config::{Config, EditorConfig};
use crate::error::EditorError;
use crate::group::{self, BoundaryLimits, Group};
use crate::playback::{AudioSink, PlaybackClip};
use crate::types::{
    format_time, ActiveDrag, AtomicSegment, DiarizeSummary, Edge, ExportGroup, ExportSummary,
    FileId, Seconds, TrimSummary,
};
use crate::view_model::{EditorView, GroupReadout};
use crate::waveform::{TimeAxis, WaveformFrame, WaveformPeaks, WaveformRenderer};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 通知の最大保持件数
const MAX_NOTICES: usize = 10;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// バックエンドを呼び出す操作
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorAction {
    /// 話者分離を実行して読み込み直す
    Diarize,
    LoadSegments,
    /// 音声を取得してデコード
    LoadAudio,
    /// グループごとに音声を書き出す（`force` で空の文字起こしを許可）
    Export { force: bool },
    /// 先頭グループの開始〜末尾グループの終了で元ファイルを切り詰める
    Trim,
    SaveTranscripts,
    /// 保存してから元ファイルに反映
    ApplyToOriginal,
}

impl EditorAction {
    /// 操作の種類（同じ種類は同時に1つしか実行しない）
    pub fn name(&self) -> &'static str {
        match self {
            EditorAction::Diarize => "diarize",
            EditorAction::LoadSegments => "load_segments",
            EditorAction::LoadAudio => "load_audio",
            EditorAction::Export { .. } => "export",
            EditorAction::Trim => "trim",
            EditorAction::SaveTranscripts => "save_transcripts",
            EditorAction::ApplyToOriginal => "apply_to_original",
        }
    }
}

/// 操作者への通知
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
    /// 一定時間で消してよい（通信失敗など）
    pub transient: bool,
    pub posted_at: Instant,
}

impl Notice {
    fn new(message: String, is_error: bool, transient: bool) -> Self {
        Self {
            message,
            is_error,
            transient,
            posted_at: Instant::now(),
        }
    }

    /// `now` の時点でまだ表示すべきか
    pub fn is_visible(&self, now: Instant, ttl: Duration) -> bool {
        !self.transient || now.saturating_duration_since(self.posted_at) < ttl
    }
}

/// 開いているクリップ1件分の編集状態
#[derive(Clone, Debug)]
pub struct EditorState {
    pub file_id: FileId,
    pub segments: Vec<AtomicSegment>,
    pub groups: Vec<Group>,
    pub audio: Option<DecodedAudio>,
    /// デコード済み音声の長さ（音声の取得前は最後のセグメントの終了時刻）
    pub total_duration: Seconds,
    pub active_drag: Option<ActiveDrag>,
}

impl EditorState {
    fn new(file_id: FileId) -> Self {
        Self {
            file_id,
            segments: Vec::new(),
            groups: Vec::new(),
            audio: None,
            total_duration: 0.0,
            active_drag: None,
        }
    }

    fn refresh_duration(&mut self) {
        let audio = self.audio.as_ref().map_or(0.0, DecodedAudio::duration);
        self.total_duration = if audio > 0.0 {
            audio
        } else {
            self.segments.iter().map(|s| s.end).fold(0.0, f64::max)
        };
    }
}

/// 分割位置の選択肢
#[derive(Clone, Debug, PartialEq)]
pub struct SplitChoice {
    /// [`SegmentEditor::split_group`] に渡す位置
    pub offset: usize,
    /// `<n>: M:SS.s - M:SS.s (SPEAKER)`
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SplitPrompt {
    pub group_index: usize,
    pub choices: Vec<SplitChoice>,
}

/// 操作完了時の結果
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub notices: Vec<Notice>,
    /// 続けて実行すべき操作
    pub follow_up: Option<EditorAction>,
    pub render: RenderRequest,
    /// 画面を閉じる（エクスポート・トリム後）
    pub close_view: bool,
    /// 別セッションの結果だったため無視した
    pub abandoned: bool,
}

impl Completion {
    fn new(render: RenderRequest) -> Self {
        Self {
            notices: Vec::new(),
            follow_up: None,
            render,
            close_view: false,
            abandoned: false,
        }
    }

    fn abandoned() -> Self {
        Self {
            abandoned: true,
            ..Self::new(RenderRequest::None)
        }
    }

    fn absorb(&mut self, other: Completion) {
        self.notices.extend(other.notices);
        self.close_view |= other.close_view;
        self.render = match (self.render, other.render) {
            (RenderRequest::Full, _) | (_, RenderRequest::Full) => RenderRequest::Full,
            (current, RenderRequest::None) => current,
            (_, next) => next,
        };
    }
}

enum CallRequest {
    Diarize,
    LoadSegments,
    LoadAudio,
    Export(Vec<ExportGroup>),
    Trim { start: Seconds, end: Seconds },
    Save { transcripts: TranscriptMap, groups: usize },
    Apply(TranscriptMap),
}

enum CallResponse {
    Diarized(DiarizeSummary),
    Segments(Vec<AtomicSegment>),
    Audio(DecodedAudio),
    Exported(ExportSummary),
    Trimmed(TrimSummary),
    Saved { groups: usize },
    Applied,
}

/// 実行待ちのバックエンド呼び出し
///
/// 必要なデータをすべて所有しているので、別タスクに渡して実行できる。
pub struct BackendCall {
    session: u64,
    file_id: FileId,
    action: EditorAction,
    request: CallRequest,
    backend: Arc<dyn SegmentBackend>,
    decoder: Arc<dyn AudioDecoder>,
}

/// バックエンド呼び出しの結果（[`SegmentEditor::complete`] に渡す）
pub struct CallResult {
    session: u64,
    action: EditorAction,
    outcome: Result<CallResponse, EditorError>,
}

impl CallResult {
    pub fn action(&self) -> EditorAction {
        self.action
    }
}

impl BackendCall {
    pub fn action(&self) -> EditorAction {
        self.action
    }

    pub async fn execute(self) -> CallResult {
        let BackendCall {
            session,
            file_id,
            action,
            request,
            backend,
            decoder,
        } = self;

        let outcome = match request {
            CallRequest::Diarize => backend.diarize(file_id).await.map(CallResponse::Diarized),
            CallRequest::LoadSegments => backend
                .load_segments(file_id)
                .await
                .map(CallResponse::Segments),
            CallRequest::LoadAudio => match backend.fetch_audio(file_id).await {
                Ok(bytes) => decoder.decode(&bytes).map(CallResponse::Audio),
                Err(e) => Err(e),
            },
            CallRequest::Export(groups) => backend
                .export_groups(file_id, &groups)
                .await
                .map(CallResponse::Exported),
            CallRequest::Trim { start, end } => {
                let result = backend.trim(file_id, start, end).await;
                if result.is_ok() {
                    // 元ファイルが置き換わったので古い音声を使わせない
                    backend.invalidate_audio(file_id);
                }
                result.map(CallResponse::Trimmed)
            }
            CallRequest::Save {
                transcripts,
                groups,
            } => backend
                .save_transcripts(file_id, &transcripts)
                .await
                .map(|_| CallResponse::Saved { groups }),
            CallRequest::Apply(transcripts) => {
                match backend.save_transcripts(file_id, &transcripts).await {
                    Ok(()) => backend
                        .apply_to_original(file_id)
                        .await
                        .map(|_| CallResponse::Applied),
                    Err(e) => Err(e),
                }
            }
        };

        CallResult {
            session,
            action,
            outcome,
        }
    }
}

/// セグメント境界エディタ
///
/// 1クリップ分の [`EditorState`] を所有し、描画・境界操作・バックエンド連携をまとめる。
///
/// バックエンド操作は3段階に分かれる:
///
/// ```text
/// start(action) ──→ BackendCall ──execute().await──→ CallResult ──→ complete(result)
///   (同期・検証)       (所有データ)     (非同期・spawn可)                 (同期・状態更新)
/// ```
///
/// 入力ループは `start` と `complete` だけを呼び、I/O を待たない。
/// 別セッション（閉じたエディタ）の結果は `complete` で無視される。
pub struct SegmentEditor {
    session: u64,
    state: EditorState,
    config: EditorConfig,
    renderer: WaveformRenderer,
    controller: BoundaryController,
    peaks: Option<WaveformPeaks>,
    frame: WaveformFrame,
    busy: HashSet<&'static str>,
    notices: VecDeque<Notice>,
    backend: Arc<dyn SegmentBackend>,
    decoder: Arc<dyn AudioDecoder>,
}

impl SegmentEditor {
    pub fn new(
        file_id: FileId,
        config: &Config,
        backend: Arc<dyn SegmentBackend>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Self {
        let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        let renderer = WaveformRenderer::from_config(&config.waveform);
        log::info!("エディタを開きます: ファイル {} (セッション {})", file_id, session);

        Self {
            session,
            state: EditorState::new(file_id),
            config: config.editor.clone(),
            frame: WaveformFrame::new(renderer.width(), renderer.height()),
            renderer,
            controller: BoundaryController::from_config(&config.waveform),
            peaks: None,
            busy: HashSet::new(),
            notices: VecDeque::new(),
            backend,
            decoder,
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn file_id(&self) -> FileId {
        self.state.file_id
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn groups(&self) -> &[Group] {
        &self.state.groups
    }

    pub fn total_duration(&self) -> Seconds {
        self.state.total_duration
    }

    pub fn is_busy(&self, action: EditorAction) -> bool {
        self.busy.contains(action.name())
    }

    /// 実行中の操作名
    pub fn busy_actions(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.busy.iter().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn notices(&self) -> &VecDeque<Notice> {
        &self.notices
    }

    /// 表示中の通知（期限切れの一時的な通知は表示しない）
    pub fn current_notice(&self, now: Instant, ttl: Duration) -> Option<&Notice> {
        self.notices.back().filter(|n| n.is_visible(now, ttl))
    }

    /// エラーを通知（通信失敗などは一時的な通知にする）
    pub fn push_error(&mut self, error: &EditorError) {
        self.push(Notice::new(error.to_string(), true, error.is_transient()));
    }

    /// 閉じたエディタの通知を引き継ぐ
    pub fn inherit_notices(&mut self, previous: &SegmentEditor) {
        for notice in &previous.notices {
            self.push(notice.clone());
        }
    }

    fn push(&mut self, notice: Notice) {
        self.notices.push_back(notice);
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    pub fn fine_step(&self) -> Seconds {
        self.config.fine_nudge_seconds
    }

    pub fn coarse_step(&self) -> Seconds {
        self.config.coarse_nudge_seconds
    }

    fn limits(&self) -> BoundaryLimits {
        BoundaryLimits::from_config(&self.config, self.state.total_duration)
    }

    fn axis(&self) -> TimeAxis {
        self.renderer.axis(self.state.total_duration)
    }

    fn group_index_error(&self, index: usize) -> EditorError {
        EditorError::Invariant(format!(
            "グループ {} は存在しません（全 {} グループ）",
            index + 1,
            self.state.groups.len()
        ))
    }

    fn inverted_error(&self, index: usize) -> EditorError {
        let group = &self.state.groups[index];
        EditorError::Invariant(format!(
            "G{} の開始 ({}) が終了 ({}) 以降です",
            index + 1,
            format_time(group.effective_start()),
            format_time(group.effective_end())
        ))
    }

    // ---- バックエンド操作 ----

    /// 操作を開始（検証して実行中にし、呼び出しを作る）
    ///
    /// # Errors
    ///
    /// * `Busy` - 同じ種類の操作が実行中
    /// * `EmptyTranscripts` - 文字起こしが空のグループがあり、`force` でない
    /// * `Invariant` - エクスポート・トリムするグループがない、または開始が終了以降のグループがある
    pub fn start(&mut self, action: EditorAction) -> Result<BackendCall, EditorError> {
        let name = action.name();
        if self.busy.contains(name) {
            return Err(EditorError::Busy(name));
        }

        let request = match action {
            EditorAction::Diarize => CallRequest::Diarize,
            EditorAction::LoadSegments => CallRequest::LoadSegments,
            EditorAction::LoadAudio => CallRequest::LoadAudio,
            EditorAction::Export { force } => {
                if self.state.groups.is_empty() {
                    return Err(EditorError::Invariant(
                        "エクスポートするグループがありません".to_string(),
                    ));
                }
                if let Some(index) = self.state.groups.iter().position(Group::is_inverted) {
                    return Err(self.inverted_error(index));
                }
                let blank = self.blank_transcripts();
                if blank > 0 && !force {
                    return Err(EditorError::EmptyTranscripts { count: blank });
                }
                CallRequest::Export(self.export_snapshot())
            }
            EditorAction::Trim => {
                let (start, end) = self.trim_range()?;
                CallRequest::Trim { start, end }
            }
            EditorAction::SaveTranscripts => CallRequest::Save {
                transcripts: self.transcript_map(),
                groups: self.state.groups.len(),
            },
            EditorAction::ApplyToOriginal => CallRequest::Apply(self.transcript_map()),
        };

        self.busy.insert(name);
        log::debug!("{} を開始 (ファイル {})", name, self.state.file_id);

        Ok(BackendCall {
            session: self.session,
            file_id: self.state.file_id,
            action,
            request,
            backend: Arc::clone(&self.backend),
            decoder: Arc::clone(&self.decoder),
        })
    }

    /// 呼び出し結果を反映
    ///
    /// 失敗時もエラー通知を記録してからエラーを返す。
    pub fn complete(&mut self, result: CallResult) -> Result<Completion, EditorError> {
        let name = result.action.name();
        if result.session != self.session {
            log::debug!(
                "別セッション {} の {} の結果を無視します",
                result.session,
                name
            );
            return Ok(Completion::abandoned());
        }
        self.busy.remove(name);

        let response = match result.outcome {
            Ok(response) => response,
            Err(e) => {
                log::warn!("{} に失敗しました: {}", name, e);
                self.push_error(&e);
                return Err(e);
            }
        };

        let mut completion = Completion::new(RenderRequest::None);
        match response {
            CallResponse::Diarized(summary) => {
                log::info!(
                    "話者分離完了: {} セグメント, {} 話者",
                    summary.segments,
                    summary.num_speakers
                );
                self.notify(
                    &mut completion,
                    format!(
                        "Found {} segments, {} speakers",
                        summary.segments, summary.num_speakers
                    ),
                );
                // 編集内容は読み込み直しで破棄される
                completion.follow_up = Some(EditorAction::LoadSegments);
            }
            CallResponse::Segments(segments) => {
                self.install_segments(segments);
                completion.render = RenderRequest::Full;
                if self.state.audio.is_none() && !self.is_busy(EditorAction::LoadAudio) {
                    completion.follow_up = Some(EditorAction::LoadAudio);
                }
            }
            CallResponse::Audio(audio) => {
                log::info!(
                    "音声を読み込みました: {:.2} 秒 ({} Hz)",
                    audio.duration(),
                    audio.sample_rate()
                );
                self.state.audio = Some(audio);
                self.peaks = None;
                self.state.refresh_duration();
                completion.render = RenderRequest::Full;
            }
            CallResponse::Exported(summary) => {
                log::info!("エクスポート完了: {} ファイル", summary.created);
                self.notify(
                    &mut completion,
                    format!("Created {} audio files", summary.created),
                );
                completion.close_view = true;
            }
            CallResponse::Trimmed(summary) => {
                log::info!("トリム完了: {:.2} 秒", summary.new_duration);
                self.notify(
                    &mut completion,
                    format!("Trimmed! New duration: {:.2}s", summary.new_duration),
                );
                completion.close_view = true;
            }
            CallResponse::Saved { groups } => {
                self.notify(&mut completion, format!("Saved {} group transcripts", groups));
            }
            CallResponse::Applied => {
                self.notify(&mut completion, "Applied to original".to_string());
            }
        }

        Ok(completion)
    }

    /// 開始から完了まで（続く操作も含めて）順に実行
    pub async fn run(&mut self, action: EditorAction) -> Result<Completion, EditorError> {
        let mut summary = Completion::new(RenderRequest::None);
        let mut next = Some(action);

        while let Some(action) = next.take() {
            let call = self.start(action)?;
            let mut completion = self.complete(call.execute().await)?;
            next = completion.follow_up.take();
            summary.absorb(completion);
        }

        Ok(summary)
    }

    fn notify(&mut self, completion: &mut Completion, message: String) {
        let notice = Notice::new(message, false, false);
        self.push(notice.clone());
        completion.notices.push(notice);
    }

    fn install_segments(&mut self, segments: Vec<AtomicSegment>) {
        let (valid, invalid): (Vec<_>, Vec<_>) =
            segments.into_iter().partition(AtomicSegment::is_valid);
        for segment in &invalid {
            log::warn!(
                "不正なセグメントを除外: id={} start={} end={}",
                segment.id,
                segment.start,
                segment.end
            );
        }

        self.state.groups = group::groups_from_segments(&valid);
        self.state.segments = valid;
        self.state.active_drag = None;
        self.state.refresh_duration();

        log::info!(
            "セグメントを読み込みました: {} 個 ({} グループ)",
            self.state.segments.len(),
            self.state.groups.len()
        );
    }

    // ---- 送信用スナップショット ----

    /// 文字起こしが空白のみのグループ数
    pub fn blank_transcripts(&self) -> usize {
        self.state
            .groups
            .iter()
            .filter(|g| g.transcript.trim().is_empty())
            .count()
    }

    /// エクスポートするグループ
    pub fn export_snapshot(&self) -> Vec<ExportGroup> {
        self.state
            .groups
            .iter()
            .map(|g| ExportGroup {
                start: g.effective_start(),
                end: g.effective_end(),
                transcript: g.transcript.clone(),
                speaker: g.primary_speaker().to_string(),
            })
            .collect()
    }

    /// セグメントIDごとの文字起こし
    ///
    /// グループの文字起こしは先頭セグメントに入れ、残りは空文字にする。
    pub fn transcript_map(&self) -> TranscriptMap {
        let mut map = TranscriptMap::new();
        for group in &self.state.groups {
            for (i, segment) in group.segments().iter().enumerate() {
                let text = if i == 0 {
                    group.transcript.clone()
                } else {
                    String::new()
                };
                map.insert(segment.id, text);
            }
        }
        map
    }

    /// 全グループを包む範囲（先頭の開始〜末尾の終了）
    pub fn trim_range(&self) -> Result<(Seconds, Seconds), EditorError> {
        match (self.state.groups.first(), self.state.groups.last()) {
            (Some(first), Some(last)) if first.effective_start() < last.effective_end() => {
                Ok((first.effective_start(), last.effective_end()))
            }
            (Some(first), Some(last)) => Err(EditorError::Invariant(format!(
                "トリム範囲が不正です: {} - {}",
                format_time(first.effective_start()),
                format_time(last.effective_end())
            ))),
            _ => Err(EditorError::Invariant(
                "トリムする範囲がありません".to_string(),
            )),
        }
    }

    // ---- グループ編集 ----

    pub fn merge_with_next(&mut self, index: usize) -> Result<RenderRequest, EditorError> {
        group::merge_with_next(&mut self.state.groups, index)?;
        self.state.active_drag = None;
        log::debug!("G{} と G{} を結合", index + 1, index + 2);
        Ok(RenderRequest::Full)
    }

    /// 分割位置の候補を列挙
    pub fn split_options(&self, index: usize) -> Result<SplitPrompt, EditorError> {
        let group = self
            .state
            .groups
            .get(index)
            .ok_or_else(|| self.group_index_error(index))?;
        let segments = group.segments();
        if segments.len() < 2 {
            return Err(EditorError::Invariant(
                "セグメントが1個のため分割できません".to_string(),
            ));
        }

        let choices = segments[..segments.len() - 1]
            .iter()
            .enumerate()
            .map(|(i, seg)| SplitChoice {
                offset: i + 1,
                label: format!(
                    "{}: {} - {} ({})",
                    i + 1,
                    format_time(seg.start),
                    format_time(seg.end),
                    seg.speaker
                ),
            })
            .collect();

        Ok(SplitPrompt {
            group_index: index,
            choices,
        })
    }

    pub fn split_group(&mut self, index: usize, offset: usize) -> Result<RenderRequest, EditorError> {
        group::split_group(&mut self.state.groups, index, offset)?;
        self.state.active_drag = None;
        log::debug!("G{} を {} 個目の後ろで分割", index + 1, offset);
        Ok(RenderRequest::Full)
    }

    pub fn set_transcript(&mut self, index: usize, text: impl Into<String>) -> Result<(), EditorError> {
        let error = self.group_index_error(index);
        let group = self.state.groups.get_mut(index).ok_or(error)?;
        group.transcript = text.into();
        Ok(())
    }

    /// 境界を `delta` 秒動かす（制約違反は無視）
    pub fn adjust_boundary(&mut self, index: usize, edge: Edge, delta: Seconds) -> RenderRequest {
        let limits = self.limits();
        self.controller
            .nudge(&mut self.state.groups, index, edge, delta, &limits)
    }

    pub fn reset_boundaries(&mut self, index: usize) -> RenderRequest {
        match self.state.groups.get_mut(index) {
            Some(group) => {
                group.reset_boundaries();
                RenderRequest::Waveform { group: index }
            }
            None => RenderRequest::None,
        }
    }

    // ---- ポインタ操作（x は波形ラスタ上のピクセル位置） ----

    pub fn pointer_press(&mut self, x: f32) -> RenderRequest {
        let axis = self.axis();
        self.controller
            .press(&mut self.state.active_drag, &self.state.groups, &axis, x)
    }

    pub fn pointer_move(&mut self, x: f32) -> RenderRequest {
        let axis = self.axis();
        let limits = self.limits();
        self.controller.pointer_move(
            &mut self.state.active_drag,
            &mut self.state.groups,
            &axis,
            &limits,
            x,
        )
    }

    pub fn pointer_release(&mut self) -> RenderRequest {
        self.controller.release(&mut self.state.active_drag)
    }

    pub fn pointer_leave(&mut self) -> RenderRequest {
        self.controller.leave(&mut self.state.active_drag)
    }

    // ---- 再生 ----

    /// グループの実効区間（調整後の開始〜終了）の音声
    pub fn playback_clip(&self, index: usize) -> Result<PlaybackClip, EditorError> {
        let group = self
            .state
            .groups
            .get(index)
            .ok_or_else(|| self.group_index_error(index))?;
        let audio = self.state.audio.as_ref().ok_or_else(|| {
            EditorError::Invariant("音声が読み込まれていません".to_string())
        })?;

        PlaybackClip::from_audio(audio, group.effective_start(), group.effective_end()).ok_or_else(
            || {
                EditorError::Invariant(format!(
                    "G{} の再生区間が空です ({} - {})",
                    index + 1,
                    format_time(group.effective_start()),
                    format_time(group.effective_end())
                ))
            },
        )
    }

    /// グループを再生（再生中のものは止めて置き換える）
    pub fn play_group(&self, index: usize, sink: &mut dyn AudioSink) -> Result<(), EditorError> {
        let clip = self.playback_clip(index)?;
        log::info!(
            "G{} を再生: {:.2} 秒 (サンプル {}..{})",
            index + 1,
            clip.duration(),
            clip.range().start,
            clip.range().end
        );
        sink.play(clip)
    }

    // ---- 描画 ----

    /// 波形を描画（同じ幅の間はピーク計算とフレームを使い回す）
    pub fn render_waveform(&mut self, width: u32, height: u32) -> &WaveformFrame {
        if self.renderer.width() != width || self.renderer.height() != height {
            self.renderer.resize(width, height);
        }

        let stale = self.peaks.as_ref().map_or(true, |p| p.width() != width);
        if stale {
            let samples = self
                .state
                .audio
                .as_ref()
                .map(DecodedAudio::samples)
                .unwrap_or(&[]);
            self.peaks = Some(WaveformPeaks::compute(samples, width));
        }

        if let Some(peaks) = &self.peaks {
            self.renderer.render_into(
                &mut self.frame,
                peaks,
                self.state.total_duration,
                &self.state.groups,
            );
        }
        &self.frame
    }

    pub fn view(&self) -> EditorView {
        EditorView::build(&self.state.groups, self.state.segments.len())
    }

    pub fn readout(&self, index: usize) -> Option<GroupReadout> {
        self.state
            .groups
            .get(index)
            .map(|g| GroupReadout::from_group(index, g))
    }
}
