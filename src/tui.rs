use crate::audio_decode::AudioDecoder;
use crate::backend::SegmentBackend;
use crate::boundary::{CursorHint, RenderRequest};
use crate::config::Config;
use crate::editor::{CallResult, EditorAction, SegmentEditor, SplitPrompt};
use crate::error::EditorError;
use crate::playback::AudioSink;
use crate::types::{format_time, Edge, FileId};
use crate::view_model::{speaker_color, EditorView, GroupRow, WAVEFORM_HINT};
use crate::waveform::{LabelKind, Rgba, WaveformFrame};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// 波形表示の行数（枠線を除く）
const WAVEFORM_ROWS: u16 = 8;

/// 一時的な通知（通信失敗など）を表示しておく時間
const TRANSIENT_NOTICE_TTL: Duration = Duration::from_secs(4);

/// キー操作
#[derive(Clone, Copy, Debug, PartialEq)]
enum Command {
    Quit,
    /// 選択グループの移動（-1 / +1）
    Select(i32),
    Nudge { edge: Edge, coarse: bool, forward: bool },
    Reset,
    Merge,
    Split,
    Play,
    EditTranscript,
    Diarize,
    Reload,
    Save,
    Export,
    Trim,
    Apply,
}

/// 通常モードのキー割り当て
fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Command::Quit),
            _ => None,
        };
    }

    let nudge = |edge, coarse, forward| Some(Command::Nudge { edge, coarse, forward });
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Up | KeyCode::Char('k') => Some(Command::Select(-1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Command::Select(1)),
        KeyCode::Char('[') => nudge(Edge::Start, false, false),
        KeyCode::Char(']') => nudge(Edge::Start, false, true),
        KeyCode::Char('{') => nudge(Edge::Start, true, false),
        KeyCode::Char('}') => nudge(Edge::Start, true, true),
        KeyCode::Char(',') => nudge(Edge::End, false, false),
        KeyCode::Char('.') => nudge(Edge::End, false, true),
        KeyCode::Char('<') => nudge(Edge::End, true, false),
        KeyCode::Char('>') => nudge(Edge::End, true, true),
        KeyCode::Char('r') => Some(Command::Reset),
        KeyCode::Char('m') => Some(Command::Merge),
        KeyCode::Char('s') => Some(Command::Split),
        KeyCode::Char('p') => Some(Command::Play),
        KeyCode::Char('e') | KeyCode::Enter => Some(Command::EditTranscript),
        KeyCode::Char('d') => Some(Command::Diarize),
        KeyCode::Char('l') => Some(Command::Reload),
        KeyCode::Char('w') => Some(Command::Save),
        KeyCode::Char('x') => Some(Command::Export),
        KeyCode::Char('t') => Some(Command::Trim),
        KeyCode::Char('a') => Some(Command::Apply),
        _ => None,
    }
}

/// 分割位置の入力
#[derive(Clone, Debug, PartialEq)]
struct SplitEntry {
    prompt: SplitPrompt,
    digits: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum SplitStep {
    /// 入力を続ける
    Pending,
    Cancel,
    Apply(usize),
    /// 候補にない番号で確定した
    Invalid,
}

impl SplitEntry {
    fn new(prompt: SplitPrompt) -> Self {
        Self {
            prompt,
            digits: String::new(),
        }
    }

    fn key(&mut self, code: KeyCode) -> SplitStep {
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.digits.push(c);
                SplitStep::Pending
            }
            KeyCode::Backspace => {
                self.digits.pop();
                SplitStep::Pending
            }
            KeyCode::Enter => match self.digits.parse::<usize>() {
                Ok(offset) if self.prompt.choices.iter().any(|c| c.offset == offset) => {
                    SplitStep::Apply(offset)
                }
                _ => SplitStep::Invalid,
            },
            KeyCode::Esc => SplitStep::Cancel,
            _ => SplitStep::Pending,
        }
    }
}

/// 入力モード
#[derive(Clone, Debug, PartialEq)]
enum Mode {
    Normal,
    /// 文字起こしの編集中
    EditTranscript { buffer: String },
    /// 分割位置の選択中
    Split(SplitEntry),
    /// y/n の確認待ち
    Confirm { prompt: String, action: EditorAction },
}

fn to_color(c: Rgba) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// 波形ラスタを半ブロック文字で描くウィジェット
///
/// 1セルに縦2ピクセル（上を前景、下を背景）を割り当てるため、
/// ラスタは `幅 = 列数`、`高さ = 行数 × 2` で描画しておく。
struct WaveformWidget<'a> {
    frame: &'a WaveformFrame,
}

impl Widget for WaveformWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let raster = &self.frame.raster;
        let cols = area.width.min(raster.width() as u16);
        let rows = area.height.min((raster.height() / 2) as u16);

        for row in 0..rows {
            for col in 0..cols {
                let top = raster.pixel(col as u32, row as u32 * 2);
                let bottom = raster.pixel(col as u32, row as u32 * 2 + 1);
                if let (Some(top), Some(bottom)) = (top, bottom) {
                    if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                        cell.set_char('▀').set_fg(to_color(top)).set_bg(to_color(bottom));
                    }
                }
            }
        }

        // グループ番号は最上段に重ねる
        for label in &self.frame.labels {
            if let LabelKind::GroupOrdinal(_) = label.kind {
                let col = label.x.max(0.0) as u16;
                if col < cols {
                    buf.set_stringn(
                        area.x + col,
                        area.y,
                        &label.text,
                        (cols - col) as usize,
                        Style::default()
                            .fg(to_color(label.color))
                            .add_modifier(Modifier::BOLD),
                    );
                }
            }
        }
    }
}

/// 時刻目盛りのラベル行
fn tick_line(frame: &WaveformFrame, width: u16) -> Line<'static> {
    let mut text = vec![' '; width as usize];
    let mut next_free = 0;
    for label in &frame.labels {
        if label.kind != LabelKind::TimeTick {
            continue;
        }
        // 前のラベルと重なるものは省く
        let start = label.x.max(0.0) as usize;
        if start < next_free {
            continue;
        }
        next_free = start + label.text.chars().count() + 1;
        for (i, ch) in label.text.chars().enumerate() {
            if let Some(slot) = text.get_mut(start + i) {
                *slot = ch;
            }
        }
    }
    Line::styled(
        text.into_iter().collect::<String>(),
        Style::default().fg(Color::Gray),
    )
}

/// TUIアプリケーション
///
/// バックエンド呼び出しはタスクとして起動し、結果はチャネル経由で受け取る。
/// 入力と描画のループは I/O を待たない。
pub struct TuiApp {
    config: Config,
    backend: Arc<dyn SegmentBackend>,
    decoder: Arc<dyn AudioDecoder>,
    output: Box<dyn AudioSink>,
    editor: SegmentEditor,
    view: EditorView,
    selected: usize,
    mode: Mode,
    cursor: CursorHint,
    /// 直近の描画での波形領域（マウス座標の変換に使う）
    waveform_area: Rect,
    results_tx: mpsc::UnboundedSender<CallResult>,
    results_rx: mpsc::UnboundedReceiver<CallResult>,
    running: bool,
}

impl TuiApp {
    pub fn new(
        file_id: FileId,
        config: Config,
        backend: Arc<dyn SegmentBackend>,
        decoder: Arc<dyn AudioDecoder>,
        output: Box<dyn AudioSink>,
    ) -> Self {
        let editor = SegmentEditor::new(file_id, &config, Arc::clone(&backend), Arc::clone(&decoder));
        let view = editor.view();
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        Self {
            config,
            backend,
            decoder,
            output,
            editor,
            view,
            selected: 0,
            mode: Mode::Normal,
            cursor: CursorHint::Default,
            waveform_area: Rect::default(),
            results_tx,
            results_rx,
            running: true,
        }
    }

    /// TUIを起動
    pub async fn run(&mut self) -> Result<()> {
        // ターミナルを初期化
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.dispatch(EditorAction::LoadSegments);

        // メインループ
        while self.running {
            // 完了した呼び出しを反映
            while let Ok(result) = self.results_rx.try_recv() {
                self.on_result(result);
            }

            terminal.draw(|f| self.draw(f))?;

            // イベントをポーリング（100msごと）
            if event::poll(Duration::from_millis(100))? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key)?,
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }

        self.output.stop();

        // ターミナルをリストア
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    // ---- バックエンド操作 ----

    fn dispatch(&mut self, action: EditorAction) {
        match self.editor.start(action) {
            Ok(call) => {
                let tx = self.results_tx.clone();
                tokio::spawn(async move {
                    // 受信側が閉じていれば結果は捨てる
                    let _ = tx.send(call.execute().await);
                });
            }
            Err(EditorError::EmptyTranscripts { .. }) => {
                self.mode = Mode::Confirm {
                    prompt: "Some groups have empty transcripts. Continue anyway?".to_string(),
                    action: EditorAction::Export { force: true },
                };
            }
            Err(e) => {
                log::warn!("{} を開始できません: {}", action.name(), e);
                self.editor.push_error(&e);
            }
        }
    }

    fn on_result(&mut self, result: CallResult) {
        let completion = match self.editor.complete(result) {
            Ok(completion) => completion,
            // 通知はエディタ側に記録済み
            Err(_) => return,
        };
        if completion.abandoned {
            return;
        }

        if completion.close_view {
            self.reopen();
            return;
        }
        self.apply_render(completion.render);
        if let Some(next) = completion.follow_up {
            self.dispatch(next);
        }
    }

    /// エクスポート・トリム後にクリップを開き直す
    fn reopen(&mut self) {
        let file_id = self.editor.file_id();
        let reopened = SegmentEditor::new(
            file_id,
            &self.config,
            Arc::clone(&self.backend),
            Arc::clone(&self.decoder),
        );
        let previous = std::mem::replace(&mut self.editor, reopened);
        self.editor.inherit_notices(&previous);

        // 元ファイルが変わっているので古い区間の再生は止める
        self.output.stop();
        self.mode = Mode::Normal;
        self.selected = 0;
        self.apply_render(RenderRequest::Full);
        self.dispatch(EditorAction::LoadSegments);
    }

    fn apply_render(&mut self, request: RenderRequest) {
        match request {
            RenderRequest::None => {}
            RenderRequest::Cursor(hint) => self.cursor = hint,
            RenderRequest::Waveform { group } => {
                if let Some(readout) = self.editor.readout(group) {
                    self.view.apply_readout(readout);
                }
            }
            RenderRequest::Full => {
                self.view = self.editor.view();
                self.selected = self.selected.min(self.view.rows.len().saturating_sub(1));
            }
        }
    }

    // ---- 入力 ----

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('z') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Self::suspend();
        }

        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.handle_command(key),
            Mode::EditTranscript { mut buffer } => match key.code {
                KeyCode::Enter => {
                    if let Err(e) = self.editor.set_transcript(self.selected, buffer) {
                        self.editor.push_error(&e);
                    }
                    self.apply_render(RenderRequest::Full);
                }
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    buffer.pop();
                    self.mode = Mode::EditTranscript { buffer };
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    self.mode = Mode::EditTranscript { buffer };
                }
                _ => self.mode = Mode::EditTranscript { buffer },
            },
            Mode::Split(mut entry) => match entry.key(key.code) {
                SplitStep::Pending => self.mode = Mode::Split(entry),
                SplitStep::Cancel => {}
                SplitStep::Apply(offset) => {
                    let index = entry.prompt.group_index;
                    self.apply_edit(|editor| editor.split_group(index, offset));
                }
                SplitStep::Invalid => {
                    let e = EditorError::Invariant(format!(
                        "分割位置が不正です: '{}'",
                        entry.digits
                    ));
                    self.editor.push_error(&e);
                }
            },
            Mode::Confirm { prompt, action } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.dispatch(action),
                KeyCode::Char('n') | KeyCode::Esc => {}
                _ => self.mode = Mode::Confirm { prompt, action },
            },
        }
        Ok(())
    }

    fn handle_command(&mut self, key: KeyEvent) {
        let Some(command) = command_for(&key) else {
            return;
        };
        let index = self.selected;

        match command {
            Command::Quit => self.running = false,
            Command::Select(step) => {
                let last = self.view.rows.len().saturating_sub(1) as i64;
                self.selected = (index as i64 + step as i64).clamp(0, last) as usize;
            }
            Command::Nudge {
                edge,
                coarse,
                forward,
            } => {
                let step = if coarse {
                    self.editor.coarse_step()
                } else {
                    self.editor.fine_step()
                };
                let delta = if forward { step } else { -step };
                let request = self.editor.adjust_boundary(index, edge, delta);
                self.apply_render(request);
            }
            Command::Reset => {
                let request = self.editor.reset_boundaries(index);
                self.apply_render(request);
            }
            Command::Merge => self.apply_edit(|editor| editor.merge_with_next(index)),
            Command::Split => match self.editor.split_options(index) {
                Ok(prompt) => self.mode = Mode::Split(SplitEntry::new(prompt)),
                Err(e) => self.editor.push_error(&e),
            },
            Command::Play => {
                if let Err(e) = self.editor.play_group(index, self.output.as_mut()) {
                    log::warn!("G{} を再生できません: {}", index + 1, e);
                    self.editor.push_error(&e);
                }
            }
            Command::EditTranscript => {
                if let Some(row) = self.view.rows.get(index) {
                    self.mode = Mode::EditTranscript {
                        buffer: row.transcript.clone(),
                    };
                }
            }
            Command::Diarize => self.dispatch(EditorAction::Diarize),
            Command::Reload => self.dispatch(EditorAction::LoadSegments),
            Command::Save => self.dispatch(EditorAction::SaveTranscripts),
            Command::Export => self.dispatch(EditorAction::Export { force: false }),
            Command::Trim => match self.editor.trim_range() {
                Ok((start, end)) => {
                    self.mode = Mode::Confirm {
                        prompt: format!(
                            "Trim audio to {} - {}? Duration: {:.3}s. This will REPLACE the original file!",
                            format_time(start),
                            format_time(end),
                            end - start
                        ),
                        action: EditorAction::Trim,
                    }
                }
                Err(e) => self.editor.push_error(&e),
            },
            Command::Apply => {
                self.mode = Mode::Confirm {
                    prompt: "Apply group transcripts to original?".to_string(),
                    action: EditorAction::ApplyToOriginal,
                }
            }
        }
    }

    fn apply_edit(
        &mut self,
        edit: impl FnOnce(&mut SegmentEditor) -> Result<RenderRequest, EditorError>,
    ) {
        match edit(&mut self.editor) {
            Ok(request) => self.apply_render(request),
            Err(e) => self.editor.push_error(&e),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let area = self.waveform_area;
        let inside = mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height;
        // セルの中央をピクセル位置とする
        let x = mouse.column.saturating_sub(area.x) as f32 + 0.5;

        let request = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if inside => self.editor.pointer_press(x),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved if inside => {
                self.editor.pointer_move(x)
            }
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                self.cursor = CursorHint::Default;
                self.editor.pointer_leave()
            }
            MouseEventKind::Up(MouseButton::Left) => self.editor.pointer_release(),
            _ => RenderRequest::None,
        };
        self.apply_render(request);
    }

    /// Ctrl+Z でプロセスを一時停止
    fn suspend() -> Result<()> {
        // まずターミナルをリストア
        disable_raw_mode()?;
        execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;

        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            let _ = signal::raise(Signal::SIGTSTP);
        }

        // 再開後にターミナルを再初期化
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(())
    }

    // ---- 描画 ----

    fn draw(&mut self, f: &mut Frame) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),                 // ヘッダ
                Constraint::Length(WAVEFORM_ROWS + 2), // 波形
                Constraint::Length(1),                 // 時刻目盛り
                Constraint::Length(1),                 // 操作説明
                Constraint::Min(0),                    // グループ一覧
                Constraint::Length(2),                 // 通知・入力
            ])
            .split(f.area());

        self.draw_header(f, sections[0]);
        self.draw_waveform(f, sections[1], sections[2]);
        f.render_widget(
            Paragraph::new(format!(
                "{} | ↑↓ select  [ ] {{ }} start  , . < > end  r reset  m merge  s split  p play  e edit  d diarize  w save  x export  t trim  a apply  q quit",
                WAVEFORM_HINT
            ))
            .style(Style::default().fg(Color::DarkGray)),
            sections[3],
        );
        self.draw_groups(f, sections[4]);
        self.draw_footer(f, sections[5]);
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(
                format!("segment-editor - File {}", self.editor.file_id()),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(self.view.summary(), Style::default().fg(Color::Gray)),
        ];

        let busy = self.editor.busy_actions();
        if !busy.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("実行中: {}", busy.join(", ")),
                Style::default().fg(Color::Yellow),
            ));
        }
        if self.cursor == CursorHint::Resize {
            spans.push(Span::styled("  ⇔", Style::default().fg(Color::Cyan)));
        }

        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_waveform(&mut self, f: &mut Frame, area: Rect, tick_area: Rect) {
        let block = Block::default()
            .title("Waveform")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White));
        let inner = block.inner(area);
        f.render_widget(block, area);
        self.waveform_area = inner;

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let frame = self
            .editor
            .render_waveform(inner.width as u32, inner.height as u32 * 2);
        f.render_widget(WaveformWidget { frame }, inner);

        let ticks = Rect {
            x: inner.x,
            width: inner.width,
            ..tick_area
        };
        f.render_widget(Paragraph::new(tick_line(frame, inner.width)), ticks);
    }

    fn draw_groups(&self, f: &mut Frame, area: Rect) {
        let block = Block::default().title("Groups").borders(Borders::ALL);
        let inner = block.inner(area);
        f.render_widget(block, area);

        if self.view.is_empty() {
            let paragraph = Paragraph::new("No segments found (d: Split Audio)")
                .style(Style::default().fg(Color::Gray));
            f.render_widget(paragraph, inner);
            return;
        }

        let lines: Vec<Line> = self
            .view
            .rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| Self::group_lines(row, i == self.selected))
            .collect();

        // 選択グループが見えるようにスクロール
        let visible = inner.height as usize;
        let scroll = (self.selected * 2 + 2).saturating_sub(visible);

        let paragraph = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .scroll((scroll as u16, 0));
        f.render_widget(paragraph, inner);
    }

    /// グループ1件分（見出し行と文字起こし行）
    fn group_lines(row: &GroupRow, selected: bool) -> Vec<Line<'static>> {
        let marker = if selected { "▶" } else { " " };
        let mut spans = vec![
            Span::raw(marker),
            Span::styled("▌", Style::default().fg(to_color(row.color))),
            Span::styled(
                format!("G{} ", row.ordinal),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "{} {} ",
                row.readout.time_label, row.readout.duration_label
            )),
        ];

        for (i, speaker) in row.speakers.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(", "));
            }
            spans.push(Span::styled(
                speaker.clone(),
                Style::default().fg(to_color(speaker_color(speaker))),
            ));
        }
        if row.overlap {
            spans.push(Span::styled(
                " OVERLAP",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        if row.readout.adjusted {
            spans.push(Span::styled(
                " ADJUSTED ↺",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
        }
        spans.push(Span::styled(
            format!(" {} seg", row.segment_count),
            Style::default().fg(Color::Gray),
        ));
        if row.can_split {
            spans.push(Span::raw(" ✂"));
        }
        if row.can_merge {
            spans.push(Span::raw(" ⊕"));
        }

        let mut heading = Line::from(spans);
        if selected {
            heading = heading.style(Style::default().bg(Color::DarkGray));
        }

        let transcript = if row.transcript.is_empty() {
            Line::styled(
                "    (Enter transcript for this group...)",
                Style::default().fg(Color::DarkGray),
            )
        } else {
            Line::raw(format!("    {}", row.transcript))
        };

        vec![heading, transcript]
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let line = match &self.mode {
            Mode::EditTranscript { buffer } => Line::from(vec![
                Span::styled(
                    format!("G{} transcript> ", self.selected + 1),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(buffer.clone()),
                Span::styled("█", Style::default().fg(Color::Cyan)),
            ]),
            Mode::Split(entry) => {
                let choices: Vec<_> = entry
                    .prompt
                    .choices
                    .iter()
                    .map(|c| c.label.as_str())
                    .collect();
                Line::from(vec![
                    Span::styled(
                        format!("Split after segment: {}", choices.join("  ")),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled(
                        "  Enter number> ",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(entry.digits.clone()),
                    Span::styled("█", Style::default().fg(Color::Cyan)),
                ])
            }
            Mode::Confirm { prompt, .. } => Line::styled(
                format!("{} (y/n)", prompt),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Mode::Normal => match self
                .editor
                .current_notice(Instant::now(), TRANSIENT_NOTICE_TTL)
            {
                Some(notice) if notice.is_error => {
                    Line::styled(notice.message.clone(), Style::default().fg(Color::Red))
                }
                Some(notice) => {
                    Line::styled(notice.message.clone(), Style::default().fg(Color::Green))
                }
                None => Line::raw(""),
            },
        };

        f.render_widget(Paragraph::new(line).wrap(Wrap { trim: false }), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::SplitChoice;
    use crate::group::{groups_from_segments, merge_with_next, split_group};
    use crate::types::AtomicSegment;
    use crate::waveform::{WaveformRenderer, BACKGROUND};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(command_for(&key(KeyCode::Char('q'))), Some(Command::Quit));
        assert_eq!(
            command_for(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
        assert_eq!(command_for(&key(KeyCode::Up)), Some(Command::Select(-1)));
        assert_eq!(
            command_for(&key(KeyCode::Char('}'))),
            Some(Command::Nudge {
                edge: Edge::Start,
                coarse: true,
                forward: true
            })
        );
        assert_eq!(
            command_for(&key(KeyCode::Char(','))),
            Some(Command::Nudge {
                edge: Edge::End,
                coarse: false,
                forward: false
            })
        );
        assert_eq!(command_for(&key(KeyCode::Char('x'))), Some(Command::Export));
        assert_eq!(command_for(&key(KeyCode::Char('p'))), Some(Command::Play));
        assert_eq!(command_for(&key(KeyCode::Char('?'))), None);
    }

    fn split_prompt(segments: usize) -> SplitPrompt {
        SplitPrompt {
            group_index: 0,
            choices: (1..segments)
                .map(|offset| SplitChoice {
                    offset,
                    label: format!("{}: ...", offset),
                })
                .collect(),
        }
    }

    #[test]
    fn test_split_entry_accepts_two_digit_offset() {
        let segments: Vec<AtomicSegment> = (0..12)
            .map(|i| AtomicSegment {
                id: i,
                audio_file_id: 1,
                start: i as f64,
                end: i as f64 + 1.0,
                speaker: "SPEAKER_00".to_string(),
                has_overlap: false,
                selected: false,
                transcript: String::new(),
            })
            .collect();
        let mut groups = groups_from_segments(&segments);
        while groups.len() > 1 {
            merge_with_next(&mut groups, 0).unwrap();
        }

        let mut entry = SplitEntry::new(split_prompt(12));
        assert_eq!(entry.key(KeyCode::Char('1')), SplitStep::Pending);
        assert_eq!(entry.key(KeyCode::Char('1')), SplitStep::Pending);
        assert_eq!(entry.digits, "11");
        let SplitStep::Apply(offset) = entry.key(KeyCode::Enter) else {
            panic!("11 は分割位置の候補にある");
        };

        split_group(&mut groups, 0, offset).unwrap();
        let sizes: Vec<_> = groups.iter().map(|g| g.segments().len()).collect();
        assert_eq!(sizes, vec![11, 1]);
    }

    #[test]
    fn test_split_entry_editing_and_validation() {
        let mut entry = SplitEntry::new(split_prompt(5));

        entry.key(KeyCode::Char('4'));
        entry.key(KeyCode::Char('2'));
        assert_eq!(entry.key(KeyCode::Enter), SplitStep::Invalid);
        entry.key(KeyCode::Backspace);
        assert_eq!(entry.key(KeyCode::Char('x')), SplitStep::Pending);
        assert_eq!(entry.key(KeyCode::Enter), SplitStep::Apply(4));

        let mut entry = SplitEntry::new(split_prompt(5));
        assert_eq!(entry.key(KeyCode::Enter), SplitStep::Invalid);
        entry.key(KeyCode::Char('0'));
        assert_eq!(entry.key(KeyCode::Enter), SplitStep::Invalid);
        assert_eq!(entry.key(KeyCode::Esc), SplitStep::Cancel);
    }

    #[test]
    fn test_waveform_widget_half_blocks() {
        let frame = WaveformRenderer::new(10, 4).render(&[], 0.0, &[]);
        let area = Rect::new(0, 0, 10, 2);
        let mut buf = Buffer::empty(area);

        WaveformWidget { frame: &frame }.render(area, &mut buf);

        let cell = &buf[(3, 1)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, to_color(BACKGROUND));
        assert_eq!(cell.bg, to_color(BACKGROUND));
    }

    #[test]
    fn test_tick_line_places_labels() {
        let frame = WaveformRenderer::new(40, 4).render(&[], 20.0, &[]);
        let line = tick_line(&frame, 40);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();

        assert_eq!(text.chars().count(), 40);
        assert!(text.starts_with("  0:00.0"));
    }
}
