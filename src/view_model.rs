use crate::group::Group;
use crate::types::format_time;
use crate::waveform::{group_color, Rgba};
use regex_lite::Regex;
use std::sync::OnceLock;

/// 波形の下に出す操作説明
pub const WAVEFORM_HINT: &str = "Drag edges to adjust boundaries | Use ◀▶ for fine control";

/// ドラッグ中に差し替える表示値
#[derive(Clone, Debug, PartialEq)]
pub struct GroupReadout {
    pub index: usize,
    /// `M:SS.s - M:SS.s`
    pub time_label: String,
    /// `(X.Xs)`
    pub duration_label: String,
    /// ADJUSTED バッジとリセット操作の表示
    pub adjusted: bool,
}

impl GroupReadout {
    pub fn from_group(index: usize, group: &Group) -> Self {
        Self {
            index,
            time_label: format!(
                "{} - {}",
                format_time(group.effective_start()),
                format_time(group.effective_end())
            ),
            duration_label: format!("({:.1}s)", group.duration()),
            adjusted: group.is_adjusted(),
        }
    }
}

/// グループ一覧の1行
#[derive(Clone, Debug, PartialEq)]
pub struct GroupRow {
    pub readout: GroupReadout,
    /// `G<N>` の N
    pub ordinal: usize,
    pub color: Rgba,
    /// 話者ラベル（重複なし、出現順）
    pub speakers: Vec<String>,
    pub overlap: bool,
    pub segment_count: usize,
    pub transcript: String,
    pub can_split: bool,
    pub can_merge: bool,
}

/// エディタ画面全体の表示内容
///
/// グループ列から毎回作り直す宣言的なビューで、表示側はこれを描くだけでよい。
#[derive(Clone, Debug, PartialEq)]
pub struct EditorView {
    pub group_count: usize,
    pub segment_count: usize,
    pub rows: Vec<GroupRow>,
}

impl EditorView {
    pub fn build(groups: &[Group], segment_count: usize) -> Self {
        let last = groups.len().saturating_sub(1);
        let rows = groups
            .iter()
            .enumerate()
            .map(|(index, group)| GroupRow {
                readout: GroupReadout::from_group(index, group),
                ordinal: index + 1,
                color: group_color(index),
                speakers: group.speakers().into_iter().map(str::to_string).collect(),
                overlap: group.has_overlap(),
                segment_count: group.segments().len(),
                transcript: group.transcript.clone(),
                can_split: group.segments().len() > 1,
                can_merge: index < last,
            })
            .collect();

        Self {
            group_count: groups.len(),
            segment_count,
            rows,
        }
    }

    /// セグメントが1つもない（話者分離を促す表示にする）
    pub fn is_empty(&self) -> bool {
        self.segment_count == 0
    }

    /// `N groups, M segments`
    pub fn summary(&self) -> String {
        format!("{} groups, {} segments", self.group_count, self.segment_count)
    }

    /// 差分描画で受け取った表示値を反映
    pub fn apply_readout(&mut self, readout: GroupReadout) {
        if let Some(row) = self.rows.get_mut(readout.index) {
            row.readout = readout;
        }
    }
}

fn speaker_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^SPEAKER_(\d+)$").ok())
        .as_ref()
}

/// `SPEAKER_03` のようなラベルから話者番号を取り出す
///
/// # Examples
///
/// ```
/// use segment_editor::view_model::speaker_number;
///
/// assert_eq!(speaker_number("SPEAKER_03"), Some(3));
/// assert_eq!(speaker_number("narrator"), None);
/// ```
pub fn speaker_number(label: &str) -> Option<usize> {
    speaker_pattern()?
        .captures(label)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// 話者バッジの色（グループ色の先頭6色を循環）
const SPEAKER_COLORS: usize = 6;

/// 話者ラベルの表示色（番号がなければ既定色）
pub fn speaker_color(label: &str) -> Rgba {
    group_color(speaker_number(label).unwrap_or(0) % SPEAKER_COLORS)
}
