use serde::{Deserialize, Serialize};

/// 秒単位の時刻
///
/// クリップ先頭からの経過秒数。バックエンドとの受け渡しもすべて秒で行う。
pub type Seconds = f64;

/// バックエンド上の音声ファイルID
pub type FileId = i64;

/// バックエンド上のセグメントID
pub type SegmentId = i64;

/// 話者分離（ダイアライゼーション）の結果セグメント
///
/// バックエンドの話者分離で生成され、クライアント側では変更しない。
/// `start < end` を満たさないものは読み込み時に破棄される。
///
/// # Examples
///
/// ```
/// # use segment_editor::types::AtomicSegment;
/// let json = r#"{"id": 7, "start": 1.5, "end": 3.0, "speaker": "SPEAKER_01"}"#;
/// let seg: AtomicSegment = serde_json::from_str(json).unwrap();
/// assert_eq!(seg.id, 7);
/// assert!(seg.transcript.is_empty());
/// assert!(!seg.has_overlap);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AtomicSegment {
    /// セグメントID
    pub id: SegmentId,

    /// 元の音声ファイルID
    #[serde(default)]
    pub audio_file_id: FileId,

    /// 開始時刻 (秒)
    pub start: Seconds,

    /// 終了時刻 (秒)
    pub end: Seconds,

    /// 話者ラベル（例: "SPEAKER_00"）
    #[serde(default)]
    pub speaker: String,

    /// 他の話者との重なりがあるか
    #[serde(default)]
    pub has_overlap: bool,

    /// バックエンド側の選択フラグ（エディタでは参照のみ）
    #[serde(default)]
    pub selected: bool,

    /// セグメント単位で保存済みの文字起こし
    #[serde(default)]
    pub transcript: String,
}

impl AtomicSegment {
    /// セグメント長 (秒)
    pub fn duration(&self) -> Seconds {
        self.end - self.start
    }

    /// 時刻が有限で、開始 < 終了 を満たすか
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start < self.end
    }
}

/// グループ境界の端
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// 開始側
    Start,
    /// 終了側
    End,
}

/// グループ境界の状態
///
/// 手動調整されていなければ `Natural`（セグメント本来の端を使う）、
/// 調整済みなら `Override` に秒数を保持する。
///
/// # Examples
///
/// ```
/// # use segment_editor::types::Boundary;
/// assert_eq!(Boundary::Natural.resolve(2.0), 2.0);
/// assert_eq!(Boundary::Override(2.5).resolve(2.0), 2.5);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Boundary {
    /// セグメント本来の境界
    #[default]
    Natural,

    /// 手動で上書きされた境界 (秒)
    Override(Seconds),
}

impl Boundary {
    /// 実効的な境界時刻を求める
    pub fn resolve(self, natural: Seconds) -> Seconds {
        match self {
            Boundary::Natural => natural,
            Boundary::Override(t) => t,
        }
    }

    /// 上書きされているか
    pub fn is_override(self) -> bool {
        matches!(self, Boundary::Override(_))
    }
}

/// ドラッグ中の境界
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveDrag {
    /// 対象グループのインデックス
    pub group_index: usize,

    /// ドラッグ中の端
    pub edge: Edge,
}

/// 話者分離APIのレスポンス
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DiarizeSummary {
    /// 生成されたセグメント数
    pub segments: usize,

    /// 検出された話者数
    pub num_speakers: usize,

    /// 重なり区間の数
    #[serde(default)]
    pub overlaps: usize,

    /// 解析した音声の長さ (秒)
    #[serde(default)]
    pub duration: Seconds,
}

/// エクスポート時に送信するグループ1件分
///
/// バックエンドはこの1件ごとに新しい音声ファイルを作成する。
///
/// # JSON例
///
/// ```json
/// { "start": 0.0, "end": 2.0, "transcript": "こんにちは", "speaker": "SPEAKER_00" }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ExportGroup {
    pub start: Seconds,
    pub end: Seconds,
    pub transcript: String,
    pub speaker: String,
}

/// エクスポートAPIのレスポンス
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ExportSummary {
    /// 作成されたファイル数
    pub created: usize,

    /// 作成されたファイルID
    #[serde(default)]
    pub file_ids: Vec<FileId>,

    /// 出力先ディレクトリ
    #[serde(default)]
    pub output_dir: Option<String>,
}

/// トリムAPIのレスポンス
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TrimSummary {
    /// トリム後の長さ (秒)
    pub new_duration: Seconds,
}

/// 秒数を `M:SS.s` 形式に整形
///
/// # Examples
///
/// ```
/// # use segment_editor::types::format_time;
/// assert_eq!(format_time(0.0), "0:00.0");
/// assert_eq!(format_time(75.3), "1:15.3");
/// ```
pub fn format_time(sec: Seconds) -> String {
    let minutes = (sec / 60.0).floor();
    let rest = sec - minutes * 60.0;
    format!("{}:{:04.1}", minutes as i64, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00.0");
        assert_eq!(format_time(9.5), "0:09.5");
        assert_eq!(format_time(60.0), "1:00.0");
        assert_eq!(format_time(125.4), "2:05.4");
    }

    #[test]
    fn test_segment_deserialization_full() {
        let json = r#"{
            "id": 12,
            "audio_file_id": 3,
            "start": 0.5,
            "end": 2.25,
            "speaker": "SPEAKER_02",
            "has_overlap": true,
            "selected": false,
            "transcript": "テスト"
        }"#;
        let seg: AtomicSegment = serde_json::from_str(json).unwrap();
        assert_eq!(seg.audio_file_id, 3);
        assert_eq!(seg.speaker, "SPEAKER_02");
        assert!(seg.has_overlap);
        assert_eq!(seg.transcript, "テスト");
        assert!((seg.duration() - 1.75).abs() < 1e-9);
        assert!(seg.is_valid());
    }

    #[test]
    fn test_segment_validity() {
        let mut seg: AtomicSegment =
            serde_json::from_str(r#"{"id": 1, "start": 2.0, "end": 2.0}"#).unwrap();
        assert!(!seg.is_valid());
        seg.end = f64::NAN;
        assert!(!seg.is_valid());
    }

    #[test]
    fn test_edge_serialization() {
        assert_eq!(serde_json::to_string(&Edge::Start).unwrap(), r#""start""#);
        assert_eq!(serde_json::from_str::<Edge>(r#""end""#).unwrap(), Edge::End);
    }

    #[test]
    fn test_boundary_override_flag() {
        assert!(!Boundary::Natural.is_override());
        assert!(Boundary::Override(0.0).is_override());
        assert_eq!(Boundary::default(), Boundary::Natural);
    }

    #[test]
    fn test_export_group_json() {
        let group = ExportGroup {
            start: 0.0,
            end: 2.0,
            transcript: "a".to_string(),
            speaker: "SPEAKER_00".to_string(),
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&group).unwrap()).unwrap();
        assert_eq!(parsed["end"], 2.0);
        assert_eq!(parsed["speaker"], "SPEAKER_00");
    }
}
