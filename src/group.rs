use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::types::{AtomicSegment, Boundary, Edge, Seconds};

/// 境界操作の制約
///
/// 境界は `[0, total_duration]` に収め、`precision` 単位に丸めたうえで、
/// 反対側の端と `min_gap` 以上の間隔を保たなければならない。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryLimits {
    /// クリップ全体の長さ (秒)
    pub total_duration: Seconds,

    /// 開始と終了の最小間隔 (秒)
    pub min_gap: Seconds,

    /// 境界の丸め単位 (秒)。0以下なら丸めない
    pub precision: Seconds,
}

impl BoundaryLimits {
    pub fn new(total_duration: Seconds) -> Self {
        Self {
            total_duration,
            min_gap: 0.1,
            precision: 0.01,
        }
    }

    pub fn from_config(config: &EditorConfig, total_duration: Seconds) -> Self {
        Self {
            total_duration,
            min_gap: config.min_gap_seconds,
            precision: config.boundary_precision,
        }
    }

    /// 範囲内に収めて丸める
    fn normalize(&self, time: Seconds) -> Seconds {
        let upper = self.total_duration.max(0.0);
        let clamped = time.clamp(0.0, upper);
        if self.precision > 0.0 {
            let scale = 1.0 / self.precision;
            ((clamped * scale).round() / scale).min(upper)
        } else {
            clamped
        }
    }
}

/// 操作者が編集する単位
///
/// 連続する1個以上の話者分離セグメントをまとめたもの。
/// 境界の手動調整とグループ単位の文字起こしを持つ。
///
/// # Examples
///
/// ```
/// # use segment_editor::group::{BoundaryLimits, Group};
/// # use segment_editor::types::{AtomicSegment, Edge};
/// let seg: AtomicSegment =
///     serde_json::from_str(r#"{"id": 1, "start": 2.0, "end": 4.0}"#).unwrap();
/// let mut group = Group::from_segment(seg);
/// let limits = BoundaryLimits::new(10.0);
///
/// assert!(group.adjust_boundary(Edge::End, 10.0, &limits));
/// assert_eq!(group.effective_end(), 10.0);
///
/// // 開始が終了を越えるため拒否される
/// assert!(!group.adjust_boundary(Edge::Start, 9.0, &limits));
/// assert_eq!(group.effective_start(), 2.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    segments: Vec<AtomicSegment>,

    /// グループの文字起こし
    pub transcript: String,

    start: Boundary,
    end: Boundary,
}

impl Group {
    /// セグメント1個からグループを作成（文字起こしはセグメントのものを引き継ぐ）
    pub fn from_segment(segment: AtomicSegment) -> Self {
        let transcript = segment.transcript.clone();
        Self {
            segments: vec![segment],
            transcript,
            start: Boundary::Natural,
            end: Boundary::Natural,
        }
    }

    pub fn segments(&self) -> &[AtomicSegment] {
        &self.segments
    }

    pub fn start_boundary(&self) -> Boundary {
        self.start
    }

    pub fn end_boundary(&self) -> Boundary {
        self.end
    }

    /// セグメント本来の開始時刻
    pub fn natural_start(&self) -> Seconds {
        self.segments.first().map(|s| s.start).unwrap_or_default()
    }

    /// セグメント本来の終了時刻
    pub fn natural_end(&self) -> Seconds {
        self.segments.last().map(|s| s.end).unwrap_or_default()
    }

    /// 実効的な開始時刻
    pub fn effective_start(&self) -> Seconds {
        self.start.resolve(self.natural_start())
    }

    /// 実効的な終了時刻
    pub fn effective_end(&self) -> Seconds {
        self.end.resolve(self.natural_end())
    }

    /// 指定した端の実効時刻
    pub fn effective(&self, edge: Edge) -> Seconds {
        match edge {
            Edge::Start => self.effective_start(),
            Edge::End => self.effective_end(),
        }
    }

    /// 実効的な長さ (秒)
    pub fn duration(&self) -> Seconds {
        self.effective_end() - self.effective_start()
    }

    /// 境界が手動調整されているか
    pub fn is_adjusted(&self) -> bool {
        self.start.is_override() || self.end.is_override()
    }

    /// 含まれる話者（初出順、重複なし）
    pub fn speakers(&self) -> Vec<&str> {
        let mut speakers: Vec<&str> = Vec::new();
        for seg in &self.segments {
            if !speakers.contains(&seg.speaker.as_str()) {
                speakers.push(&seg.speaker);
            }
        }
        speakers
    }

    /// 重なりを含むセグメントがあるか
    pub fn has_overlap(&self) -> bool {
        self.segments.iter().any(|s| s.has_overlap)
    }

    /// 境界を絶対時刻で設定
    ///
    /// 時刻は `[0, total_duration]` に収めて丸めた後、反対側の端と
    /// `min_gap` 以上離れている場合のみ反映される。
    ///
    /// # Returns
    /// * `true` - 反映された
    /// * `false` - 制約違反のため無視された（以前の値を維持）
    pub fn set_boundary(&mut self, edge: Edge, time: Seconds, limits: &BoundaryLimits) -> bool {
        if !time.is_finite() {
            return false;
        }
        let t = limits.normalize(time);

        let accepted = match edge {
            Edge::Start => t < self.effective_end() - limits.min_gap,
            Edge::End => t > self.effective_start() + limits.min_gap,
        };
        if !accepted {
            log::trace!("境界 {:?} = {:.2} は間隔制約により無視", edge, t);
            return false;
        }

        match edge {
            Edge::Start => self.start = Boundary::Override(t),
            Edge::End => self.end = Boundary::Override(t),
        }
        true
    }

    /// 境界を現在位置から相対的に移動
    pub fn adjust_boundary(&mut self, edge: Edge, delta: Seconds, limits: &BoundaryLimits) -> bool {
        let target = self.effective(edge) + delta;
        self.set_boundary(edge, target, limits)
    }

    /// 手動調整を取り消してセグメント本来の境界に戻す
    pub fn reset_boundaries(&mut self) {
        self.start = Boundary::Natural;
        self.end = Boundary::Natural;
    }

    /// 先頭セグメントの話者（エクスポート時のラベル）
    pub fn primary_speaker(&self) -> &str {
        self.segments
            .first()
            .map(|s| s.speaker.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("SPEAKER_00")
    }

    /// 実効的な開始が終了以降になっている
    ///
    /// 時刻順でないグループ同士を結合すると起こりうる。
    pub fn is_inverted(&self) -> bool {
        self.effective_start() >= self.effective_end()
    }
}

/// セグメントごとに1グループを作成（初期状態）
pub fn groups_from_segments(segments: &[AtomicSegment]) -> Vec<Group> {
    segments.iter().cloned().map(Group::from_segment).collect()
}

/// グループを次のグループと結合
///
/// 開始側の調整は左から、終了側の調整は右から引き継ぐ。
/// 文字起こしは空でないものを半角スペースで連結する。
/// 開始と終了の順序は検査しないので、結果が [`Group::is_inverted`] になることがある。
///
/// # Errors
///
/// `index` が最後のグループ（または範囲外）の場合
pub fn merge_with_next(groups: &mut Vec<Group>, index: usize) -> Result<(), EditorError> {
    if index + 1 >= groups.len() {
        return Err(EditorError::Invariant(
            "最後のグループは次のグループと結合できません".to_string(),
        ));
    }

    let next = groups.remove(index + 1);
    let current = &mut groups[index];

    current.segments.extend(next.segments);
    current.transcript = [current.transcript.as_str(), next.transcript.as_str()]
        .iter()
        .filter(|t| !t.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    current.end = next.end;

    Ok(())
}

/// グループを `after_segment` 個目のセグメントの後ろで2つに分割
///
/// 左側は開始側の調整を引き継ぎ、文字起こしは空になる。
/// 右側は終了側の調整と元の文字起こしを引き継ぐ。
///
/// # Errors
///
/// セグメントが1個しかない場合、または `0 < after_segment < len` でない場合
pub fn split_group(
    groups: &mut Vec<Group>,
    index: usize,
    after_segment: usize,
) -> Result<(), EditorError> {
    let group = groups.get(index).ok_or_else(|| {
        EditorError::Invariant(format!("グループ {} は存在しません", index + 1))
    })?;

    let len = group.segments.len();
    if len < 2 {
        return Err(EditorError::Invariant(
            "セグメントが1個のため分割できません".to_string(),
        ));
    }
    if after_segment == 0 || after_segment >= len {
        return Err(EditorError::Invariant(format!(
            "分割位置は 1 から {} の範囲で指定してください",
            len - 1
        )));
    }

    let Group {
        mut segments,
        transcript,
        start,
        end,
    } = groups.remove(index);
    let right_segments = segments.split_off(after_segment);

    let left = Group {
        segments,
        transcript: String::new(),
        start,
        end: Boundary::Natural,
    };
    let right = Group {
        segments: right_segments,
        transcript,
        start: Boundary::Natural,
        end,
    };

    groups.insert(index, right);
    groups.insert(index, left);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: i64, start: f64, end: f64, speaker: &str, transcript: &str) -> AtomicSegment {
        AtomicSegment {
            id,
            audio_file_id: 1,
            start,
            end,
            speaker: speaker.to_string(),
            has_overlap: false,
            selected: false,
            transcript: transcript.to_string(),
        }
    }

    fn sample_groups() -> Vec<Group> {
        groups_from_segments(&[
            segment(1, 0.0, 2.0, "SPEAKER_00", "こんにちは"),
            segment(2, 2.0, 3.5, "SPEAKER_01", "はい"),
            segment(3, 3.5, 6.0, "SPEAKER_00", ""),
            segment(4, 6.0, 8.0, "SPEAKER_01", "どうぞ"),
        ])
    }

    #[test]
    fn test_effective_bounds_natural() {
        let groups = sample_groups();
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[1].effective_start(), 2.0);
        assert_eq!(groups[1].effective_end(), 3.5);
        assert_eq!(groups[1].transcript, "はい");
        assert!(!groups[1].is_adjusted());
    }

    #[test]
    fn test_adjust_clamps_to_total_duration() {
        let mut group = Group::from_segment(segment(1, 2.0, 4.0, "SPEAKER_00", ""));
        let limits = BoundaryLimits::new(10.0);

        assert!(group.adjust_boundary(Edge::End, 10.0, &limits));
        assert_eq!(group.effective_end(), 10.0);
        assert!(group.is_adjusted());
    }

    #[test]
    fn test_adjust_start_rejected_past_end() {
        let mut group = Group::from_segment(segment(1, 2.0, 4.0, "SPEAKER_00", ""));
        let limits = BoundaryLimits::new(10.0);
        assert!(group.adjust_boundary(Edge::End, 10.0, &limits));

        // 2.0 + 9.0 = 11.0 -> 10.0 に丸められ、10.0 < 9.9 を満たさない
        assert!(!group.adjust_boundary(Edge::Start, 9.0, &limits));
        assert_eq!(group.effective_start(), 2.0);
        assert_eq!(group.start_boundary(), Boundary::Natural);

        // 2.0 + 5.0 = 7.0 は許可される
        assert!(group.adjust_boundary(Edge::Start, 5.0, &limits));
        assert_eq!(group.effective_start(), 7.0);
    }

    #[test]
    fn test_start_clamped_at_zero() {
        let mut group = Group::from_segment(segment(1, 0.3, 4.0, "SPEAKER_00", ""));
        let limits = BoundaryLimits::new(10.0);
        assert!(group.adjust_boundary(Edge::Start, -0.5, &limits));
        assert_eq!(group.effective_start(), 0.0);
    }

    #[test]
    fn test_exact_min_gap_is_rejected() {
        let mut group = Group::from_segment(segment(1, 2.0, 4.0, "SPEAKER_00", ""));
        let limits = BoundaryLimits::new(10.0);
        assert!(!group.set_boundary(Edge::Start, 3.9, &limits));
        assert!(!group.set_boundary(Edge::End, 2.1, &limits));
        assert!(group.set_boundary(Edge::End, 2.2, &limits));
        assert_eq!(group.effective_end(), 2.2);
    }

    #[test]
    fn test_boundary_rounded_to_centiseconds() {
        let mut group = Group::from_segment(segment(1, 2.0, 4.0, "SPEAKER_00", ""));
        let limits = BoundaryLimits::new(10.0);
        assert!(group.set_boundary(Edge::End, 5.1234, &limits));
        assert_eq!(group.end_boundary(), Boundary::Override(5.12));
    }

    #[test]
    fn test_non_finite_time_is_ignored() {
        let mut group = Group::from_segment(segment(1, 2.0, 4.0, "SPEAKER_00", ""));
        let limits = BoundaryLimits::new(10.0);
        assert!(!group.set_boundary(Edge::End, f64::NAN, &limits));
        assert!(!group.is_adjusted());
    }

    #[test]
    fn test_min_gap_holds_after_mutation_sequence() {
        let mut groups = sample_groups();
        let limits = BoundaryLimits::new(8.0);

        // 決定的な疑似乱数で操作列を生成
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;

            let index = (seed % groups.len() as u64) as usize;
            let edge = if seed & 0x100 == 0 { Edge::Start } else { Edge::End };
            let value = ((seed >> 20) % 2000) as f64 / 100.0 - 6.0;

            if seed & 0x200 == 0 {
                groups[index].adjust_boundary(edge, value, &limits);
            } else {
                groups[index].set_boundary(edge, value, &limits);
            }

            for group in &groups {
                assert!(group.duration() >= 0.1 - 1e-9);
                assert!(group.effective_start() >= 0.0);
                assert!(group.effective_end() <= 8.0);
            }
        }
    }

    #[test]
    fn test_reset_restores_natural_bounds() {
        let mut groups = sample_groups();
        let limits = BoundaryLimits::new(8.0);
        assert!(groups[2].adjust_boundary(Edge::Start, -0.5, &limits));
        assert!(groups[2].adjust_boundary(Edge::End, 0.7, &limits));

        groups[2].reset_boundaries();

        assert_eq!(groups[2].effective_start(), 3.5);
        assert_eq!(groups[2].effective_end(), 6.0);
        assert!(!groups[2].is_adjusted());
    }

    #[test]
    fn test_merge_with_next() {
        let mut groups = sample_groups();
        let limits = BoundaryLimits::new(8.0);
        assert!(groups[0].adjust_boundary(Edge::Start, 0.2, &limits));
        assert!(groups[1].adjust_boundary(Edge::End, 0.3, &limits));
        // 右グループの開始調整は結合で失われる
        assert!(groups[1].adjust_boundary(Edge::Start, 0.1, &limits));

        merge_with_next(&mut groups, 0).unwrap();

        assert_eq!(groups.len(), 3);
        let merged = &groups[0];
        assert_eq!(merged.segments().len(), 2);
        assert_eq!(merged.transcript, "こんにちは はい");
        assert_eq!(merged.start_boundary(), Boundary::Override(0.2));
        assert_eq!(merged.end_boundary(), Boundary::Override(3.8));
        assert_eq!(groups[1].segments()[0].id, 3);
    }

    #[test]
    fn test_merge_out_of_order_groups_inverts() {
        let mut groups = groups_from_segments(&[
            segment(1, 8.0, 10.0, "SPEAKER_00", ""),
            segment(2, 2.0, 4.0, "SPEAKER_01", ""),
        ]);
        assert!(!groups[0].is_inverted());

        merge_with_next(&mut groups, 0).unwrap();

        assert_eq!(groups[0].effective_start(), 8.0);
        assert_eq!(groups[0].effective_end(), 4.0);
        assert!(groups[0].is_inverted());
    }

    #[test]
    fn test_merge_skips_empty_transcripts() {
        let mut groups = sample_groups();
        merge_with_next(&mut groups, 1).unwrap();
        assert_eq!(groups[1].transcript, "はい");
    }

    #[test]
    fn test_merge_last_group_rejected() {
        let mut groups = sample_groups();
        let result = merge_with_next(&mut groups, 3);
        assert!(matches!(result, Err(EditorError::Invariant(_))));
        assert_eq!(groups.len(), 4);
    }

    #[test]
    fn test_split_group() {
        let mut groups = sample_groups();
        merge_with_next(&mut groups, 0).unwrap();
        merge_with_next(&mut groups, 0).unwrap();
        assert_eq!(groups[0].segments().len(), 3);

        split_group(&mut groups, 0, 1).unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].segments().len(), 1);
        assert_eq!(groups[0].transcript, "");
        assert_eq!(groups[1].segments().len(), 2);
        assert_eq!(groups[1].transcript, "こんにちは はい");
        assert_eq!(groups[1].effective_start(), 2.0);
    }

    #[test]
    fn test_merge_then_split_restores_segments() {
        let original = sample_groups();
        let mut groups = original.clone();
        let limits = BoundaryLimits::new(8.0);
        assert!(groups[1].adjust_boundary(Edge::Start, -0.4, &limits));
        assert!(groups[2].adjust_boundary(Edge::End, 0.5, &limits));

        merge_with_next(&mut groups, 1).unwrap();
        split_group(&mut groups, 1, 1).unwrap();

        let ids: Vec<i64> = groups
            .iter()
            .flat_map(|g| g.segments().iter().map(|s| s.id))
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        // 外側の調整は維持される
        assert_eq!(groups[1].start_boundary(), Boundary::Override(1.6));
        assert_eq!(groups[2].end_boundary(), Boundary::Override(6.5));
        // 左半分の文字起こしは消え、右半分が結合後の文字起こしを持つ
        assert_eq!(groups[1].transcript, "");
        assert_eq!(groups[2].transcript, "はい");
    }

    #[test]
    fn test_split_invalid_offsets() {
        let mut groups = sample_groups();
        assert!(split_group(&mut groups, 0, 1).is_err());

        merge_with_next(&mut groups, 0).unwrap();
        assert!(split_group(&mut groups, 0, 0).is_err());
        assert!(split_group(&mut groups, 0, 2).is_err());
        assert!(split_group(&mut groups, 9, 1).is_err());
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_speakers_and_overlap() {
        let mut segments = vec![
            segment(1, 0.0, 1.0, "SPEAKER_01", ""),
            segment(2, 1.0, 2.0, "SPEAKER_00", ""),
            segment(3, 2.0, 3.0, "SPEAKER_01", ""),
        ];
        segments[1].has_overlap = true;
        let mut groups = groups_from_segments(&segments);
        merge_with_next(&mut groups, 0).unwrap();
        merge_with_next(&mut groups, 0).unwrap();
        let group = &groups[0];
        assert_eq!(group.speakers(), vec!["SPEAKER_01", "SPEAKER_00"]);
        assert!(group.has_overlap());
        assert_eq!(group.primary_speaker(), "SPEAKER_01");
    }
}
