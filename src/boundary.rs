use crate::config::WaveformConfig;
use crate::group::{BoundaryLimits, Group};
use crate::types::{ActiveDrag, Edge, Seconds};
use crate::waveform::TimeAxis;

/// ポインタ位置に応じたカーソル形状
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    /// 境界ハンドルの上（左右リサイズ）
    Resize,
}

/// 入力処理後に必要な再描画
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderRequest {
    /// 何もしない
    None,
    /// カーソル形状の変更のみ
    Cursor(CursorHint),
    /// 波形と該当グループの表示値のみ描き直す
    Waveform { group: usize },
    /// 一覧を含めて作り直す
    Full,
}

/// 境界のドラッグ・微調整を扱うコントローラ
///
/// 状態は持たず、ドラッグ中かどうかは呼び出し側の `Option<ActiveDrag>` で表す。
///
/// ```text
/// Idle ──press(ハンドル上)──→ Dragging ──move──→ Dragging（差分描画）
///   ↑                            │
///   └──────release / leave───────┘（全体を1回だけ再描画）
/// ```
#[derive(Clone, Copy, Debug)]
pub struct BoundaryController {
    tolerance_px: f32,
}

impl Default for BoundaryController {
    fn default() -> Self {
        Self::new(8.0)
    }
}

impl BoundaryController {
    pub fn new(tolerance_px: f32) -> Self {
        Self { tolerance_px }
    }

    pub fn from_config(config: &WaveformConfig) -> Self {
        Self::new(config.handle_tolerance_px)
    }

    /// `x` に最も早く一致するハンドルを探す
    ///
    /// リスト順に走査し、各グループで開始側を終了側より先に調べる。
    /// 距離は許容値未満（境界値は含まない）で一致とみなす。
    pub fn hit_test(&self, groups: &[Group], axis: &TimeAxis, x: f32) -> Option<ActiveDrag> {
        groups.iter().enumerate().find_map(|(group_index, group)| {
            [Edge::Start, Edge::End].into_iter().find_map(|edge| {
                let edge_x = axis.time_to_x(group.effective(edge));
                ((x - edge_x).abs() < self.tolerance_px).then_some(ActiveDrag { group_index, edge })
            })
        })
    }

    pub fn press(
        &self,
        drag: &mut Option<ActiveDrag>,
        groups: &[Group],
        axis: &TimeAxis,
        x: f32,
    ) -> RenderRequest {
        if drag.is_some() {
            return RenderRequest::None;
        }
        match self.hit_test(groups, axis, x) {
            Some(hit) => {
                log::debug!("ドラッグ開始: G{} {:?}", hit.group_index + 1, hit.edge);
                *drag = Some(hit);
                RenderRequest::Cursor(CursorHint::Resize)
            }
            None => RenderRequest::None,
        }
    }

    pub fn pointer_move(
        &self,
        drag: &mut Option<ActiveDrag>,
        groups: &mut [Group],
        axis: &TimeAxis,
        limits: &BoundaryLimits,
        x: f32,
    ) -> RenderRequest {
        let Some(active) = *drag else {
            let hint = if self.hit_test(groups, axis, x).is_some() {
                CursorHint::Resize
            } else {
                CursorHint::Default
            };
            return RenderRequest::Cursor(hint);
        };

        let Some(group) = groups.get_mut(active.group_index) else {
            // ドラッグ中にグループ構成が変わった
            *drag = None;
            return RenderRequest::Full;
        };

        let time = axis.x_to_time(x);
        group.set_boundary(active.edge, time, limits);
        RenderRequest::Waveform {
            group: active.group_index,
        }
    }

    /// ドラッグ終了（最後に受理された値で確定）
    pub fn release(&self, drag: &mut Option<ActiveDrag>) -> RenderRequest {
        match drag.take() {
            Some(active) => {
                log::debug!("ドラッグ終了: G{} {:?}", active.group_index + 1, active.edge);
                RenderRequest::Full
            }
            None => RenderRequest::None,
        }
    }

    /// ポインタが描画領域の外に出た
    pub fn leave(&self, drag: &mut Option<ActiveDrag>) -> RenderRequest {
        self.release(drag)
    }

    /// ボタン・キーによる微調整
    pub fn nudge(
        &self,
        groups: &mut [Group],
        index: usize,
        edge: Edge,
        delta: Seconds,
        limits: &BoundaryLimits,
    ) -> RenderRequest {
        match groups.get_mut(index) {
            Some(group) => {
                group.adjust_boundary(edge, delta, limits);
                RenderRequest::Waveform { group: index }
            }
            None => RenderRequest::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::groups_from_segments;
    use crate::types::{AtomicSegment, Boundary};

    fn segment(id: i64, start: f64, end: f64) -> AtomicSegment {
        AtomicSegment {
            id,
            audio_file_id: 1,
            start,
            end,
            speaker: "SPEAKER_00".to_string(),
            has_overlap: false,
            selected: false,
            transcript: String::new(),
        }
    }

    /// 幅700px・10秒（1秒 = 70px）
    fn fixture() -> (Vec<Group>, TimeAxis, BoundaryLimits) {
        let groups = groups_from_segments(&[segment(1, 1.0, 3.0), segment(2, 3.0, 6.0)]);
        (groups, TimeAxis::new(700.0, 10.0), BoundaryLimits::new(10.0))
    }

    #[test]
    fn test_hit_test_tolerance_is_strict() {
        let (groups, axis, _) = fixture();
        let controller = BoundaryController::default();

        // G1 開始は x = 70
        assert_eq!(
            controller.hit_test(&groups, &axis, 77.9),
            Some(ActiveDrag {
                group_index: 0,
                edge: Edge::Start
            })
        );
        assert_eq!(controller.hit_test(&groups, &axis, 78.0), None);
        assert_eq!(controller.hit_test(&groups, &axis, 350.0), None);
    }

    #[test]
    fn test_hit_test_first_match_wins() {
        let (groups, axis, _) = fixture();
        let controller = BoundaryController::default();

        // x = 210 は G1 終了と G2 開始が重なる。先に走査する G1 が優先
        assert_eq!(
            controller.hit_test(&groups, &axis, 211.0),
            Some(ActiveDrag {
                group_index: 0,
                edge: Edge::End
            })
        );
    }

    #[test]
    fn test_drag_press_move_release() {
        let (mut groups, axis, limits) = fixture();
        let controller = BoundaryController::default();
        let mut drag = None;

        // G2 終了 (x = 420) をつかむ
        assert_eq!(
            controller.press(&mut drag, &groups, &axis, 421.0),
            RenderRequest::Cursor(CursorHint::Resize)
        );
        assert_eq!(
            drag,
            Some(ActiveDrag {
                group_index: 1,
                edge: Edge::End
            })
        );

        let mut full_renders = 0;
        for x in [450.0, 490.0, 525.0] {
            let request = controller.pointer_move(&mut drag, &mut groups, &axis, &limits, x);
            assert_eq!(request, RenderRequest::Waveform { group: 1 });
        }
        assert_eq!(groups[1].effective_end(), 7.5);

        if controller.release(&mut drag) == RenderRequest::Full {
            full_renders += 1;
        }
        if controller.release(&mut drag) == RenderRequest::Full {
            full_renders += 1;
        }
        assert_eq!(full_renders, 1);
        assert!(drag.is_none());
        assert_eq!(groups[1].end_boundary(), Boundary::Override(7.5));
    }

    #[test]
    fn test_drag_keeps_last_valid_value() {
        let (mut groups, axis, limits) = fixture();
        let controller = BoundaryController::default();
        let mut drag = None;

        controller.press(&mut drag, &groups, &axis, 70.0);
        controller.pointer_move(&mut drag, &mut groups, &axis, &limits, 140.0);
        assert_eq!(groups[0].effective_start(), 2.0);

        // 終了 (3.0) の手前 0.1 秒以内は拒否される
        controller.pointer_move(&mut drag, &mut groups, &axis, &limits, 207.0);
        assert_eq!(groups[0].effective_start(), 2.0);

        assert_eq!(controller.leave(&mut drag), RenderRequest::Full);
        assert_eq!(groups[0].effective_start(), 2.0);
    }

    #[test]
    fn test_idle_move_reports_cursor() {
        let (mut groups, axis, limits) = fixture();
        let controller = BoundaryController::default();
        let mut drag = None;

        assert_eq!(
            controller.pointer_move(&mut drag, &mut groups, &axis, &limits, 72.0),
            RenderRequest::Cursor(CursorHint::Resize)
        );
        assert_eq!(
            controller.pointer_move(&mut drag, &mut groups, &axis, &limits, 300.0),
            RenderRequest::Cursor(CursorHint::Default)
        );
        assert_eq!(controller.press(&mut drag, &groups, &axis, 300.0), RenderRequest::None);
        assert!(drag.is_none());
        assert!(!groups[0].is_adjusted());
    }

    #[test]
    fn test_drag_past_clip_end_is_clamped() {
        let (mut groups, axis, limits) = fixture();
        let controller = BoundaryController::default();
        let mut drag = None;

        controller.press(&mut drag, &groups, &axis, 420.0);
        controller.pointer_move(&mut drag, &mut groups, &axis, &limits, 900.0);
        assert_eq!(groups[1].effective_end(), 10.0);
    }

    #[test]
    fn test_stale_drag_is_dropped() {
        let (mut groups, axis, limits) = fixture();
        let controller = BoundaryController::default();
        let mut drag = Some(ActiveDrag {
            group_index: 5,
            edge: Edge::Start,
        });

        assert_eq!(
            controller.pointer_move(&mut drag, &mut groups, &axis, &limits, 100.0),
            RenderRequest::Full
        );
        assert!(drag.is_none());
    }

    #[test]
    fn test_nudge() {
        let (mut groups, _, limits) = fixture();
        let controller = BoundaryController::default();

        assert_eq!(
            controller.nudge(&mut groups, 0, Edge::Start, -0.5, &limits),
            RenderRequest::Waveform { group: 0 }
        );
        assert_eq!(groups[0].effective_start(), 0.5);

        controller.nudge(&mut groups, 0, Edge::End, 0.1, &limits);
        assert_eq!(groups[0].effective_end(), 3.1);

        assert_eq!(
            controller.nudge(&mut groups, 9, Edge::End, 0.1, &limits),
            RenderRequest::None
        );
    }
}
