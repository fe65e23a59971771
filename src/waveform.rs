use crate::config::WaveformConfig;
use crate::group::Group;
use crate::types::{format_time, Seconds};

/// RGBA色
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// `dst` の上にアルファ合成した結果（結果は常に不透明）
    fn over(self, dst: Rgba) -> Rgba {
        if self.a == 0xff {
            return self;
        }
        let alpha = self.a as u32;
        let mix = |s: u8, d: u8| ((s as u32 * alpha + d as u32 * (255 - alpha) + 127) / 255) as u8;
        Rgba::rgb(mix(self.r, dst.r), mix(self.g, dst.g), mix(self.b, dst.b))
    }
}

/// 背景色
pub const BACKGROUND: Rgba = Rgba::rgb(0x1f, 0x29, 0x37);

/// 波形の色
pub const TRACE_COLOR: Rgba = Rgba::rgb(0x60, 0xa5, 0xfa);

/// 時刻目盛りの色
pub const TICK_COLOR: Rgba = Rgba::rgb(0x9c, 0xa3, 0xaf);

/// グループ番号ラベルの色
pub const LABEL_COLOR: Rgba = Rgba::rgb(0xff, 0xff, 0xff);

/// グループの帯の不透明度
const BAND_ALPHA: u8 = 0x40;

/// グループの枠線の太さ (px)
const BORDER_WIDTH: f32 = 2.0;

/// 時刻目盛りの線の長さ (px)
const TICK_LENGTH: f32 = 4.0;

const GROUP_COLORS: [Rgba; 8] = [
    Rgba::rgb(0x22, 0xc5, 0x5e), // 緑
    Rgba::rgb(0x3b, 0x82, 0xf6), // 青
    Rgba::rgb(0xf5, 0x9e, 0x0b), // 橙
    Rgba::rgb(0xec, 0x48, 0x99), // 桃
    Rgba::rgb(0x8b, 0x5c, 0xf6), // 紫
    Rgba::rgb(0x06, 0xb6, 0xd4), // 水色
    Rgba::rgb(0x84, 0xcc, 0x16), // 黄緑
    Rgba::rgb(0xf4, 0x3f, 0x5e), // 赤
];

/// グループ番号に対応する色（8色を循環）
pub fn group_color(index: usize) -> Rgba {
    GROUP_COLORS[index % GROUP_COLORS.len()]
}

/// 固定サイズのピクセルバッファ
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }


    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// 全体を塗りつぶす
    pub fn fill(&mut self, color: Rgba) {
        self.pixels.iter_mut().for_each(|p| *p = color);
    }

    /// 矩形を塗る（はみ出し部分は切り取る、半透明色は合成する）
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        if !(w > 0.0 && h > 0.0) {
            return;
        }
        let x0 = x.floor().max(0.0) as u32;
        let y0 = y.floor().max(0.0) as u32;
        let x1 = ((x + w).ceil().max(0.0) as u32).min(self.width);
        let y1 = ((y + h).ceil().max(0.0) as u32).min(self.height);

        for py in y0..y1 {
            let row = (py * self.width) as usize;
            for px in x0..x1 {
                let p = &mut self.pixels[row + px as usize];
                *p = color.over(*p);
            }
        }
    }

    /// 矩形の枠線を描く（線はパスの中央に乗る）
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, line_width: f32, color: Rgba) {
        let half = line_width / 2.0;
        self.fill_rect(x - half, y - half, w + line_width, line_width, color);
        self.fill_rect(x - half, y + h - half, w + line_width, line_width, color);
        self.fill_rect(x - half, y + half, line_width, h - line_width, color);
        self.fill_rect(x + w - half, y + half, line_width, h - line_width, color);
    }

    /// 1列の縦線を描く
    fn vline(&mut self, x: u32, y_a: f32, y_b: f32, color: Rgba) {
        if x >= self.width || self.height == 0 {
            return;
        }
        let top = y_a.min(y_b).floor().max(0.0) as u32;
        let bottom = (y_a.max(y_b).ceil() as u32).saturating_sub(1).max(top);
        let bottom = bottom.min(self.height - 1);

        for py in top..=bottom {
            let p = &mut self.pixels[(py * self.width + x) as usize];
            *p = color.over(*p);
        }
    }
}

/// テキストラベルの種類
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelKind {
    /// グループ番号（0始まりのインデックスを保持）
    GroupOrdinal(usize),
    /// 時刻目盛り
    TimeTick,
}

/// ラスタ上に重ねて表示するテキスト
///
/// 文字の描画は表示側に任せ、位置と内容だけを渡す。
/// `y` はベースライン位置。
#[derive(Clone, Debug, PartialEq)]
pub struct TextLabel {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub color: Rgba,
    pub kind: LabelKind,
}

/// 描画結果（ピクセルバッファとラベル）
#[derive(Clone, Debug, PartialEq)]
pub struct WaveformFrame {
    pub raster: Raster,
    pub labels: Vec<TextLabel>,
}

impl WaveformFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            raster: Raster::new(width, height),
            labels: Vec::new(),
        }
    }
}

/// 時刻とピクセルの線形対応
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeAxis {
    pub width: f32,
    pub total_duration: Seconds,
}

impl TimeAxis {
    pub fn new(width: f32, total_duration: Seconds) -> Self {
        Self {
            width,
            total_duration,
        }
    }

    /// `x = (t / total) * width`
    pub fn time_to_x(&self, time: Seconds) -> f32 {
        if self.total_duration <= 0.0 {
            return 0.0;
        }
        ((time / self.total_duration) * self.width as f64) as f32
    }

    /// ピクセル位置から時刻を求める（`[0, total]` に収める）
    pub fn x_to_time(&self, x: f32) -> Seconds {
        if self.width <= 0.0 || self.total_duration <= 0.0 {
            return 0.0;
        }
        ((x as f64 / self.width as f64) * self.total_duration).clamp(0.0, self.total_duration)
    }
}

/// 列ごとの (最小値, 最大値)
///
/// サンプルはデコード後に変更されないため、幅が同じなら使い回せる。
#[derive(Clone, Debug, PartialEq)]
pub struct WaveformPeaks {
    width: u32,
    columns: Vec<Option<(f32, f32)>>,
}

impl WaveformPeaks {
    /// サンプル列を `width` 個のバケットに分け、各バケットの最小・最大を求める
    ///
    /// バケットサイズは `ceil(サンプル数 / width)`。末尾の空バケットは `None`。
    pub fn compute(samples: &[f32], width: u32) -> Self {
        let mut columns = vec![None; width as usize];
        if samples.is_empty() || width == 0 {
            return Self { width, columns };
        }

        let step = samples.len().div_ceil(width as usize);
        for (i, column) in columns.iter_mut().enumerate() {
            let from = i * step;
            if from >= samples.len() {
                break;
            }
            let to = (from + step).min(samples.len());
            let (min, max) = samples[from..to]
                .iter()
                .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            *column = Some((min, max));
        }

        Self { width, columns }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn column(&self, x: usize) -> Option<(f32, f32)> {
        self.columns.get(x).copied().flatten()
    }
}

/// 波形レンダラ
///
/// デコード済み音声とグループ列からラスタ画像を決定的に生成する。
/// ドラッグ中は移動のたびに呼ばれるため、ピーク計算を省いた
/// [`WaveformRenderer::render_into`] で既存のフレームを描き直せる。
///
/// # 描画順
///
/// 1. 背景
/// 2. グループごとの帯・枠線・ハンドル・番号（リスト順、後のグループが上）
/// 3. 波形（列ごとの最小〜最大の縦線）
/// 4. 時刻目盛り（`ceil(total / 10)` 秒ごと）
#[derive(Clone, Debug)]
pub struct WaveformRenderer {
    width: u32,
    height: u32,
    handle_width: f32,
}

impl WaveformRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            handle_width: 6.0,
        }
    }

    pub fn from_config(config: &WaveformConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            handle_width: config.handle_width_px,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 描画サイズを変更（ハンドル幅は維持）
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn axis(&self, total_duration: Seconds) -> TimeAxis {
        TimeAxis::new(self.width as f32, total_duration)
    }

    /// 新しいフレームに描画
    pub fn render(&self, samples: &[f32], total_duration: Seconds, groups: &[Group]) -> WaveformFrame {
        let peaks = WaveformPeaks::compute(samples, self.width);
        let mut frame = WaveformFrame::new(self.width, self.height);
        self.render_into(&mut frame, &peaks, total_duration, groups);
        frame
    }

    /// 既存のフレームに描き直す（サイズが異なれば作り直す）
    pub fn render_into(
        &self,
        frame: &mut WaveformFrame,
        peaks: &WaveformPeaks,
        total_duration: Seconds,
        groups: &[Group],
    ) {
        if frame.raster.width() != self.width || frame.raster.height() != self.height {
            *frame = WaveformFrame::new(self.width, self.height);
        }
        frame.labels.clear();

        let raster = &mut frame.raster;
        let height = self.height as f32;
        let axis = self.axis(total_duration);

        // 1. 背景
        raster.fill(BACKGROUND);

        if total_duration <= 0.0 {
            return;
        }

        // 2. グループ
        for (index, group) in groups.iter().enumerate() {
            let x1 = axis.time_to_x(group.effective_start());
            let x2 = axis.time_to_x(group.effective_end());
            let color = group_color(index);

            raster.fill_rect(x1, 0.0, x2 - x1, height, color.with_alpha(BAND_ALPHA));
            raster.stroke_rect(x1, 0.0, x2 - x1, height, BORDER_WIDTH, color);

            let half = self.handle_width / 2.0;
            raster.fill_rect(x1 - half, 0.0, self.handle_width, height, color);
            raster.fill_rect(x2 - half, 0.0, self.handle_width, height, color);

            frame.labels.push(TextLabel {
                x: x1 + 5.0,
                y: 15.0,
                text: format!("G{}", index + 1),
                color: LABEL_COLOR,
                kind: LabelKind::GroupOrdinal(index),
            });
        }

        // 3. 波形
        let columns = peaks.width().min(self.width);
        if peaks.width() != self.width {
            log::debug!(
                "ピーク幅 {} とラスタ幅 {} が一致しません",
                peaks.width(),
                self.width
            );
        }
        for x in 0..columns {
            if let Some((min, max)) = peaks.column(x as usize) {
                let y_min = ((1.0 + min) / 2.0) * height;
                let y_max = ((1.0 + max) / 2.0) * height;
                raster.vline(x, y_min, y_max, TRACE_COLOR);
            }
        }

        // 4. 時刻目盛り
        let step = (total_duration / 10.0).ceil().max(1.0);
        let mut t = 0.0;
        while t <= total_duration {
            let x = axis.time_to_x(t);
            raster.fill_rect(x, 0.0, 1.0, TICK_LENGTH, TICK_COLOR);
            frame.labels.push(TextLabel {
                x: x + 2.0,
                y: height - 3.0,
                text: format_time(t),
                color: TICK_COLOR,
                kind: LabelKind::TimeTick,
            });
            t += step;
        }
    }
}
