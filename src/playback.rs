use crate::audio_decode::DecodedAudio;
use crate::config::PlaybackConfig;
use crate::error::EditorError;
use crate::types::Seconds;
use std::ops::Range;
use std::sync::Arc;

/// 再生する区間
///
/// デコード済みのサンプル列を共有したまま、区間だけを持つ。
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackClip {
    samples: Arc<[f32]>,
    sample_rate: u32,
    range: Range<usize>,
}

impl PlaybackClip {
    /// `start`〜`end` 秒の区間を切り出す（音声の範囲に丸める）
    ///
    /// 区間が空になる場合は `None`。
    pub fn from_audio(audio: &DecodedAudio, start: Seconds, end: Seconds) -> Option<Self> {
        let samples = audio.shared_samples();
        let rate = audio.sample_rate() as f64;
        let index = |t: Seconds| ((t * rate).round().max(0.0) as usize).min(samples.len());

        let range = index(start)..index(end);
        if range.is_empty() {
            return None;
        }
        Some(Self {
            sample_rate: audio.sample_rate(),
            range,
            samples,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples[self.range.clone()]
    }

    /// 元の音声でのサンプル位置
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Seconds {
        self.range.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// 音声出力
///
/// 再生中に次の `play` が来たら前の再生は止める。
pub trait AudioSink {
    fn play(&mut self, clip: PlaybackClip) -> Result<(), EditorError>;
    fn stop(&mut self);
}

/// 出力デバイスがない場合の出力（再生要求はエラーにする）
#[derive(Debug)]
pub struct NoOutput {
    reason: String,
}

impl NoOutput {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl AudioSink for NoOutput {
    fn play(&mut self, _clip: PlaybackClip) -> Result<(), EditorError> {
        Err(EditorError::Playback(self.reason.clone()))
    }

    fn stop(&mut self) {}
}

/// 設定に従って出力を開く（開けなければ再生なしで続ける）
#[cfg(feature = "playback")]
pub fn open_output(config: &PlaybackConfig) -> Box<dyn AudioSink> {
    match output::DeviceOutput::new(config.device.as_deref()) {
        Ok(output) => Box::new(output),
        Err(e) => {
            log::warn!("出力デバイスを開けません。再生は無効です: {}", e);
            Box::new(NoOutput::new(e.to_string()))
        }
    }
}

/// 設定に従って出力を開く（再生なしのビルド）
#[cfg(not(feature = "playback"))]
pub fn open_output(config: &PlaybackConfig) -> Box<dyn AudioSink> {
    if let Some(device) = &config.device {
        log::warn!("playback フィーチャーなしでビルドされているため {} は使いません", device);
    }
    Box::new(NoOutput::new("playback フィーチャーなしでビルドされています"))
}

#[cfg(feature = "playback")]
mod output {
    use super::{AudioSink, PlaybackClip};
    use crate::error::EditorError;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};

    fn playback_error(e: impl std::fmt::Display) -> EditorError {
        EditorError::Playback(e.to_string())
    }

    /// cpal の出力デバイス
    pub struct DeviceOutput {
        device: Device,
        stream: Option<Stream>,
    }

    impl DeviceOutput {
        pub fn new(device_name: Option<&str>) -> Result<Self, EditorError> {
            let host = cpal::default_host();

            let device = if let Some(name) = device_name {
                host.output_devices()
                    .map_err(playback_error)?
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| {
                        EditorError::Playback(format!("出力デバイス '{}' が見つかりません", name))
                    })?
            } else {
                host.default_output_device().ok_or_else(|| {
                    EditorError::Playback("デフォルト出力デバイスが見つかりません".to_string())
                })?
            };

            log::info!("出力デバイス: {}", device.name().map_err(playback_error)?);

            Ok(Self {
                device,
                stream: None,
            })
        }

        /// 区間を先頭から流し、終わったら無音を出す
        fn build_stream<T>(&self, config: &StreamConfig, clip: PlaybackClip) -> Result<Stream, EditorError>
        where
            T: SizedSample + FromSample<f32> + Send + 'static,
        {
            let mut position = 0;
            self.device
                .build_output_stream(
                    config,
                    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                        let samples = clip.samples();
                        for out in data.iter_mut() {
                            *out = match samples.get(position) {
                                Some(&v) => {
                                    position += 1;
                                    T::from_sample(v)
                                }
                                None => T::EQUILIBRIUM,
                            };
                        }
                    },
                    move |err| {
                        log::error!("出力ストリームエラー: {}", err);
                    },
                    None,
                )
                .map_err(playback_error)
        }
    }

    impl AudioSink for DeviceOutput {
        fn play(&mut self, clip: PlaybackClip) -> Result<(), EditorError> {
            self.stop();

            let default_config = self.device.default_output_config().map_err(playback_error)?;
            let config = StreamConfig {
                channels: 1,
                sample_rate: cpal::SampleRate(clip.sample_rate()),
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = match default_config.sample_format() {
                SampleFormat::F32 => self.build_stream::<f32>(&config, clip)?,
                SampleFormat::I16 => self.build_stream::<i16>(&config, clip)?,
                SampleFormat::U16 => self.build_stream::<u16>(&config, clip)?,
                other => {
                    return Err(EditorError::Playback(format!(
                        "サポートされていないサンプルフォーマット: {:?}",
                        other
                    )))
                }
            };
            stream.play().map_err(playback_error)?;

            self.stream = Some(stream);
            Ok(())
        }

        fn stop(&mut self) {
            if self.stream.take().is_some() {
                log::debug!("再生を停止しました");
            }
        }
    }

    impl Drop for DeviceOutput {
        fn drop(&mut self) {
            self.stop();
        }
    }
}
