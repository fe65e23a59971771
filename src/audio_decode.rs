use crate::error::EditorError;
use crate::types::Seconds;
use std::io::Cursor;
use std::sync::Arc;

/// デコード済みの音声
///
/// 波形表示用に先頭チャンネルのみを -1.0〜1.0 の `f32` で保持する。
/// デコード後は読み取り専用で、描画側と共有しても同期は不要。
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAudio {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl DecodedAudio {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// 共有用のハンドル
    pub fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// 音声の長さ (秒)
    pub fn duration(&self) -> Seconds {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// 音声デコード機能
///
/// 取得した音声ファイルのバイト列をサンプル列に変換する。
/// 実行環境のデコーダに差し替えられるようトレイトにしている。
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio, EditorError>;
}

/// WAV / FLAC に対応する標準デコーダ
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultDecoder;

impl AudioDecoder for DefaultDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio, EditorError> {
        decode_audio(bytes)
    }
}

/// マジックナンバーで形式を判定してデコード
pub fn decode_audio(bytes: &[u8]) -> Result<DecodedAudio, EditorError> {
    if bytes.starts_with(b"RIFF") {
        decode_wav(bytes)
    } else if bytes.starts_with(b"fLaC") {
        decode_flac(bytes)
    } else {
        Err(EditorError::Decode(format!(
            "未対応の音声形式です ({} バイト)",
            bytes.len()
        )))
    }
}

fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, EditorError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(channels)
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    log::debug!(
        "WAVデコード完了: {} Hz, {} ch, {} bit, {} サンプル",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        samples.len()
    );

    Ok(DecodedAudio::from_samples(samples, spec.sample_rate))
}

fn decode_flac(bytes: &[u8]) -> Result<DecodedAudio, EditorError> {
    let mut reader = claxon::FlacReader::new(Cursor::new(bytes))?;
    let streaminfo = reader.streaminfo();
    let channels = streaminfo.channels.max(1) as usize;
    let scale = (1i64 << (streaminfo.bits_per_sample.max(1) - 1)) as f32;
    let total_frames = streaminfo.samples.unwrap_or(0) as usize;

    let mut samples: Vec<f32> = reader
        .samples()
        .step_by(channels)
        .map(|s| s.map(|v| v as f32 / scale))
        .collect::<Result<_, _>>()?;

    // ブロック境界のパディングを除去
    if total_frames > 0 && samples.len() > total_frames {
        samples.truncate(total_frames);
    }

    log::debug!(
        "FLACデコード完了: {} Hz, {} ch, {} bit, {} サンプル",
        streaminfo.sample_rate,
        streaminfo.channels,
        streaminfo.bits_per_sample,
        samples.len()
    );

    Ok(DecodedAudio::from_samples(samples, streaminfo.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, write: impl FnOnce(&mut hound::WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono_i16_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for _ in 0..4000 {
                w.write_sample(16384i16).unwrap();
            }
            for _ in 0..4000 {
                w.write_sample(-32768i16).unwrap();
            }
        });

        let audio = decode_audio(&bytes).unwrap();
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.samples().len(), 8000);
        assert!((audio.duration() - 1.0).abs() < 1e-9);
        assert!((audio.samples()[0] - 0.5).abs() < 1e-6);
        assert_eq!(audio.samples()[7999], -1.0);
    }

    #[test]
    fn test_decode_stereo_uses_first_channel() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for _ in 0..1600 {
                w.write_sample(8192i16).unwrap(); // 左
                w.write_sample(-8192i16).unwrap(); // 右
            }
        });

        let audio = decode_audio(&bytes).unwrap();
        assert_eq!(audio.samples().len(), 1600);
        assert!(audio.samples().iter().all(|&s| (s - 0.25).abs() < 1e-6));
        assert!((audio.duration() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_float_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 4,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let bytes = wav_bytes(spec, |w| {
            for v in [0.0f32, 0.25, -0.75, 1.0] {
                w.write_sample(v).unwrap();
            }
        });

        let audio = DefaultDecoder.decode(&bytes).unwrap();
        assert_eq!(audio.samples(), &[0.0, 0.25, -0.75, 1.0]);
        assert_eq!(audio.duration(), 1.0);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = decode_audio(b"ID3\x04 definitely not audio");
        assert!(matches!(result, Err(EditorError::Decode(_))));
    }

    #[test]
    fn test_truncated_wav_rejected() {
        let result = decode_audio(b"RIFF\x00\x00");
        assert!(matches!(result, Err(EditorError::Decode(_))));
    }

    #[test]
    fn test_truncated_flac_rejected() {
        let result = decode_audio(b"fLaC\x00");
        assert!(matches!(result, Err(EditorError::Decode(_))));
    }

    #[test]
    fn test_shared_samples_point_to_same_buffer() {
        let audio = DecodedAudio::from_samples(vec![0.1, 0.2], 2);
        let shared = audio.shared_samples();
        assert!(std::ptr::eq(shared.as_ptr(), audio.samples().as_ptr()));
        assert_eq!(DecodedAudio::from_samples(vec![0.0; 10], 0).duration(), 0.0);
    }
}
