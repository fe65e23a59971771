use thiserror::Error;

/// エディタ操作のエラー
///
/// 通信・バックエンド拒否・ローカルな不変条件違反・確認待ちを区別する。
/// 境界のドラッグや微調整での違反はエラーにせず、黙って無視する
/// （[`crate::group::Group::set_boundary`] は `false` を返すだけ）。
#[derive(Error, Debug)]
pub enum EditorError {
    /// 通信レベルの失敗（接続拒否、切断など）
    #[error("通信エラー: {0}")]
    Network(String),

    /// バックエンドが `success: false` を返した
    #[error("{0}")]
    Rejected(String),

    /// レスポンスの形式が不正
    #[error("不正なレスポンス: {0}")]
    InvalidResponse(String),

    /// ローカルで検出した操作ミス（分割位置の範囲外、最後のグループの結合など）
    #[error("{0}")]
    Invariant(String),

    /// 文字起こしが空のグループがある（確認後に強制実行できる）
    #[error("{count} 個のグループの文字起こしが空です")]
    EmptyTranscripts { count: usize },

    /// 同じ種類の操作が実行中
    #[error("{0} は実行中です")]
    Busy(&'static str),

    /// 音声データのデコード失敗
    #[error("音声デコードエラー: {0}")]
    Decode(String),

    /// 出力デバイスでの再生失敗
    #[error("再生エラー: {0}")]
    Playback(String),
}

impl EditorError {
    /// 操作者への通知を一時的なもの（トースト）として扱うべきか
    ///
    /// 通信失敗は一時的な通知、それ以外は内容をそのまま表示する。
    pub fn is_transient(&self) -> bool {
        matches!(self, EditorError::Network(_) | EditorError::Busy(_))
    }
}

impl From<reqwest::Error> for EditorError {
    fn from(e: reqwest::Error) -> Self {
        EditorError::Network(e.to_string())
    }
}

impl From<hound::Error> for EditorError {
    fn from(e: hound::Error) -> Self {
        EditorError::Decode(e.to_string())
    }
}

impl From<claxon::Error> for EditorError {
    fn from(e: claxon::Error) -> Self {
        EditorError::Decode(format!("{:?}", e))
    }
}
