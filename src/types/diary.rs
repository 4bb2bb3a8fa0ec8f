use serde::Serialize;
use time::OffsetDateTime;

/// Request body for `POST /api/diary`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiaryParams {
    /// The diary or schedule text entered by the user.
    pub diary: String,
    /// When the entry applies, serialized as RFC 3339.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl DiaryParams {
    /// Creates a diary entry for a specific date.
    pub fn new<S: Into<String>>(diary: S, date: OffsetDateTime) -> Self {
        Self {
            diary: diary.into(),
            date,
        }
    }

    /// Creates a diary entry dated now.
    pub fn now<S: Into<String>>(diary: S) -> Self {
        Self::new(diary, OffsetDateTime::now_utc())
    }
}
