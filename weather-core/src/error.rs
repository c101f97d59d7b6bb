use thiserror::Error;

/// Failure taxonomy of a single weather query.
///
/// None of these variants carry credential material; `Display` is meant for
/// logs, [`QueryError::user_message`] for the conversation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The utterance contained nothing that looks like a place name.
    #[error("no location phrase found in the query")]
    NoLocationFound,

    /// The provider does not know the place.
    #[error("location not found: {place}")]
    LocationNotFound { place: String },

    /// Network failure, timeout, non-2xx status or a provider-side error code.
    #[error("weather provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    /// The provider rejected the configured API key.
    #[error("weather provider rejected the API key")]
    InvalidCredential,

    /// The payload could not be decoded or lacks required fields.
    #[error("malformed provider response{}", missing_suffix(.fields))]
    MalformedResponse { fields: Vec<String> },
}

impl QueryError {
    pub fn location_not_found(place: impl Into<String>) -> Self {
        Self::LocationNotFound { place: place.into() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable { reason: reason.into() }
    }

    pub fn malformed<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MalformedResponse { fields: fields.into_iter().map(Into::into).collect() }
    }

    /// Operator-facing failures point at configuration rather than at the user's question.
    pub fn is_operator_facing(&self) -> bool {
        matches!(self, QueryError::InvalidCredential)
    }

    /// Short localized sentence safe to hand back to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            QueryError::NoLocationFound => "请提供有效的城市名称",
            QueryError::LocationNotFound { .. } => "未能找到该地点的天气信息",
            QueryError::ProviderUnavailable { .. } => "天气服务暂时不可用，请稍后再试",
            QueryError::InvalidCredential => "天气服务配置有误（API Key 无效），请联系管理员检查配置",
            QueryError::MalformedResponse { .. } => "天气服务返回的数据异常，暂时无法提供天气信息",
        }
    }
}

fn missing_suffix(fields: &[String]) -> String {
    if fields.is_empty() { String::new() } else { format!(" (missing: {})", fields.join(", ")) }
}
