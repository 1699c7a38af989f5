pub type CardpressResult<T> = Result<T, CardpressError>;

#[derive(thiserror::Error, Debug)]
pub enum CardpressError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("compile error: {0}")]
    Compile(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CardpressError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            CardpressError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            CardpressError::compile("x")
                .to_string()
                .contains("compile error:")
        );
        assert!(
            CardpressError::session("x")
                .to_string()
                .contains("session error:")
        );
        assert!(
            CardpressError::render("x")
                .to_string()
                .contains("render error:")
        );
        assert!(
            CardpressError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = CardpressError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
