use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use super::{ResponseGenerator, ResponseRequest};

/// Tries `primary`, answers from `fallback` when it errors or comes back blank.
pub struct FallbackGenerator<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackGenerator<P, F>
where
    P: ResponseGenerator,
    F: ResponseGenerator,
{
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P, F> ResponseGenerator for FallbackGenerator<P, F>
where
    P: ResponseGenerator,
    F: ResponseGenerator,
{
    async fn generate(&self, request: &ResponseRequest) -> Result<String> {
        match self.primary.generate(request).await {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => {
                warn!(
                    "{} returned an empty reply, falling back to {}",
                    self.primary.name(),
                    self.fallback.name()
                );
                self.fallback.generate(request).await
            }
            Err(err) => {
                warn!(
                    "{} failed ({err:#}), falling back to {}",
                    self.primary.name(),
                    self.fallback.name()
                );
                self.fallback.generate(request).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::MoodState;
    use anyhow::bail;

    struct Fixed(&'static str);

    #[async_trait]
    impl ResponseGenerator for Fixed {
        async fn generate(&self, _request: &ResponseRequest) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct Broken;

    #[async_trait]
    impl ResponseGenerator for Broken {
        async fn generate(&self, _request: &ResponseRequest) -> Result<String> {
            bail!("timed out")
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn request() -> ResponseRequest {
        ResponseRequest::greeting(MoodState::Down, None)
    }

    #[tokio::test]
    async fn primary_wins_when_it_answers() {
        let generator = FallbackGenerator::new(Fixed("remote"), Fixed("local"));
        assert_eq!(generator.generate(&request()).await.unwrap(), "remote");
    }

    #[tokio::test]
    async fn error_falls_back() {
        let generator = FallbackGenerator::new(Broken, Fixed("local"));
        assert_eq!(generator.generate(&request()).await.unwrap(), "local");
    }

    #[tokio::test]
    async fn blank_reply_falls_back() {
        let generator = FallbackGenerator::new(Fixed("   "), Fixed("local"));
        assert_eq!(generator.generate(&request()).await.unwrap(), "local");
    }

    #[tokio::test]
    async fn fallback_errors_propagate() {
        let generator = FallbackGenerator::new(Broken, Broken);
        assert!(generator.generate(&request()).await.is_err());
    }
}
