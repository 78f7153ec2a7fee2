//! Text-generation backend seam.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ProviderError, ProviderResult};

/// A backend that turns one prompt into one completion.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> ProviderResult<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    fn generate(&self, prompt: &str) -> ProviderResult<String> {
        (**self).generate(prompt)
    }
}

/// Scripted generator for testing without network access.
///
/// Replies are served in order; the last one repeats once the script runs out.
pub struct MockGenerator {
    script: Mutex<VecDeque<ProviderResult<String>>>,
    last: Mutex<Option<ProviderResult<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new(script: Vec<ProviderResult<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with the same text.
    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Always fail with the same error.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, prompt: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let mut script = self
            .script
            .lock()
            .map_err(|_| ProviderError::Http("mock script lock poisoned".into()))?;
        let mut last = self
            .last
            .lock()
            .map_err(|_| ProviderError::Http("mock script lock poisoned".into()))?;

        if let Some(next) = script.pop_front() {
            *last = Some(next.clone());
            return next;
        }

        last.clone()
            .unwrap_or_else(|| Err(ProviderError::EmptyCompletion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_replays_script_in_order() {
        let mock = MockGenerator::new(vec![
            Err(ProviderError::Timeout(15)),
            Ok("second".into()),
        ]);
        assert_eq!(mock.generate("a"), Err(ProviderError::Timeout(15)));
        assert_eq!(mock.generate("b"), Ok("second".into()));
        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.prompts(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_mock_repeats_last_reply() {
        let mock = MockGenerator::replying("same");
        assert_eq!(mock.generate("a"), Ok("same".into()));
        assert_eq!(mock.generate("b"), Ok("same".into()));
        assert_eq!(mock.generate("c"), Ok("same".into()));
    }

    #[test]
    fn test_empty_script_yields_empty_completion() {
        let mock = MockGenerator::new(vec![]);
        assert_eq!(mock.generate("a"), Err(ProviderError::EmptyCompletion));
    }
}
