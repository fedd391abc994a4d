/// The extraction-to-score pipeline.
///
/// One call runs every stage in sequence: extract → prompt → model → decode → score.
/// The first failing stage ends the run; nothing shared is mutated along the way.
use std::sync::Arc;

use tracing::{info, warn};

use checker_common::fetch::PageSource;
use checker_common::ollama::InferenceBackend;

use crate::cache::ResponseCache;
use crate::catalog::{Checklist, PromptTemplate};
use crate::error::AnalysisError;
use crate::extract::ArticleExtractor;
use crate::model::{AnalysisResult, ArticleRecord};
use crate::prompt::{build_prompt, prompt_fingerprint};
use crate::response::parse_analysis;
use crate::scoring::score_analysis;

/// Characters of unparseable model output kept for diagnostics.
const RAW_RESPONSE_PREVIEW_CHARS: usize = 500;

pub struct AnalysisPipeline<S, M> {
    extractor: ArticleExtractor<S>,
    model: M,
    checklist: Arc<Checklist>,
    template: Arc<PromptTemplate>,
    cache: ResponseCache,
}

impl<S: PageSource, M: InferenceBackend> AnalysisPipeline<S, M> {
    pub fn new(
        extractor: ArticleExtractor<S>,
        model: M,
        checklist: Arc<Checklist>,
        template: Arc<PromptTemplate>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            extractor,
            model,
            checklist,
            template,
            cache,
        }
    }

    pub fn extractor(&self) -> &ArticleExtractor<S> {
        &self.extractor
    }

    pub async fn model_available(&self) -> bool {
        self.model.is_available().await
    }

    pub async fn cache_available(&self) -> bool {
        self.cache.is_available().await
    }

    /// Fetch the article at `url` and run the full analysis.
    pub async fn analyze(&self, url: &str) -> Result<AnalysisResult, AnalysisError> {
        let article = self.extractor.extract(url).await?;
        self.analyze_article(article).await
    }

    /// Run the model stages on an already extracted article.
    pub async fn analyze_article(
        &self,
        article: ArticleRecord,
    ) -> Result<AnalysisResult, AnalysisError> {
        let prompt = build_prompt(&article, &self.checklist, &self.template);
        let model_name = self.model.model_name();

        let cached = self.cache.get(model_name, &prompt).await;
        let from_cache = cached.is_some();
        let raw = match cached {
            Some(raw) => raw,
            None => {
                if !self.model.is_available().await {
                    return Err(AnalysisError::ModelUnavailable(self.model.endpoint().to_string()));
                }
                info!(
                    model = model_name,
                    prompt_chars = prompt.chars().count(),
                    prompt_sha = %prompt_fingerprint(&prompt),
                    "requesting analysis from model"
                );
                self.model.generate(&prompt, None).await?
            }
        };

        let analysis = parse_analysis(&raw).map_err(|source| {
            warn!(error = %source, "model response could not be decoded");
            AnalysisError::Decode {
                source,
                raw_response: raw.chars().take(RAW_RESPONSE_PREVIEW_CHARS).collect(),
            }
        })?;

        if !from_cache && analysis.has_details() {
            self.cache.set(model_name, &prompt, &raw).await;
        }

        let final_score = score_analysis(&analysis, &self.checklist);
        info!(
            url = %article.url,
            score = final_score.score,
            category = %final_score.category,
            from_cache,
            "analysis complete"
        );

        Ok(AnalysisResult {
            article,
            analysis,
            final_score,
            timestamp: chrono::Local::now(),
        })
    }
}
