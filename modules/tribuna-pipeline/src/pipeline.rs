use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use tribuna_common::{
    CandidateProfile, Clock, ContentKind, DraftMetadata, DraftStatus, GeneratedDraft,
    SocialDestination, SocialNetwork, TribunaError,
};
use uuid::Uuid;

use crate::arbiter::SourceArbiter;
use crate::generation::GenerationEngine;
use crate::images::ImagePicker;
use crate::publish::{hook_payload, PublishGate, WorkflowHook};
use crate::store::DraftStore;
use crate::variants::format_variants;

const SYSTEM_PROMPT: &str = "Eres un redactor de educación cívica. A partir de una noticia \
sobre un candidato, escribe contenido informativo, veraz y no difamatorio. Responde \
únicamente con JSON válido con las claves: title, body, summary, variants (objeto opcional \
de red a texto), keywords (lista de términos SEO).";

/// Structured output contract for the generation backends.
#[derive(Debug, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub variants: BTreeMap<SocialNetwork, String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Result of one pipeline invocation.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub draft: GeneratedDraft,
    pub eligible_destinations: Vec<SocialDestination>,
    /// Whether the workflow hook accepted the publication.
    pub dispatched: bool,
}

/// One request-scoped invocation: source selection, generation, formatting,
/// authorization filter, hand-off. Article and image lookup run
/// concurrently; generation waits for the chosen article.
pub struct Pipeline {
    arbiter: SourceArbiter,
    images: ImagePicker,
    engine: GenerationEngine,
    gate: PublishGate,
    hook: Arc<dyn WorkflowHook>,
    drafts: Arc<dyn DraftStore>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(
        arbiter: SourceArbiter,
        images: ImagePicker,
        engine: GenerationEngine,
        gate: PublishGate,
        hook: Arc<dyn WorkflowHook>,
        drafts: Arc<dyn DraftStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            arbiter,
            images,
            engine,
            gate,
            hook,
            drafts,
            clock,
        }
    }

    pub async fn run_for_candidate(
        &self,
        candidate: &CandidateProfile,
    ) -> Result<PipelineOutcome, TribunaError> {
        let exclude_urls: HashSet<String> = self
            .drafts
            .used_source_urls(candidate.id)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?
            .into_iter()
            .collect();
        let avoid_images: HashSet<String> = self
            .drafts
            .used_image_urls(candidate.id)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?
            .into_iter()
            .collect();

        let image_query = format!("{} {}", candidate.region, candidate.office);
        let (article, image) = tokio::join!(
            self.arbiter.select_article(candidate, &exclude_urls),
            self.images.pick_image(&image_query, &avoid_images),
        );

        let article = article
            .map_err(TribunaError::Anyhow)?
            .ok_or(TribunaError::NoSourceFound)?;

        // Image failures degrade the output; the article page is a
        // secondary source of imagery.
        let mut image = image.unwrap_or_else(|e| {
            warn!(error = %e, "Image lookup failed");
            None
        });
        if image.is_none() {
            image = self
                .images
                .article_image(&article.url)
                .await
                .unwrap_or(None);
        }
        if image.is_none() {
            info!(reason = "image_unavailable", "Proceeding without media");
        }

        let user_prompt = build_user_prompt(candidate, &article);
        let content: GeneratedContent = self
            .engine
            .generate("candidate_draft", SYSTEM_PROMPT, &user_prompt)
            .await?;

        let blog_text = format!("{}\n\n{}", content.title, content.body);
        let base_text = content.summary.as_deref().unwrap_or(&content.body);
        let variants = format_variants(
            base_text,
            Some(&blog_text),
            &content.variants,
            &content.keywords,
            candidate,
        );

        let draft = GeneratedDraft {
            id: Uuid::new_v4(),
            candidate_id: candidate.id,
            kind: ContentKind::Blog,
            body: blog_text,
            metadata: DraftMetadata {
                source_url: Some(article.url.clone()),
                image,
                variants: variants.per_network,
                canonical: variants.canonical,
                keywords: content.keywords,
            },
            created_at: self.clock.now(),
            status: DraftStatus::Draft,
            published_post_id: None,
        };
        self.drafts
            .insert_draft(&draft)
            .await
            .map_err(|e| TribunaError::Store(e.to_string()))?;

        let publication = self.gate.prepare_publication(candidate, draft).await?;

        // Authorization and delivery problems never undo the draft.
        let dispatched = match self.hook.dispatch(&hook_payload(&publication)).await {
            Ok(()) => true,
            Err(TribunaError::WorkflowNotConfigured) => {
                info!(reason = "workflow_not_configured", "Draft stored without hand-off");
                false
            }
            Err(e) => {
                warn!(reason = e.reason(), "Workflow hook dispatch failed");
                false
            }
        };

        info!(
            candidate = %candidate.id,
            draft = %publication.draft.id,
            destinations = publication.eligible_destinations.len(),
            dispatched,
            "Pipeline invocation complete"
        );

        Ok(PipelineOutcome {
            draft: publication.draft,
            eligible_destinations: publication.eligible_destinations,
            dispatched,
        })
    }
}

fn build_user_prompt(candidate: &CandidateProfile, article: &tribuna_common::SourceArticle) -> String {
    let mut prompt = format!(
        "Candidato: {} — {} ({}).\nNoticia: \"{}\" — {}\n",
        candidate.display_name, candidate.office, candidate.region, article.title, article.url
    );
    if let Some(number) = candidate.ballot_number {
        prompt.push_str(&format!("Número de tarjetón: {number}.\n"));
    }
    if let Some(bio) = &candidate.biography {
        prompt.push_str(&format!("Biografía: {bio}\n"));
    }
    if let Some(proposals) = &candidate.proposals {
        prompt.push_str(&format!("Propuestas: {proposals}\n"));
    }
    prompt.push_str("Escribe una entrada educativa para el sitio de la campaña.");
    prompt
}
