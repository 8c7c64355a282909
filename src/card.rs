use crate::chart::{language_chart, ColorCache, LanguageSlice};
use crate::enrichment::{ContributorCount, Enrichment};
use crate::format::{format_stat, format_updated};
use crate::suggest::SuggestionOutcome;
use crate::types::{LanguageDistribution, Repository};
use serde::{Deserialize, Serialize};

/// Language breakdown for one card. `Missing` means no chart, either because
/// the mapping was empty or because the fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LanguageState {
    Pending,
    Loaded {
        distribution: LanguageDistribution,
        chart: Vec<LanguageSlice>,
    },
    Missing,
}

impl LanguageState {
    pub fn resolve(languages: Option<LanguageDistribution>, colors: &mut ColorCache) -> Self {
        match languages {
            Some(distribution) => match language_chart(&distribution, colors) {
                Some(chart) => LanguageState::Loaded {
                    distribution,
                    chart,
                },
                None => LanguageState::Missing,
            },
            None => LanguageState::Missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum SuggestionState {
    Idle,
    Pending,
    Resolved(SuggestionOutcome),
}

impl SuggestionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SuggestionState::Pending)
    }
}

/// Display strings for the stat grid of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStats {
    pub stars: String,
    pub forks: String,
    pub contributors: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoCard {
    pub repository: Repository,
    pub contributors: ContributorCount,
    pub languages: LanguageState,
    pub suggestions: SuggestionState,
    pub stats: CardStats,
}

impl RepoCard {
    pub fn new(repository: Repository) -> Self {
        let stats = CardStats {
            stars: format_stat(repository.stargazers_count),
            forks: format_stat(repository.forks_count),
            contributors: ContributorCount::Pending.to_string(),
            updated: format_updated(&repository.updated_at),
        };

        RepoCard {
            repository,
            contributors: ContributorCount::Pending,
            languages: LanguageState::Pending,
            suggestions: SuggestionState::Idle,
            stats,
        }
    }

    /// A card with both enrichment values already known.
    pub fn enriched(repository: Repository, enrichment: Enrichment, colors: &mut ColorCache) -> Self {
        let mut card = RepoCard::new(repository);
        card.set_contributors(enrichment.contributors);
        card.set_languages(enrichment.languages, colors);
        card
    }

    pub fn full_name(&self) -> &str {
        &self.repository.full_name
    }

    pub fn set_contributors(&mut self, count: ContributorCount) {
        self.contributors = count;
        self.stats.contributors = count.to_string();
    }

    pub fn set_languages(&mut self, languages: Option<LanguageDistribution>, colors: &mut ColorCache) {
        self.languages = LanguageState::resolve(languages, colors);
    }

    pub fn has_chart(&self) -> bool {
        matches!(self.languages, LanguageState::Loaded { .. })
    }
}
