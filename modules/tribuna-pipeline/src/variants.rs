use std::collections::BTreeMap;

use tribuna_common::{CandidateProfile, SocialNetwork};

/// Per-network formatting constraints. One declarative record per network
/// consumed by a single formatting function, so adding a network is a new
/// table row, not a new string-building block.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSpec {
    pub network: SocialNetwork,
    pub max_chars: usize,
    pub max_hashtags: usize,
}

pub const NETWORK_SPECS: &[NetworkSpec] = &[
    NetworkSpec {
        network: SocialNetwork::Twitter,
        max_chars: 280,
        max_hashtags: 2,
    },
    NetworkSpec {
        network: SocialNetwork::Facebook,
        max_chars: 5000,
        max_hashtags: 4,
    },
    NetworkSpec {
        network: SocialNetwork::Instagram,
        max_chars: 2200,
        max_hashtags: 6,
    },
    NetworkSpec {
        network: SocialNetwork::Linkedin,
        max_chars: 3000,
        max_hashtags: 3,
    },
    NetworkSpec {
        network: SocialNetwork::Whatsapp,
        max_chars: 4096,
        max_hashtags: 2,
    },
    NetworkSpec {
        network: SocialNetwork::Telegram,
        max_chars: 4096,
        max_hashtags: 2,
    },
];

const SUMMARY_MAX_CHARS: usize = 900;
const MAX_HASHTAGS: usize = 6;

/// Output of the formatter: one text per network, plus the canonical
/// long-form body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkVariants {
    pub per_network: BTreeMap<SocialNetwork, String>,
    pub canonical: Option<String>,
}

/// Turn one generated body into per-network variants. Pure and
/// deterministic. Caller-supplied precomputed variants win over the
/// generated fallback, so an upstream AI call can supply network-specific
/// copy while every network is still guaranteed something to publish.
pub fn format_variants(
    base_text: &str,
    blog_text: Option<&str>,
    precomputed: &BTreeMap<SocialNetwork, String>,
    keywords: &[String],
    candidate: &CandidateProfile,
) -> NetworkVariants {
    let title = first_non_empty_line(blog_text.unwrap_or(""))
        .or_else(|| first_non_empty_line(base_text))
        .unwrap_or_default();

    let body = blog_text.filter(|t| !t.trim().is_empty()).unwrap_or(base_text);
    let summary = clamp_at_word(&leading_paragraphs(body, &title, 2), SUMMARY_MAX_CHARS);

    let hashtags: Vec<String> = keywords
        .iter()
        .filter_map(|k| hashtag(k))
        .take(MAX_HASHTAGS)
        .collect();

    let cta = call_to_action(candidate);

    let mut per_network = BTreeMap::new();
    for spec in NETWORK_SPECS {
        let text = match precomputed.get(&spec.network) {
            Some(custom) if !custom.trim().is_empty() => {
                clamp_at_word(custom.trim(), spec.max_chars)
            }
            _ => {
                let tags = hashtags
                    .iter()
                    .take(spec.max_hashtags)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(" ");
                let composed = [title.as_str(), summary.as_str(), cta.as_str(), tags.as_str()]
                    .iter()
                    .filter(|part| !part.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join("\n\n");
                clamp_at_word(&composed, spec.max_chars)
            }
        };
        per_network.insert(spec.network, text);
    }

    let canonical = Some(body.trim().to_string()).filter(|t| !t.is_empty());

    NetworkVariants {
        per_network,
        canonical,
    }
}

fn call_to_action(candidate: &CandidateProfile) -> String {
    match candidate.ballot_number {
        Some(number) => format!(
            "Conoce las propuestas de {} — tarjetón {}.",
            candidate.display_name, number
        ),
        None => format!("Conoce las propuestas de {}.", candidate.display_name),
    }
}

fn first_non_empty_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// First `count` paragraphs of `text`, excluding the title line.
fn leading_paragraphs(text: &str, title: &str, count: usize) -> String {
    // Drop the first occurrence of the title line, keep everything else.
    let mut dropped = false;
    let body: Vec<&str> = text
        .lines()
        .filter(|l| {
            if !dropped && l.trim() == title {
                dropped = true;
                false
            } else {
                true
            }
        })
        .collect();

    body.join("\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(count)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Sanitize one keyword into a hashtag: alphanumeric only (Unicode, so
/// accented letters survive), each word capitalized.
fn hashtag(keyword: &str) -> Option<String> {
    let mut out = String::new();
    for word in keyword.split_whitespace() {
        let clean: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if clean.is_empty() {
            continue;
        }
        let mut chars = clean.chars();
        let first = chars.next().expect("non-empty");
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }

    if out.is_empty() {
        None
    } else {
        Some(format!("#{out}"))
    }
}

/// Clamp to at most `max_chars` characters, trimming at a whitespace
/// boundary so public copy never ends mid-word. A single token longer
/// than the cap clamps to empty: no boundary exists, and a truncated
/// token (or URL) must never be published.
pub fn clamp_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let prefix: String = text.chars().take(max_chars).collect();
    match prefix.rfind(char::is_whitespace) {
        Some(idx) => prefix[..idx].trim_end().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::candidate_fixture;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn every_network_always_gets_a_variant() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let variants = format_variants(
            "Título\n\nCuerpo del artículo.",
            None,
            &BTreeMap::new(),
            &keywords(&["educación"]),
            &candidate,
        );
        assert_eq!(variants.per_network.len(), SocialNetwork::ALL.len());
        for network in SocialNetwork::ALL {
            assert!(!variants.per_network[&network].is_empty());
        }
    }

    #[test]
    fn twitter_variant_respects_280_chars_and_word_boundaries() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let long_body = "Titular de la nota\n\n".to_string()
            + &"palabra ".repeat(200)
            + "\n\nSegundo párrafo con más contexto sobre la propuesta educativa.";
        let variants = format_variants(
            &long_body,
            None,
            &BTreeMap::new(),
            &keywords(&["educación pública", "juventud"]),
            &candidate,
        );

        let tweet = &variants.per_network[&SocialNetwork::Twitter];
        assert!(tweet.chars().count() <= 280);
        // The clamp must land on a whole word.
        assert!(!tweet.ends_with("palabr"));
        let last = tweet.split_whitespace().last().unwrap();
        assert!(long_body.contains(last) || last.starts_with('#') || last.ends_with('.'));
    }

    #[test]
    fn precomputed_variant_takes_precedence() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let mut precomputed = BTreeMap::new();
        precomputed.insert(SocialNetwork::Twitter, "Copy hecho a mano".to_string());

        let variants = format_variants(
            "Título\n\nCuerpo.",
            None,
            &precomputed,
            &[],
            &candidate,
        );
        assert_eq!(variants.per_network[&SocialNetwork::Twitter], "Copy hecho a mano");
        // Other networks still fall back to the generated template.
        assert!(variants.per_network[&SocialNetwork::Facebook].contains("Título"));
    }

    #[test]
    fn precomputed_variant_is_still_clamped() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let mut precomputed = BTreeMap::new();
        precomputed.insert(SocialNetwork::Twitter, "palabra ".repeat(100));

        let variants = format_variants("Título\n\nCuerpo.", None, &precomputed, &[], &candidate);
        assert!(variants.per_network[&SocialNetwork::Twitter].chars().count() <= 280);
    }

    #[test]
    fn single_token_over_the_cap_never_cut_mid_word() {
        // No whitespace boundary means nothing survives whole.
        assert_eq!(clamp_at_word(&"x".repeat(300), 280), "");

        // Reachable via a precomputed variant that is one oversized token,
        // e.g. an unbroken tracking URL.
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let mut precomputed = BTreeMap::new();
        precomputed.insert(
            SocialNetwork::Twitter,
            format!("https://example.com/{}", "a".repeat(300)),
        );
        let variants = format_variants("Título\n\nCuerpo.", None, &precomputed, &[], &candidate);
        assert_eq!(variants.per_network[&SocialNetwork::Twitter], "");
    }

    #[test]
    fn title_comes_from_blog_text_when_present() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let variants = format_variants(
            "Base corta.",
            Some("\nTitular del blog\n\nPárrafo uno.\n\nPárrafo dos.\n\nPárrafo tres."),
            &BTreeMap::new(),
            &[],
            &candidate,
        );
        let facebook = &variants.per_network[&SocialNetwork::Facebook];
        assert!(facebook.starts_with("Titular del blog"));
        // Summary is the first two paragraphs after the title.
        assert!(facebook.contains("Párrafo uno."));
        assert!(facebook.contains("Párrafo dos."));
        assert!(!facebook.contains("Párrafo tres."));
    }

    #[test]
    fn hashtags_are_sanitized_and_keep_accents() {
        assert_eq!(
            hashtag("educación pública!"),
            Some("#EducaciónPública".to_string())
        );
        assert_eq!(hashtag("salud"), Some("#Salud".to_string()));
        assert_eq!(hashtag("!!!"), None);
    }

    #[test]
    fn ballot_number_appears_in_call_to_action() {
        let mut candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        candidate.ballot_number = Some(42);
        let variants = format_variants(
            "Título\n\nCuerpo.",
            None,
            &BTreeMap::new(),
            &[],
            &candidate,
        );
        assert!(variants.per_network[&SocialNetwork::Facebook].contains("tarjetón 42"));
    }

    #[test]
    fn canonical_carries_the_long_form_body() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let variants = format_variants(
            "Base.",
            Some("Titular\n\nCuerpo largo."),
            &BTreeMap::new(),
            &[],
            &candidate,
        );
        assert_eq!(
            variants.canonical.as_deref(),
            Some("Titular\n\nCuerpo largo.")
        );
    }

    #[test]
    fn clamp_is_a_noop_for_short_text() {
        assert_eq!(clamp_at_word("hola mundo", 280), "hola mundo");
    }

    #[test]
    fn clamp_counts_chars_not_bytes() {
        let text = "á".repeat(300);
        assert_eq!(clamp_at_word(&text, 280).chars().count(), 280);
    }

    #[test]
    fn summary_is_clamped_to_900_chars() {
        let candidate = candidate_fixture("Ana Pérez", "Concejo", "Antioquia");
        let body = format!("Titular\n\n{}", "texto largo ".repeat(200));
        let variants = format_variants(&body, None, &BTreeMap::new(), &[], &candidate);
        let facebook = &variants.per_network[&SocialNetwork::Facebook];
        // Title + 900-char summary + CTA stays well under the Facebook cap.
        assert!(facebook.chars().count() <= 5000);
        assert!(facebook.chars().count() < 1100);
    }
}
