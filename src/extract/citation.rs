use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::paper::ExtractedCitation;
use crate::extract::normalize::normalize_title;

// "[PDF]" marker, then the next anchor, possibly on a later line.
static CITING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[PDF\].*?<a[^>]*>([^<]+)</a>").expect("valid citing paper regex")
});

static BRACKET_QUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<b>「([^」]+)」").expect("valid bracket quote regex"));

static ANGLE_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"〈<a[^>]*>([^<]+)</a>〉").expect("valid angle anchor regex"));

static FIRST_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a[^>]*>([^<]+)</a>").expect("valid anchor regex"));

/// Ways an alert template can carry the seed paper title, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPattern {
    /// `<b>「Title」- new citations</b>`
    BracketQuote,
    /// `〈<a href=...>Title</a>〉`
    AngleAnchor,
    /// Text of the first anchor anywhere in the body.
    FirstAnchor,
}

impl SeedPattern {
    pub const PRIORITY: [SeedPattern; 3] = [
        SeedPattern::BracketQuote,
        SeedPattern::AngleAnchor,
        SeedPattern::FirstAnchor,
    ];

    fn regex(self) -> &'static Regex {
        match self {
            SeedPattern::BracketQuote => &BRACKET_QUOTE_RE,
            SeedPattern::AngleAnchor => &ANGLE_ANCHOR_RE,
            SeedPattern::FirstAnchor => &FIRST_ANCHOR_RE,
        }
    }

    /// Raw capture for this pattern, before normalization.
    pub fn capture(self, body: &str) -> Option<&str> {
        self.regex()
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    }
}

/// Titles of every paper announced with a `[PDF]` marker, in document order.
/// Repeated mentions are kept.
pub fn extract_citing_titles(body: &str) -> Vec<String> {
    CITING_RE
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .filter_map(|m| normalize_title(m.as_str()))
        .collect()
}

/// First seed pattern whose capture survives normalization.
pub fn extract_seed_title(body: &str) -> Option<(SeedPattern, String)> {
    SeedPattern::PRIORITY.iter().find_map(|&pattern| {
        let title = pattern.capture(body).and_then(normalize_title)?;
        debug!("seed title matched by {pattern:?}");
        Some((pattern, title))
    })
}

/// Parse an entity-decoded alert body into seed and citing titles.
pub fn extract_citation(body: &str) -> ExtractedCitation {
    ExtractedCitation {
        seed_paper_title: extract_seed_title(body).map(|(_, title)| title),
        citing_paper_titles: extract_citing_titles(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALERT: &str = r#"<html><body>
<div><b>「Denoising Diffusion Probabilistic Models」- 新的引用</b></div>
<h3><span>[PDF]</span> <a href="https://arxiv.org/pdf/2401.00001" class="gse_alrt_title">Paper A: Faster Sampling</a></h3>
<div>Some authors - arXiv preprint</div>
<h3><span>[PDF]</span>
  <a href="https://arxiv.org/pdf/2401.00002">Paper B: Guidance Revisited</a></h3>
<h3><span>[PDF]</span> <a href="https://arxiv.org/pdf/2401.00001">Paper A: Faster Sampling</a></h3>
</body></html>"#;

    #[test]
    fn extracts_seed_and_citing_in_document_order() {
        let got = extract_citation(ALERT);
        assert_eq!(
            got.seed_paper_title.as_deref(),
            Some("Denoising Diffusion Probabilistic Models")
        );
        assert_eq!(
            got.citing_paper_titles,
            vec![
                "Paper A: Faster Sampling".to_string(),
                "Paper B: Guidance Revisited".to_string(),
                "Paper A: Faster Sampling".to_string(),
            ]
        );
    }

    #[test]
    fn bracket_quote_wins_over_anchors() {
        let (pattern, _) = extract_seed_title(ALERT).unwrap();
        assert_eq!(pattern, SeedPattern::BracketQuote);
    }

    #[test]
    fn angle_anchor_seed() {
        let body = r#"<p>引用 〈<a href="x">Scaling Laws for Neural Language Models</a>〉 的新文章</p>
<a href="y">Something else entirely</a>"#;
        assert_eq!(
            extract_seed_title(body),
            Some((
                SeedPattern::AngleAnchor,
                "Scaling Laws for Neural Language Models".to_string()
            ))
        );
    }

    #[test]
    fn falls_back_to_first_anchor() {
        let body = r#"<p>New citations to</p><a href="x">Seed Paper X</a>
<span>[PDF]</span><a href="y">Citing One</a>"#;
        let got = extract_citation(body);
        assert_eq!(got.seed_paper_title.as_deref(), Some("Seed Paper X"));
        assert_eq!(got.citing_paper_titles, vec!["Citing One".to_string()]);
    }

    #[test]
    fn unusable_capture_moves_to_next_pattern() {
        let body = r#"<b>「新的引用」</b><a href="x">Graph Neural Networks</a>"#;
        assert_eq!(
            extract_seed_title(body),
            Some((SeedPattern::FirstAnchor, "Graph Neural Networks".to_string()))
        );
    }

    #[test]
    fn short_citing_titles_are_dropped() {
        let body = r#"[PDF] <a href="x">―</a> [PDF] <a href="y">Real Title Here</a>"#;
        assert_eq!(extract_citing_titles(body), vec!["Real Title Here".to_string()]);
    }

    #[test]
    fn plain_text_yields_nothing() {
        let got = extract_citation("Hello, this message has no markup at all.");
        assert_eq!(got, ExtractedCitation::default());
    }
}
