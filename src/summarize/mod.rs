pub mod anthropic;

use anyhow::{Result, anyhow};
use log::warn;

use crate::domain::paper::SummaryResult;

pub const SUMMARY_MAX_TOKENS: u32 = 2000;
pub const TLDR_MAX_TOKENS: u32 = 150;

/// Characters of the summary used when it has no usable first sentence.
const FALLBACK_TLDR_CHARS: usize = 150;

pub const SUMMARY_PROMPT: &str = "Please read this paper and provide a structured summary that details \
the **core motivation** (what problem it solves and why existing methods fail), the **key methodology** \
(briefly explaining the technical approach, architecture, or loss function), and the **main contributions**. \
Summarize the **quantitative results**, specifically comparing them to previous baseline methods and \
highlighting the margin of improvement on key datasets. If available, explicitly analyze the \
**computational cost** (training vs. inference time, memory usage) and summarize the key takeaways from \
the **ablation studies** to identify which components contributed most to the performance gain. \
Finally, list any stated **limitations or assumptions** made by the authors.";

/// Single-turn text completion.
pub trait Completion {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

fn summary_prompt(paper_text: &str) -> String {
    format!("{SUMMARY_PROMPT}\n\n---\n\nPaper Content:\n\n{paper_text}")
}

fn tldr_prompt(full_summary: &str) -> String {
    format!(
        "Based on this paper summary, generate a single, complete sentence that captures the main \
contribution or finding. The sentence should be grammatically complete and end with a period.\n\n\
Summary:\n{full_summary}\n\nGenerate only the one-sentence TLDR, nothing else."
    )
}

/// Trim and make the text end in exactly one period.
pub fn ensure_period(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches('.').trim_end();
    format!("{trimmed}.")
}

/// One-sentence synopsis synthesized from the summary itself: its first
/// sentence, or its leading characters when that sentence is empty.
pub fn fallback_tldr(full_summary: &str) -> String {
    let first = full_summary.split('.').next().unwrap_or("").trim();
    if !first.is_empty() {
        return ensure_period(first);
    }
    let head: String = full_summary.chars().take(FALLBACK_TLDR_CHARS).collect();
    ensure_period(&head)
}

pub struct Summarizer<'a> {
    completion: &'a dyn Completion,
}

impl<'a> Summarizer<'a> {
    pub fn new(completion: &'a dyn Completion) -> Self {
        Self { completion }
    }

    /// Structured long-form summary, verbatim from the model.
    pub fn long_form(&self, paper_text: &str) -> Result<String> {
        let summary = self
            .completion
            .complete(&summary_prompt(paper_text), SUMMARY_MAX_TOKENS)?;
        if summary.trim().is_empty() {
            return Err(anyhow!("completion returned an empty summary"));
        }
        Ok(summary)
    }

    /// One-sentence TLDR conditioned on the long-form summary.
    pub fn tldr(&self, full_summary: &str) -> Result<String> {
        let tldr = self
            .completion
            .complete(&tldr_prompt(full_summary), TLDR_MAX_TOKENS)?;
        if tldr.trim().is_empty() {
            return Err(anyhow!("completion returned an empty TLDR"));
        }
        Ok(ensure_period(&tldr))
    }

    /// Long-form summary plus TLDR. Only a long-form failure is an error; a
    /// failed TLDR request is replaced by [`fallback_tldr`].
    pub fn summarize(&self, paper_text: &str) -> Result<SummaryResult> {
        let full_summary = self.long_form(paper_text)?;
        let tldr = match self.tldr(&full_summary) {
            Ok(t) => t,
            Err(e) => {
                warn!("TLDR generation failed, using first sentence of summary: {e:#}");
                fallback_tldr(&full_summary)
            }
        };
        Ok(SummaryResult { full_summary, tldr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Replies from a script, one per call; `None` fails the call.
    struct Scripted {
        replies: RefCell<Vec<Option<String>>>,
        prompts: RefCell<Vec<(String, u32)>>,
    }

    impl Scripted {
        fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: RefCell::new(replies.into_iter().rev().map(|r| r.map(String::from)).collect()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Completion for Scripted {
        fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
            self.prompts.borrow_mut().push((prompt.to_string(), max_tokens));
            self.replies
                .borrow_mut()
                .pop()
                .flatten()
                .ok_or_else(|| anyhow!("service unavailable"))
        }
    }

    #[test]
    fn tldr_request_sees_summary_not_paper() {
        let llm = Scripted::new(vec![Some("Long summary body"), Some("It works")]);
        let got = Summarizer::new(&llm).summarize("RAW PAPER TEXT").unwrap();

        assert_eq!(got.full_summary, "Long summary body");
        assert_eq!(got.tldr, "It works.");

        let prompts = llm.prompts.borrow();
        assert!(prompts[0].0.starts_with(SUMMARY_PROMPT));
        assert!(prompts[0].0.ends_with("RAW PAPER TEXT"));
        assert_eq!(prompts[0].1, SUMMARY_MAX_TOKENS);
        assert!(prompts[1].0.contains("Long summary body"));
        assert!(!prompts[1].0.contains("RAW PAPER TEXT"));
        assert_eq!(prompts[1].1, TLDR_MAX_TOKENS);
    }

    #[test]
    fn long_form_failure_fails_the_unit() {
        let llm = Scripted::new(vec![None]);
        assert!(Summarizer::new(&llm).summarize("text").is_err());
        assert_eq!(llm.prompts.borrow().len(), 1);
    }

    #[test]
    fn tldr_failure_uses_first_sentence() {
        let llm = Scripted::new(vec![Some("The method halves latency. It also scales"), None]);
        let got = Summarizer::new(&llm).summarize("text").unwrap();
        assert_eq!(got.tldr, "The method halves latency.");
    }

    #[test]
    fn fallback_without_period_gets_exactly_one() {
        assert_eq!(fallback_tldr("A summary with no terminator"), "A summary with no terminator.");
        assert_eq!(fallback_tldr("  Leading space sentence"), "Leading space sentence.");
    }

    #[test]
    fn fallback_with_empty_first_sentence_uses_prefix() {
        let summary = format!(".{}", "x".repeat(300));
        let got = fallback_tldr(&summary);
        assert_eq!(got.chars().count(), FALLBACK_TLDR_CHARS + 1);
        assert!(got.ends_with("x."));
        assert!(!got.ends_with(".."));
    }

    #[test]
    fn ensure_period_never_doubles() {
        assert_eq!(ensure_period("Done."), "Done.");
        assert_eq!(ensure_period("Done...  "), "Done.");
        assert_eq!(ensure_period("Done"), "Done.");
    }
}
