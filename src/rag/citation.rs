//! Citation validation for generated answers.
//!
//! Generated text is untrusted. Before it reaches the user it goes through
//! **Parse -> CitationCheck -> EvidenceCheck**:
//!
//! 1. **Parse** the mandated skeleton:
//!
//!    ```text
//!    Answer:
//!    <text>
//!
//!    Citations:
//!    [pX:cY], [pX:cY]
//!
//!    Evidence:
//!    [pX:cY] "<exact quote>"
//!    ```
//!
//!    or the canonical refusal [`NOT_FOUND`].
//! 2. **CitationCheck**: every cited `(page, chunk_id)` must name a passage
//!    retrieved for this turn.
//! 3. **EvidenceCheck**: every quote must occur verbatim (case-sensitive,
//!    whitespace runs collapsed, trimmed) in the passage it cites.
//!
//! [`review`] applies the refusal policy: any failure is downgraded to
//! [`NOT_FOUND`] and the reason is kept for diagnostics.

use crate::types::{CitationKey, Passage, RetrievalResult, ValidationError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// The canonical refusal.
pub const NOT_FOUND: &str = "Not found in the document.";

static CITATION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[p(\d+):c(\d+)\]").unwrap_or_else(|e| panic!("invalid citation regex: {e}"))
});

// ============= Parsed form =============

/// One `[pX:cY] "quote"` line of the `Evidence:` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub citation: CitationKey,
    pub quote: String,
}

/// A structurally valid, cited answer (not yet checked against passages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitedAnswer {
    /// Body of the `Answer:` section, trimmed.
    pub answer: String,
    /// Tokens of the `Citations:` section, deduplicated in order of appearance.
    pub citations: Vec<CitationKey>,
    pub evidence: Vec<Evidence>,
    /// Citation tokens written in the answer body or anywhere in the
    /// `Evidence:` section.
    pub inline: Vec<CitationKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAnswer {
    Refusal,
    Cited(CitedAnswer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Answer,
    Citations,
    Evidence,
}

impl Section {
    fn header(line: &str) -> Option<(Section, &str)> {
        [
            (Section::Answer, "Answer:"),
            (Section::Citations, "Citations:"),
            (Section::Evidence, "Evidence:"),
        ]
        .into_iter()
        .find_map(|(section, label)| line.strip_prefix(label).map(|rest| (section, rest)))
    }

    fn label(self) -> &'static str {
        match self {
            Section::Answer => "Answer:",
            Section::Citations => "Citations:",
            Section::Evidence => "Evidence:",
        }
    }
}

fn format_error(msg: impl Into<String>) -> ValidationError {
    ValidationError::Format(msg.into())
}

// Digits that overflow still form a citation, one that cannot name any passage.
fn parse_key(page: &str, chunk: &str) -> Result<CitationKey, ValidationError> {
    match (page.parse::<u32>(), chunk.parse::<usize>()) {
        (Ok(page), Ok(chunk_id)) => Ok(CitationKey { page, chunk_id }),
        (page_number, chunk_id) => Err(ValidationError::UngroundedCitation {
            citation: CitationKey {
                page: page_number.unwrap_or(u32::MAX),
                chunk_id: chunk_id.unwrap_or(usize::MAX),
            },
            reason: format!("[p{}:c{}] is beyond any page or chunk", page, chunk),
        }),
    }
}

fn tokens(text: &str) -> Result<Vec<CitationKey>, ValidationError> {
    CITATION_TOKEN
        .captures_iter(text)
        .map(|caps| parse_key(&caps[1], &caps[2]))
        .collect()
}

/// Split generated text into its skeleton sections.
pub fn parse(raw: &str) -> Result<ParsedAnswer, ValidationError> {
    let trimmed = raw.trim();
    if trimmed == NOT_FOUND {
        return Ok(ParsedAnswer::Refusal);
    }
    if !trimmed.starts_with(Section::Answer.label()) {
        return Err(format_error(
            "answer must start with 'Answer:' or be exactly the refusal",
        ));
    }

    let mut current: Option<Section> = None;
    let mut bodies: [Option<Vec<&str>>; 3] = [None, None, None];

    for line in trimmed.lines() {
        match Section::header(line.trim_start()) {
            Some((section, rest)) => {
                if current.is_some_and(|c| section <= c) || bodies[section as usize].is_some() {
                    return Err(format_error(format!(
                        "section '{}' is repeated or out of order",
                        section.label()
                    )));
                }
                current = Some(section);
                let body = bodies[section as usize].insert(Vec::new());
                if !rest.trim().is_empty() {
                    body.push(rest);
                }
            }
            None => {
                // `current` is always set: the text starts with "Answer:".
                if let Some(body) = current.and_then(|c| bodies[c as usize].as_mut()) {
                    body.push(line);
                }
            }
        }
    }

    let [answer, citations, evidence] = bodies;
    let answer = answer.unwrap_or_default().join("\n").trim().to_string();
    if answer.is_empty() {
        return Err(format_error("the 'Answer:' section is empty"));
    }

    if answer == NOT_FOUND && citations.is_none() && evidence.is_none() {
        return Ok(ParsedAnswer::Refusal);
    }

    let citation_lines =
        citations.ok_or_else(|| format_error("missing 'Citations:' section"))?;
    let evidence_lines = evidence.ok_or_else(|| format_error("missing 'Evidence:' section"))?;

    if answer == NOT_FOUND {
        return Err(format_error("a refusal must not carry citations"));
    }

    let citations = parse_citations(&citation_lines.join("\n"))?;
    let evidence = evidence_lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_evidence_line(line))
        .collect::<Result<Vec<_>, _>>()?;

    for key in &citations {
        if !evidence.iter().any(|e| e.citation == *key) {
            return Err(format_error(format!("citation {} has no evidence", key)));
        }
    }
    for e in &evidence {
        if !citations.contains(&e.citation) {
            return Err(format_error(format!(
                "evidence for {} which is not listed under 'Citations:'",
                e.citation
            )));
        }
    }

    let mut inline = tokens(&answer)?;
    inline.extend(tokens(&evidence_lines.join("\n"))?);

    Ok(ParsedAnswer::Cited(CitedAnswer {
        answer,
        citations,
        evidence,
        inline,
    }))
}

fn parse_citations(body: &str) -> Result<Vec<CitationKey>, ValidationError> {
    let leftover = CITATION_TOKEN.replace_all(body, "");
    if let Some(c) = leftover
        .chars()
        .find(|c| !c.is_whitespace() && *c != ',' && *c != ';')
    {
        return Err(format_error(format!(
            "unexpected '{}' in 'Citations:' section",
            c
        )));
    }

    let mut keys = Vec::new();
    for key in tokens(body)? {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    if keys.is_empty() {
        return Err(format_error("'Citations:' lists no citation tokens"));
    }
    Ok(keys)
}

fn parse_evidence_line(line: &str) -> Result<Evidence, ValidationError> {
    let line = line.trim();
    let caps = CITATION_TOKEN
        .captures(line)
        .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0))
        .ok_or_else(|| format_error(format!("evidence line '{}' must start with a citation", line)))?;
    let citation = parse_key(&caps[1], &caps[2])?;
    let rest = &line[caps.get(0).map_or(0, |m| m.end())..];

    let open = rest
        .find('"')
        .ok_or_else(|| format_error(format!("evidence for {} is not quoted", citation)))?;
    if !rest[..open]
        .chars()
        .all(|c| c.is_whitespace() || c == ':' || c == '-')
    {
        return Err(format_error(format!(
            "unexpected text before the quote for {}",
            citation
        )));
    }
    let close = rest.rfind('"').filter(|close| *close > open).ok_or_else(|| {
        format_error(format!("evidence quote for {} is not closed", citation))
    })?;

    if !rest[close + 1..].trim().is_empty() {
        return Err(format_error(format!(
            "unexpected text after the quote for {}",
            citation
        )));
    }

    let quote = &rest[open + 1..close];
    if collapse_whitespace(quote).is_empty() {
        return Err(format_error(format!("evidence quote for {} is empty", citation)));
    }

    Ok(Evidence {
        citation,
        quote: quote.to_string(),
    })
}

/// Collapse whitespace runs to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============= Checks =============

/// An answer that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAnswer {
    /// The generated text as surfaced to the user (trimmed, otherwise unchanged).
    pub text: String,
    pub answer: String,
    pub citations: Vec<CitationKey>,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Grounded(ValidatedAnswer),
    Refusal,
}

fn cited_passage<'a>(
    key: CitationKey,
    retrieved: &'a RetrievalResult,
) -> Result<&'a Passage, ValidationError> {
    match retrieved.get(key.chunk_id) {
        Some(passage) if passage.page == key.page => Ok(passage),
        Some(passage) => Err(ValidationError::UngroundedCitation {
            citation: key,
            reason: format!("chunk c{} is on page {}", key.chunk_id, passage.page),
        }),
        None => Err(ValidationError::UngroundedCitation {
            citation: key,
            reason: format!("chunk c{} was not retrieved for this question", key.chunk_id),
        }),
    }
}

/// Check generated text against the passages retrieved for this turn.
pub fn validate(raw: &str, retrieved: &RetrievalResult) -> Result<Verdict, ValidationError> {
    let cited = match parse(raw)? {
        ParsedAnswer::Refusal => return Ok(Verdict::Refusal),
        ParsedAnswer::Cited(cited) => cited,
    };

    let all_keys: BTreeSet<CitationKey> = cited
        .citations
        .iter()
        .chain(cited.inline.iter())
        .copied()
        .collect();
    for key in &all_keys {
        cited_passage(*key, retrieved)?;
    }

    for evidence in &cited.evidence {
        let passage = cited_passage(evidence.citation, retrieved)?;
        let quote = collapse_whitespace(&evidence.quote);
        if !collapse_whitespace(&passage.text).contains(&quote) {
            return Err(ValidationError::FabricatedEvidence {
                citation: evidence.citation,
                quote,
            });
        }
    }

    debug!(citations = cited.citations.len(), "Answer is grounded");
    Ok(Verdict::Grounded(ValidatedAnswer {
        text: raw.trim().to_string(),
        answer: cited.answer,
        citations: cited.citations,
        evidence: cited.evidence,
    }))
}

// ============= Policy =============

/// What a turn produced after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Answered(ValidatedAnswer),
    /// Refused, either by the generator (`reason: None`) or because the
    /// answer failed validation.
    Refused { reason: Option<ValidationError> },
}

impl Outcome {
    /// Text shown to the user.
    pub fn surfaced(&self) -> &str {
        match self {
            Outcome::Answered(answer) => &answer.text,
            Outcome::Refused { .. } => NOT_FOUND,
        }
    }

    pub fn is_refusal(&self) -> bool {
        matches!(self, Outcome::Refused { .. })
    }

    /// The validation failure, when the answer was downgraded.
    pub fn rejection(&self) -> Option<&ValidationError> {
        match self {
            Outcome::Refused { reason } => reason.as_ref(),
            Outcome::Answered(_) => None,
        }
    }
}

/// Validate and apply the refusal policy. Never fails.
pub fn review(raw: &str, retrieved: &RetrievalResult) -> Outcome {
    match validate(raw, retrieved) {
        Ok(Verdict::Grounded(answer)) => Outcome::Answered(answer),
        Ok(Verdict::Refusal) => Outcome::Refused { reason: None },
        Err(reason) => {
            warn!(%reason, "Rejected generated answer");
            Outcome::Refused {
                reason: Some(reason),
            }
        }
    }
}
