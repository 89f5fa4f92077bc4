//! Parsing of HTML-formatted vote breakdowns
//!
//! The source encodes per-party positions as free-form HTML text like:
//!
//! ```text
//! A Favor: <I>PSD</I>, <I>CDS-PP</I><BR>Contra:<I>CH</I>
//! ```
//!
//! which is parsed into a structured [`DetalheVotos`] breakdown. Ninsc
//! members are preserved with their full names ("João Silva (Ninsc)"): an
//! independent MP is a political position of their own, either the single
//! elected member of a party or someone who left their parliamentary group,
//! and must not be aggregated away.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static ITALIC_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?I>").expect("valid regex"));
static AGGREGATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+-").expect("valid regex"));
static AFFILIATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".+\(.+\)$").expect("valid regex"));
static NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));

/// Structured vote breakdown by party position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetalheVotos {
    /// Parties/members voting in favor
    pub a_favor: Vec<String>,
    /// Parties/members voting against
    pub contra: Vec<String>,
    /// Parties/members abstaining
    pub abstencao: Vec<String>,
    /// Parties/members absent
    pub ausencia: Vec<String>,
}

/// Parse HTML voting details into a structured breakdown.
///
/// Returns `None` for an empty/absent `detalhe`: unanimous votes carry no
/// per-party text upstream, and that absence is preserved as a data-quality
/// signal rather than papered over.
pub fn parse_detalhe(detalhe: &str) -> Option<DetalheVotos> {
    if detalhe.trim().is_empty() {
        return None;
    }

    let mut result = DetalheVotos::default();

    for section in detalhe.split("<BR>") {
        let Some((vote_type, parties_html)) = section.split_once(':') else {
            continue;
        };

        let vote_type_key = vote_type
            .trim()
            .to_lowercase()
            .replace(' ', "_")
            .replace("ção", "cao");

        let parties_str = ITALIC_TAG.replace_all(parties_html, "");
        let clean_parties = clean_party_list(&parties_str);

        match vote_type_key.as_str() {
            "a_favor" => result.a_favor = clean_parties,
            "contra" => result.contra = clean_parties,
            "abstencao" => result.abstencao = clean_parties,
            "ausencia" => result.ausencia = clean_parties,
            _ => {}
        }
    }

    Some(result)
}

/// Keep party codes (PS, PSD, ...) and Ninsc members with full names; skip
/// aggregates like "6-PSD", individual party-affiliated MPs, and bare
/// numbers.
fn clean_party_list(parties_str: &str) -> Vec<String> {
    parties_str
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| !AGGREGATE.is_match(p))
        .filter(|p| p.contains("(Ninsc)") || !AFFILIATED.is_match(p))
        .filter(|p| !NUMERIC.is_match(p))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_breakdown() {
        let detalhe = "A Favor: <I>PSD</I>, <I>CDS-PP</I><BR>Contra:<I>CH</I>";
        let parsed = parse_detalhe(detalhe).unwrap();
        assert_eq!(parsed.a_favor, vec!["PSD", "CDS-PP"]);
        assert_eq!(parsed.contra, vec!["CH"]);
        assert!(parsed.abstencao.is_empty());
        assert!(parsed.ausencia.is_empty());
    }

    #[test]
    fn test_parse_abstencao_accent_normalization() {
        let detalhe = "Abstenção: <I>PS</I><BR>A Favor: <I>PSD</I>";
        let parsed = parse_detalhe(detalhe).unwrap();
        assert_eq!(parsed.abstencao, vec!["PS"]);
        assert_eq!(parsed.a_favor, vec!["PSD"]);
    }

    #[test]
    fn test_ninsc_members_kept_with_full_name() {
        let detalhe = "A Favor: <I>PS</I>, <I>António Maló (Ninsc)</I>";
        let parsed = parse_detalhe(detalhe).unwrap();
        assert_eq!(parsed.a_favor, vec!["PS", "António Maló (Ninsc)"]);
    }

    #[test]
    fn test_affiliated_members_aggregated_away() {
        // Individual MPs voting with their party are dropped; the party
        // position is already carried by the party code.
        let detalhe = "Contra: <I>PSD</I>, <I>João Silva (PSD)</I>";
        let parsed = parse_detalhe(detalhe).unwrap();
        assert_eq!(parsed.contra, vec!["PSD"]);
    }

    #[test]
    fn test_aggregates_and_numbers_skipped() {
        let detalhe = "A Favor: <I>6-PSD</I>, <I>12</I>, <I>PS</I>";
        let parsed = parse_detalhe(detalhe).unwrap();
        assert_eq!(parsed.a_favor, vec!["PS"]);
    }

    #[test]
    fn test_empty_detalhe_is_none() {
        assert_eq!(parse_detalhe(""), None);
        assert_eq!(parse_detalhe("   "), None);
    }

    #[test]
    fn test_section_without_colon_ignored() {
        let detalhe = "so much noise<BR>A Favor: <I>PS</I>";
        let parsed = parse_detalhe(detalhe).unwrap();
        assert_eq!(parsed.a_favor, vec!["PS"]);
    }
}
