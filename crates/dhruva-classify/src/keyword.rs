use crate::error::ClassifyError;
use crate::{Classifier, ClassifierOutput};
use dhruva_core::taxonomy::{Language, RootCause};

/// Phrases that point at a root cause, English and Telugu mixed.
const ROOT_CAUSE_SIGNALS: &[(&str, &[&str])] = &[
    (
        "DUPLICATE_CASE",
        &[
            "already filed",
            "already complained",
            "complained before",
            "same complaint",
            "duplicate",
            "ఇప్పటికే ఫిర్యాదు",
            "మళ్ళీ ఫిర్యాదు",
        ],
    ),
    (
        "MISSING_INFORMATION",
        &[
            "missing document",
            "documents missing",
            "incomplete",
            "not submitted",
            "asked for details",
            "bank account",
            "account number",
            "survey number",
            "పత్రాలు లేవు",
            "వివరాలు లేవు",
            "బ్యాంక్ ఖాతా",
        ],
    ),
    (
        "WRONG_DEPARTMENT",
        &[
            "wrong department",
            "wrong office",
            "not our department",
            "sent to another department",
            "తప్పు శాఖ",
        ],
    ),
    (
        "OUTSIDE_JURISDICTION",
        &[
            "other district",
            "another district",
            "another state",
            "outside jurisdiction",
            "central government",
            "వేరే జిల్లా",
        ],
    ),
    (
        "NEEDS_FIELD_VISIT",
        &[
            "field visit",
            "site visit",
            "inspection",
            "survey the land",
            "measure the land",
            "encroachment",
            "స్థల పరిశీలన",
            "ఆక్రమణ",
        ],
    ),
    (
        "EXTERNAL_DEPENDENCY",
        &[
            "verification pending",
            "pending verification",
            "waiting for bank",
            "awaiting approval",
            "treasury",
            "ధృవీకరణ పెండింగ్",
        ],
    ),
    (
        "CITIZEN_UNREACHABLE",
        &[
            "not reachable",
            "unreachable",
            "phone switched off",
            "could not contact",
            "ఫోన్ కలవడం లేదు",
        ],
    ),
    (
        "POLICY_LIMITATION",
        &[
            "not eligible",
            "as per rules",
            "not covered by the scheme",
            "policy",
            "అర్హత లేదు",
        ],
    ),
    (
        "RESOURCE_CONSTRAINT",
        &[
            "no funds",
            "budget",
            "no staff",
            "material shortage",
            "నిధులు లేవు",
        ],
    ),
    (
        "OFFICER_OVERLOAD",
        &[
            "officer busy",
            "officer on leave",
            "no officer",
            "too many cases",
            "అధికారి సెలవు",
        ],
    ),
];

const DEPARTMENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("Pension", &["pension", "ppo", "పెన్షన్", "పింఛన్"]),
    ("Revenue", &["land", "patta", "survey", "mutation", "భూమి", "పట్టా", "సర్వే"]),
    ("Health", &["hospital", "doctor", "medicine", "ఆసుపత్రి", "వైద్యుడు"]),
    ("Roads", &["road", "pothole", "bridge", "రోడ్డు"]),
    ("Water", &["drinking water", "water supply", "borewell", "నీటి", "మంచినీరు"]),
    ("Electricity", &["electricity", "power cut", "transformer", "విద్యుత్", "కరెంట్"]),
    ("Education", &["school", "teacher", "scholarship", "పాఠశాల"]),
    ("Police", &["police", "fir", "పోలీస్"]),
];

/// Offline classifier matching signal phrases in the grievance text.
///
/// Confidence grows with the number of distinct signals for the winning
/// root cause and drops below the default threshold when two root causes
/// tie.
pub struct KeywordClassifier;

impl KeywordClassifier {
    fn root_cause_hits(text: &str) -> Vec<(&'static str, usize)> {
        let mut hits: Vec<(&'static str, usize)> = ROOT_CAUSE_SIGNALS
            .iter()
            .map(|(code, phrases)| (*code, phrases.iter().filter(|p| text.contains(*p)).count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        // stable: ties keep declaration order
        hits.sort_by(|a, b| b.1.cmp(&a.1));
        hits
    }

    fn department(text: &str) -> Option<String> {
        DEPARTMENT_KEYWORDS
            .iter()
            .map(|(dept, words)| (*dept, words.iter().filter(|w| contains_word(text, w)).count()))
            .filter(|(_, n)| *n > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(dept, _)| dept.to_string())
    }
}

impl Classifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    fn classify(&self, text: &str, _language: Language) -> Result<ClassifierOutput, ClassifyError> {
        let text = text.to_lowercase();
        let hits = Self::root_cause_hits(&text);
        let Some(&(code, count)) = hits.first() else {
            return Err(ClassifyError::NoSignal);
        };
        let tied = hits.get(1).is_some_and(|(_, n)| *n == count);
        let confidence = if tied {
            0.4
        } else {
            match count {
                1 => 0.6,
                2 => 0.75,
                _ => 0.9,
            }
        };
        let root_cause =
            RootCause::parse(code).map_err(|e| ClassifyError::InvalidResponse(e.to_string()))?;
        tracing::debug!(%root_cause, signals = count, tied, "keyword classification");
        Ok(ClassifierOutput {
            department: Self::department(&text),
            root_cause,
            confidence,
        })
    }
}

/// ASCII keywords must stand alone so "fir" does not match "first";
/// Telugu keywords match anywhere since suffixes attach to the stem.
fn contains_word(text: &str, word: &str) -> bool {
    if !word.is_ascii() {
        return text.contains(word);
    }
    text.match_indices(word).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + word.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Result<ClassifierOutput, ClassifyError> {
        KeywordClassifier.classify(text, Language::En)
    }

    #[test]
    fn english_pension_bank_issue() {
        let out = classify("My pension is not credited, the bank account number is wrong").unwrap();
        assert_eq!(out.root_cause.as_str(), "MISSING_INFORMATION");
        assert_eq!(out.department.as_deref(), Some("Pension"));
        assert_eq!(out.confidence, 0.75);
    }

    #[test]
    fn telugu_duplicate() {
        let out = KeywordClassifier
            .classify("నేను ఇప్పటికే ఫిర్యాదు చేశాను, పెన్షన్ రాలేదు", Language::Te)
            .unwrap();
        assert_eq!(out.root_cause.as_str(), "DUPLICATE_CASE");
        assert_eq!(out.department.as_deref(), Some("Pension"));
        assert_eq!(out.confidence, 0.6);
    }

    #[test]
    fn tie_gives_low_confidence() {
        let out = classify("duplicate complaint about land encroachment").unwrap();
        assert_eq!(out.root_cause.as_str(), "DUPLICATE_CASE");
        assert_eq!(out.confidence, 0.4);
        assert_eq!(out.department.as_deref(), Some("Revenue"));
    }

    #[test]
    fn no_signal_is_an_error() {
        assert!(matches!(
            classify("please help me"),
            Err(ClassifyError::NoSignal)
        ));
    }

    #[test]
    fn short_keywords_match_whole_words_only() {
        assert!(contains_word("filed an fir yesterday", "fir"));
        assert!(!contains_word("first time", "fir"));
        assert!(contains_word("పెన్షన్‌లు", "పెన్షన్"));
    }
}
