//! Document Categorizer
//!
//! 파일명과 본문 앞부분의 키워드로 HR 문서 카테고리를 추정합니다.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 분류에 사용하는 본문 앞부분 길이 (문자 수)
const SAMPLE_CHARACTERS: usize = 5000;

/// 문서 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Policy,
    Procedure,
    JobDescription,
    Handbook,
    Benefits,
    Compliance,
    Training,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Procedure => "procedure",
            Self::JobDescription => "job_description",
            Self::Handbook => "handbook",
            Self::Benefits => "benefits",
            Self::Compliance => "compliance",
            Self::Training => "training",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "policy" | "policies" => Ok(Self::Policy),
            "procedure" | "procedures" | "sop" => Ok(Self::Procedure),
            "job_description" | "jd" => Ok(Self::JobDescription),
            "handbook" | "booklet" => Ok(Self::Handbook),
            "benefits" | "benefit" => Ok(Self::Benefits),
            "compliance" => Ok(Self::Compliance),
            "training" => Ok(Self::Training),
            "general" => Ok(Self::General),
            other => anyhow::bail!(
                "Unknown category: {}. Use: policy, procedure, job_description, handbook, benefits, compliance, training, general",
                other
            ),
        }
    }
}

// ============================================================================
// Category Patterns
// ============================================================================

/// 평가 순서가 고정된 (카테고리, 패턴) 테이블. 동점이면 앞선 항목이 이김.
static CATEGORY_PATTERNS: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    [
        (
            Category::Policy,
            r"(?i)\b(polic(y|ies)|code of conduct|guideline|must not|prohibited)\b",
        ),
        (
            Category::Procedure,
            r"(?i)\b(procedures?|step \d+|process|workflow|instructions?|how to)\b",
        ),
        (
            Category::JobDescription,
            r"(?i)\b(job description|responsibilities|qualifications|requirements|reports to|position summary)\b",
        ),
        (
            Category::Handbook,
            r"(?i)\b(handbook|booklet|welcome to|our mission|our values|organi[sz]ation(al)? chart)\b",
        ),
        (
            Category::Benefits,
            r"(?i)\b(benefits?|insurance|pension|401k|vacation|paid leave|allowance)\b",
        ),
        (
            Category::Compliance,
            r"(?i)\b(compliance|regulat(ion|ory)|audit|gdpr|osha|legal requirement)\b",
        ),
        (
            Category::Training,
            r"(?i)\b(training|onboarding|course|learning objectives?|workshop)\b",
        ),
    ]
    .into_iter()
    .map(|(category, pattern)| (category, Regex::new(pattern).expect("valid regex")))
    .collect()
});

// ============================================================================
// Categorization
// ============================================================================

/// 파일명 + 본문 앞부분으로 카테고리 결정
///
/// 매치 수가 가장 많은 카테고리를 선택하고, 아무것도 없으면 `General`.
pub fn categorize(filename: &str, text: &str) -> Category {
    let sample: String = text.chars().take(SAMPLE_CHARACTERS).collect();
    let haystack = format!("{}\n{}", filename.replace(['_', '-', '.'], " "), sample);

    let mut best = (Category::General, 0usize);

    for (category, pattern) in CATEGORY_PATTERNS.iter() {
        let score = pattern.find_iter(&haystack).count();
        if score > best.1 {
            best = (*category, score);
        }
    }

    tracing::debug!("Categorized {:?} as {} (score {})", filename, best.0, best.1);
    best.0
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_policy() {
        let text = "This policy applies to all staff. Smoking is prohibited on site.";
        assert_eq!(categorize("rules.txt", text), Category::Policy);
    }

    #[test]
    fn test_categorize_from_filename() {
        assert_eq!(
            categorize("employee_handbook.pdf", "Plain text without hints."),
            Category::Handbook
        );
    }

    #[test]
    fn test_categorize_job_description() {
        let text = "Position Summary\n\nResponsibilities include payroll.\n\nQualifications: CPA.";
        assert_eq!(categorize("senior-accountant.md", text), Category::JobDescription);
    }

    #[test]
    fn test_categorize_general() {
        assert_eq!(categorize("notes.txt", "Lunch menu for Friday."), Category::General);
    }

    #[test]
    fn test_tie_goes_to_earlier_entry() {
        // policy 1회, training 1회
        assert_eq!(
            categorize("doc.txt", "The policy covers the workshop."),
            Category::Policy
        );
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            Category::Policy,
            Category::Procedure,
            Category::JobDescription,
            Category::Handbook,
            Category::Benefits,
            Category::Compliance,
            Category::Training,
            Category::General,
        ] {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("unknown".parse::<Category>().is_err());
    }
}
