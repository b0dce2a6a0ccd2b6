//! Prompt templates for routing and answering.

use gradkg_resolve::StudentProfile;

/// Reply used when no regulation text was retrieved.
pub const NOT_FOUND_ANSWER: &str = "관련된 정보를 찾을 수 없었습니다.";

/// Source label when nothing was retrieved.
pub const NO_SOURCE: &str = "없음";

/// Source label for answers built from the requirement graph.
pub const KG_SOURCE_LABEL: &str = "Knowledge Graph (졸업요건 DB)";

/// System instruction for the routing call. The model sees the recent
/// conversation and must reply with `{"final_query", "tool"}`.
pub fn intent_prompt(history: &str, query: &str, latest_year: i32) -> String {
    format!(
        r#"[이전 대화]와 [질문]을 보고 아래 두 가지를 결정하세요.

[이전 대화]
{history}

[질문]
{query}

1. final_query
[질문]에서 생략된 주제나 대명사를 [이전 대화]로 채워 완결된 질문으로 다시 쓰세요.
[이전 대화]와 이어지지 않는 질문이면 그대로 두세요.
- 이전 "알고리즘 선수과목이 뭐야?", 현재 "자료구조는?" -> "자료구조의 선수과목은 무엇인가요?"
- 이전 "수강신청 언제야?", 현재 "장학금 신청 기간 알려줘" -> "장학금 신청 기간 알려줘"

2. tool
문서 검색(Vector)은 학생의 입학년도 문서와 최신 연도({latest_year}년) 문서만 찾을 수 있습니다.
다음 경우에는 "KG"를 고르세요.
- 서로 다른 연도의 졸업요건이나 교육과정을 비교하는 질문
- 입학년도와 최신 연도가 아닌 특정 연도에 대한 질문
- 교육과정이나 졸업요건 변경에 대한 질문
그 밖의 질문은 "Vector"를 고르세요.

JSON 객체 하나로만 답하세요.
{{"final_query": "완결된 질문", "tool": "KG" 또는 "Vector"}}"#
    )
}

/// Prompt for the final answer. The original question is answered; the
/// rewritten one was only used for retrieval.
pub fn answer_prompt(
    context: &str,
    history: &str,
    query: &str,
    profile: &StudentProfile,
) -> String {
    format!(
        r#"아래 [학사규정]만 근거로 학생의 [질문]에 답하세요.

[답변 규칙]
- 서론 없이 질문에 필요한 내용만 읽기 쉽게 정리하세요.
- 필요하면 [이전 대화]로 질문의 맥락을 파악하세요.
- [학사규정]에 없는 내용은 만들어내지 마세요.
- 근거가 없으면 "죄송합니다. 현재 가지고 있는 문서에는 해당 내용이 나와있지 않습니다."라고 답하세요.
- 학생의 입학년도와 학과에 적용되는 규정을 먼저 설명하세요.

[학사규정]
{context}

[이전 대화]
{history}

[질문]
{query}

[학생 정보]
- 입학년도: {year}
- 학과: {department}
- 전공 유형: {major_type}"#,
        year = profile.admission_year,
        department = profile.department,
        major_type = profile.major_type.label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradkg_core::MajorType;

    #[test]
    fn test_answer_prompt_carries_profile() {
        let profile = StudentProfile {
            admission_year: 2021,
            department: "컴퓨터공학과".into(),
            major_type: MajorType::Double,
        };
        let prompt = answer_prompt("규정 본문", "이전 대화 없음.", "졸업학점은?", &profile);
        assert!(prompt.contains("- 입학년도: 2021"));
        assert!(prompt.contains("- 전공 유형: 다전공"));
        assert!(prompt.contains("규정 본문"));
    }

    #[test]
    fn test_intent_prompt_mentions_latest_year() {
        let prompt = intent_prompt("이전 대화 없음.", "졸업요건 알려줘", 2025);
        assert!(prompt.contains("2025년"));
        assert!(prompt.contains(r#""tool""#));
    }
}
