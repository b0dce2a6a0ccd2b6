//! Response shape tests: the JSON field names the web client reads.
//!
//! These serialize the real response types rather than going through a
//! running server.

use std::collections::BTreeMap;

use gradkg_chat::{ChatAnswer, ChatRequest, LLMConfig, LLMConfigUpdate};
use gradkg_core::{Classification, MajorType, Requirement, RequirementKey, Subject};
use gradkg_resolve::{reconcile, KgContext, RetrievalTool};
use gradkg_store::{KgRow, RequirementRow};

fn requirement() -> Requirement {
    let key = RequirementKey::new(2025, "컴퓨터공학과", MajorType::Single);
    Requirement {
        id: key.id(),
        year: 2025,
        department: "컴퓨터공학과".into(),
        major_type: MajorType::Single,
        total_credits: Some(130),
        credits_major_basic: Some(12),
        credits_major_required: Some(42),
        credits_major_elective: Some(30),
        credits_industry_required: None,
    }
}

/// GraduationReport without a requirement: empty summary, every category
/// present with zero requirement.
#[test]
fn test_graduation_report_without_requirement() {
    let report = serde_json::to_value(reconcile(None, &[], &["자료구조".into()])).unwrap();

    assert_eq!(report["requirement_summary"], serde_json::json!({}));
    assert_eq!(report["missing_by_category"], serde_json::json!({}));
    for category in ["major_required", "major_elective", "major_basic", "industry_required"] {
        let status = &report["credit_status"][category];
        assert_eq!(status["required"], 0, "{}", category);
        assert_eq!(status["remaining"], 0, "{}", category);
    }
}

/// Missing subjects are grouped by category with name, credits,
/// alternatives and note.
#[test]
fn test_graduation_report_missing_shape() {
    let req = requirement();
    let rows = vec![RequirementRow {
        subject: Subject::new("CSE101", "자료구조", 3),
        classification: Classification::MajorRequired,
        sub_classification: None,
        substitute: Some(Subject::new("OLD201", "자료구조및실습", 3)),
        substitute_note: Some("2022 이전 입학생".into()),
    }];
    let report = serde_json::to_value(reconcile(Some(&req), &rows, &[])).unwrap();

    assert_eq!(report["requirement_summary"]["id"], "2025_컴퓨터공학과_단일전공");
    let missing = &report["missing_by_category"]["major_required"][0];
    assert_eq!(missing["name"], "자료구조");
    assert_eq!(missing["credits"], 3);
    assert_eq!(missing["alternatives"], "자료구조및실습");
    assert_eq!(missing["note"], "2022 이전 입학생");
    assert_eq!(report["credit_status"]["major_required"]["remaining"], 42);
}

/// Chat request uses camelCase and defaults the major type.
#[test]
fn test_chat_request_shape() {
    let req: ChatRequest = serde_json::from_value(serde_json::json!({
        "message": "졸업 학점은?",
        "admissionYear": 2021,
        "department": "컴퓨터공학과",
        "conversationHistory": [
            {"role": "user", "content": "안녕"},
            {"role": "assistant", "content": "무엇을 도와드릴까요?"}
        ]
    }))
    .unwrap();

    assert_eq!(req.conversation_history.len(), 2);
    let profile = req.profile();
    assert_eq!(profile.admission_year, 2021);
    assert_eq!(profile.major_type, MajorType::Single);
}

#[test]
fn test_chat_answer_shape() {
    let answer = ChatAnswer {
        message: "130학점입니다.".into(),
        source: "3, 7".into(),
        tool: RetrievalTool::Vector,
        final_query: "졸업 학점".into(),
        model: None,
        duration: 12,
    };
    let json = serde_json::to_value(&answer).unwrap();

    assert!(json["message"].is_string());
    assert_eq!(json["source"], "3, 7");
    assert_eq!(json["tool"], "Vector");
    assert_eq!(json["finalQuery"], "졸업 학점");
    assert!(json.get("model").is_none());
    assert!(json["duration"].is_number());
}

/// KG browse response: source tag, years and the rendered document.
#[test]
fn test_kg_context_shape() {
    let rows = vec![KgRow {
        requirement: requirement(),
        subject_id: "CSE101".into(),
        subject_name: "자료구조".into(),
        classification: Classification::MajorBasic,
        sub_classification: None,
    }];
    let ctx = KgContext::from_rows("컴퓨터공학과", MajorType::Single, &rows).unwrap();
    let json = serde_json::to_value(&ctx).unwrap();

    assert_eq!(json["source"], "Knowledge Graph");
    assert_eq!(json["major_type"], "single");
    assert_eq!(json["years"], serde_json::json!([2025]));
    assert_eq!(json["rows"], 1);
    assert!(json["text"].as_str().unwrap().contains("전공기초"));
}

/// LLM config response never carries keys.
#[test]
fn test_llm_config_shape() {
    let mut config = LLMConfig::default();
    config.apply_update(&LLMConfigUpdate {
        openai_api_key: Some("sk-secret".into()),
        ..Default::default()
    });
    let json = serde_json::to_value(config.to_response()).unwrap();

    assert_eq!(json["preferredProvider"], "auto");
    assert_eq!(json["openaiConfigured"], true);
    assert_eq!(json["geminiConfigured"], false);
    assert_eq!(json["activeProvider"], "openai");
    assert!(!json.to_string().contains("sk-secret"));

    let models: BTreeMap<&str, &serde_json::Value> = [
        ("gemini", &json["geminiModel"]),
        ("openai", &json["openaiModel"]),
        ("anthropic", &json["anthropicModel"]),
    ]
    .into_iter()
    .collect();
    assert!(models.values().all(|m| m.is_string()));
}
