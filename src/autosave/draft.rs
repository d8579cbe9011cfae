//! # 편집 스냅샷과 핑거프린트
//!
//! 편집 화면(Editor Surface)이 만들어내는 필드 단위 편집 이벤트를
//! 메모리 내 스냅샷(`SessionDraft`)에 병합하고, "저장할 필요가 있는가"를
//! 판단하기 위한 핑거프린트를 계산합니다.
//!
//! 핑거프린트는 스냅샷의 JSON 직렬화 결과입니다. 구조체 필드 순서가
//! 직렬화 순서를 결정하므로 같은 내용이면 항상 같은 문자열이 나옵니다
//! (직렬화 동등성 비교).

use serde::Serialize;

use crate::models::{AutoSaveRequest, Category, CreateSessionRequest, Difficulty, SessionStatus};

/// 필드 단위 편집 이벤트
///
/// 편집 화면의 입력 하나가 델타 하나가 됩니다.
/// 코디네이터는 델타를 스냅샷에 병합만 하고, 저장 여부는
/// 타이밍 정책(디바운스/주기)이 결정합니다.
#[derive(Debug, Clone)]
pub enum FieldDelta {
    Title(String),
    Description(String),
    Tags(Vec<String>),
    JsonUrl(String),
    Content(serde_json::Value),
    Category(Category),
    Difficulty(Difficulty),
    Duration(i64),
}

/// 편집 중인 세션의 메모리 내 스냅샷
///
/// 저장 실패는 이 스냅샷을 절대 버리지 않습니다 — 저장이 성공할 때까지
/// 미저장 편집의 유일한 원본(source of truth)입니다.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionDraft {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    /// 빈 문자열 = URL 없음 (편집 필드 그대로 보관, 전송 시 생략)
    pub json_url: String,
    pub content: serde_json::Value,
    /// 명시적 선택 전에는 None — 생성 시 기본값이 적용됩니다
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub duration: Option<i64>,
}

impl Default for SessionDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            tags: Vec::new(),
            json_url: String::new(),
            content: serde_json::json!({}),
            category: None,
            difficulty: None,
            duration: None,
        }
    }
}

impl SessionDraft {
    /// 델타 하나를 스냅샷에 병합합니다 (필드 단위 교체).
    pub fn apply(&mut self, delta: FieldDelta) {
        match delta {
            FieldDelta::Title(title) => self.title = title,
            FieldDelta::Description(description) => self.description = description,
            FieldDelta::Tags(tags) => self.tags = tags,
            FieldDelta::JsonUrl(url) => self.json_url = url,
            FieldDelta::Content(content) => self.content = content,
            FieldDelta::Category(category) => self.category = Some(category),
            FieldDelta::Difficulty(difficulty) => self.difficulty = Some(difficulty),
            FieldDelta::Duration(duration) => self.duration = Some(duration),
        }
    }

    /// 제목이 있는가 — 제목 없는 문서는 절대 저장하지 않습니다.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// 내용 핑거프린트 — 마지막으로 저장된 핑거프린트와 같으면
    /// 저장은 무의미한 중복 쓰기이므로 건너뜁니다.
    pub fn fingerprint(&self) -> String {
        // SessionDraft는 Serialize 실패 요인이 없는 평범한 값 타입이라
        // 이 직렬화는 실패하지 않습니다.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// 최초 생성(create) 페이로드로 정규화합니다.
    ///
    /// 아직 선택되지 않은 필드에 편집기 기본값을 적용합니다:
    /// category=meditation, difficulty=beginner, duration=30, status=draft.
    /// jsonUrl이 빈 값이면 필드를 생략합니다.
    pub fn create_payload(&self) -> CreateSessionRequest {
        let json_url = self.json_url.trim();
        CreateSessionRequest {
            title: self.title.trim().to_string(),
            description: Some(self.description.clone()),
            tags: Some(self.tags.clone()),
            json_url: (!json_url.is_empty()).then(|| json_url.to_string()),
            content: Some(self.content.clone()),
            status: Some(SessionStatus::Draft),
            duration: Some(self.duration.unwrap_or(30)),
            difficulty: Some(self.difficulty.unwrap_or_default()),
            category: Some(self.category.unwrap_or(Category::Meditation)),
        }
    }

    /// 부분 업데이트(autosave) 페이로드를 만듭니다.
    ///
    /// 자동 저장 채널이 허용된 필드만 싣습니다. status/category처럼
    /// 명시적 동작으로만 바뀌는 필드는 여기서 전송하지 않으므로
    /// 서버의 값이 조용히 덮어써질 일이 없습니다.
    pub fn autosave_payload(&self) -> AutoSaveRequest {
        let json_url = self.json_url.trim();
        AutoSaveRequest {
            title: Some(self.title.trim().to_string()),
            description: Some(self.description.clone()),
            content: Some(self.content.clone()),
            tags: Some(self.tags.clone()),
            json_url: (!json_url.is_empty()).then(|| json_url.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_changes_with_content() {
        let mut draft = SessionDraft::default();
        draft.apply(FieldDelta::Title("Morning Flow".to_string()));
        let fp1 = draft.fingerprint();

        draft.apply(FieldDelta::Description("A gentle start".to_string()));
        let fp2 = draft.fingerprint();
        assert_ne!(fp1, fp2);

        // 같은 내용 → 같은 핑거프린트
        assert_eq!(draft.fingerprint(), fp2);
    }

    #[test]
    fn apply_replaces_whole_field() {
        let mut draft = SessionDraft::default();
        draft.apply(FieldDelta::Tags(vec!["morning".to_string()]));
        draft.apply(FieldDelta::Tags(vec!["evening".to_string()]));
        assert_eq!(draft.tags, vec!["evening"]);
    }

    #[test]
    fn create_payload_applies_editor_defaults() {
        let mut draft = SessionDraft::default();
        draft.apply(FieldDelta::Title("  Morning Flow  ".to_string()));

        let payload = draft.create_payload();
        assert_eq!(payload.title, "Morning Flow");
        assert_eq!(payload.category, Some(Category::Meditation));
        assert_eq!(payload.difficulty, Some(Difficulty::Beginner));
        assert_eq!(payload.duration, Some(30));
        assert_eq!(payload.status, Some(SessionStatus::Draft));
        // 빈 jsonUrl은 생략
        assert_eq!(payload.json_url, None);
    }

    #[test]
    fn autosave_payload_carries_only_allowed_fields() {
        let mut draft = SessionDraft::default();
        draft.apply(FieldDelta::Title("Morning Flow".to_string()));
        draft.apply(FieldDelta::Content(json!({"steps": [1, 2, 3]})));
        draft.apply(FieldDelta::Category(Category::Yoga));

        let patch = draft.autosave_payload();
        assert_eq!(patch.title.as_deref(), Some("Morning Flow"));
        assert_eq!(patch.content, Some(json!({"steps": [1, 2, 3]})));
        // category는 AutoSaveRequest에 아예 존재하지 않음 — 타입이 보장
        let wire = serde_json::to_value(&patch).unwrap();
        assert!(wire.get("category").is_none());
        assert!(wire.get("status").is_none());
    }
}
