/// A finished question/answer pair.
///
/// Both the single-shot endpoint and the streaming assembler produce this exact
/// shape, so history views and persistence never need to know which path a
/// record came from. Once built it is not mutated.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueryRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    /// ISO-8601 start time as reported by the backend.
    pub timestamp: String,
    /// Server-side processing time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

/// One page of the backend's query history.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueryHistory {
    pub queries: Vec<QueryRecord>,
    pub total_count: usize,
}

/// Request body shared by the single-shot and streaming endpoints.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub question: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_shot_body_decodes_into_record() {
        let body = r#"{
            "id": "a1",
            "question": "Visa for Japan?",
            "answer": "Depends on passport.",
            "timestamp": "2024-05-01T10:00:00",
            "processing_time": 2.25
        }"#;
        let record: QueryRecord = serde_json::from_str(body).expect("record");
        assert_eq!(record.id, "a1");
        assert_eq!(record.processing_time, Some(2.25));
    }

    #[test]
    fn processing_time_is_optional() {
        let body = r#"{"id":"a","question":"q","answer":"x","timestamp":"t"}"#;
        let record: QueryRecord = serde_json::from_str(body).expect("record");
        assert_eq!(record.processing_time, None);
        let encoded = serde_json::to_value(&record).expect("encode");
        assert!(encoded.get("processing_time").is_none());
    }

    #[test]
    fn request_body_is_question_object() {
        let body = serde_json::to_value(QueryRequest { question: "Q" }).expect("encode");
        assert_eq!(body, serde_json::json!({"question": "Q"}));
    }
}
