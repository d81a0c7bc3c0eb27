//! Snapshot tests for core types

#[cfg(test)]
mod snapshot_tests {
    use crate::{ChatTurn, DocumentChunk, QueryResult};
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_chat_history_snapshot() {
        let history = vec![
            ChatTurn::human("what is a retriever?"),
            ChatTurn::ai("An interface that returns documents."),
        ];

        assert_yaml_snapshot!(history, @r###"
        - role: human
          text: what is a retriever?
        - role: ai
          text: An interface that returns documents.
        "###);
    }

    #[test]
    fn test_query_result_sources_keep_retrieval_order() {
        let result = QueryResult {
            query: "q".to_string(),
            standalone_query: "q".to_string(),
            result: "a".to_string(),
            source_documents: vec![
                DocumentChunk::new("one", "https://example.com/b.html"),
                DocumentChunk::new("two", "https://example.com/a.html"),
                DocumentChunk::new("three", "https://example.com/b.html"),
            ],
        };

        let sources: Vec<&str> = result.sources().collect();
        assert_yaml_snapshot!(sources, @r###"
        - "https://example.com/b.html"
        - "https://example.com/a.html"
        - "https://example.com/b.html"
        "###);
    }
}
