//! Chain-of-thought context template
//!
//! A fixed five-step text block naming the query and listing every retrieved
//! document in order. No ranking or summarizing happens here.

use std::fmt::Write;

/// Line emitted in step 2 when the search returned nothing.
pub const NO_DOCUMENTS_LINE: &str = " - No relevant documents found.";

/// Build the context passed to the answer service.
pub fn chain_of_thought<S: AsRef<str>>(query: &str, documents: &[S]) -> String {
    let mut steps = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(steps, "Step 1: Understand the user's query: '{}'", query);
    steps.push_str("Step 2: Review the relevant documents:\n");

    if documents.is_empty() {
        steps.push_str(NO_DOCUMENTS_LINE);
        steps.push('\n');
    } else {
        for document in documents {
            let _ = writeln!(steps, " - Document: '{}'", document.as_ref());
        }
    }

    steps.push_str("Step 3: Reasoning through the provided context and documents.\n");
    steps.push_str(
        "Step 4: Based on the reasoning and information in the documents, I will generate an answer:\n",
    );
    steps.push_str("Step 5: Answer: ");

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKERS: [&str; 5] = ["Step 1:", "Step 2:", "Step 3:", "Step 4:", "Step 5:"];

    fn assert_markers_in_order(context: &str) {
        let mut cursor = 0;
        for marker in MARKERS {
            let offset = context[cursor..]
                .find(marker)
                .unwrap_or_else(|| panic!("{} missing or out of order", marker));
            cursor += offset + marker.len();
        }
    }

    #[test]
    fn test_exact_layout_with_documents() {
        let context = chain_of_thought("What is RAG?", &["Doc A", "Doc B"]);
        assert_eq!(
            context,
            "Step 1: Understand the user's query: 'What is RAG?'\n\
             Step 2: Review the relevant documents:\n \
             - Document: 'Doc A'\n \
             - Document: 'Doc B'\n\
             Step 3: Reasoning through the provided context and documents.\n\
             Step 4: Based on the reasoning and information in the documents, I will generate an answer:\n\
             Step 5: Answer: "
        );
    }

    #[test]
    fn test_empty_results() {
        let context = chain_of_thought::<&str>("hello", &[]);
        assert!(context.contains("\n - No relevant documents found.\n"));
        assert!(!context.contains("Document:"));
        assert_markers_in_order(&context);
    }

    #[test]
    fn test_documents_never_report_empty() {
        let docs = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        let context = chain_of_thought("q", &docs);

        assert!(!context.contains(NO_DOCUMENTS_LINE));
        let lines: Vec<&str> = context
            .lines()
            .filter(|l| l.starts_with(" - Document: "))
            .collect();
        assert_eq!(
            lines,
            vec![
                " - Document: 'first'",
                " - Document: 'second'",
                " - Document: 'third'",
            ]
        );
    }

    #[test]
    fn test_markers_survive_odd_queries() {
        for query in ["", "Step 5: Answer:", "multi\nline", "quote ' inside"] {
            assert_markers_in_order(&chain_of_thought(query, &["doc"]));
            assert_markers_in_order(&chain_of_thought::<&str>(query, &[]));
        }
    }

    #[test]
    fn test_ends_with_open_answer() {
        let context = chain_of_thought("q", &["d"]);
        assert!(context.ends_with("Step 5: Answer: "));
    }
}
