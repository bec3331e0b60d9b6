use crate::models::QueryResult;

/// Exact reply the model is told to give when the context lacks the answer.
/// Callers compare against it, so it must never be reworded.
pub const REFUSAL_ANSWER: &str = "I cannot find this information.";

pub fn context_block(result: &QueryResult) -> String {
    format!(
        "Source Document: {} (Chunk: {})\nContent: {}",
        result.document_id, result.chunk_sequence, result.text
    )
}

/// Renders the grounded instruction prompt. Blocks appear in the order
/// given and are separated by a blank line.
pub fn compose_prompt(question: &str, retrieved: &[QueryResult]) -> String {
    let context = retrieved
        .iter()
        .map(context_block)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a company policy assistant chatbot.\n\
         \n\
         Use ONLY the context below (company policies) to answer the user's question.\n\
         If the answer is not clearly found in the context, reply exactly with:\n\
         \"{REFUSAL_ANSWER}\"\n\
         \n\
         ### CONTEXT:\n\
         {context}\n\
         \n\
         ### QUESTION:\n\
         {question}\n\
         \n\
         ### ANSWER (in clear, simple English):\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(rank: usize, document_id: &str, chunk_sequence: usize, text: &str) -> QueryResult {
        QueryResult {
            rank,
            score: rank as f32,
            document_id: document_id.to_string(),
            chunk_sequence,
            text: text.to_string(),
        }
    }

    #[test]
    fn blocks_follow_retrieval_order() {
        let retrieved = vec![
            result(0, "leave.txt", 0, "Sick leave is 10 days per year."),
            result(1, "travel.txt", 3, "Flights need approval."),
        ];
        let prompt = compose_prompt("How many sick leave days?", &retrieved);

        let expected_context = "Source Document: leave.txt (Chunk: 0)\n\
                                Content: Sick leave is 10 days per year.\n\
                                \n\
                                Source Document: travel.txt (Chunk: 3)\n\
                                Content: Flights need approval.";
        assert!(prompt.contains(expected_context));
        assert!(prompt.contains("### QUESTION:\nHow many sick leave days?\n"));
    }

    #[test]
    fn refusal_literal_is_embedded_verbatim() {
        let prompt = compose_prompt("q", &[result(0, "a.txt", 0, "text")]);
        assert!(prompt.contains("reply exactly with:\n\"I cannot find this information.\"\n"));
    }

    #[test]
    fn composition_is_deterministic() {
        let retrieved = vec![result(0, "a.txt", 0, "alpha"), result(1, "b.txt", 1, "beta")];
        assert_eq!(
            compose_prompt("same?", &retrieved),
            compose_prompt("same?", &retrieved)
        );
    }
}
