//! Prompt templates for the generation collaborator.

use crate::query::EnhancedQuery;
use crate::rag::context_builder::SqlPromptContext;

pub fn enhancer_prompt(question: &str, schema_hint: &str) -> String {
    format!(
        r#"You are an expert in turning natural-language questions into structured SQL intent.
Analyze the question and return structured information about it.

Available tables (hint):
{schema_hint}

Question: {question}

Respond ONLY with a JSON object in this format:
{{"rewritten_query":"<more precise rephrasing>","mentioned_tables":["<table>"],"time_constraints":"<time conditions or empty>","aggregation":"<COUNT, SUM, AVG ... or empty>","filter_conditions":["<condition>"]}}
Do not include any extra text outside the JSON."#
    )
}

pub fn sql_prompt(question: &str, context: &SqlPromptContext, enhanced: &EnhancedQuery) -> String {
    let tables_hint = if enhanced.mentioned_tables.is_empty() {
        "not determined".to_string()
    } else {
        enhanced
            .mentioned_tables
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"You are an expert in converting natural language questions into SQL queries.
Use the following schema and examples to guide your response.

Schema:
{schema}

Examples:
{examples}

Query understanding:
- Rewritten question: {rewritten}
- Tables: {tables_hint}
- Time constraints: {time}
- Aggregation: {aggregation}

Now, convert the following question into a SQL query.
Ensure:
- Only output valid SQL.
- Only write read-only SELECT statements.
- Use proper JOINs when needed.
- Do not include explanations.

Question: {question}"#,
        schema = context.schema,
        examples = context.examples,
        rewritten = enhanced.rewritten_query,
        time = or_none(&enhanced.time_constraints),
        aggregation = or_none(&enhanced.aggregation),
    )
}

pub fn text_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are an expert assistant that provides helpful and accurate responses based on the provided context.
Use the following information to answer the question.

Context:
{context}

Answer the following question clearly and concisely.
Ensure:
- Your response is based only on the provided context.
- Be thorough and provide complete information.
- Do not include phrases like 'Based on the context' or 'According to the information'.

Question: {question}"#
    )
}

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() {
        "none"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_prompt_carries_context_and_hints() {
        let context = SqlPromptContext {
            schema: "Table users: id, name".to_string(),
            examples: "Question: count users\nSQL: SELECT COUNT(*) FROM users".to_string(),
        };
        let mut enhanced = EnhancedQuery::fallback("how many users signed up");
        enhanced.mentioned_tables.insert("users".to_string());
        enhanced.aggregation = "COUNT".to_string();

        let prompt = sql_prompt("how many users signed up", &context, &enhanced);

        assert!(prompt.contains("Table users: id, name"));
        assert!(prompt.contains("SELECT COUNT(*) FROM users"));
        assert!(prompt.contains("- Tables: users"));
        assert!(prompt.contains("- Aggregation: COUNT"));
        assert!(prompt.contains("- Time constraints: none"));
        assert!(prompt.ends_with("Question: how many users signed up"));
    }

    #[test]
    fn enhancer_prompt_embeds_schema_hint() {
        let prompt = enhancer_prompt("orders last week", "users, orders");
        assert!(prompt.contains("users, orders"));
        assert!(prompt.contains("Question: orders last week"));
        assert!(prompt.contains("\"rewritten_query\""));
    }
}
