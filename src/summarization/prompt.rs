//! Blog-explainer prompt template.

/// Template sent to the chat model. `{context}` receives the retrieved chunks and
/// `{question}` the retrieval question (the whole paper, see [`crate::processing::query`]).
pub const BLOG_PROMPT_TEMPLATE: &str = "
You are an expert science communicator. Based on the content of the research paper below, write a blog-style explainer suitable for a non-expert audience.

Follow this format:

Title: (Make it catchy and easy to understand)

1. The Problem
- What problem does the paper address?
- Why is it important?

2. The Approach
- What method or idea is proposed?
- How does it work in simple terms?

3. Key Takeaways
- What are the key findings?
- How can this be useful?

Write in a conversational tone, use analogies, and avoid technical jargon. The goal is to help general readers understand and appreciate the research.

Context: {context}
Research Paper Text: {question}

Generate a blog-style summary below:
";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

/// Joiner placed between retrieved chunks inside `{context}`.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Fill the blog template.
///
/// Substitution is a single left-to-right pass over the template, so braces that happen to
/// appear inside the paper text are copied through untouched.
pub fn render_blog_prompt(context: &str, question: &str) -> String {
    let mut rendered =
        String::with_capacity(BLOG_PROMPT_TEMPLATE.len() + context.len() + question.len());
    let mut rest = BLOG_PROMPT_TEMPLATE;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let tail = &rest[open..];
        if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
            rendered.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
            rendered.push_str(question);
            rest = after;
        } else {
            rendered.push('{');
            rest = &tail[1..];
        }
    }
    rendered.push_str(rest);
    rendered
}
