//! Prompt templates sent to the model.

pub fn complexity(code: &str) -> String {
    format!(
        "Analyze the time and space complexity of the following code snippet.\n\
         \n\
         Format your response as:\n\
         **Time Complexity:** O(notation)\n\
         **Space Complexity:** O(notation)\n\
         \n\
         Use markdown formatting. Do not include any explanations, reasoning, or additional text.\n\
         \n\
         Code to analyze:\n\
         ```\n\
         {code}\n\
         ```\n"
    )
}

pub fn debug(code: &str) -> String {
    format!(
        "As a code expert, analyze the following code for bugs, errors, and issues.\n\
         \n\
         Format your response with markdown:\n\
         \n\
         ### Issues Found:\n\
         - **Error Type:** Description of the issue\n\
         \n\
         ### Suggested Fixes:\n\
         - **Fix:** Specific solution for each issue\n\
         \n\
         ### Improved Code:\n\
         ```\n\
         Your improved code here\n\
         ```\n\
         \n\
         Use markdown formatting with proper code blocks for code examples.\n\
         \n\
         Code to debug:\n\
         ```\n\
         {code}\n\
         ```\n"
    )
}

pub fn create(problem_statement: &str, language: &str) -> String {
    format!(
        "Generate a {language} code solution for the following problem:\n\
         \n\
         Problem: {problem_statement}\n\
         \n\
         Format your response with markdown:\n\
         \n\
         ### Solution:\n\
         ```{language}\n\
         Your code solution here\n\
         ```\n\
         \n\
         ### Explanation:\n\
         Brief explanation of the approach\n\
         \n\
         ### Complexity:\n\
         **Time:** O(notation)\n\
         **Space:** O(notation)\n\
         \n\
         Use proper markdown formatting with code blocks for the solution.\n"
    )
}

/// Asks for a JSON array of `count` samples for an arbitrary growth label.
pub fn curve(label: &str, count: u32) -> String {
    format!(
        "Generate realistic performance data for an algorithm with {label} complexity.\n\
         \n\
         Return ONLY a JSON array of exactly {count} objects, one per input size from 1 to {count}, \
         each shaped like {{\"input_size\": <integer>, \"operations\": <number>}}.\n\
         \n\
         Rules:\n\
         - operations must follow the {label} growth rate\n\
         - add about 10% realistic variation to each value\n\
         - every value must be a finite number of at least 1\n\
         - cap exponential or factorial growth so no value exceeds 1048576\n\
         - no markdown, comments, or explanations\n"
    )
}
