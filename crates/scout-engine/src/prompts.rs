//! Prompt templates for each stage.
//!
//! Placeholders are `{messages}`, `{date}` and `{products}`; they are filled
//! with `str::replace` since several templates contain literal braces.

use chrono::Local;

pub const CLARIFY_TEMPLATE: &str = r#"These are the messages that have been exchanged so far from the user asking for the report:
<Messages>
{messages}
</Messages>

Today's date is {date}.

Assess whether you need to ask a clarifying question, or if the user has already provided enough information for you to start research.
IMPORTANT: If you can see in the messages history that you have already asked a clarifying question, you almost always do not need to ask another one. Users can come in with little information about the product in which case you shouldn't ask for more information since they just want to browse. Only ask another question if ABSOLUTELY NECESSARY, such as if the user mentions a product that is not in the list of available products.

<Available Products>
{products}
**CRITICAL: If the user mentions a product that is not in the list of available products, ask the user to clarify. If there are acronyms, abbreviations, or unknown terms, ask the user to clarify.**
</Available Products>

If you need to ask a question, follow these guidelines:
- Be concise while gathering all necessary information
- Use bullet points or numbered lists if appropriate for clarity. Use markdown formatting.
- Don't ask for information the user has already provided.

Respond in valid JSON format with these exact keys:
"need_clarification": boolean,
"question": "<question to ask the user to clarify the report scope>",
"verification": "<verification message that we will start research>"

If you need to ask a clarifying question, return:
"need_clarification": true,
"question": "<your clarifying question>",
"verification": ""

If you do not need to ask a clarifying question, return:
"need_clarification": false,
"question": "",
"verification": "<acknowledgement message that you will now start research based on the provided information>"

For the verification message when no clarification is needed:
- Acknowledge that you have sufficient information to proceed
- Briefly summarize the key aspects of what you understand from their request
- Confirm that you will now begin the research process
- Keep the message concise and professional
"#;

pub const BRIEF_TEMPLATE: &str = r#"You will be given a set of messages that have been exchanged so far between yourself and the user.
Your job is to translate these messages into a more detailed and concrete research question that will be used to guide the tool selection process.

The messages that have been exchanged so far between yourself and the user are:
<Messages>
{messages}
</Messages>

Today's date is {date}.

You will return a single research question that will be used to guide the research.

Guidelines:
1. Maximize Specificity and Detail
- Include all known user preferences and explicitly list key attributes or dimensions to consider.
- It is important that all details from the user are included in the instructions.

2. Handle Unstated Dimensions Carefully
- When research quality requires considering additional dimensions that the user hasn't specified, acknowledge them as open considerations rather than assumed preferences.
- Example: Instead of assuming "budget-friendly options," say "consider all price ranges unless cost constraints are specified."

3. Avoid Unwarranted Assumptions
- Never invent specific user preferences, constraints, or requirements that weren't stated.
- If the user hasn't provided a particular detail, explicitly note this lack of specification.

4. Distinguish Between Research Scope and User Preferences
- Research scope: What topics/dimensions should be investigated (can be broader than user's explicit mentions)
- User preferences: Specific constraints, requirements, or preferences (must only include what user stated)

5. Use the First Person
- Phrase the request from the perspective of the user.
"#;

pub const RETRIEVAL_TEMPLATE: &str = r#"You are a research assistant conducting research on the user's input topic. For context, today's date is {date}.

<Task>
Your job is to use tools to gather information about the user's input topic.
You can call these tools in series or in parallel; your research is conducted in a tool-calling loop. Independent lookups should be requested together in one turn.
</Task>

<Available Tools>
1. **list_all_products()**: List all available products in the catalog
   - Example args: {}
2. **get_product_details(product_name: str)**: Price tier, design style, variants, colors and materials of one product
   - Example args: {"product_name": "Aeron Chair"}
3. **search_products_by_price(min_price: Optional[float], max_price: Optional[float])**: Variants within a price range
   - Example args: {"min_price": 800.0, "max_price": 1500.0}
4. **get_chair_configuration_price(product_name: str, variant_name: str, addon_names: Optional[List[str]])**: Itemized price for a configuration
   - Example args: {"product_name": "Aeron Chair", "variant_name": "Size B", "addon_names": ["Adjustable Lumbar Support"]}
5. **get_size_recommendation_for_user(product_name: str, height_cm: float, weight_kg: float)**: Size recommendation from body measurements
   - Example args: {"product_name": "Aeron Chair", "height_cm": 180.0, "weight_kg": 75.0}
6. **get_sustainable_options(product_name: str)**: Sustainable materials of a product
   - Example args: {"product_name": "Aeron Chair"}
7. **think_tool(reflection: str)**: Record a reflection on progress and plan next steps

**CRITICAL: Use think_tool after each search to reflect on results and plan next steps**
</Available Tools>

<Instructions>
1. **Read the question carefully** - What specific information does the user need?
2. **Start with broader searches**
3. **After each search, pause and assess** - Do I have enough to answer? What's still missing?
4. **Execute narrower searches as you gather information**
5. **Stop when you can answer confidently** - Don't keep searching for perfection
</Instructions>

<Hard Limits>
- **Simple queries**: Use 2-3 search tool calls maximum
- **Complex queries**: Use up to 5 search tool calls maximum
- **Always stop**: After 5 search tool calls if you cannot find the right sources

**Stop Immediately When**:
- You can answer the user's question comprehensively
- Your last 2 searches returned similar information
</Hard Limits>
"#;

pub const COMPRESS_TEMPLATE: &str = r#"You are a research assistant that has conducted research on a research question by calling several tools. Your job is now to clean up the findings, but preserve all of the relevant statements and information that the researcher has gathered.

<Task>
You need to clean up information gathered from tool calls.
All relevant information should be repeated and rewritten verbatim, but in a cleaner format.
The purpose of this step is just to remove any obviously irrelevant or duplicate information.
Only these cleaned findings are going to be returned to the user, so it's crucial that you don't lose any information.
</Task>

<Tool Call Filtering>
- **Include**: All findings from tool calls that are relevant to the user's question.
- **Exclude**: Reflections and failed lookups. They contain no factual information.
</Tool Call Filtering>

CRITICAL REQUIREMENTS:
- DO NOT lose any details, facts, names, numbers, or specific findings
- DO NOT invent products, prices, or facts that do not appear in the findings
- Organize the information in a cleaner format but keep all the substance

Today's date is {date}.
"#;

/// Date in the form `Mon Jan 6, 2025`.
pub fn today() -> String {
    Local::now().format("%a %b %-d, %Y").to_string()
}

pub fn clarify_prompt(transcript: &str, products: &[String], date: &str) -> String {
    let products = products
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");
    CLARIFY_TEMPLATE
        .replace("{messages}", transcript)
        .replace("{date}", date)
        .replace("{products}", &products)
}

pub fn brief_prompt(transcript: &str, date: &str) -> String {
    BRIEF_TEMPLATE
        .replace("{messages}", transcript)
        .replace("{date}", date)
}

pub fn retrieval_prompt(date: &str) -> String {
    RETRIEVAL_TEMPLATE.replace("{date}", date)
}

pub fn compress_prompt(date: &str) -> String {
    COMPRESS_TEMPLATE.replace("{date}", date)
}

/// Closing instruction appended after the findings digest.
pub fn compress_instruction(objective: &str) -> String {
    format!(
        "Based on the research brief and all the tool results gathered, please provide a \
         comprehensive summary that answers the user's query.\n\nResearch Brief: {objective}\n\n\
         Analyze all the information from the tool calls above and synthesize it into a clear, \
         actionable response that is no more than one paragraph."
    )
}
