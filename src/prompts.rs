//! Prompt templates for every reasoning-port call.
//!
//! Templates are plain format functions rather than a template engine: each
//! call site has a fixed, small set of placeholders (conversation buffer,
//! date, caps) and nothing here is user-configurable.

/// Clarification decision: does the conversation carry enough context to
/// start research, or must the user be asked one focused question first?
pub fn clarification_prompt(conversation: &str, date: &str) -> String {
    format!(
        "Today is {date}. You are scoping a research request.\n\
         Review the conversation below and decide whether you need to ask a \
         clarifying question before research can begin, or whether the request \
         already contains enough context.\n\
         Ask only if something essential is missing or ambiguous (scope, the \
         items to compare, the criteria that matter). If you ask, ask exactly \
         one concise question. If no clarification is needed, write a short \
         verification message confirming that research will now begin.\n\n\
         <conversation>\n{conversation}\n</conversation>"
    )
}

/// Brief compilation: turn the whole conversation into one self-contained
/// research objective.
pub fn brief_prompt(conversation: &str, date: &str) -> String {
    format!(
        "Today is {date}. Transform the conversation below into a single, \
         detailed research brief that will guide the research.\n\
         The brief must be fully self-contained: name every entity explicitly \
         and carry over every constraint and preference the user stated. Do \
         not use pronouns that refer back to the conversation. Prefer the \
         user's own wording; where the user was open-ended, note the \
         dimensions as open rather than inventing constraints.\n\n\
         <conversation>\n{conversation}\n</conversation>"
    )
}

/// System prompt for one research loop working a single objective.
pub fn researcher_system_prompt(date: &str) -> String {
    format!(
        "Today is {date}. You are a researcher working on the single topic \
         given in the first user message.\n\
         Use the available tools to gather information. After each search, \
         use the think tool to assess what you found and what is still \
         missing. Issue focused queries; stop as soon as you can answer the \
         topic comprehensively. When you are done, respond without calling \
         any tool."
    )
}

/// System prompt for compressing one loop's full tool history into a
/// finding.
pub fn compression_system_prompt(date: &str) -> String {
    format!(
        "Today is {date}. Compress the research transcript below into \
         findings for a report writer.\n\
         Preserve every relevant fact, number, and source URL verbatim; cut \
         only redundancy and tool chatter. Structure the output as findings \
         with inline source references, followed by a list of the sources \
         used."
    )
}

/// Trailing user message for the compression call.
pub const COMPRESSION_REQUEST: &str =
    "Compress the research above. Do not add information that is not in the transcript.";

/// Condense one webpage's raw content into a summary with key excerpts,
/// for the search tool's source blocks.
pub fn webpage_summary_prompt(webpage_content: &str, date: &str) -> String {
    format!(
        "Today is {date}. Summarize the webpage content below for a \
         researcher who needs its substance without reading the whole page.\n\
         Write a concise summary of what the page says, then collect the \
         most important quotes and excerpts verbatim. Keep every number, \
         name, and date that carries information; drop navigation, \
         boilerplate, and repetition.\n\n\
         <webpage_content>\n{webpage_content}\n</webpage_content>"
    )
}

/// Delegation decision for the supervisor: which sub-topics to research
/// next, or whether research is complete.
pub fn delegation_prompt(
    brief: &str,
    findings_so_far: &str,
    max_concurrent: usize,
    rounds_remaining: usize,
    date: &str,
) -> String {
    let findings_block = if findings_so_far.is_empty() {
        "No research has been conducted yet.".to_string()
    } else {
        format!("Findings so far:\n{findings_so_far}")
    };
    format!(
        "Today is {date}. You are the lead researcher coordinating a team.\n\
         Research brief:\n{brief}\n\n\
         {findings_block}\n\n\
         Decide what to do next. Either delegate up to {max_concurrent} \
         independent sub-topics for parallel research, or declare research \
         complete. Each sub-topic must be a single, self-contained objective \
         described in at least one full sentence; sub-topics must not overlap. \
         Delegate multiple sub-topics only when the brief genuinely splits \
         into independent parts (for example, comparing several named items). \
         You have {rounds_remaining} delegation rounds remaining; declare \
         research complete when the findings already cover the brief."
    )
}

/// Final report generation over the brief and all findings.
pub fn final_report_prompt(brief: &str, findings: &str, date: &str) -> String {
    format!(
        "Today is {date}. Write the final research report.\n\
         Research brief:\n{brief}\n\n\
         Findings:\n{findings}\n\n\
         Write a well-structured report in markdown that directly answers the \
         brief: a brief overview, one section per major theme, and a closing \
         list of sources. Cite sources inline where facts come from them. If \
         several findings cite the same source, cite it once. Where findings \
         are marked as failed or truncated, say so plainly rather than \
         papering over the gap."
    )
}
