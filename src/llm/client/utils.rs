use serde::de::DeserializeOwned;

use crate::llm::client::types::LlmError;

/// 从模型回复中截取JSON片段
///
/// 先去掉Markdown代码块包裹，再取第一个 `[` 或 `{` 到最后一个对应闭合符号之间的内容。
pub fn extract_json_payload(content: &str) -> &str {
    let mut content = content.trim();

    if let Some((_, rest)) = content.split_once("```json") {
        content = rest.split("```").next().unwrap_or(rest).trim();
    } else if let Some((_, rest)) = content.split_once("```") {
        content = rest.split("```").next().unwrap_or(rest).trim();
    }

    let start = match (content.find('['), content.find('{')) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    if let Some(start) = start {
        let end_char = if content[start..].starts_with('[') { ']' } else { '}' };
        if let Some(end) = content.rfind(end_char)
            && end > start
        {
            return &content[start..=end];
        }
    }

    content
}

/// 解析模型回复中的JSON为指定类型
pub fn parse_json_payload<T: DeserializeOwned>(content: &str) -> Result<T, LlmError> {
    let payload = extract_json_payload(content);
    serde_json::from_str(payload).map_err(|e| {
        let preview: String = payload.chars().take(200).collect();
        LlmError::MalformedResponse(format!("{} (payload: {})", e, preview))
    })
}
