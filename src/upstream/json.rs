//! LLM 输出清洗：去掉 Markdown 代码块标记，截取 JSON 主体

use std::sync::OnceLock;

use regex::Regex;

static FENCE_RE: OnceLock<Regex> = OnceLock::new();

pub fn strip_code_fences(text: &str) -> String {
    let re = FENCE_RE.get_or_init(|| Regex::new(r"```(?:json|JSON)?").unwrap());
    re.replace_all(text, "").trim().to_string()
}

fn slice_between(text: &str, open: char, close: char) -> Option<String> {
    let cleaned = strip_code_fences(text);
    let start = cleaned.find(open)?;
    let end = cleaned.rfind(close)?;
    (end > start).then(|| cleaned[start..=end].to_string())
}

/// 第一个 `[` 到最后一个 `]`
pub fn extract_json_array(text: &str) -> Option<String> {
    slice_between(text, '[', ']')
}

/// 第一个 `{` 到最后一个 `}`
pub fn extract_json_object(text: &str) -> Option<String> {
    slice_between(text, '{', '}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_array_is_extracted() {
        let raw = "Here you go:\n```json\n[{\"cmd\":\"GRAB\",\"width\":0.0}]\n```\nDone.";
        assert_eq!(
            extract_json_array(raw).as_deref(),
            Some("[{\"cmd\":\"GRAB\",\"width\":0.0}]")
        );
    }

    #[test]
    fn test_missing_brackets() {
        assert_eq!(extract_json_array("no plan"), None);
        assert_eq!(extract_json_object("] [ }{"), None);
    }
}
