use scraper::ElementRef;

/// 取元素内全部文本并压缩空白，实体已由解析器解码
pub fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按字符截断，超出部分以省略号结尾
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_element_text() {
        let html = Html::parse_fragment("<p><b>Acme</b>  Corp &amp; Sons\n <i>Inc.</i> &#8212; est. 1920</p>");
        let selector = Selector::parse("p").unwrap();
        let paragraph = html.select(&selector).next().unwrap();

        assert_eq!(element_text(&paragraph), "Acme Corp & Sons Inc. \u{2014} est. 1920");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 4), "abcd...");
    }
}
