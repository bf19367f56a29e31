//! Page metadata extraction and markup stripping for fetched documents.
//!
//! Feeders only need the handful of fields a link preview would show, plus
//! a readable text rendering of the page.

use std::sync::LazyLock;

use regex::Regex;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());
static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#).unwrap()
});
static SKIP_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|head)\b[^>]*>.*?</(script|style|noscript|head)\s*>|<!--.*?-->")
        .unwrap()
});
static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|tr|h[1-6]|section|article|header|footer|ul|ol|table)\b[^>]*>")
        .unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static INLINE_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").unwrap());
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());

/// Link-preview metadata of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub image: String,
    pub site_name: String,
}

/// Extract metadata from an HTML document. Open Graph and Twitter card tags
/// take precedence over the plain `<title>` and `description` meta.
/// Non-HTML input yields empty fields.
pub fn meta_from_html(html: &str) -> PageMeta {
    let mut meta = PageMeta::default();
    let mut og_title = None;
    let mut og_description = None;

    for tag in META_RE.captures_iter(html) {
        let mut key = None;
        let mut content = None;
        for attr in ATTR_RE.captures_iter(&tag[1]) {
            let name = attr[1].to_ascii_lowercase();
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match name.as_str() {
                "property" | "name" => key = Some(value.to_ascii_lowercase()),
                "content" => content = Some(decode_entities(value.trim())),
                _ => {}
            }
        }
        let (Some(key), Some(content)) = (key, content) else {
            continue;
        };

        match key.as_str() {
            "og:title" | "twitter:title" => {
                og_title.get_or_insert(content);
            }
            "og:description" | "twitter:description" => {
                og_description.get_or_insert(content);
            }
            "description" if meta.description.is_empty() => meta.description = content,
            "og:image" | "twitter:image" if meta.image.is_empty() => meta.image = content,
            "og:site_name" if meta.site_name.is_empty() => meta.site_name = content,
            _ => {}
        }
    }

    if let Some(title) = og_title {
        meta.title = title;
    } else if let Some(cap) = TITLE_RE.captures(html) {
        meta.title = decode_entities(cap[1].trim());
    }
    if let Some(description) = og_description {
        meta.description = description;
    }

    meta
}

/// Strip markup and return the readable text of an HTML document.
pub fn text_from_html(html: &str) -> String {
    let without_blocks = SKIP_BLOCK_RE.replace_all(html, " ");
    let with_breaks = BLOCK_TAG_RE.replace_all(&without_blocks, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);
    let collapsed = INLINE_WS_RE.replace_all(&decoded, " ");
    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    BLANK_LINES_RE
        .replace_all(lines.join("\n").trim(), "\n")
        .into_owned()
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(end) = rest.find(';').filter(|&end| end <= 12) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" | "#39" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_title() {
        let meta = meta_from_html("<html><head><title>T</title></head><body></body></html>");
        assert_eq!(meta.title, "T");
        assert!(meta.description.is_empty());
    }

    #[test]
    fn open_graph_fields() {
        let html = r#"
            <head>
              <title>Fallback</title>
              <meta name="description" content="plain desc">
              <meta property="og:title" content="OG &amp; Title" />
              <meta property="og:image" content='https://img.test/a.png'>
              <meta property="og:site_name" content="Site">
            </head>"#;
        let meta = meta_from_html(html);
        assert_eq!(meta.title, "OG & Title");
        assert_eq!(meta.description, "plain desc");
        assert_eq!(meta.image, "https://img.test/a.png");
        assert_eq!(meta.site_name, "Site");
    }

    #[test]
    fn non_html_yields_empty_meta() {
        assert_eq!(meta_from_html(r#"{"json": true}"#), PageMeta::default());
    }

    #[test]
    fn strips_markup_scripts_and_entities() {
        let html = "<html><head><title>x</title></head><body><script>var a = 1;</script>\
                    <p>Hello &amp; <b>welcome</b></p><div>second</div></body></html>";
        assert_eq!(text_from_html(html), "Hello & welcome\nsecond");
    }

    #[test]
    fn entity_decoding() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &unknown; & c"), "a <b> AB &unknown; & c");
    }
}
